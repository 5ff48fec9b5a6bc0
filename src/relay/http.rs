//! HTTP relay client.

use super::{IntentStatus, RelayApi};
use crate::{
    balances::{BalanceMap, BalanceOracle},
    constants::INSUFFICIENT_BALANCE_CODE,
    error::RelayError,
    types::{IntentHash, SignedTransfer},
};
use alloy::primitives::Address;
use async_trait::async_trait;
use jsonrpsee::{
    core::{ClientError, RpcResult},
    http_client::{HttpClient, HttpClientBuilder},
    proc_macros::rpc,
};
use url::Url;

/// The `gift_` RPC namespace of intent relays.
#[rpc(client, namespace = "gift")]
pub trait GiftRelayApi {
    /// Submits a signed transfer for execution.
    #[method(name = "publishIntents")]
    async fn publish_intents(&self, payload: SignedTransfer) -> RpcResult<Vec<IntentHash>>;

    /// Reads the status of a published intent.
    #[method(name = "intentStatus")]
    async fn intent_status(&self, hash: IntentHash) -> RpcResult<IntentStatus>;

    /// Reads all balances of an account.
    #[method(name = "accountBalances")]
    async fn account_balances(&self, account: Address) -> RpcResult<BalanceMap>;
}

/// A relay reached over HTTP JSON-RPC.
#[derive(Debug, Clone)]
pub struct HttpRelay {
    client: HttpClient,
}

impl HttpRelay {
    /// Connects to the relay at the given endpoint.
    pub fn new(endpoint: &Url) -> Result<Self, RelayError> {
        Ok(Self { client: HttpClientBuilder::default().build(endpoint.as_str())? })
    }
}

/// Maps a JSON-RPC client error to a [`RelayError`].
fn map_client_error(err: ClientError) -> RelayError {
    match err {
        ClientError::Call(object) if object.code() == INSUFFICIENT_BALANCE_CODE => {
            RelayError::InsufficientBalance
        }
        ClientError::Call(object) => RelayError::Rejected(object.message().to_string()),
        err => RelayError::Transport(err),
    }
}

#[async_trait]
impl RelayApi for HttpRelay {
    async fn publish_intents(
        &self,
        payload: &SignedTransfer,
    ) -> Result<Vec<IntentHash>, RelayError> {
        GiftRelayApiClient::publish_intents(&self.client, payload.clone())
            .await
            .map_err(map_client_error)
    }

    async fn intent_status(&self, hash: IntentHash) -> Result<IntentStatus, RelayError> {
        GiftRelayApiClient::intent_status(&self.client, hash).await.map_err(map_client_error)
    }
}

#[async_trait]
impl BalanceOracle for HttpRelay {
    async fn balances(&self, account: Address) -> Result<BalanceMap, RelayError> {
        GiftRelayApiClient::account_balances(&self.client, account)
            .await
            .map_err(map_client_error)
    }
}
