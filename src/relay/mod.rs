//! Relay endpoints.

mod http;
pub use http::HttpRelay;

mod mock;
pub use mock::InMemoryRelay;

use crate::{
    error::RelayError,
    types::{IntentHash, SignedTransfer},
};
use alloy::primitives::B256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Status of a published intent as reported by a relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum IntentStatus {
    /// The relay holds the intent but has not executed it yet.
    Pending,
    /// The intent executed on-chain.
    Settled {
        /// Hash of the settling transaction.
        tx_hash: B256,
    },
    /// The relay gave up on the intent.
    Invalid {
        /// Why the intent cannot settle.
        reason: String,
    },
}

/// Relay API.
#[async_trait]
pub trait RelayApi: Debug + Send + Sync {
    /// Submits a signed transfer, returning the hashes of the intents the relay admitted.
    ///
    /// A transfer touching several chains yields one intent per chain. An empty result means
    /// the relay took nothing.
    async fn publish_intents(
        &self,
        payload: &SignedTransfer,
    ) -> Result<Vec<IntentHash>, RelayError>;

    /// Reads the status of a published intent.
    async fn intent_status(&self, hash: IntentHash) -> Result<IntentStatus, RelayError>;
}
