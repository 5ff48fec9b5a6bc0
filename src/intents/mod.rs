//! The sign, publish and settle pipeline.

use crate::{
    abort::AbortSignal,
    config::GiftConfig,
    constants::{DEFAULT_DEADLINE_TTL, DEFAULT_SETTLE_POLL_INTERVAL},
    error::{PipelineError, PublishError},
    metrics::PipelineMetrics,
    relay::{IntentStatus, RelayApi},
    signers::IntentSigner,
    types::{IntentHash, SignedTransfer, TokenDiff, TransferMessage},
};
use alloy::primitives::{Address, B256};
use std::{sync::Arc, time::Duration};
use tracing::instrument;

/// Everything a completed pipeline run produced.
#[derive(Debug, Clone)]
pub struct IntentOutcome {
    /// The signed payload that was published.
    pub payload: SignedTransfer,
    /// The intents the relay admitted.
    pub intent_hashes: Vec<IntentHash>,
    /// The transaction that settled the transfer.
    pub tx_hash: B256,
}

/// Runs transfers through signing, publishing and settlement.
///
/// Makers funding an escrow and claimers draining one share this pipeline; only the signer and
/// the direction of the diff differ.
#[derive(Debug, Clone)]
pub struct IntentPipeline {
    relay: Arc<dyn RelayApi>,
    ttl: Duration,
    poll_interval: Duration,
    metrics: Arc<PipelineMetrics>,
}

impl IntentPipeline {
    /// Creates a pipeline with default timing.
    pub fn new(relay: Arc<dyn RelayApi>) -> Self {
        Self {
            relay,
            ttl: DEFAULT_DEADLINE_TTL,
            poll_interval: DEFAULT_SETTLE_POLL_INTERVAL,
            metrics: Arc::new(PipelineMetrics::default()),
        }
    }

    /// Creates a pipeline timed from the config.
    pub fn from_config(relay: Arc<dyn RelayApi>, config: &GiftConfig) -> Self {
        Self {
            relay,
            ttl: config.deadline_ttl,
            poll_interval: config.settle_poll_interval,
            metrics: Arc::new(PipelineMetrics::default()),
        }
    }

    /// Asks the signer to commit to moving `diff` out of its account towards `recipient`.
    #[instrument(skip_all, fields(signer = %signer.address(), recipient = %recipient))]
    pub async fn sign(
        &self,
        signer: &dyn IntentSigner,
        recipient: Address,
        diff: TokenDiff,
    ) -> Result<SignedTransfer, PipelineError> {
        let message = TransferMessage::new(signer.address(), recipient, diff, self.ttl);
        let digest = message.digest();
        let signature = signer
            .sign_digest(digest)
            .await
            .map_err(PipelineError::Signing)?
            .ok_or(PipelineError::SigningDeclined)?;
        self.metrics.signed.increment(1);
        tracing::debug!(%digest, deadline = %message.deadline, "signed transfer");
        Ok(message.into_signed(signature))
    }

    /// Publishes a signed transfer, returning the admitted intent hashes.
    #[instrument(skip_all, fields(payload_hash = %payload.hash()))]
    pub async fn publish(
        &self,
        payload: &SignedTransfer,
    ) -> Result<Vec<IntentHash>, PipelineError> {
        let hashes = self
            .relay
            .publish_intents(payload)
            .await
            .map_err(|err| PipelineError::Publishing(err.into()))?;
        if hashes.is_empty() {
            return Err(PublishError::NoIntentsAccepted.into());
        }
        self.metrics.published.increment(1);
        tracing::info!(intents = hashes.len(), "published transfer");
        Ok(hashes)
    }

    /// Waits until the transfer settles, returning the settling transaction hash.
    ///
    /// Relays settle a payload's intents together, so polling the first hash stands for all of
    /// them. The wait can be cancelled through `abort`; the published intents stay live on the
    /// relay either way.
    #[instrument(skip_all, fields(intent = %intent_hashes.first().copied().unwrap_or_default()))]
    pub async fn settle(
        &self,
        intent_hashes: &[IntentHash],
        abort: &AbortSignal,
    ) -> Result<B256, PipelineError> {
        let Some(intent) = intent_hashes.first().copied() else {
            return Err(PublishError::NoIntentsAccepted.into());
        };
        loop {
            if abort.is_aborted() {
                return Err(PipelineError::Aborted);
            }
            match self.relay.intent_status(intent).await? {
                IntentStatus::Settled { tx_hash } => {
                    self.metrics.settled.increment(1);
                    tracing::info!(%tx_hash, "intent settled");
                    return Ok(tx_hash);
                }
                IntentStatus::Invalid { reason } => {
                    return Err(PipelineError::Settlement(reason));
                }
                IntentStatus::Pending => {
                    tokio::select! {
                        _ = abort.aborted() => return Err(PipelineError::Aborted),
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                }
            }
        }
    }

    /// Runs the full pipeline: sign, publish, then wait for settlement.
    pub async fn execute(
        &self,
        signer: &dyn IntentSigner,
        recipient: Address,
        diff: TokenDiff,
        abort: &AbortSignal,
    ) -> Result<IntentOutcome, PipelineError> {
        let outcome = async {
            let payload = self.sign(signer, recipient, diff).await?;
            let intent_hashes = self.publish(&payload).await?;
            let tx_hash = self.settle(&intent_hashes, abort).await?;
            Ok(IntentOutcome { payload, intent_hashes, tx_hash })
        }
        .await;
        if outcome.is_err() {
            self.metrics.failed.increment(1);
        }
        outcome
    }
}
