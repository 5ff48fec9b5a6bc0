//! Gift flow metrics.

use metrics::Counter;
use metrics_derive::Metrics;

/// Metrics for the [`IntentPipeline`](crate::intents::IntentPipeline).
#[derive(Metrics)]
#[metrics(scope = "gift_pipeline")]
pub struct PipelineMetrics {
    /// Number of transfers signed.
    pub signed: Counter,
    /// Number of payloads published.
    pub published: Counter,
    /// Number of transfers settled.
    pub settled: Counter,
    /// Number of pipeline runs that failed.
    pub failed: Counter,
}

/// Metrics for the [`ClaimProtocol`](crate::claim::ClaimProtocol).
#[derive(Metrics)]
#[metrics(scope = "gift_claim")]
pub struct ClaimMetrics {
    /// Number of gifts claimed.
    pub claimed: Counter,
    /// Number of claims that found the escrow already drained.
    pub unclaimable: Counter,
    /// Number of claims aborted before confirmation.
    pub aborted: Counter,
}
