use crate::types::IntentHash;

/// Errors returned by relay endpoints.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The escrow account no longer covers the transfer.
    ///
    /// During claims this is the signal that a concurrent claimer won the race.
    #[error("insufficient escrow balance")]
    InsufficientBalance,
    /// The relay rejected the request.
    #[error("relay rejected the request: {0}")]
    Rejected(String),
    /// The relay does not know the intent.
    #[error("unknown intent {0}")]
    UnknownIntent(IntentHash),
    /// An error occurred talking to the relay.
    #[error(transparent)]
    Transport(#[from] jsonrpsee::core::ClientError),
}
