use super::RelayError;

/// Errors produced when publishing a signed transfer to a relay.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The escrow account no longer covers the transfer.
    #[error("insufficient escrow balance")]
    InsufficientBalance,
    /// The relay accepted the call but admitted no intents.
    #[error("the relay accepted no intents")]
    NoIntentsAccepted,
    /// The relay rejected the payload.
    #[error("relay rejected the payload: {0}")]
    Rejected(String),
    /// An error occurred talking to the relay.
    #[error(transparent)]
    Transport(RelayError),
}

impl From<RelayError> for PublishError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::InsufficientBalance => Self::InsufficientBalance,
            RelayError::Rejected(reason) => Self::Rejected(reason),
            err => Self::Transport(err),
        }
    }
}

/// Errors produced by the sign, publish and settle pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The signer declined to produce a signature.
    #[error("signing was declined")]
    SigningDeclined,
    /// The signer failed to produce a signature.
    #[error("signing failed")]
    Signing(#[source] eyre::Error),
    /// Publishing the signed transfer failed.
    #[error(transparent)]
    Publishing(#[from] PublishError),
    /// The relay reported the intent as invalid during settlement.
    #[error("settlement failed: {0}")]
    Settlement(String),
    /// The wait for settlement was aborted.
    #[error("settlement wait aborted")]
    Aborted,
    /// An error occurred talking to the relay.
    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl PipelineError {
    /// Whether this is the insufficient balance signal claims use to detect a lost race.
    pub const fn is_insufficient_balance(&self) -> bool {
        matches!(self, Self::Publishing(PublishError::InsufficientBalance))
    }
}
