//! Giftlink error types.

use thiserror::Error;

mod amount;
pub use amount::AmountError;

mod credentials;
pub use credentials::CredentialError;

mod pipeline;
pub use pipeline::{PipelineError, PublishError};

mod relay;
pub use relay::RelayError;

mod storage;
pub use storage::{MigrationError, StorageError};

/// The overarching error type for gift operations.
#[derive(Debug, Error)]
pub enum GiftError {
    /// Errors related to amount parsing and splitting.
    #[error(transparent)]
    Amount(#[from] AmountError),
    /// Errors related to escrow credentials.
    #[error(transparent)]
    Credential(#[from] CredentialError),
    /// Errors related to the intent pipeline.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// Errors related to relay communication.
    #[error(transparent)]
    Relay(#[from] RelayError),
    /// Errors related to gift record storage.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// An internal error occurred.
    #[error(transparent)]
    Internal(#[from] eyre::Error),
}
