/// Errors returned by gift record storage.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No record with the given secret key exists for the wallet.
    ///
    /// The message carries no key material.
    #[error("gift record not found")]
    GiftNotFound,
    /// A (de)serialization error occurred.
    #[error("a deserialization error occurred")]
    Serde(#[from] serde_json::Error),
    /// A stored history could not be migrated to the current layout.
    #[error(transparent)]
    Migration(#[from] MigrationError),
    /// A storage backend failed.
    #[error("storage backend {backend} failed")]
    Backend {
        /// Name of the failing backend.
        backend: &'static str,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// An internal error occurred.
    #[error("an internal error occurred")]
    Internal(#[from] eyre::Error),
}

/// Errors produced while migrating stored histories to the current layout.
///
/// These are not recoverable by retrying; the stored payload itself is bad.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    /// A stored record does not parse under its declared version.
    #[error("invalid {version} record: {reason}")]
    InvalidRecord {
        /// Version tag of the record that failed to migrate.
        version: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}
