use crate::{
    error::StorageError,
    storage::VersionedHistory,
    types::HistoryKey,
};
use async_trait::async_trait;
use std::fmt::Debug;

/// Storage result type.
pub type Result<T> = core::result::Result<T, StorageError>;

/// A backend holding per-wallet gift histories.
///
/// Backends store histories verbatim, including their version tag. Migration to the latest
/// record shape happens above the backend, in [`GiftStore`](crate::storage::GiftStore).
#[async_trait]
pub trait HistoryBackend: Debug + Send + Sync {
    /// The backend's name, used in error reports and logs.
    fn name(&self) -> &'static str;

    /// Loads the history stored under a key.
    ///
    /// Returns `None` when the backend has never seen the key. An existing but empty history
    /// is `Some`.
    async fn load(&self, key: &HistoryKey) -> Result<Option<VersionedHistory>>;

    /// Stores a history under a key, replacing whatever was there.
    async fn store(&self, key: &HistoryKey, history: &VersionedHistory) -> Result<()>;
}
