//! Gift history storage in-memory.
//!
//! Backs tests, and stands in for the ephemeral browser stores older clients kept their
//! histories in when wiring those up as legacy fallbacks.

use super::{HistoryBackend, api::Result, migrate::VersionedHistory};
use crate::types::HistoryKey;
use async_trait::async_trait;
use dashmap::DashMap;

/// [`HistoryBackend`] implementation in-memory.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    histories: DashMap<HistoryKey, VersionedHistory>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend pre-seeded with one stored history.
    ///
    /// Tests use this to model a legacy store that already holds records.
    pub fn seeded(key: HistoryKey, history: VersionedHistory) -> Self {
        let backend = Self::default();
        backend.histories.insert(key, history);
        backend
    }
}

#[async_trait]
impl HistoryBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, key: &HistoryKey) -> Result<Option<VersionedHistory>> {
        Ok(self.histories.get(key).map(|history| history.clone()))
    }

    async fn store(&self, key: &HistoryKey, history: &VersionedHistory) -> Result<()> {
        self.histories.insert(*key, history.clone());
        Ok(())
    }
}
