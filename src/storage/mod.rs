//! Gift history storage.

mod api;
pub use api::HistoryBackend;

mod disk;
pub use disk::JsonFileBackend;

mod memory;
pub use memory::InMemoryBackend;

pub mod migrate;
pub use migrate::VersionedHistory;

use crate::{
    constants::ENCRYPTION_IV_LEN,
    error::StorageError,
    types::{EscrowCredentials, GiftRecord, HistoryKey, IntentHash, TokenDiff},
};
use alloy::primitives::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::instrument;

/// Gift history store.
///
/// One durable backend is authoritative; legacy backends are consulted, in order, only when the
/// durable backend has never seen a key, and are never written back to. Every mutation is a
/// read-modify-write over a cached copy that commits to the durable backend first; the cache
/// only picks up states the backend accepted.
///
/// Mutations are not transactional across store handles. Two instances racing on the same gift
/// settle the question on-chain: the escrow balance decides, the records merely remember.
#[derive(Debug, Clone)]
pub struct GiftStore {
    durable: Arc<dyn HistoryBackend>,
    legacy: Vec<Arc<dyn HistoryBackend>>,
    cache: Arc<DashMap<HistoryKey, Vec<GiftRecord>>>,
}

impl GiftStore {
    /// Creates a store committing to the given durable backend.
    pub fn new(durable: Arc<dyn HistoryBackend>) -> Self {
        Self { durable, legacy: Vec::new(), cache: Arc::new(DashMap::new()) }
    }

    /// Creates a [`GiftStore`] with an in-memory backend. Used for testing only.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBackend::new()))
    }

    /// Appends a read-only legacy backend consulted when the durable backend is empty.
    ///
    /// Fallbacks are consulted in the order they were appended.
    pub fn with_legacy(mut self, backend: Arc<dyn HistoryBackend>) -> Self {
        self.legacy.push(backend);
        self
    }

    /// Loads all gift records stored for a wallet, oldest first.
    pub async fn load_gifts(&self, key: &HistoryKey) -> api::Result<Vec<GiftRecord>> {
        self.records_for(key).await
    }

    /// Persists a fresh gift record, minting its encryption IV.
    ///
    /// The record starts as a draft: created and updated at the same instant, no intent hashes.
    /// Drafts are written before the funding transfer is even published, so the escrow key
    /// survives a crash between signing and publishing.
    #[instrument(skip_all, fields(%key))]
    pub async fn add_gift(
        &self,
        key: &HistoryKey,
        credentials: &EscrowCredentials,
        token_diff: TokenDiff,
        message: impl Into<String> + Send,
    ) -> api::Result<GiftRecord> {
        let now = now_millis();
        let record = GiftRecord {
            secret_key: credentials.encode(),
            token_diff,
            message: message.into(),
            intent_hashes: Vec::new(),
            created_at: now,
            updated_at: now,
            encryption_iv: Bytes::copy_from_slice(&rand::random::<[u8; ENCRYPTION_IV_LEN]>()),
        };

        let mut records = self.records_for(key).await?;
        records.push(record.clone());
        self.commit(key, records).await?;
        tracing::debug!(account = %credentials.address, "added gift record");
        Ok(record)
    }

    /// Attaches the published intent hashes to a stored gift.
    #[instrument(skip_all, fields(%key, intents = intent_hashes.len()))]
    pub async fn update_gift(
        &self,
        key: &HistoryKey,
        secret_key: &str,
        intent_hashes: Vec<IntentHash>,
    ) -> api::Result<GiftRecord> {
        let mut records = self.records_for(key).await?;
        let record =
            records.iter_mut().find(|record| record.secret_key == secret_key).ok_or(
                StorageError::GiftNotFound,
            )?;
        record.intent_hashes = intent_hashes;
        // The update must be visible even when it lands within the creation millisecond,
        // otherwise the record would still read as a draft.
        record.updated_at =
            now_millis().max(record.created_at + TimeDelta::milliseconds(1));
        let record = record.clone();

        self.commit(key, records).await?;
        Ok(record)
    }

    /// Removes a stored gift.
    #[instrument(skip_all, fields(%key))]
    pub async fn remove_gift(&self, key: &HistoryKey, secret_key: &str) -> api::Result<()> {
        let mut records = self.records_for(key).await?;
        let len = records.len();
        records.retain(|record| record.secret_key != secret_key);
        if records.len() == len {
            return Err(StorageError::GiftNotFound);
        }
        self.commit(key, records).await
    }

    /// Reads the current records for a key, consulting backends on a cache miss.
    async fn records_for(&self, key: &HistoryKey) -> api::Result<Vec<GiftRecord>> {
        if let Some(records) = self.cache.get(key) {
            return Ok(records.clone());
        }

        let mut history = self.durable.load(key).await?;
        if history.is_none() {
            for backend in &self.legacy {
                history = backend.load(key).await?;
                if history.is_some() {
                    tracing::info!(
                        backend = backend.name(),
                        %key,
                        "loaded history from legacy backend"
                    );
                    break;
                }
            }
        }

        let records = history.map(migrate::to_latest).transpose()?.unwrap_or_default();
        self.cache.insert(*key, records.clone());
        Ok(records)
    }

    /// Commits records durably, then updates the cache.
    async fn commit(&self, key: &HistoryKey, records: Vec<GiftRecord>) -> api::Result<()> {
        self.durable.store(key, &VersionedHistory::latest(records.clone())).await?;
        self.cache.insert(*key, records);
        Ok(())
    }
}

/// The current time, clamped to the millisecond precision records round-trip at.
fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}
