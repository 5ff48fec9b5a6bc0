//! Gift history storage on disk.

use super::{HistoryBackend, api::Result, migrate::VersionedHistory};
use crate::{error::StorageError, types::HistoryKey};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

const BACKEND_NAME: &str = "json-file";

/// [`HistoryBackend`] implementation writing one JSON file per history key.
///
/// Writes land in a temporary file first and are renamed into place, so a crash mid-write
/// leaves the previous history intact rather than a truncated file.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    /// Creates a backend storing histories under the given directory.
    ///
    /// The directory is created on the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &HistoryKey) -> PathBuf {
        // `:` is not portable in file names; the key renders as `<kind>-<wallet>`.
        self.dir.join(format!("{}-{}.json", key.chain_kind, key.wallet))
    }

    fn io_error(source: std::io::Error) -> StorageError {
        StorageError::Backend { backend: BACKEND_NAME, source }
    }
}

#[async_trait]
impl HistoryBackend for JsonFileBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn load(&self, key: &HistoryKey) -> Result<Option<VersionedHistory>> {
        let bytes = match fs::read(self.path_for(key)).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Self::io_error(err)),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn store(&self, key: &HistoryKey, history: &VersionedHistory) -> Result<()> {
        fs::create_dir_all(&self.dir).await.map_err(Self::io_error)?;

        let path = self.path_for(key);
        let staged = staging_path(&path);
        fs::write(&staged, serde_json::to_vec(history)?).await.map_err(Self::io_error)?;
        fs::rename(&staged, &path).await.map_err(Self::io_error)?;
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut staged = path.as_os_str().to_owned();
    staged.push(".tmp");
    PathBuf::from(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GiftRecord, TokenDiff};
    use alloy::primitives::{Address, Bytes, I256};
    use chrono::DateTime;

    fn record() -> GiftRecord {
        GiftRecord {
            secret_key: "secp256k1:0000000000000000000000000000000000000000000000000000000000000001".into(),
            token_diff: TokenDiff::from_iter([(
                crate::types::DeploymentId::native(1),
                I256::try_from(-42i8).unwrap(),
            )]),
            message: "for later".into(),
            intent_hashes: Vec::new(),
            created_at: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            updated_at: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            encryption_iv: Bytes::from_static(&[7u8; 16]),
        }
    }

    #[tokio::test]
    async fn store_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path());
        let key = HistoryKey::evm(Address::with_last_byte(1));

        assert_eq!(backend.load(&key).await.unwrap(), None);

        let history = VersionedHistory::latest(vec![record()]);
        backend.store(&key, &history).await.unwrap();
        assert_eq!(backend.load(&key).await.unwrap(), Some(history));

        // No staging file left behind.
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".json"), "{names:?}");
    }

    #[tokio::test]
    async fn histories_are_stored_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path());
        let first = HistoryKey::evm(Address::with_last_byte(1));
        let second = HistoryKey::evm(Address::with_last_byte(2));

        backend.store(&first, &VersionedHistory::latest(vec![record()])).await.unwrap();
        backend.store(&second, &VersionedHistory::latest(Vec::new())).await.unwrap();

        assert_eq!(
            backend.load(&first).await.unwrap(),
            Some(VersionedHistory::latest(vec![record()]))
        );
        assert_eq!(
            backend.load(&second).await.unwrap(),
            Some(VersionedHistory::latest(Vec::new()))
        );
    }

    #[tokio::test]
    async fn corrupt_files_fail_loudly() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path());
        let key = HistoryKey::evm(Address::with_last_byte(1));

        backend.store(&key, &VersionedHistory::latest(Vec::new())).await.unwrap();
        let path = backend.path_for(&key);
        std::fs::write(&path, b"{ not json").unwrap();

        assert!(matches!(backend.load(&key).await, Err(StorageError::Serde(_))));
    }
}
