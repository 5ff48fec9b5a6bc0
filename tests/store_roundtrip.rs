//! On-disk history round trips: wire format stability, legacy fallback, bigint fidelity.

use alloy::primitives::{Address, I256};
use giftlink::{
    storage::{
        GiftStore, HistoryBackend, JsonFileBackend, VersionedHistory,
        migrate::{RecordV1, TokenSnapshot},
    },
    types::{DeploymentId, EscrowCredentials, HistoryKey, IntentHash, TokenDiff, TokenId},
};
use chrono::DateTime;
use std::sync::Arc;
use tempfile::TempDir;

/// The most negative delta a record can carry; its decimal form must survive the disk intact.
const MIN_DELTA: &str =
    "-57896044618658097711785492504343953926634992332820282019728792003956564819968";

fn key() -> HistoryKey {
    HistoryKey::evm(Address::with_last_byte(0x42))
}

fn diff_of(deltas: &[(DeploymentId, I256)]) -> TokenDiff {
    deltas.iter().copied().collect()
}

/// Reads the single history file a backend directory holds.
fn read_history_file(dir: &TempDir) -> eyre::Result<String> {
    let mut entries = std::fs::read_dir(dir.path())?;
    let entry = entries.next().ok_or_else(|| eyre::eyre!("no history file written"))??;
    Ok(std::fs::read_to_string(entry.path())?)
}

#[tokio::test]
async fn records_written_by_one_store_load_in_the_next() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let credentials = EscrowCredentials::generate();
    let diff = diff_of(&[
        (DeploymentId::native(1), I256::MIN),
        (DeploymentId::native(10), I256::try_from(-3i8)?),
    ]);

    let store = GiftStore::new(Arc::new(JsonFileBackend::new(dir.path())));
    store.add_gift(&key(), &credentials, diff.clone(), "extremes").await?;
    let updated = store
        .update_gift(&key(), &credentials.encode(), vec![IntentHash::repeat_byte(0xA1)])
        .await?;

    // A cold store over the same directory sees the identical record.
    let reopened = GiftStore::new(Arc::new(JsonFileBackend::new(dir.path())));
    let records = reopened.load_gifts(&key()).await?;
    assert_eq!(records, vec![updated]);
    assert_eq!(records[0].token_diff[&DeploymentId::native(1)], I256::MIN);
    assert!(!records[0].is_draft());
    Ok(())
}

#[tokio::test]
async fn the_wire_format_tags_versions_and_bigints() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = GiftStore::new(Arc::new(JsonFileBackend::new(dir.path())));
    store
        .add_gift(
            &key(),
            &EscrowCredentials::generate(),
            diff_of(&[(DeploymentId::native(1), I256::MIN)]),
            "",
        )
        .await?;

    let written = read_history_file(&dir)?;
    assert!(written.contains(r#""version":"v2""#), "history must carry its version tag");
    assert!(written.contains(r#""__type":"bigint""#), "deltas must be tagged bigints");
    assert!(written.contains(MIN_DELTA), "deltas must be stored as exact decimal strings");
    Ok(())
}

#[tokio::test]
async fn legacy_histories_are_imported_but_never_written() -> eyre::Result<()> {
    let old_dir = tempfile::tempdir()?;
    let new_dir = tempfile::tempdir()?;
    let credentials = EscrowCredentials::generate();

    // A history as an older client left it on disk: v1 records still carrying the token
    // snapshot and account id.
    let legacy_backend = Arc::new(JsonFileBackend::new(old_dir.path()));
    let legacy_record = RecordV1 {
        secret_key: credentials.encode(),
        token_diff: diff_of(&[(DeploymentId::native(1), I256::try_from(-9i8)?)]),
        message: "from the old app".into(),
        intent_hashes: vec![IntentHash::repeat_byte(0x11)],
        created_at: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
        updated_at: DateTime::from_timestamp_millis(1_700_000_060_000).unwrap(),
        encryption_iv: None,
        token: TokenSnapshot { id: TokenId::new("usdc".into()), symbol: None, decimals: 6 },
        account_id: Address::with_last_byte(0x42),
    };
    legacy_backend
        .store(&key(), &VersionedHistory::V1 { records: vec![legacy_record] })
        .await?;
    let legacy_bytes = read_history_file(&old_dir)?;

    let store = GiftStore::new(Arc::new(JsonFileBackend::new(new_dir.path())))
        .with_legacy(legacy_backend.clone());

    // The fallback read migrates the record to the current shape.
    let records = store.load_gifts(&key()).await?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message, "from the old app");
    assert!(records[0].encryption_iv.is_empty());

    // A mutation commits the merged history to the durable backend only.
    store
        .add_gift(
            &key(),
            &EscrowCredentials::generate(),
            diff_of(&[(DeploymentId::native(1), I256::MINUS_ONE)]),
            "fresh",
        )
        .await?;
    assert_eq!(read_history_file(&old_dir)?, legacy_bytes, "legacy files must stay untouched");

    let durable = read_history_file(&new_dir)?;
    assert!(durable.contains(r#""version":"v2""#));
    assert!(durable.contains("from the old app"));
    assert!(durable.contains("fresh"));

    // Once the durable backend holds the key, the legacy backend is out of the loop.
    let reopened = GiftStore::new(Arc::new(JsonFileBackend::new(new_dir.path())));
    assert_eq!(reopened.load_gifts(&key()).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn histories_are_partitioned_per_wallet() -> eyre::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = GiftStore::new(Arc::new(JsonFileBackend::new(dir.path())));
    let other = HistoryKey::evm(Address::with_last_byte(0x43));

    store
        .add_gift(
            &key(),
            &EscrowCredentials::generate(),
            diff_of(&[(DeploymentId::native(1), I256::MINUS_ONE)]),
            "mine",
        )
        .await?;

    assert!(store.load_gifts(&other).await?.is_empty());
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
    Ok(())
}
