//! Gift history versioning and migration.

use crate::{
    error::MigrationError,
    types::{GiftRecord, IntentHash, TokenDiff, TokenId},
};
use alloy::primitives::{Address, Bytes, I256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A wallet's gift history as stored, tagged with its record shape version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "version", rename_all = "lowercase")]
pub enum VersionedHistory {
    /// Plain decimal-string deltas, token snapshot and account id on every record.
    V0 {
        /// The stored records.
        records: Vec<RecordV0>,
    },
    /// Tagged bigint deltas, token snapshot and account id still present.
    V1 {
        /// The stored records.
        records: Vec<RecordV1>,
    },
    /// The current record shape.
    V2 {
        /// The stored records.
        records: Vec<GiftRecord>,
    },
}

impl VersionedHistory {
    /// Wraps records in the latest version.
    pub const fn latest(records: Vec<GiftRecord>) -> Self {
        Self::V2 { records }
    }
}

/// Token metadata legacy records carried inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSnapshot {
    /// The token identifier.
    pub id: TokenId,
    /// Display symbol, when one was known.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Decimals of the token.
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_decimals() -> u8 {
    18
}

/// The original gift record shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordV0 {
    /// Encoded escrow credentials.
    pub secret_key: String,
    /// Per-deployment deltas as plain decimal strings.
    pub token_diff: BTreeMap<String, String>,
    /// The gift message.
    #[serde(default)]
    pub message: String,
    /// Intents admitted when the gift was published, as hex strings.
    #[serde(default)]
    pub intent_hashes: Vec<String>,
    /// When the record was created.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// When the record last changed.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
    /// IV minted for the record at creation, when one was stored.
    #[serde(default)]
    pub encryption_iv: Option<Bytes>,
    /// Token metadata snapshotted at creation.
    pub token: TokenSnapshot,
    /// The gifting wallet.
    pub account_id: Address,
}

/// The first typed record shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordV1 {
    /// Encoded escrow credentials.
    pub secret_key: String,
    /// Per-deployment deltas the gift escrowed.
    pub token_diff: TokenDiff,
    /// The gift message.
    #[serde(default)]
    pub message: String,
    /// Intents admitted when the gift was published.
    #[serde(default)]
    pub intent_hashes: Vec<IntentHash>,
    /// When the record was created.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// When the record last changed.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
    /// IV minted for the record at creation, when one was stored.
    #[serde(default)]
    pub encryption_iv: Option<Bytes>,
    /// Token metadata snapshotted at creation.
    pub token: TokenSnapshot,
    /// The gifting wallet.
    pub account_id: Address,
}

/// Upgrades a v0 record by parsing its stringly typed fields.
pub fn v0_to_v1(record: RecordV0) -> Result<RecordV1, MigrationError> {
    let invalid = |reason: String| MigrationError::InvalidRecord { version: "v0", reason };

    let token_diff = record
        .token_diff
        .into_iter()
        .map(|(deployment, delta)| {
            let deployment = deployment.parse().map_err(|err| invalid(format!("{err}")))?;
            let delta = I256::from_dec_str(&delta).map_err(|err| invalid(format!("{err}")))?;
            Ok((deployment, delta))
        })
        .collect::<Result<TokenDiff, MigrationError>>()?;
    let intent_hashes = record
        .intent_hashes
        .into_iter()
        .map(|hash| hash.parse().map_err(|err| invalid(format!("{err}"))))
        .collect::<Result<Vec<IntentHash>, MigrationError>>()?;

    Ok(RecordV1 {
        secret_key: record.secret_key,
        token_diff,
        message: record.message,
        intent_hashes,
        created_at: record.created_at,
        updated_at: record.updated_at,
        encryption_iv: record.encryption_iv,
        token: record.token,
        account_id: record.account_id,
    })
}

/// Upgrades a v1 record by dropping the token snapshot and account id.
///
/// Both are derivable again: the token from the registry and the deltas, the account from the
/// escrow credentials.
pub fn v1_to_v2(record: RecordV1) -> GiftRecord {
    GiftRecord {
        secret_key: record.secret_key,
        token_diff: record.token_diff,
        message: record.message,
        intent_hashes: record.intent_hashes,
        created_at: record.created_at,
        updated_at: record.updated_at,
        encryption_iv: record.encryption_iv.unwrap_or_default(),
    }
}

/// Migrates a stored history to the latest record shape.
pub fn to_latest(history: VersionedHistory) -> Result<Vec<GiftRecord>, MigrationError> {
    match history {
        VersionedHistory::V0 { records } => {
            records.into_iter().map(|record| v0_to_v1(record).map(v1_to_v2)).collect()
        }
        VersionedHistory::V1 { records } => {
            Ok(records.into_iter().map(v1_to_v2).collect())
        }
        VersionedHistory::V2 { records } => Ok(records),
    }
}
