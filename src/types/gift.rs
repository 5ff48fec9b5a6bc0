//! Stored gift records and their presentation form.

use super::{EscrowCredentials, GiftLink, IntentHash, TokenDiff, TokenId, TokenRegistry};
use crate::{
    balances::{self, BalanceMap},
    error::{AmountError, CredentialError},
};
use alloy::primitives::{Address, Bytes};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A gift as persisted in the maker's history.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftRecord {
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
    /// IV minted for the record at creation.
    pub encryption_iv: Bytes,
}

impl GiftRecord {
    /// Whether the record was never updated after creation.
    ///
    /// Drafts are gifts whose publish outcome never made it back into storage.
    pub fn is_draft(&self) -> bool {
        self.created_at == self.updated_at
    }

    /// Parses the escrow credentials stored on the record.
    pub fn credentials(&self) -> Result<EscrowCredentials, CredentialError> {
        EscrowCredentials::parse(&self.secret_key)
    }
}

impl fmt::Debug for GiftRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GiftRecord")
            .field("token_diff", &self.token_diff)
            .field("message", &self.message)
            .field("intent_hashes", &self.intent_hashes)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

/// The lifecycle stage of a gift, derived from its record and escrow funding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GiftStatus {
    /// Created but never confirmed published.
    Draft,
    /// The escrow still holds funds waiting for a claimer.
    Pending,
    /// The escrow has been emptied.
    Claimed,
}

impl GiftStatus {
    /// Derives the status of a record given whether its escrow still holds funds.
    ///
    /// Funding wins over recency: a funded gift is pending even when the record never saw its
    /// publish outcome.
    pub fn derive(record: &GiftRecord, escrow_funded: bool) -> Self {
        if escrow_funded {
            Self::Pending
        } else if record.is_draft() {
            Self::Draft
        } else {
            Self::Claimed
        }
    }

    /// Whether the gift still waits for a claimer.
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether the gift has been claimed.
    pub const fn is_claimed(&self) -> bool {
        matches!(self, Self::Claimed)
    }
}

/// A gift record joined with everything a view needs to render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftInfo {
    /// The underlying record.
    #[serde(flatten)]
    pub record: GiftRecord,
    /// Lifecycle stage at the time the escrow balances were read.
    pub status: GiftStatus,
    /// The single token the gift draws on, when the registry can name one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_token: Option<TokenId>,
    /// The escrow account holding the gift.
    pub account_id: Address,
}

impl GiftInfo {
    /// Builds the info view of a stored record.
    pub fn from_record(
        record: GiftRecord,
        registry: &TokenRegistry,
        escrow_balances: &BalanceMap,
    ) -> Result<Self, CredentialError> {
        let credentials = record.credentials()?;
        Ok(Self {
            status: GiftStatus::derive(&record, balances::is_funded(escrow_balances)),
            resolved_token: registry.resolve_token(&record.token_diff),
            account_id: credentials.address,
            record,
        })
    }

    /// Builds the info view a claimer sees after opening a link.
    ///
    /// Claimers hold no stored record, so one is synthesized that drains whatever the escrow
    /// holds right now.
    pub fn for_claim(
        credentials: &EscrowCredentials,
        link: &GiftLink,
        registry: &TokenRegistry,
        escrow_balances: &BalanceMap,
    ) -> Result<Self, AmountError> {
        let token_diff = TokenDiff::draining(escrow_balances)?;
        let now = Utc::now();
        let record = GiftRecord {
            secret_key: link.secret_key.clone(),
            token_diff,
            message: link.message.clone(),
            intent_hashes: Vec::new(),
            created_at: now,
            updated_at: now,
            encryption_iv: Bytes::new(),
        };
        Ok(Self {
            status: GiftStatus::derive(&record, balances::is_funded(escrow_balances)),
            resolved_token: registry.resolve_token(&record.token_diff),
            account_id: credentials.address,
            record,
        })
    }
}

/// Families of chains gifts can live on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ChainKind {
    /// EVM-compatible chains.
    Evm,
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evm => f.write_str("evm"),
        }
    }
}

/// Addresses one wallet's gift history within storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryKey {
    /// The gifting wallet.
    pub wallet: Address,
    /// The chain family the wallet gifts on.
    pub chain_kind: ChainKind,
}

impl HistoryKey {
    /// Creates a history key for an EVM wallet.
    pub const fn evm(wallet: Address) -> Self {
        Self { wallet, chain_kind: ChainKind::Evm }
    }
}

impl fmt::Display for HistoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain_kind, self.wallet)
    }
}
