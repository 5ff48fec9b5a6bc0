//! In-memory relay. For testing only.

use super::{IntentStatus, RelayApi};
use crate::{
    balances::{BalanceMap, BalanceOracle},
    error::RelayError,
    types::{DeploymentId, IntentHash, SignedTransfer},
};
use alloy::primitives::{Address, Keccak256, U256};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::{
    collections::{BTreeSet, HashMap},
    sync::atomic::{AtomicU64, Ordering},
};
use tokio::sync::RwLock;

/// An in-memory relay executing intents against hosted balances. For testing only.
///
/// Publishing debits the signer and credits the recipient under one lock, so two claims racing
/// for the same escrow resolve the way a real relay resolves them: one wins, the other is told
/// the balance is insufficient.
#[derive(Debug, Default)]
pub struct InMemoryRelay {
    /// Balances per account.
    accounts: RwLock<HashMap<Address, BalanceMap>>,
    /// Statuses of admitted intents.
    intents: DashMap<IntentHash, IntentStatus>,
    /// Status queries left to answer with pending before reporting the stored status.
    pending_polls: AtomicU64,
    /// Number of publish calls served.
    publishes: AtomicU64,
    /// Number of balance queries served.
    balance_queries: AtomicU64,
}

impl InMemoryRelay {
    /// Creates an empty relay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits an account with a balance.
    pub async fn fund(&self, account: Address, deployment: DeploymentId, amount: U256) {
        *self
            .accounts
            .write()
            .await
            .entry(account)
            .or_default()
            .entry(deployment)
            .or_default() += amount;
    }

    /// Reads an account's balances without counting as an oracle query.
    pub async fn balance_of(&self, account: Address) -> BalanceMap {
        self.accounts.read().await.get(&account).cloned().unwrap_or_default()
    }

    /// Makes the next `polls` status queries report intents as still pending.
    pub fn defer_settlement(&self, polls: u64) {
        self.pending_polls.store(polls, Ordering::SeqCst);
    }

    /// Number of publish calls served.
    pub fn publish_count(&self) -> u64 {
        self.publishes.load(Ordering::Relaxed)
    }

    /// Number of balance queries served.
    pub fn balance_query_count(&self) -> u64 {
        self.balance_queries.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RelayApi for InMemoryRelay {
    async fn publish_intents(
        &self,
        payload: &SignedTransfer,
    ) -> Result<Vec<IntentHash>, RelayError> {
        self.publishes.fetch_add(1, Ordering::Relaxed);

        let message = payload.ty();
        let signer = payload
            .recover_address()
            .map_err(|err| RelayError::Rejected(format!("signature does not verify: {err}")))?;
        if signer != message.signer {
            return Err(RelayError::Rejected("signature does not match signer".into()));
        }
        if message.is_expired(Utc::now()) {
            return Err(RelayError::Rejected("message deadline expired".into()));
        }
        if message.token_diff.values().any(|delta| delta.is_positive()) {
            return Err(RelayError::Rejected("transfers only move funds out of the signer".into()));
        }

        let mut accounts = self.accounts.write().await;
        let signer_balances = accounts.entry(message.signer).or_default();
        for (deployment, delta) in message.token_diff.iter() {
            if signer_balances.get(deployment).copied().unwrap_or_default() < delta.unsigned_abs()
            {
                return Err(RelayError::InsufficientBalance);
            }
        }
        for (deployment, delta) in message.token_diff.iter() {
            if let Some(balance) = signer_balances.get_mut(deployment) {
                *balance -= delta.unsigned_abs();
            }
        }
        let recipient_balances = accounts.entry(message.recipient).or_default();
        for (deployment, delta) in message.token_diff.iter() {
            *recipient_balances.entry(*deployment).or_default() += delta.unsigned_abs();
        }
        drop(accounts);

        let tx_hash = {
            let mut hasher = Keccak256::new();
            hasher.update(payload.hash());
            hasher.update(b"settled");
            hasher.finalize()
        };
        let mut hashes = Vec::new();
        let mut chains = BTreeSet::new();
        for deployment in message.token_diff.keys() {
            if chains.insert(deployment.chain) {
                let mut hasher = Keccak256::new();
                hasher.update(payload.hash());
                hasher.update(deployment.chain.to_be_bytes());
                let hash = IntentHash::from(hasher.finalize());
                self.intents.insert(hash, IntentStatus::Settled { tx_hash });
                hashes.push(hash);
            }
        }
        Ok(hashes)
    }

    async fn intent_status(&self, hash: IntentHash) -> Result<IntentStatus, RelayError> {
        let deferred = self
            .pending_polls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |polls| polls.checked_sub(1))
            .is_ok();
        if deferred {
            return Ok(IntentStatus::Pending);
        }
        self.intents
            .get(&hash)
            .map(|status| status.clone())
            .ok_or(RelayError::UnknownIntent(hash))
    }
}

#[async_trait]
impl BalanceOracle for InMemoryRelay {
    async fn balances(&self, account: Address) -> Result<BalanceMap, RelayError> {
        self.balance_queries.fetch_add(1, Ordering::Relaxed);
        Ok(self.accounts.read().await.get(&account).cloned().unwrap_or_default())
    }
}
