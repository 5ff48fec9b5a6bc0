//! The maker's gift history view.

use crate::{
    balances::BalanceOracle,
    error::GiftError,
    storage::GiftStore,
    types::{GiftInfo, HistoryKey, TokenRegistry},
};
use futures_util::future::try_join_all;
use std::sync::Arc;
use tracing::instrument;

/// Reads a wallet's gift history joined with live escrow balances.
///
/// Statuses come out of the join, never out of storage: a draft whose escrow turns out to be
/// funded is a recoverable gift, and a published record whose escrow is empty has been
/// claimed.
#[derive(Debug, Clone)]
pub struct GiftHistory {
    store: GiftStore,
    balances: Arc<dyn BalanceOracle>,
    registry: TokenRegistry,
}

impl GiftHistory {
    /// Creates the view.
    pub fn new(
        store: GiftStore,
        balances: Arc<dyn BalanceOracle>,
        registry: TokenRegistry,
    ) -> Self {
        Self { store, balances, registry }
    }

    /// Loads all gifts of a wallet, oldest first, with statuses derived from the escrows.
    ///
    /// Escrow balances are read concurrently; record order is preserved.
    #[instrument(skip(self))]
    pub async fn load(&self, key: &HistoryKey) -> Result<Vec<GiftInfo>, GiftError> {
        let records = self.store.load_gifts(key).await?;
        try_join_all(records.into_iter().map(|record| async move {
            let credentials = record.credentials()?;
            let escrow_balances = self.balances.balances(credentials.address).await?;
            Ok::<_, GiftError>(GiftInfo::from_record(record, &self.registry, &escrow_balances)?)
        }))
        .await
    }
}
