//! Account balance lookups.

use crate::{error::RelayError, types::DeploymentId};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use std::{collections::BTreeMap, fmt::Debug};

/// Balances per deployment for one account.
pub type BalanceMap = BTreeMap<DeploymentId, U256>;

/// Whether any balance in the map is non-zero.
pub fn is_funded(balances: &BalanceMap) -> bool {
    balances.values().any(|balance| !balance.is_zero())
}

/// Source of account balances across deployments.
#[async_trait]
pub trait BalanceOracle: Debug + Send + Sync {
    /// Reads all balances of the account.
    async fn balances(&self, account: Address) -> Result<BalanceMap, RelayError>;
}
