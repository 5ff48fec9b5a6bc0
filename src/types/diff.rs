//! Signed per-deployment token deltas.

use super::DeploymentId;
use crate::{balances::BalanceMap, error::AmountError};
use alloy::primitives::I256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Net token movement per deployment, from the signer's point of view.
///
/// Negative deltas leave the signer's account, positive deltas enter it. Deltas round-trip
/// through storage as tagged bigint objects, never as plain JSON numbers.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    derive_more::Deref,
    derive_more::DerefMut,
    Serialize,
    Deserialize,
)]
pub struct TokenDiff(#[serde(with = "crate::serde::bigint::map")] BTreeMap<DeploymentId, I256>);

impl TokenDiff {
    /// Creates a diff from a delta map.
    pub const fn new(deltas: BTreeMap<DeploymentId, I256>) -> Self {
        Self(deltas)
    }

    /// Builds the diff that drains every listed balance from the signer.
    ///
    /// Claims use this to sweep whatever the escrow still holds.
    pub fn draining(balances: &BalanceMap) -> Result<Self, AmountError> {
        balances
            .iter()
            .map(|(deployment, balance)| {
                let delta = I256::try_from(*balance)
                    .ok()
                    .and_then(|delta| delta.checked_neg())
                    .ok_or(AmountError::Overflow)?;
                Ok((*deployment, delta))
            })
            .collect::<Result<_, _>>()
            .map(Self)
    }
}

impl FromIterator<(DeploymentId, I256)> for TokenDiff {
    fn from_iter<T: IntoIterator<Item = (DeploymentId, I256)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
