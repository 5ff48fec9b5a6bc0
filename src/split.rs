//! Splitting a gift amount across token deployments.

use crate::{
    balances::BalanceMap,
    error::AmountError,
    types::{DeploymentId, TokenDiff, TokenRegistry},
};
use alloy::primitives::{I256, U256};
use std::collections::BTreeMap;

/// Per-deployment escrow amounts covering one gift, in each deployment's own decimals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitPlan(BTreeMap<DeploymentId, U256>);

impl SplitPlan {
    /// The planned amounts.
    pub const fn amounts(&self) -> &BTreeMap<DeploymentId, U256> {
        &self.0
    }

    /// Whether the plan takes nothing.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A plan taking a single amount from one deployment.
    pub fn full_on(deployment: DeploymentId, amount: U256) -> Self {
        Self(BTreeMap::from([(deployment, amount)]))
    }

    /// Converts the plan into the outgoing diff the funding signer commits to.
    pub fn into_outgoing_diff(self) -> Result<TokenDiff, AmountError> {
        self.0
            .into_iter()
            .map(|(deployment, amount)| {
                let delta = I256::try_from(amount)
                    .ok()
                    .and_then(|delta| delta.checked_neg())
                    .ok_or(AmountError::Overflow)?;
                Ok((deployment, delta))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(TokenDiff::new)
    }
}

/// Plans how to fund `amount`, given in `decimals`, out of `balances`.
///
/// Deployments are consumed in ascending [`DeploymentId`] order. The take from each deployment
/// is floored to what its own decimals can represent; whatever a coarse deployment cannot
/// express is left for the next one. When the pass ends short of the amount the split fails
/// with [`AmountError::Mismatch`] and takes nothing, even if a second pass over skipped
/// capacity could have covered it.
pub fn split_across_deployments(
    amount: U256,
    decimals: u8,
    balances: &BalanceMap,
    registry: &TokenRegistry,
) -> Result<SplitPlan, AmountError> {
    let mut remaining = amount;
    let mut plan = BTreeMap::new();

    for (deployment, balance) in balances {
        if remaining.is_zero() {
            break;
        }
        let deployment_decimals = registry.decimals(deployment);
        let (take, covered) = if deployment_decimals <= decimals {
            let factor = U256::from(10).pow(U256::from(decimals - deployment_decimals));
            let take = (*balance).min(remaining / factor);
            (take, take * factor)
        } else {
            let factor = U256::from(10).pow(U256::from(deployment_decimals - decimals));
            let need = remaining.checked_mul(factor).ok_or(AmountError::Overflow)?;
            let take = (*balance - *balance % factor).min(need);
            (take, take / factor)
        };
        if !take.is_zero() {
            plan.insert(*deployment, take);
            remaining -= covered;
        }
    }

    if !remaining.is_zero() {
        return Err(AmountError::Mismatch {
            requested: amount,
            available: available(decimals, balances, registry),
        });
    }
    Ok(SplitPlan(plan))
}

/// Total balance in the requested scale, floored per deployment.
fn available(decimals: u8, balances: &BalanceMap, registry: &TokenRegistry) -> U256 {
    balances.iter().fold(U256::ZERO, |total, (deployment, balance)| {
        let deployment_decimals = registry.decimals(deployment);
        let in_scale = if deployment_decimals <= decimals {
            let factor = U256::from(10).pow(U256::from(decimals - deployment_decimals));
            balance.saturating_mul(factor)
        } else {
            let factor = U256::from(10).pow(U256::from(deployment_decimals - decimals));
            *balance / factor
        };
        total.saturating_add(in_scale)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeploymentDescriptor, TokenId};

    fn registry(deployments: &[(DeploymentId, u8)]) -> TokenRegistry {
        let mut registry = TokenRegistry::default();
        for (deployment, decimals) in deployments {
            registry.insert(
                *deployment,
                DeploymentDescriptor { token: TokenId::new("uni".into()), decimals: *decimals },
            );
        }
        registry
    }

    #[test]
    fn drains_deployments_in_ascending_order() {
        let registry = registry(&[(DeploymentId::native(1), 18), (DeploymentId::native(10), 18)]);
        let balances = BalanceMap::from_iter([
            (DeploymentId::native(1), U256::from(60u64)),
            (DeploymentId::native(10), U256::from(70u64)),
        ]);

        let plan =
            split_across_deployments(U256::from(100u64), 18, &balances, &registry).unwrap();
        assert_eq!(
            plan.amounts().clone(),
            BTreeMap::from([
                (DeploymentId::native(1), U256::from(60u64)),
                (DeploymentId::native(10), U256::from(40u64)),
            ])
        );
    }

    #[test]
    fn uniform_decimals_cover_exactly() {
        let registry = registry(&[(DeploymentId::native(1), 18), (DeploymentId::native(10), 18)]);
        let balances = BalanceMap::from_iter([
            (DeploymentId::native(1), U256::from(25u64)),
            (DeploymentId::native(10), U256::from(75u64)),
        ]);

        for amount in [1u64, 25, 26, 99, 100] {
            let plan =
                split_across_deployments(U256::from(amount), 18, &balances, &registry).unwrap();
            let total: U256 = plan.amounts().values().copied().fold(U256::ZERO, |a, b| a + b);
            assert_eq!(total, U256::from(amount));
        }
    }

    #[test]
    fn shortfall_reports_availability() {
        let registry = registry(&[(DeploymentId::native(1), 18)]);
        let balances = BalanceMap::from_iter([(DeploymentId::native(1), U256::from(130u64))]);

        let err = split_across_deployments(U256::from(200u64), 18, &balances, &registry)
            .unwrap_err();
        assert_eq!(
            err,
            AmountError::Mismatch { requested: U256::from(200u64), available: U256::from(130u64) }
        );
    }

    #[test]
    fn rescales_between_decimals() {
        // 6-decimal deployment first, 18-decimal second; amount is in 18-decimal scale.
        let registry = registry(&[(DeploymentId::native(1), 6), (DeploymentId::native(10), 18)]);
        let balances = BalanceMap::from_iter([
            (DeploymentId::native(1), U256::from(2u64)),
            (DeploymentId::native(10), U256::from(500_000_000_000u64)),
        ]);

        // 2.5 coarse units: two whole units from the coarse deployment, the rest in fine units.
        let amount = U256::from(2_500_000_000_000u64);
        let plan = split_across_deployments(amount, 18, &balances, &registry).unwrap();
        assert_eq!(
            plan.amounts().clone(),
            BTreeMap::from([
                (DeploymentId::native(1), U256::from(2u64)),
                (DeploymentId::native(10), U256::from(500_000_000_000u64)),
            ])
        );
    }

    #[test]
    fn floor_policy_fails_rather_than_overshoot() {
        // The coarse deployment holds plenty, but the tail the fine deployment cannot cover is
        // smaller than one coarse unit. The split refuses instead of rounding up.
        let registry = registry(&[(DeploymentId::native(1), 6), (DeploymentId::native(10), 18)]);
        let balances = BalanceMap::from_iter([
            (DeploymentId::native(1), U256::from(5u64)),
            (DeploymentId::native(10), U256::from(400_000_000_000u64)),
        ]);

        let amount = U256::from(1_500_000_000_000u64);
        let err = split_across_deployments(amount, 18, &balances, &registry).unwrap_err();
        assert_eq!(
            err,
            AmountError::Mismatch {
                requested: amount,
                available: U256::from(5_400_000_000_000u64),
            }
        );
    }

    #[test]
    fn strands_sub_scale_dust() {
        // Deployment is finer than the requested scale; the 0.5 dust unit cannot contribute.
        let registry = registry(&[(DeploymentId::native(1), 18)]);
        let balances =
            BalanceMap::from_iter([(DeploymentId::native(1), U256::from(2_500_000_000_000u64))]);

        let plan = split_across_deployments(U256::from(2u64), 6, &balances, &registry).unwrap();
        assert_eq!(
            plan.amounts().clone(),
            BTreeMap::from([(DeploymentId::native(1), U256::from(2_000_000_000_000u64))])
        );

        let err =
            split_across_deployments(U256::from(3u64), 6, &balances, &registry).unwrap_err();
        assert_eq!(
            err,
            AmountError::Mismatch { requested: U256::from(3u64), available: U256::from(2u64) }
        );
    }

    #[test]
    fn outgoing_diff_negates_plan() {
        let plan = SplitPlan::full_on(DeploymentId::native(1), U256::from(42u64));
        let diff = plan.into_outgoing_diff().unwrap();
        assert_eq!(diff[&DeploymentId::native(1)], I256::try_from(-42i8).unwrap());

        let too_big = SplitPlan::full_on(DeploymentId::native(1), U256::MAX);
        assert_eq!(too_big.into_outgoing_diff(), Err(AmountError::Overflow));
    }
}
