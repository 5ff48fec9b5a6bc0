//! Token identifiers and the deployment registry.

use super::TokenDiff;
use crate::balances::BalanceMap;
use alloy::primitives::{Address, ChainId};
use derive_more::{Display, FromStr};
use eyre::Context;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{collections::BTreeMap, fmt, path::Path, str::FromStr as _};

/// A unique identifier for a token across all of its deployments.
#[derive(
    Debug, Display, Clone, Eq, PartialEq, FromStr, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TokenId(String);

impl TokenId {
    /// Creates a new `TokenId` from a string.
    pub const fn new(id: String) -> Self {
        Self(id)
    }

    /// Gets a reference to the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A single deployment of a token: a chain plus the contract address on it.
///
/// Native currency deployments have no contract address. The ordering sorts by chain first and
/// puts the native deployment before contract deployments on the same chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeploymentId {
    /// The chain the deployment lives on.
    pub chain: ChainId,
    /// The token contract address, or `None` for the native currency.
    pub address: Option<Address>,
}

impl DeploymentId {
    /// Creates the native currency deployment of a chain.
    pub const fn native(chain: ChainId) -> Self {
        Self { chain, address: None }
    }

    /// Creates a token contract deployment.
    pub const fn token(chain: ChainId, address: Address) -> Self {
        Self { chain, address: Some(address) }
    }

    /// Whether this is the native currency deployment.
    pub const fn is_native(&self) -> bool {
        self.address.is_none()
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address {
            Some(address) => write!(f, "{}:{}", self.chain, address),
            None => write!(f, "{}:native", self.chain),
        }
    }
}

/// Error returned when parsing a [`DeploymentId`] fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid deployment id: {0}")]
pub struct ParseDeploymentIdError(String);

impl std::str::FromStr for DeploymentId {
    type Err = ParseDeploymentIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (chain, address) =
            s.split_once(':').ok_or_else(|| ParseDeploymentIdError(s.to_string()))?;
        let chain = chain.parse::<ChainId>().map_err(|_| ParseDeploymentIdError(s.to_string()))?;
        let address = match address {
            "native" => None,
            address => Some(
                Address::from_str(address).map_err(|_| ParseDeploymentIdError(s.to_string()))?,
            ),
        };
        Ok(Self { chain, address })
    }
}

impl Serialize for DeploymentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DeploymentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?.parse().map_err(serde::de::Error::custom)
    }
}

/// Describes a token deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentDescriptor {
    /// The token deployed there.
    pub token: TokenId,
    /// Number of decimals the deployment uses.
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

/// Default number of decimals for a deployment.
fn default_decimals() -> u8 {
    18
}

/// All token deployments known to the client, keyed by [`DeploymentId`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRegistry(BTreeMap<DeploymentId, DeploymentDescriptor>);

impl TokenRegistry {
    /// Creates a new registry from a deployment map.
    pub const fn new(deployments: BTreeMap<DeploymentId, DeploymentDescriptor>) -> Self {
        Self(deployments)
    }

    /// Registers a deployment.
    pub fn insert(&mut self, deployment: DeploymentId, descriptor: DeploymentDescriptor) {
        self.0.insert(deployment, descriptor);
    }

    /// Returns the descriptor of a deployment, if known.
    pub fn get(&self, deployment: &DeploymentId) -> Option<&DeploymentDescriptor> {
        self.0.get(deployment)
    }

    /// Iterates all deployments in ascending [`DeploymentId`] order.
    pub fn iter(&self) -> impl Iterator<Item = (&DeploymentId, &DeploymentDescriptor)> {
        self.0.iter()
    }

    /// Returns the decimals of a deployment, defaulting to 18 when unknown.
    pub fn decimals(&self, deployment: &DeploymentId) -> u8 {
        self.0.get(deployment).map_or_else(default_decimals, |descriptor| descriptor.decimals)
    }

    /// Iterates the deployments of a token in ascending [`DeploymentId`] order.
    pub fn deployments_of<'a>(
        &'a self,
        token: &'a TokenId,
    ) -> impl Iterator<Item = (&'a DeploymentId, &'a DeploymentDescriptor)> + 'a {
        self.0.iter().filter(move |(_, descriptor)| &descriptor.token == token)
    }

    /// Returns the first deployment of a token in ascending order, if any.
    pub fn canonical_deployment(&self, token: &TokenId) -> Option<DeploymentId> {
        self.deployments_of(token).next().map(|(deployment, _)| *deployment)
    }

    /// Returns the decimals gift amounts of a token are denominated in.
    ///
    /// This is the maximum across the token's deployments, so every deployment amount stays
    /// representable.
    pub fn token_decimals(&self, token: &TokenId) -> Option<u8> {
        self.deployments_of(token).map(|(_, descriptor)| descriptor.decimals).max()
    }

    /// Resolves the single token a diff draws on.
    ///
    /// Returns `None` when the diff touches an unknown deployment or spans more than one token.
    pub fn resolve_token(&self, diff: &TokenDiff) -> Option<TokenId> {
        let mut resolved: Option<&TokenId> = None;
        for deployment in diff.keys() {
            let token = &self.0.get(deployment)?.token;
            match resolved {
                Some(current) if current != token => return None,
                _ => resolved = Some(token),
            }
        }
        resolved.cloned()
    }

    /// Restricts a balance map to the deployments of a token.
    pub fn balances_for(&self, token: &TokenId, balances: &BalanceMap) -> BalanceMap {
        balances
            .iter()
            .filter(|(deployment, _)| {
                self.0.get(deployment).is_some_and(|descriptor| &descriptor.token == token)
            })
            .map(|(deployment, balance)| (*deployment, *balance))
            .collect()
    }

    /// Load from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> eyre::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .wrap_err_with(|| format!("failed to read token registry: {}", path.display()))?;
        let registry = serde_yaml::from_reader(&file)
            .wrap_err_with(|| format!("failed to parse token registry: {}", path.display()))?;
        Ok(registry)
    }

    /// Save to a YAML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> eyre::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{I256, address};

    #[test]
    fn deployment_id_display_roundtrip() {
        let token =
            DeploymentId::token(8453, address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"));
        assert_eq!(token.to_string(), "8453:0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
        assert_eq!(token.to_string().parse::<DeploymentId>().unwrap(), token);

        let native = DeploymentId::native(1);
        assert_eq!(native.to_string(), "1:native");
        assert_eq!("1:native".parse::<DeploymentId>().unwrap(), native);
    }

    #[test]
    fn deployment_id_rejects_garbage() {
        assert!("1".parse::<DeploymentId>().is_err());
        assert!("one:native".parse::<DeploymentId>().is_err());
        assert!("1:0xnothex".parse::<DeploymentId>().is_err());
    }

    #[test]
    fn deployment_id_orders_chain_then_native_first() {
        let native_1 = DeploymentId::native(1);
        let token_1 = DeploymentId::token(1, Address::with_last_byte(1));
        let native_10 = DeploymentId::native(10);
        assert!(native_1 < token_1);
        assert!(token_1 < native_10);
    }

    fn registry() -> TokenRegistry {
        let mut registry = TokenRegistry::default();
        registry.insert(
            DeploymentId::token(1, Address::with_last_byte(1)),
            DeploymentDescriptor { token: TokenId::new("uni".into()), decimals: 18 },
        );
        registry.insert(
            DeploymentId::token(10, Address::with_last_byte(2)),
            DeploymentDescriptor { token: TokenId::new("uni".into()), decimals: 6 },
        );
        registry.insert(
            DeploymentId::native(1),
            DeploymentDescriptor { token: TokenId::new("eth".into()), decimals: 18 },
        );
        registry
    }

    #[test]
    fn resolves_single_token_diffs_only() {
        let registry = registry();
        let uni = TokenId::new("uni".into());

        let single = TokenDiff::from_iter([
            (DeploymentId::token(1, Address::with_last_byte(1)), I256::MINUS_ONE),
            (DeploymentId::token(10, Address::with_last_byte(2)), I256::MINUS_ONE),
        ]);
        assert_eq!(registry.resolve_token(&single), Some(uni.clone()));

        let mixed = TokenDiff::from_iter([
            (DeploymentId::token(1, Address::with_last_byte(1)), I256::MINUS_ONE),
            (DeploymentId::native(1), I256::MINUS_ONE),
        ]);
        assert_eq!(registry.resolve_token(&mixed), None);

        let unknown = TokenDiff::from_iter([(DeploymentId::native(99), I256::MINUS_ONE)]);
        assert_eq!(registry.resolve_token(&unknown), None);
        assert_eq!(registry.resolve_token(&TokenDiff::default()), None);
    }

    #[test]
    fn token_decimals_is_max_across_deployments() {
        let registry = registry();
        assert_eq!(registry.token_decimals(&TokenId::new("uni".into())), Some(18));
        assert_eq!(registry.token_decimals(&TokenId::new("unknown".into())), None);
    }

    #[test]
    fn serde_deployment_keys_as_strings() {
        let registry = registry();
        let json = serde_json::to_string(&registry).unwrap();
        assert!(json.contains(r#""1:native""#));
        assert_eq!(serde_json::from_str::<TokenRegistry>(&json).unwrap(), registry);
    }

    #[test]
    fn registry_file_roundtrip() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let registry = registry();
        registry.save_to_file(file.path()).unwrap();
        assert_eq!(TokenRegistry::load_from_file(file.path()).unwrap(), registry);
    }
}
