use crate::types::TokenId;
use alloy::primitives::U256;

/// Errors produced while parsing and splitting gift amounts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// The requested amount exceeds what the funding account holds.
    #[error("requested {requested} but only {available} is available")]
    Mismatch {
        /// The requested amount, in the scale it was given in.
        requested: U256,
        /// The total available across all deployments, in the same scale.
        available: U256,
    },
    /// An amount does not fit the signed 256-bit delta encoding.
    #[error("amount overflows the signed 256-bit delta range")]
    Overflow,
    /// The amount string could not be parsed.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    /// The token is not present in the registry.
    #[error("unknown token {0}")]
    UnknownToken(TokenId),
}
