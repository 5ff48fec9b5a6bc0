//! # Giftlink
//!
//! Library for creating, publishing and claiming link-based token gifts over intent relays.

pub mod abort;
pub mod balances;
pub mod claim;
pub mod config;
pub mod constants;
pub mod error;
pub mod gift;
pub mod intents;
pub mod metrics;
pub mod relay;
pub mod serde;
pub mod signers;
pub mod split;
pub mod storage;
pub mod types;
