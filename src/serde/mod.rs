//! Serde helpers.

pub mod bigint;
pub mod duration;
