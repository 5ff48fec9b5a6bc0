//! Giftlink constants.

use std::time::Duration;

/// How long a signed transfer message stays valid before the relay refuses it.
///
/// An expired message cannot be re-published; a fresh one must be signed.
pub const DEFAULT_DEADLINE_TTL: Duration = Duration::from_secs(5 * 60);

/// How often settlement status is polled on the relay.
pub const DEFAULT_SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// JSON-RPC error code relays return when the escrow no longer covers the transfer.
///
/// Seeing this during a claim means another claimer drained the escrow first.
pub const INSUFFICIENT_BALANCE_CODE: i32 = -32090;

/// Length in bytes of the encryption IV stored on legacy gift records.
pub const ENCRYPTION_IV_LEN: usize = 16;
