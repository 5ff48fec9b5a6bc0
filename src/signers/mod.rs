//! Transfer signers.

mod escrow;
pub use escrow::EscrowSigner;

mod local;
pub use local::LocalWalletSigner;

use alloy::primitives::{Address, B256, Signature};

/// Trait for signing transfer message digests.
#[async_trait::async_trait]
pub trait IntentSigner: std::fmt::Debug + Send + Sync {
    /// The address signatures recover to.
    fn address(&self) -> Address;

    /// Signs the transfer digest.
    ///
    /// Returns `None` when the signer declines to sign.
    async fn sign_digest(&self, digest: B256) -> eyre::Result<Option<Signature>>;
}
