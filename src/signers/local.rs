//! Local wallet signer.

use super::IntentSigner;
use alloy::{
    primitives::{Address, B256, Signature},
    signers::{SignerSync, local::PrivateKeySigner},
};
use std::fmt;

/// Signs with a locally held wallet key.
///
/// Stands in for an attached wallet in tests and tooling; interactive deployments plug in a
/// prompting [`IntentSigner`] instead.
#[derive(Clone)]
pub struct LocalWalletSigner {
    signer: PrivateKeySigner,
}

impl LocalWalletSigner {
    /// Wraps an existing key.
    pub const fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    /// Creates a signer with a fresh random key.
    pub fn random() -> Self {
        Self { signer: PrivateKeySigner::random() }
    }
}

impl fmt::Debug for LocalWalletSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LocalWalletSigner").field(&self.signer.address()).finish()
    }
}

#[async_trait::async_trait]
impl IntentSigner for LocalWalletSigner {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn sign_digest(&self, digest: B256) -> eyre::Result<Option<Signature>> {
        Ok(Some(self.signer.sign_hash_sync(&digest)?))
    }
}
