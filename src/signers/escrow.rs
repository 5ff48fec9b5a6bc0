//! Escrow account signer.

use super::IntentSigner;
use crate::{error::CredentialError, types::EscrowCredentials};
use alloy::{
    primitives::{Address, B256, Signature},
    signers::{SignerSync, local::PrivateKeySigner},
};
use std::fmt;

/// Signs with a gift's escrow key.
///
/// Escrow keys travel inside the link payload rather than living in a wallet, so signing never
/// prompts and never declines.
#[derive(Clone)]
pub struct EscrowSigner {
    signer: PrivateKeySigner,
}

impl EscrowSigner {
    /// Creates a signer from escrow credentials.
    pub fn new(credentials: &EscrowCredentials) -> Result<Self, CredentialError> {
        Ok(Self { signer: credentials.signer()? })
    }
}

impl fmt::Debug for EscrowSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EscrowSigner").field(&self.signer.address()).finish()
    }
}

#[async_trait::async_trait]
impl IntentSigner for EscrowSigner {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn sign_digest(&self, digest: B256) -> eyre::Result<Option<Signature>> {
        Ok(Some(self.signer.sign_hash_sync(&digest)?))
    }
}
