//! Transfer messages and their signed form.

use super::TokenDiff;
use alloy::primitives::{Address, B256, Keccak256, Signature, SignatureError, wrap_fixed_bytes};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

wrap_fixed_bytes! {
    /// Identifies a published intent on a relay.
    ///
    /// Relays admit one intent per chain a transfer touches, so a single published payload can
    /// map to several hashes.
    pub struct IntentHash<32>;
}

/// A type that has been signed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signed<T> {
    #[serde(flatten)]
    ty: T,
    #[serde(flatten)]
    signature: Signature,
    hash: B256,
}

impl<T> Signed<T> {
    /// Instantiate from a type and signature. Does not verify the signature.
    pub const fn new_unchecked(ty: T, signature: Signature, hash: B256) -> Self {
        Self { ty, signature, hash }
    }

    /// Returns a reference to the type.
    pub const fn ty(&self) -> &T {
        &self.ty
    }

    /// Returns a reference to the signature.
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Returns a reference to the hash of the type.
    pub const fn hash(&self) -> &B256 {
        &self.hash
    }

    /// Recover the address of the signer.
    pub fn recover_address(&self) -> Result<Address, SignatureError> {
        self.signature().recover_address_from_prehash(self.hash())
    }
}

/// A signed transfer message ready for publishing.
pub type SignedTransfer = Signed<TransferMessage>;

/// The message a transfer signer commits to.
///
/// Publishing one asks the relay to move the negative deltas out of `signer` and credit them
/// to `recipient` before `deadline` passes. Expired messages are refused; a fresh message must
/// be signed instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferMessage {
    /// The account funds leave.
    pub signer: Address,
    /// The account funds arrive at.
    pub recipient: Address,
    /// Per-deployment deltas of the transfer.
    pub token_diff: TokenDiff,
    /// When the message stops being publishable.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub deadline: DateTime<Utc>,
    /// Distinguishes otherwise identical transfers.
    pub nonce: B256,
}

impl TransferMessage {
    /// Creates a message valid for `ttl` from now, with a random nonce.
    pub fn new(signer: Address, recipient: Address, token_diff: TokenDiff, ttl: Duration) -> Self {
        Self {
            signer,
            recipient,
            token_diff,
            deadline: Utc::now() + ttl,
            nonce: B256::from(rand::random::<[u8; 32]>()),
        }
    }

    /// Whether the deadline has passed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }

    /// Computes the signing digest of the message.
    pub fn digest(&self) -> B256 {
        let mut hasher = Keccak256::new();
        hasher.update(self.signer);
        hasher.update(self.recipient);
        for (deployment, delta) in self.token_diff.iter() {
            hasher.update(deployment.chain.to_be_bytes());
            hasher.update(deployment.address.unwrap_or(Address::ZERO));
            hasher.update(delta.to_be_bytes::<32>());
        }
        hasher.update(self.deadline.timestamp_millis().to_be_bytes());
        hasher.update(self.nonce);
        hasher.finalize()
    }

    /// Attaches a signature, producing a [`SignedTransfer`].
    pub fn into_signed(self, signature: Signature) -> SignedTransfer {
        let hash = self.digest();
        Signed::new_unchecked(self, signature, hash)
    }
}
