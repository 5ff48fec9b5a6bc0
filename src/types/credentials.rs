//! Escrow account credentials.

use crate::error::CredentialError;
use alloy::{
    hex,
    primitives::{Address, B256},
    signers::local::PrivateKeySigner,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported escrow credential schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum CredentialKind {
    /// A secp256k1 private key.
    Secp256k1,
}

impl CredentialKind {
    /// The scheme label used in encoded credentials.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Secp256k1 => "secp256k1",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The signing credentials controlling a gift escrow account.
///
/// Whoever holds these can move the escrowed funds. They are the entire secret a gift link
/// carries, so the `Debug` impl never prints the key.
#[derive(Clone, PartialEq, Eq)]
pub struct EscrowCredentials {
    /// The escrow account's private key.
    pub secret_key: B256,
    /// The address derived from the key.
    pub address: Address,
    /// The signature scheme of the key.
    pub kind: CredentialKind,
}

impl EscrowCredentials {
    /// Generates fresh random credentials.
    pub fn generate() -> Self {
        let signer = PrivateKeySigner::random();
        Self {
            secret_key: B256::from_slice(signer.to_bytes().as_slice()),
            address: signer.address(),
            kind: CredentialKind::Secp256k1,
        }
    }

    /// Rebuilds credentials from a raw secret key.
    pub fn from_secret_key(secret_key: B256) -> Result<Self, CredentialError> {
        let signer = PrivateKeySigner::from_bytes(&secret_key)
            .map_err(|_| CredentialError::InvalidSecretKey)?;
        Ok(Self { secret_key, address: signer.address(), kind: CredentialKind::Secp256k1 })
    }

    /// Encodes the credentials as `<kind>:<hex key>` for links and stored records.
    pub fn encode(&self) -> String {
        format!("{}:{}", self.kind, hex::encode(self.secret_key))
    }

    /// Parses credentials from their encoded form.
    pub fn parse(encoded: &str) -> Result<Self, CredentialError> {
        let (kind, key) = encoded.split_once(':').ok_or(CredentialError::InvalidSecretKey)?;
        if kind != CredentialKind::Secp256k1.as_str() {
            return Err(CredentialError::UnsupportedKind(kind.to_string()));
        }
        let secret_key = key.parse::<B256>().map_err(|_| CredentialError::InvalidSecretKey)?;
        Self::from_secret_key(secret_key)
    }

    /// Returns a signer for the escrow account.
    pub fn signer(&self) -> Result<PrivateKeySigner, CredentialError> {
        PrivateKeySigner::from_bytes(&self.secret_key)
            .map_err(|_| CredentialError::InvalidSecretKey)
    }
}

impl fmt::Debug for EscrowCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EscrowCredentials")
            .field("address", &self.address)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn encode_parse_roundtrip() {
        let credentials = EscrowCredentials::generate();
        let parsed = EscrowCredentials::parse(&credentials.encode()).unwrap();
        assert_eq!(parsed, credentials);
    }

    #[test]
    fn derives_known_address() {
        let credentials = EscrowCredentials::from_secret_key(B256::with_last_byte(1)).unwrap();
        assert_eq!(credentials.address, address!("7E5F4552091A69125d5DfCb7b8C2659029395Bdf"));
        assert_eq!(
            credentials.encode(),
            "secp256k1:0000000000000000000000000000000000000000000000000000000000000001"
        );
    }

    #[test]
    fn rejects_malformed_encodings() {
        assert_eq!(
            EscrowCredentials::parse("not-an-encoding"),
            Err(CredentialError::InvalidSecretKey)
        );
        assert_eq!(
            EscrowCredentials::parse("secp256k1:zz"),
            Err(CredentialError::InvalidSecretKey)
        );
        assert_eq!(
            EscrowCredentials::parse("secp256k1:abcd"),
            Err(CredentialError::InvalidSecretKey)
        );
        assert_eq!(
            EscrowCredentials::parse("ed25519:0000000000000000000000000000000000000000000000000000000000000001"),
            Err(CredentialError::UnsupportedKind("ed25519".to_string()))
        );
    }

    #[test]
    fn rejects_zero_key() {
        assert_eq!(
            EscrowCredentials::from_secret_key(B256::ZERO),
            Err(CredentialError::InvalidSecretKey)
        );
    }

    #[test]
    fn debug_redacts_secret() {
        let credentials = EscrowCredentials::from_secret_key(B256::with_last_byte(1)).unwrap();
        let output = format!("{credentials:?}");
        assert!(!output.contains("0000000000000000000000000000000000000001"));
        assert!(output.contains("7E5F4552091A69125d5DfCb7b8C2659029395Bdf"));
    }
}
