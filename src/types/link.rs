//! The shareable gift link payload.

use super::EscrowCredentials;
use crate::error::CredentialError;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// The payload carried in a gift link's URL fragment.
///
/// Fragments never reach a server, so the secret stays between the maker's and the claimer's
/// browsers. The `iv` field only appears on links minted by older clients that encrypted their
/// stored records.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftLink {
    /// Encoded escrow credentials.
    pub secret_key: String,
    /// The gift message shown to the claimer.
    #[serde(default)]
    pub message: String,
    /// Encryption IV from legacy clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
}

impl GiftLink {
    /// Creates a link payload for the given escrow credentials.
    pub fn new(credentials: &EscrowCredentials, message: impl Into<String>) -> Self {
        Self { secret_key: credentials.encode(), message: message.into(), iv: None }
    }

    /// Parses the escrow credentials the link carries.
    pub fn credentials(&self) -> Result<EscrowCredentials, CredentialError> {
        EscrowCredentials::parse(&self.secret_key)
    }

    /// Renders the link on top of a base URL, with the payload in the fragment.
    pub fn to_url(&self, base: &Url) -> Result<Url, LinkError> {
        let payload = serde_json::to_vec(self)?;
        let mut url = base.clone();
        url.set_fragment(Some(&URL_SAFE_NO_PAD.encode(payload)));
        Ok(url)
    }

    /// Extracts the link payload from a URL fragment.
    pub fn from_url(url: &Url) -> Result<Self, LinkError> {
        let fragment = url.fragment().ok_or(LinkError::MissingPayload)?;
        let payload = URL_SAFE_NO_PAD.decode(fragment)?;
        Ok(serde_json::from_slice(&payload)?)
    }
}

impl fmt::Debug for GiftLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GiftLink")
            .field("message", &self.message)
            .field("iv", &self.iv)
            .finish_non_exhaustive()
    }
}

/// Errors produced while encoding or decoding gift links.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The URL carries no fragment payload.
    #[error("the link carries no gift payload")]
    MissingPayload,
    /// The fragment is not valid base64.
    #[error("the link payload is not valid base64")]
    Encoding(#[from] base64::DecodeError),
    /// The payload is not a valid gift document.
    #[error("the link payload is malformed")]
    Payload(#[from] serde_json::Error),
}
