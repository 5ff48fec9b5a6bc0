/// Errors produced while handling escrow credentials.
///
/// Messages never echo key material back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// The secret key is malformed or not a valid secp256k1 scalar.
    #[error("invalid escrow secret key")]
    InvalidSecretKey,
    /// The credential scheme is not supported.
    #[error("unsupported credential kind: {0}")]
    UnsupportedKind(String),
}
