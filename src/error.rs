//! Error type shared by every operation in the crate.

use jsonwebtoken as jwt;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PopError>;

/// The error type for loading keys, building payloads and signing or verifying tokens.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum PopError {
    /// No PEM block could be decoded from the input (missing markers, corrupt base64, ...)
    #[error("invalid PEM: {0}")]
    InvalidPem(String),

    /// The PEM block is encrypted and could not be decrypted with the supplied password
    #[error("failed to decrypt private key: {0}")]
    DecryptionFailed(String),

    /// The PEM block decoded but does not hold a usable RSA private key
    #[error("failed to parse RSA private key: {0}")]
    KeyParseError(String),

    /// The signing primitive rejected the key or the claims
    #[error("failed to sign token: {0}")]
    SigningError(String),

    /// The payload configuration is unusable (empty issuer, zero validity, ...)
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading a key or configuration file failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Failed to parse the provided public JWK
    #[error("failed to parse public JWK: {0}")]
    PubKeyParsing(String),

    /// Failed to decode the token header
    #[error("failed to decode token header: {0}")]
    TokenHeaderDecoding(jwt::errors::Error),

    /// Key ids mismatched between the public JWK and the token header
    #[error("key id mismatch: token {0:?}, key {1:?}")]
    KidMismatch(Option<String>, Option<String>),

    /// The token failed signature or claim validation. See the associated `jwt::errors::Error` for details.
    #[error("failed to decode token: {0}")]
    TokenDecoding(jwt::errors::Error),
}

impl From<std::io::Error> for PopError {
    fn from(e: std::io::Error) -> Self {
        PopError::Io(e.to_string())
    }
}
