//! The claims payload carried inside a PoP token.

use jsonwebtoken as jwt;
use serde::{Deserialize, Serialize};

use crate::config::PopConfig;

/// Decoded payload of a PoP token.
///
/// Serializes to `{"iss", "aud": [..], "exp", "iat", "custom_field"}`. The
/// fields are only readable: `exp` is fixed relative to `iat` when the value
/// is built and cannot drift afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopClaims {
    iss: String,
    aud: Vec<String>,
    exp: u64,
    iat: u64,
    custom_field: String,
}

/// Build a fresh payload from `config`, issued now.
pub fn create_payload(config: &PopConfig) -> PopClaims {
    PopClaims::new_at(config, jwt::get_current_timestamp())
}

impl PopClaims {
    /// Build a payload issued at `iat` (unix seconds). `exp` is `iat` plus the configured validity.
    pub fn new_at(config: &PopConfig, iat: u64) -> Self {
        PopClaims {
            iss: config.issuer.clone(),
            aud: vec![config.audience.clone()],
            exp: iat.saturating_add(config.validity_secs),
            iat,
            custom_field: config.custom_field.clone(),
        }
    }

    /// The reference payload: default configuration, issued now.
    pub fn default_payload() -> Self {
        create_payload(&PopConfig::default())
    }

    /// `iss` claim.
    pub fn issuer(&self) -> &str {
        &self.iss
    }

    /// `aud` claim.
    pub fn audience(&self) -> &[String] {
        &self.aud
    }

    /// `exp` claim, unix seconds.
    pub fn expires_at(&self) -> u64 {
        self.exp
    }

    /// `iat` claim, unix seconds.
    pub fn issued_at_secs(&self) -> u64 {
        self.iat
    }

    /// `custom_field` claim.
    pub fn custom_field(&self) -> &str {
        &self.custom_field
    }
}
