//! Payload configuration.
//!
//! The issuer, audience, custom field and validity window stamped into every
//! token come from a [PopConfig]. The defaults reproduce the reference
//! payload; real deployments load their own values from JSON:
//!
//! ```json
//! {
//!   "issuer": "https://issuer.example",
//!   "audience": "payments-api",
//!   "custom_field": "device-42",
//!   "validity_secs": 300,
//!   "key_id": "signing-key-1"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{PopError, Result};

/// Values used to build the claims payload and the token header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopConfig {
    /// `iss` claim.
    pub issuer: String,
    /// Sole entry of the `aud` claim.
    pub audience: String,
    /// Value of the `custom_field` claim.
    pub custom_field: String,
    /// Seconds between `iat` and `exp`.
    pub validity_secs: u64,
    /// `kid` written to the token header and the public JWK, if any.
    pub key_id: Option<String>,
}

impl Default for PopConfig {
    fn default() -> Self {
        Self {
            issuer: "example_issuer".to_string(),
            audience: "example_audience".to_string(),
            custom_field: "example_custom_value".to_string(),
            validity_secs: 60 * 60, // 1 hour
            key_id: None,
        }
    }
}

impl PopConfig {
    /// The validity window as a [Duration].
    pub fn validity(&self) -> Duration {
        Duration::from_secs(self.validity_secs)
    }

    /// Parse a configuration from a JSON document. Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| PopError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loaded PoP config");
        Self::from_json(&contents)
    }

    /// Check that the configuration can produce a meaningful payload.
    pub fn validate(&self) -> Result<()> {
        if self.issuer.is_empty() {
            return Err(PopError::InvalidConfig("issuer must not be empty".into()));
        }
        if self.audience.is_empty() {
            return Err(PopError::InvalidConfig("audience must not be empty".into()));
        }
        if self.validity_secs == 0 {
            return Err(PopError::InvalidConfig(
                "validity_secs must be greater than zero".into(),
            ));
        }
        if matches!(&self.key_id, Some(kid) if kid.is_empty()) {
            return Err(PopError::InvalidConfig("key_id must not be empty".into()));
        }
        Ok(())
    }
}
