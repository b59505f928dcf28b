#![warn(missing_docs)]
//!
//! This crate builds and signs proof-of-possession (PoP) tokens: RS256 JSON Web Tokens whose signature shows that the caller holds an RSA private key.
//!
//! Three pieces compose linearly:
//!
//! * [create_payload] builds the [PopClaims] (`iss`, `aud`, `exp`, `iat`, `custom_field`) from a [PopConfig].
//! * [load_private_key] decodes a PEM-encoded RSA key, decrypting it with a password when the block is encrypted.
//! * [sign_token] signs the claims into a compact `header.claims.signature` token.
//!
//! [verify_token] checks a token against the signer's public JWK, and [PopSigner] bundles a config and a key for repeated use.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pop_token::{create_payload, load_private_key_file, sign_token, verify_token, PopConfig};
//!
//! let config = PopConfig::default();
//! let key = load_private_key_file("signing_key.pem", b"your_password")?;
//!
//! let claims = create_payload(&config);
//! let token = sign_token(&claims, &key, config.key_id.as_deref())?;
//!
//! let public_jwk = key.public_jwk_json(config.key_id.as_deref())?;
//! let verified = verify_token(&token, &public_jwk, &config)?;
//! assert_eq!(verified.custom_field(), "example_custom_value");
//! # Ok::<(), pop_token::PopError>(())
//! ```
//!
mod claims;
mod config;
mod error;
mod key;
mod token;


pub use claims::{create_payload, PopClaims};
pub use config::PopConfig;
pub use error::{PopError, Result};
pub use key::{
    load_private_key, load_private_key_file, EncryptedBlock, KeyFormat, LegacyCipher, PemBlock,
    RsaSigningKey,
};
pub use token::{sign_token, verify_token, PopSigner};
