//! Loading RSA signing keys from PEM.
//!
//! A PEM block is inspected once and classified as a [PemBlock]: either a
//! plain key (`RSA PRIVATE KEY` / `PRIVATE KEY`) or an encrypted one. Two
//! encryption schemes are understood:
//!
//! * PKCS#8 `ENCRYPTED PRIVATE KEY` blocks (PBES2), as written by
//!   `openssl pkcs8 -topk8`.
//! * OpenSSL's traditional `Proc-Type: 4,ENCRYPTED` headers with an
//!   AES-CBC `DEK-Info`, as written by `openssl rsa -aes256 -traditional`.
//!
//! The password is only consulted for encrypted blocks.

use aes::cipher::{block_padding::Pkcs7, BlockCipher, BlockDecryptMut, KeyInit, KeyIvInit};
use jsonwebkey as jwk;
use md5::{Digest, Md5};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use std::fmt;
use std::path::Path;

use crate::error::{PopError, Result};

const LEGACY_IV_LEN: usize = 16;
const LEGACY_SALT_LEN: usize = 8;
const JWK_PUBLIC_EXPONENT: [u8; 3] = [0x01, 0x00, 0x01];

/// DER layout of a decoded private key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFormat {
    /// `RSA PRIVATE KEY`
    Pkcs1,
    /// `PRIVATE KEY`
    Pkcs8,
}

impl KeyFormat {
    fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "RSA PRIVATE KEY" => Ok(KeyFormat::Pkcs1),
            "PRIVATE KEY" => Ok(KeyFormat::Pkcs8),
            other => Err(PopError::KeyParseError(format!(
                "unsupported PEM label `{other}`"
            ))),
        }
    }
}

/// Block ciphers accepted in a traditional `DEK-Info` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyCipher {
    /// `AES-128-CBC`
    Aes128Cbc,
    /// `AES-192-CBC`
    Aes192Cbc,
    /// `AES-256-CBC`
    Aes256Cbc,
}

impl LegacyCipher {
    fn from_name(name: &str) -> Result<Self> {
        match name {
            "AES-128-CBC" => Ok(LegacyCipher::Aes128Cbc),
            "AES-192-CBC" => Ok(LegacyCipher::Aes192Cbc),
            "AES-256-CBC" => Ok(LegacyCipher::Aes256Cbc),
            other => Err(PopError::DecryptionFailed(format!(
                "unsupported PEM cipher `{other}`"
            ))),
        }
    }

    fn key_len(self) -> usize {
        match self {
            LegacyCipher::Aes128Cbc => 16,
            LegacyCipher::Aes192Cbc => 24,
            LegacyCipher::Aes256Cbc => 32,
        }
    }
}

/// An encrypted private key, still sealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncryptedBlock {
    /// `ENCRYPTED PRIVATE KEY`: DER-encoded `EncryptedPrivateKeyInfo`.
    Pkcs8 {
        /// The `EncryptedPrivateKeyInfo` structure.
        der: Vec<u8>,
    },
    /// A plain label with `Proc-Type: 4,ENCRYPTED` and `DEK-Info` headers.
    Legacy {
        /// Layout of the key once decrypted.
        format: KeyFormat,
        /// Cipher named in `DEK-Info`.
        cipher: LegacyCipher,
        /// IV from `DEK-Info`; its first 8 bytes double as the key derivation salt.
        iv: Vec<u8>,
        /// Ciphertext.
        der: Vec<u8>,
    },
}

/// A decoded PEM block, classified by its label and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PemBlock {
    /// Unencrypted key material.
    Plain {
        /// Layout of `der`.
        format: KeyFormat,
        /// Key bytes.
        der: Vec<u8>,
    },
    /// Key material that needs a password.
    Encrypted(EncryptedBlock),
}

impl PemBlock {
    /// Decode the first PEM block in `input` and classify it.
    pub fn parse(input: &[u8]) -> Result<Self> {
        let block = pem::parse(input).map_err(|e| PopError::InvalidPem(e.to_string()))?;
        let tag = block.tag();

        if tag == "ENCRYPTED PRIVATE KEY" {
            return Ok(PemBlock::Encrypted(EncryptedBlock::Pkcs8 {
                der: block.contents().to_vec(),
            }));
        }

        let format = KeyFormat::from_tag(tag)?;
        let encrypted = block
            .headers()
            .get("Proc-Type")
            .is_some_and(|v| v.split(',').any(|part| part.trim() == "ENCRYPTED"));
        if !encrypted {
            return Ok(PemBlock::Plain {
                format,
                der: block.contents().to_vec(),
            });
        }

        let dek_info = block
            .headers()
            .get("DEK-Info")
            .ok_or_else(|| PopError::DecryptionFailed("missing DEK-Info header".into()))?;
        let (cipher, iv) = dek_info
            .split_once(',')
            .ok_or_else(|| PopError::DecryptionFailed("malformed DEK-Info header".into()))?;
        let cipher = LegacyCipher::from_name(cipher.trim())?;
        let iv = hex::decode(iv.trim())
            .map_err(|e| PopError::DecryptionFailed(format!("malformed DEK-Info IV: {e}")))?;
        if iv.len() != LEGACY_IV_LEN {
            return Err(PopError::DecryptionFailed(format!(
                "DEK-Info IV must be {LEGACY_IV_LEN} bytes, got {}",
                iv.len()
            )));
        }

        Ok(PemBlock::Encrypted(EncryptedBlock::Legacy {
            format,
            cipher,
            iv,
            der: block.contents().to_vec(),
        }))
    }
}

impl EncryptedBlock {
    /// Decrypt the block and parse the RSA key inside it.
    fn open(&self, password: &[u8]) -> Result<RsaPrivateKey> {
        if password.is_empty() {
            return Err(PopError::DecryptionFailed(
                "a password is required for encrypted keys".into(),
            ));
        }

        match self {
            EncryptedBlock::Pkcs8 { der } => {
                let info = pkcs8::EncryptedPrivateKeyInfo::try_from(der.as_slice())
                    .map_err(|e| PopError::DecryptionFailed(e.to_string()))?;
                let document = info
                    .decrypt(password)
                    .map_err(|e| PopError::DecryptionFailed(e.to_string()))?;
                parse_der(KeyFormat::Pkcs8, document.as_bytes())
            }
            EncryptedBlock::Legacy {
                format,
                cipher,
                iv,
                der,
            } => {
                let key = evp_bytes_to_key(password, &iv[..LEGACY_SALT_LEN], cipher.key_len());
                let plain = match cipher {
                    LegacyCipher::Aes128Cbc => cbc_decrypt::<aes::Aes128>(&key, iv, der)?,
                    LegacyCipher::Aes192Cbc => cbc_decrypt::<aes::Aes192>(&key, iv, der)?,
                    LegacyCipher::Aes256Cbc => cbc_decrypt::<aes::Aes256>(&key, iv, der)?,
                };
                // CBC padding is a weak password check: garbage that unpads cleanly
                // still has to be reported as a decryption failure.
                parse_der(*format, &plain).map_err(|_| {
                    PopError::DecryptionFailed("incorrect password or corrupt key data".into())
                })
            }
        }
    }
}

/// OpenSSL `EVP_BytesToKey` with MD5 and a single iteration.
fn evp_bytes_to_key(password: &[u8], salt: &[u8], key_len: usize) -> Vec<u8> {
    let mut key = Vec::with_capacity(key_len + 16);
    let mut prev: Vec<u8> = Vec::new();
    while key.len() < key_len {
        let mut hasher = Md5::new();
        hasher.update(&prev);
        hasher.update(password);
        hasher.update(salt);
        prev = hasher.finalize().to_vec();
        key.extend_from_slice(&prev);
    }
    key.truncate(key_len);
    key
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>>
where
    C: BlockDecryptMut + BlockCipher + KeyInit,
{
    cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|_| PopError::DecryptionFailed("invalid key or IV length".into()))?
        .decrypt_padded_vec_mut::<Pkcs7>(data)
        .map_err(|_| PopError::DecryptionFailed("incorrect password or corrupt key data".into()))
}

fn parse_der(format: KeyFormat, der: &[u8]) -> Result<RsaPrivateKey> {
    match format {
        KeyFormat::Pkcs1 => RsaPrivateKey::from_pkcs1_der(der)
            .map_err(|e| PopError::KeyParseError(e.to_string())),
        KeyFormat::Pkcs8 => RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|e| PopError::KeyParseError(e.to_string())),
    }
}

/// An RSA private key ready to sign RS256 tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct RsaSigningKey(RsaPrivateKey);

impl fmt::Debug for RsaSigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaSigningKey")
            .field("bits", &self.size_bits())
            .finish_non_exhaustive()
    }
}

impl From<RsaPrivateKey> for RsaSigningKey {
    fn from(key: RsaPrivateKey) -> Self {
        RsaSigningKey(key)
    }
}

impl RsaSigningKey {
    /// Modulus size in bits.
    pub fn size_bits(&self) -> usize {
        self.0.n().bits()
    }

    /// The underlying `rsa` key.
    pub fn as_rsa(&self) -> &RsaPrivateKey {
        &self.0
    }

    pub(crate) fn to_pkcs1_der(&self) -> Result<Vec<u8>> {
        self.0
            .to_pkcs1_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| PopError::SigningError(e.to_string()))
    }

    /// The public half as an RS256 signature [jwk::JsonWebKey].
    ///
    /// `jsonwebkey` only represents the public exponent 65537 (`AQAB`); keys
    /// with any other exponent are rejected.
    pub fn public_jwk(&self, key_id: Option<&str>) -> Result<jwk::JsonWebKey> {
        if self.0.e().to_bytes_be() != JWK_PUBLIC_EXPONENT {
            return Err(PopError::KeyParseError(
                "only the public exponent 65537 can be exported as a JWK".into(),
            ));
        }

        let mut jwk = jwk::JsonWebKey::new(jwk::Key::RSA {
            public: jwk::RsaPublic {
                e: jwk::PublicExponent,
                n: self.0.n().to_bytes_be().into(),
            },
            private: None,
        });
        jwk.key_id = key_id.map(String::from);
        jwk.key_use = Some(jwk::KeyUse::Signing);
        jwk.algorithm = Some(jwk::Algorithm::RS256);
        Ok(jwk)
    }

    /// [RsaSigningKey::public_jwk] serialized to JSON.
    pub fn public_jwk_json(&self, key_id: Option<&str>) -> Result<String> {
        serde_json::to_string(&self.public_jwk(key_id)?)
            .map_err(|e| PopError::PubKeyParsing(e.to_string()))
    }
}

/// Load an RSA private key from a PEM document.
///
/// `password` is used only when the block is encrypted; pass an empty slice
/// for plain keys. A password given alongside a plain key is ignored.
///
/// ```rust
/// use pop_token::{load_private_key, PopError};
///
/// let res = load_private_key(b"not a key", b"");
/// assert!(matches!(res, Err(PopError::InvalidPem(_))));
/// ```
pub fn load_private_key(pem: &[u8], password: &[u8]) -> Result<RsaSigningKey> {
    let key = match PemBlock::parse(pem)? {
        PemBlock::Plain { format, der } => {
            tracing::debug!(?format, "decoded unencrypted PEM block");
            if !password.is_empty() {
                tracing::debug!("password ignored for unencrypted PEM block");
            }
            parse_der(format, &der)?
        }
        PemBlock::Encrypted(block) => {
            let scheme = match &block {
                EncryptedBlock::Pkcs8 { .. } => "pkcs8",
                EncryptedBlock::Legacy { .. } => "legacy",
            };
            tracing::debug!(scheme, "decoded encrypted PEM block");
            block.open(password).inspect_err(|e| {
                tracing::warn!(error = %e, "could not open encrypted private key");
            })?
        }
    };
    Ok(RsaSigningKey(key))
}

/// Read a PEM file from disk and load the RSA private key in it.
pub fn load_private_key_file(path: impl AsRef<Path>, password: &[u8]) -> Result<RsaSigningKey> {
    let pem = std::fs::read(path.as_ref())?;
    load_private_key(&pem, password)
}
