//! Credential Store — per-(user, provider) API secrets, encrypted at rest.
//!
//! `save` / `load` are the pure encryption half; `store` persists the
//! resulting `CredentialRecord`s and each user's active provider selection.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::matching::provider::Provider;

pub mod crypto;
pub mod handlers;
pub mod store;

pub use crypto::KdfParams;
use crypto::SealedSecret;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Decryption failed: wrong password or corrupted credential")]
    Decryption,

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Provider '{0}' does not take a credential")]
    NoCredentialNeeded(Provider),

    #[error("Stored credential is invalid: {0}")]
    InvalidRecord(String),

    #[error("Credential storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// The encrypted-at-rest form of one user's secret for one provider.
/// Byte fields serialize as standard base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub user_id: Uuid,
    pub provider: Provider,
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub salt: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub iv: Vec<u8>,
    pub kdf_iterations: u32,
    pub updated_at: DateTime<Utc>,
}

impl CredentialRecord {
    fn sealed(&self) -> SealedSecret {
        SealedSecret {
            ciphertext: self.ciphertext.clone(),
            salt: self.salt.clone(),
            iv: self.iv.clone(),
            iterations: self.kdf_iterations,
        }
    }
}

/// Encrypts `secret` for `(user_id, provider)` under a key derived from `password`.
pub fn save(
    user_id: Uuid,
    provider: Provider,
    secret: &str,
    password: &str,
    params: KdfParams,
) -> Result<CredentialRecord, CredentialError> {
    if provider.remote().is_none() {
        return Err(CredentialError::NoCredentialNeeded(provider));
    }

    let sealed = crypto::seal(secret, password, params)?;

    Ok(CredentialRecord {
        user_id,
        provider,
        ciphertext: sealed.ciphertext,
        salt: sealed.salt,
        iv: sealed.iv,
        kdf_iterations: sealed.iterations,
        updated_at: Utc::now(),
    })
}

/// Decrypts a record. Fails with `Decryption` on a wrong password or any tampering.
pub fn load(record: &CredentialRecord, password: &str) -> Result<SecretString, CredentialError> {
    crypto::open(&record.sealed(), password)
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
