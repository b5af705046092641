use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::credentials::{CredentialError, CredentialRecord};
use crate::matching::provider::Provider;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CredentialRow {
    pub user_id: Uuid,
    pub provider: String,
    pub ciphertext: Vec<u8>,
    pub salt: Vec<u8>,
    pub iv: Vec<u8>,
    pub kdf_iterations: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserAiSettingsRow {
    pub user_id: Uuid,
    pub active_provider: String,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CredentialRow> for CredentialRecord {
    type Error = CredentialError;

    fn try_from(row: CredentialRow) -> Result<Self, Self::Error> {
        let provider: Provider = row
            .provider
            .parse()
            .map_err(|e| CredentialError::InvalidRecord(format!("{e}")))?;
        let kdf_iterations = u32::try_from(row.kdf_iterations).map_err(|_| {
            CredentialError::InvalidRecord(format!(
                "negative kdf_iterations {} for {} / {}",
                row.kdf_iterations, row.user_id, row.provider
            ))
        })?;

        Ok(CredentialRecord {
            user_id: row.user_id,
            provider,
            ciphertext: row.ciphertext,
            salt: row.salt,
            iv: row.iv,
            kdf_iterations,
            updated_at: row.updated_at,
        })
    }
}
