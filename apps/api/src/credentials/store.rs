//! Persistence for credential records and provider selections.
//!
//! Records are keyed by `(user_id, provider)` and always written whole, so
//! writers on different keys never see each other's partial state.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::credentials::{CredentialError, CredentialRecord};
use crate::matching::provider::Provider;
use crate::models::credential::{CredentialRow, UserAiSettingsRow};

/// Durable key-value interface over credential records.
/// Carried in `MatchService` as `Arc<dyn CredentialStore>`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Inserts or replaces the record for `(record.user_id, record.provider)`.
    async fn put(&self, record: &CredentialRecord) -> Result<(), CredentialError>;

    async fn get(
        &self,
        user_id: Uuid,
        provider: Provider,
    ) -> Result<Option<CredentialRecord>, CredentialError>;

    /// Returns whether a record existed.
    async fn delete(&self, user_id: Uuid, provider: Provider) -> Result<bool, CredentialError>;

    /// Removes every record and the provider selection for a user.
    /// Returns the number of credential records removed.
    async fn delete_all(&self, user_id: Uuid) -> Result<u64, CredentialError>;

    async fn set_active_provider(
        &self,
        user_id: Uuid,
        provider: Provider,
    ) -> Result<(), CredentialError>;

    /// The user's selection, or `Provider::Internal` if none was ever made.
    async fn active_provider(&self, user_id: Uuid) -> Result<Provider, CredentialError>;
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL
// ────────────────────────────────────────────────────────────────────────────

pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn put(&self, record: &CredentialRecord) -> Result<(), CredentialError> {
        let kdf_iterations = i32::try_from(record.kdf_iterations).map_err(|_| {
            CredentialError::InvalidRecord(format!(
                "kdf_iterations {} does not fit the column",
                record.kdf_iterations
            ))
        })?;

        sqlx::query(
            r#"
            INSERT INTO provider_credentials
                (user_id, provider, ciphertext, salt, iv, kdf_iterations, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, provider) DO UPDATE SET
                ciphertext = EXCLUDED.ciphertext,
                salt = EXCLUDED.salt,
                iv = EXCLUDED.iv,
                kdf_iterations = EXCLUDED.kdf_iterations,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.user_id)
        .bind(record.provider.as_str())
        .bind(&record.ciphertext)
        .bind(&record.salt)
        .bind(&record.iv)
        .bind(kdf_iterations)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        info!(
            "Stored {} credential for user {}",
            record.provider, record.user_id
        );
        Ok(())
    }

    async fn get(
        &self,
        user_id: Uuid,
        provider: Provider,
    ) -> Result<Option<CredentialRecord>, CredentialError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT * FROM provider_credentials WHERE user_id = $1 AND provider = $2",
        )
        .bind(user_id)
        .bind(provider.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(CredentialRecord::try_from).transpose()
    }

    async fn delete(&self, user_id: Uuid, provider: Provider) -> Result<bool, CredentialError> {
        let result =
            sqlx::query("DELETE FROM provider_credentials WHERE user_id = $1 AND provider = $2")
                .bind(user_id)
                .bind(provider.as_str())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self, user_id: Uuid) -> Result<u64, CredentialError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM provider_credentials WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM user_ai_settings WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!("Removed {removed} credential(s) and provider selection for user {user_id}");
        Ok(removed)
    }

    async fn set_active_provider(
        &self,
        user_id: Uuid,
        provider: Provider,
    ) -> Result<(), CredentialError> {
        sqlx::query(
            r#"
            INSERT INTO user_ai_settings (user_id, active_provider, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (user_id) DO UPDATE SET
                active_provider = EXCLUDED.active_provider,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user_id)
        .bind(provider.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn active_provider(&self, user_id: Uuid) -> Result<Provider, CredentialError> {
        let row = sqlx::query_as::<_, UserAiSettingsRow>(
            "SELECT * FROM user_ai_settings WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row
                .active_provider
                .parse()
                .map_err(|e| CredentialError::InvalidRecord(format!("{e}"))),
            None => Ok(Provider::Internal),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Tables {
    records: HashMap<(Uuid, Provider), CredentialRecord>,
    selections: HashMap<Uuid, Provider>,
}

/// Process-local store for tests and for library callers without a database.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    tables: RwLock<Tables>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn put(&self, record: &CredentialRecord) -> Result<(), CredentialError> {
        self.tables
            .write()
            .await
            .records
            .insert((record.user_id, record.provider), record.clone());
        Ok(())
    }

    async fn get(
        &self,
        user_id: Uuid,
        provider: Provider,
    ) -> Result<Option<CredentialRecord>, CredentialError> {
        Ok(self
            .tables
            .read()
            .await
            .records
            .get(&(user_id, provider))
            .cloned())
    }

    async fn delete(&self, user_id: Uuid, provider: Provider) -> Result<bool, CredentialError> {
        Ok(self
            .tables
            .write()
            .await
            .records
            .remove(&(user_id, provider))
            .is_some())
    }

    async fn delete_all(&self, user_id: Uuid) -> Result<u64, CredentialError> {
        let mut tables = self.tables.write().await;
        let before = tables.records.len();
        tables.records.retain(|(owner, _), _| *owner != user_id);
        tables.selections.remove(&user_id);
        Ok((before - tables.records.len()) as u64)
    }

    async fn set_active_provider(
        &self,
        user_id: Uuid,
        provider: Provider,
    ) -> Result<(), CredentialError> {
        self.tables
            .write()
            .await
            .selections
            .insert(user_id, provider);
        Ok(())
    }

    async fn active_provider(&self, user_id: Uuid) -> Result<Provider, CredentialError> {
        Ok(self
            .tables
            .read()
            .await
            .selections
            .get(&user_id)
            .copied()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{load, save, KdfParams};
    use secrecy::ExposeSecret;
    use std::sync::Arc;

    const FAST: KdfParams = KdfParams { iterations: 1_000 };

    fn record(user_id: Uuid, provider: Provider, secret: &str) -> CredentialRecord {
        save(user_id, provider, secret, "pw", FAST).unwrap()
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let store = InMemoryCredentialStore::new();
        let user = Uuid::new_v4();
        store.put(&record(user, Provider::OpenAi, "sk-1")).await.unwrap();

        let fetched = store.get(user, Provider::OpenAi).await.unwrap().unwrap();
        assert_eq!(load(&fetched, "pw").unwrap().expose_secret(), "sk-1");
        assert!(store.get(user, Provider::Mistral).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_existing_record() {
        let store = InMemoryCredentialStore::new();
        let user = Uuid::new_v4();
        store.put(&record(user, Provider::OpenAi, "old")).await.unwrap();
        store.put(&record(user, Provider::OpenAi, "new")).await.unwrap();

        let fetched = store.get(user, Provider::OpenAi).await.unwrap().unwrap();
        assert_eq!(load(&fetched, "pw").unwrap().expose_secret(), "new");
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let store = InMemoryCredentialStore::new();
        let user = Uuid::new_v4();
        store.put(&record(user, Provider::Gemini, "g")).await.unwrap();

        assert!(store.delete(user, Provider::Gemini).await.unwrap());
        assert!(!store.delete(user, Provider::Gemini).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_all_only_touches_one_user() {
        let store = InMemoryCredentialStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store.put(&record(alice, Provider::OpenAi, "a1")).await.unwrap();
        store.put(&record(alice, Provider::Mistral, "a2")).await.unwrap();
        store.put(&record(bob, Provider::OpenAi, "b1")).await.unwrap();
        store.set_active_provider(alice, Provider::Mistral).await.unwrap();
        store.set_active_provider(bob, Provider::OpenAi).await.unwrap();

        assert_eq!(store.delete_all(alice).await.unwrap(), 2);
        assert!(store.get(alice, Provider::OpenAi).await.unwrap().is_none());
        assert_eq!(store.active_provider(alice).await.unwrap(), Provider::Internal);
        assert!(store.get(bob, Provider::OpenAi).await.unwrap().is_some());
        assert_eq!(store.active_provider(bob).await.unwrap(), Provider::OpenAi);
    }

    #[tokio::test]
    async fn test_active_provider_defaults_to_internal_and_is_single() {
        let store = InMemoryCredentialStore::new();
        let user = Uuid::new_v4();
        assert_eq!(store.active_provider(user).await.unwrap(), Provider::Internal);

        store.set_active_provider(user, Provider::OpenAi).await.unwrap();
        store.set_active_provider(user, Provider::Anthropic).await.unwrap();
        assert_eq!(store.active_provider(user).await.unwrap(), Provider::Anthropic);
    }

    #[tokio::test]
    async fn test_concurrent_writes_on_distinct_keys() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let users: Vec<Uuid> = (0..8).map(|_| Uuid::new_v4()).collect();

        let mut handles = Vec::new();
        for (i, user) in users.iter().copied().enumerate() {
            for provider in [Provider::OpenAi, Provider::Mistral] {
                let store = Arc::clone(&store);
                let secret = format!("{provider}-{i}");
                handles.push(tokio::spawn(async move {
                    store.put(&record(user, provider, &secret)).await.unwrap();
                }));
            }
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for (i, user) in users.iter().copied().enumerate() {
            for provider in [Provider::OpenAi, Provider::Mistral] {
                let fetched = store.get(user, provider).await.unwrap().unwrap();
                assert_eq!(
                    load(&fetched, "pw").unwrap().expose_secret(),
                    format!("{provider}-{i}")
                );
            }
        }
    }
}
