//! Caller-facing scoring API: parses provider identifiers, normalizes raw
//! text, resolves stored credentials and hands everything to the router.

use std::sync::Arc;

use secrecy::SecretString;
use tracing::{debug, info};
use uuid::Uuid;

use crate::credentials::store::CredentialStore;
use crate::credentials::{self, CredentialRecord, KdfParams};
use crate::errors::MatchError;
use crate::matching::keywords::{normalize, SkillSet};
use crate::matching::provider::Provider;
use crate::matching::router::{AiRouter, MatchResult};

/// Which provider to ask, and with what key, for one scoring call.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub provider: String,
    pub api_key: Option<SecretString>,
}

impl ProviderConfig {
    pub fn internal() -> Self {
        Self {
            provider: Provider::Internal.as_str().to_string(),
            api_key: None,
        }
    }
}

pub struct MatchService {
    router: AiRouter,
    store: Arc<dyn CredentialStore>,
    kdf: KdfParams,
}

impl MatchService {
    pub fn new(router: AiRouter, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            router,
            store,
            kdf: KdfParams::default(),
        }
    }

    /// Key-derivation parameters for newly saved credentials.
    pub fn with_kdf_params(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn router(&self) -> &AiRouter {
        &self.router
    }

    pub async fn score(
        &self,
        profile_text: &str,
        listing_text: &str,
        config: &ProviderConfig,
    ) -> Result<MatchResult, MatchError> {
        let provider: Provider = config.provider.parse()?;
        let profile = normalize(profile_text);
        self.score_sets(&profile, listing_text, provider, config.api_key.as_ref())
            .await
    }

    /// Same as `score`, for callers that already hold a structured skill list.
    pub async fn score_with_skills(
        &self,
        profile_skills: &[String],
        listing_text: &str,
        config: &ProviderConfig,
    ) -> Result<MatchResult, MatchError> {
        let provider: Provider = config.provider.parse()?;
        let profile = SkillSet::from_items(profile_skills);
        self.score_sets(&profile, listing_text, provider, config.api_key.as_ref())
            .await
    }

    /// Scores with the user's selected provider and stored credential.
    ///
    /// No stored credential for the selection means local scoring. A stored
    /// credential needs `password`; a wrong one surfaces as a decryption error
    /// rather than a silent fallback.
    pub async fn score_for_user(
        &self,
        user_id: Uuid,
        profile_text: &str,
        listing_text: &str,
        password: Option<&str>,
    ) -> Result<MatchResult, MatchError> {
        let provider = self.store.active_provider(user_id).await?;

        let api_key = match provider.remote() {
            None => None,
            Some(_) => match self.store.get(user_id, provider).await? {
                None => {
                    debug!("User {user_id} selected {provider} but stored no credential");
                    None
                }
                Some(record) => {
                    let password = password.ok_or_else(|| {
                        MatchError::Validation(format!(
                            "password is required to unlock the stored {provider} credential"
                        ))
                    })?;
                    Some(unlock(record, password).await?)
                }
            },
        };

        let profile = normalize(profile_text);
        self.score_sets(&profile, listing_text, provider, api_key.as_ref())
            .await
    }

    async fn score_sets(
        &self,
        profile: &SkillSet,
        listing_text: &str,
        provider: Provider,
        api_key: Option<&SecretString>,
    ) -> Result<MatchResult, MatchError> {
        let listing = normalize(listing_text);
        Ok(self.router.route(profile, &listing, provider, api_key).await)
    }

    // ── Credential operations ──────────────────────────────────────────────

    pub async fn save_credential(
        &self,
        user_id: Uuid,
        provider: &str,
        secret: &str,
        password: &str,
    ) -> Result<CredentialRecord, MatchError> {
        let provider: Provider = provider.parse()?;
        if secret.trim().is_empty() {
            return Err(MatchError::Validation("secret must not be empty".to_string()));
        }
        if password.is_empty() {
            return Err(MatchError::Validation(
                "password must not be empty".to_string(),
            ));
        }

        let secret = secret.to_string();
        let password = password.to_string();
        let kdf = self.kdf;
        let record = tokio::task::spawn_blocking(move || {
            credentials::save(user_id, provider, &secret, &password, kdf)
        })
        .await
        .map_err(|e| MatchError::Internal(format!("key derivation task failed: {e}")))??;

        self.store.put(&record).await?;
        info!("Saved {provider} credential for user {user_id}");
        Ok(record)
    }

    /// Returns whether a credential existed.
    pub async fn clear_credential(&self, user_id: Uuid, provider: &str) -> Result<bool, MatchError> {
        let provider: Provider = provider.parse()?;
        Ok(self.store.delete(user_id, provider).await?)
    }

    /// Removes every credential and the provider selection for a user.
    pub async fn clear_user(&self, user_id: Uuid) -> Result<u64, MatchError> {
        Ok(self.store.delete_all(user_id).await?)
    }

    pub async fn select_provider(&self, user_id: Uuid, provider: &str) -> Result<Provider, MatchError> {
        let provider: Provider = provider.parse()?;
        self.store.set_active_provider(user_id, provider).await?;
        info!("User {user_id} selected provider {provider}");
        Ok(provider)
    }

    pub async fn selected_provider(&self, user_id: Uuid) -> Result<Provider, MatchError> {
        Ok(self.store.active_provider(user_id).await?)
    }
}

/// PBKDF2 is CPU-bound; run it off the async workers.
async fn unlock(record: CredentialRecord, password: &str) -> Result<SecretString, MatchError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || credentials::load(&record, &password))
        .await
        .map_err(|e| MatchError::Internal(format!("key derivation task failed: {e}")))?
        .map_err(MatchError::from)
}
