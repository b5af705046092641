use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::credentials::crypto::{MIN_PBKDF2_ITERATIONS, PBKDF2_ITERATIONS};
use crate::credentials::KdfParams;
use crate::llm_client::ClientSettings;
use crate::matching::RouterConfig;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub provider_timeout: Duration,
    pub provider_max_retries: u32,
    pub credential_kdf_iterations: u32,
    pub provider_user_agent: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require_env = |key: &str| {
            lookup(key).with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let credential_kdf_iterations = parse_or(
            &lookup,
            "CREDENTIAL_KDF_ITERATIONS",
            PBKDF2_ITERATIONS,
        )?;
        if credential_kdf_iterations < MIN_PBKDF2_ITERATIONS {
            bail!(
                "CREDENTIAL_KDF_ITERATIONS must be at least {MIN_PBKDF2_ITERATIONS}, got {credential_kdf_iterations}"
            );
        }

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: parse_or(&lookup, "PORT", 8080u16)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            provider_timeout: Duration::from_millis(parse_or(
                &lookup,
                "PROVIDER_TIMEOUT_MS",
                5_000u64,
            )?),
            provider_max_retries: parse_or(&lookup, "PROVIDER_MAX_RETRIES", 0u32)?,
            credential_kdf_iterations,
            provider_user_agent: lookup("PROVIDER_HTTP_USER_AGENT")
                .filter(|ua| !ua.trim().is_empty()),
        })
    }

    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            timeout: self.provider_timeout,
            max_retries: self.provider_max_retries,
            ..RouterConfig::default()
        }
    }

    pub fn kdf_params(&self) -> KdfParams {
        KdfParams {
            iterations: self.credential_kdf_iterations,
        }
    }

    /// The router owns the per-call deadline; the HTTP client timeout is only
    /// a backstop a little above it.
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            request_timeout: self.provider_timeout + Duration::from_secs(1),
            user_agent: self.provider_user_agent.clone(),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
