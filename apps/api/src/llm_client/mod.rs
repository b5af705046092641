//! LLM Client — the single point of entry for every outbound AI completion call.
//!
//! ARCHITECTURAL RULE: No other module may talk to a provider API directly.
//! The router only sees the `CompletionBackend` trait; `HttpCompletionClient`
//! is the production implementation and tests plug in fakes.
//!
//! The client is caller-owned: build it with `open`, share it by cloning, end
//! it with `close`. There is no process-wide instance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

use crate::matching::provider::RemoteProvider;

pub mod prompts;
pub mod wire;

const DEFAULT_USER_AGENT: &str = concat!("jobmatch/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Provider reply has no usable score: {0}")]
    InvalidScore(String),

    #[error("Provider call timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Provider call cancelled")]
    Cancelled,

    #[error("Completion client is closed")]
    Closed,
}

impl LlmError {
    /// Rate limits, server errors and transport failures may succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Http(_) => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// One completion call: which provider, whose key, and what to ask.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub provider: RemoteProvider,
    pub api_key: &'a SecretString,
    pub system: &'a str,
    pub prompt: &'a str,
}

/// Anything that can turn a `CompletionRequest` into the assistant's text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, LlmError>;
}

/// Calls the backend and deserializes the text reply as JSON.
/// The prompt must instruct the model to return valid JSON.
pub async fn complete_json<T: DeserializeOwned>(
    backend: &dyn CompletionBackend,
    request: CompletionRequest<'_>,
) -> Result<T, LlmError> {
    let text = backend.complete(request).await?;

    // Strip markdown code fences if the model wraps JSON in them
    let text = strip_json_fences(&text);

    serde_json::from_str(text).map_err(LlmError::Parse)
}

/// Settings for the HTTP client itself. Per-call deadlines belong to the router.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub request_timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            user_agent: None,
        }
    }
}

/// `reqwest`-backed completion client for every `RemoteProvider`.
#[derive(Clone)]
pub struct HttpCompletionClient {
    client: Client,
    closed: Arc<AtomicBool>,
}

impl HttpCompletionClient {
    pub fn open(settings: &ClientSettings) -> Result<Self, LlmError> {
        let user_agent = settings
            .user_agent
            .as_deref()
            .unwrap_or(DEFAULT_USER_AGENT);

        let client = Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(user_agent)
            .build()?;

        info!("Completion client opened (user agent: {user_agent})");

        Ok(Self {
            client,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Marks the client closed for every clone. Later calls fail with `Closed`.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("Completion client closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletionClient {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, LlmError> {
        if self.is_closed() {
            return Err(LlmError::Closed);
        }

        let response = wire::build_request(&self.client, &request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: wire::error_message(&body),
            });
        }

        let body = response.bytes().await?;
        let text = wire::extract_text(request.provider, &body)?;

        debug!(
            "Completion from {} succeeded ({} chars)",
            request.provider,
            text.len()
        );

        Ok(text)
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
