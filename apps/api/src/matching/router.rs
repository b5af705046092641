//! AI Router — dispatches one scoring request to the local matcher or to the
//! selected provider, and always comes back with a `MatchResult`.
//!
//! Failure policy: any provider failure (transport, non-2xx, bad reply,
//! timeout, cancellation) is logged and replaced by the local score. The
//! `path` field tells callers which computation actually produced the score.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::llm_client::prompts::{render_match_prompt, MATCH_SYSTEM};
use crate::llm_client::{complete_json, CompletionBackend, CompletionRequest, LlmError};
use crate::matching::keywords::SkillSet;
use crate::matching::local::{self, LocalAssessment};
use crate::matching::provider::{Provider, RemoteProvider};

// ────────────────────────────────────────────────────────────────────────────
// Output data models
// ────────────────────────────────────────────────────────────────────────────

/// Which computation produced a score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoringPath {
    Local,
    Provider {
        provider: Provider,
    },
    /// The provider was asked and failed; the score is the local one.
    Fallback {
        provider: Provider,
        reason: FallbackReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    Timeout,
    Cancelled,
    Transport,
    ProviderRejected,
    MalformedReply,
    ClientClosed,
}

impl From<&LlmError> for FallbackReason {
    fn from(error: &LlmError) -> Self {
        match error {
            LlmError::Timeout(_) => FallbackReason::Timeout,
            LlmError::Cancelled => FallbackReason::Cancelled,
            LlmError::Http(_) => FallbackReason::Transport,
            LlmError::Api { .. } => FallbackReason::ProviderRejected,
            LlmError::Parse(_) | LlmError::EmptyContent | LlmError::InvalidScore(_) => {
                FallbackReason::MalformedReply
            }
            LlmError::Closed => FallbackReason::ClientClosed,
        }
    }
}

/// Score plus optional explanation. `score` is always within 0 – 100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub score: u8,
    pub explanation: Option<String>,
    pub path: ScoringPath,
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
}

impl MatchResult {
    fn local(assessment: LocalAssessment) -> Self {
        Self::with_path(assessment, ScoringPath::Local)
    }

    fn fallback(provider: RemoteProvider, error: &LlmError, assessment: LocalAssessment) -> Self {
        Self::with_path(
            assessment,
            ScoringPath::Fallback {
                provider: provider.provider(),
                reason: FallbackReason::from(error),
            },
        )
    }

    fn with_path(assessment: LocalAssessment, path: ScoringPath) -> Self {
        Self {
            score: assessment.score,
            explanation: None,
            path,
            matching_skills: assessment.matching_skills,
            missing_skills: assessment.missing_skills,
        }
    }

    fn from_provider(
        provider: RemoteProvider,
        scored: ProviderScore,
        assessment: LocalAssessment,
    ) -> Self {
        Self {
            score: scored.score,
            explanation: Some(scored.explanation),
            path: ScoringPath::Provider {
                provider: provider.provider(),
            },
            matching_skills: assessment.matching_skills,
            missing_skills: assessment.missing_skills,
        }
    }

    /// True when a provider was selected but the local matcher had to answer.
    pub fn is_degraded(&self) -> bool {
        matches!(self.path, ScoringPath::Fallback { .. })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Provider reply normalisation
// ────────────────────────────────────────────────────────────────────────────

/// What the match prompt asks the provider to return.
#[derive(Debug, Deserialize)]
struct ProviderAssessment {
    score: Value,
    #[serde(default, alias = "explanation")]
    summary: Option<String>,
}

#[derive(Debug)]
struct ProviderScore {
    score: u8,
    explanation: String,
}

impl ProviderAssessment {
    fn normalize(self, provider: RemoteProvider) -> Result<ProviderScore, LlmError> {
        let score = normalize_score(&self.score)?;
        let explanation = match self.summary.map(|s| s.trim().to_string()) {
            Some(s) if !s.is_empty() => s,
            _ => format!(
                "Compatibility assessed by {} at {score}/100.",
                provider.display_name()
            ),
        };
        Ok(ProviderScore { score, explanation })
    }
}

/// Accepts a JSON number or a numeric string (optionally ending in `%`),
/// rounds it and clamps it into 0 – 100.
fn normalize_score(value: &Value) -> Result<u8, LlmError> {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim_end().parse::<f64>().ok(),
        _ => None,
    };

    match raw {
        Some(v) if v.is_finite() => Ok(v.round().clamp(0.0, 100.0) as u8),
        _ => Err(LlmError::InvalidScore(value.to_string())),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Router
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Deadline for the whole provider exchange, retries included.
    pub timeout: Duration,
    /// Extra attempts after a transient failure. 0 means fall back immediately.
    pub max_retries: u32,
    /// First retry delay; doubles on each further attempt.
    pub retry_base_delay: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_retries: 0,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

pub struct AiRouter {
    backend: Arc<dyn CompletionBackend>,
    config: RouterConfig,
}

impl AiRouter {
    pub fn new(backend: Arc<dyn CompletionBackend>, config: RouterConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Scores `profile` against `listing` with the selected provider.
    /// Never fails: provider problems degrade to the local score.
    pub async fn route(
        &self,
        profile: &SkillSet,
        listing: &SkillSet,
        provider: Provider,
        api_key: Option<&SecretString>,
    ) -> MatchResult {
        self.route_with_cancel(profile, listing, provider, api_key, &CancellationToken::new())
            .await
    }

    /// Like `route`, but a cancelled `cancel` token ends the provider call
    /// early and yields the local score.
    pub async fn route_with_cancel(
        &self,
        profile: &SkillSet,
        listing: &SkillSet,
        provider: Provider,
        api_key: Option<&SecretString>,
        cancel: &CancellationToken,
    ) -> MatchResult {
        let assessment = local::evaluate(profile, listing);

        let Some(remote) = provider.remote() else {
            return MatchResult::local(assessment);
        };
        let Some(api_key) = api_key.filter(|k| !k.expose_secret().trim().is_empty()) else {
            debug!("No {remote} credential present, scoring locally");
            return MatchResult::local(assessment);
        };

        let call = self.ask_provider(remote, api_key, profile, listing);
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LlmError::Cancelled),
            result = tokio::time::timeout(self.config.timeout, call) => {
                result.unwrap_or(Err(LlmError::Timeout(self.config.timeout)))
            }
        };

        match outcome {
            Ok(scored) => {
                info!("{remote} scored match at {}", scored.score);
                MatchResult::from_provider(remote, scored, assessment)
            }
            Err(e) => {
                warn!("{remote} scoring failed, falling back to local matcher: {e}");
                MatchResult::fallback(remote, &e, assessment)
            }
        }
    }

    async fn ask_provider(
        &self,
        remote: RemoteProvider,
        api_key: &SecretString,
        profile: &SkillSet,
        listing: &SkillSet,
    ) -> Result<ProviderScore, LlmError> {
        let prompt = render_match_prompt(&profile.joined(), &listing.joined());
        let request = CompletionRequest {
            provider: remote,
            api_key,
            system: MATCH_SYSTEM,
            prompt: &prompt,
        };

        let mut attempt: u32 = 0;
        loop {
            let result = complete_json::<ProviderAssessment>(self.backend.as_ref(), request)
                .await
                .and_then(|a| a.normalize(remote));

            match result {
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    // Exponential backoff: base, 2×base, 4×base, ...
                    let delay = self
                        .config
                        .retry_base_delay
                        .saturating_mul(1 << attempt.min(16));
                    attempt += 1;
                    warn!(
                        "{remote} call attempt {attempt} failed ({e}), retrying after {}ms...",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}
