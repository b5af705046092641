//! Job-match scoring: keyword extraction, local overlap scoring, provider
//! routing with local fallback, and the caller-facing `MatchService`.

pub mod handlers;
pub mod keywords;
pub mod local;
pub mod provider;
pub mod router;
pub mod service;

pub use provider::Provider;
pub use router::{AiRouter, MatchResult, RouterConfig, ScoringPath};
pub use service::{MatchService, ProviderConfig};
