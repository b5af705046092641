use axum::{extract::State, Json};
use secrecy::SecretString;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::matching::{MatchResult, ProviderConfig};
use crate::state::AppState;

fn default_provider() -> String {
    "internal".to_string()
}

#[derive(Deserialize)]
pub struct ScoreRequest {
    pub profile_text: String,
    pub listing_text: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Deserialize)]
pub struct UserScoreRequest {
    pub user_id: Uuid,
    pub profile_text: String,
    pub listing_text: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// POST /api/v1/match/score
pub async fn handle_score(
    State(state): State<AppState>,
    Json(req): Json<ScoreRequest>,
) -> Result<Json<MatchResult>, AppError> {
    let config = ProviderConfig {
        provider: req.provider,
        api_key: req.api_key.map(SecretString::from),
    };
    let result = state
        .matcher
        .score(&req.profile_text, &req.listing_text, &config)
        .await?;
    Ok(Json(result))
}

/// POST /api/v1/match/score/user
pub async fn handle_score_for_user(
    State(state): State<AppState>,
    Json(req): Json<UserScoreRequest>,
) -> Result<Json<MatchResult>, AppError> {
    let result = state
        .matcher
        .score_for_user(
            req.user_id,
            &req.profile_text,
            &req.listing_text,
            req.password.as_deref(),
        )
        .await?;
    Ok(Json(result))
}
