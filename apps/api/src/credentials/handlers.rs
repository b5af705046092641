use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::credentials::CredentialRecord;
use crate::errors::AppError;
use crate::matching::Provider;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct SaveCredentialRequest {
    pub user_id: Uuid,
    pub secret: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SelectProviderRequest {
    pub user_id: Uuid,
    pub provider: String,
}

#[derive(Serialize)]
pub struct SelectedProviderResponse {
    pub provider: Provider,
}

/// PUT /api/v1/credentials/:provider
/// Responds with the encrypted record; the plaintext secret is never echoed.
pub async fn handle_save_credential(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Json(req): Json<SaveCredentialRequest>,
) -> Result<Json<CredentialRecord>, AppError> {
    let record = state
        .matcher
        .save_credential(req.user_id, &provider, &req.secret, &req.password)
        .await?;
    Ok(Json(record))
}

/// DELETE /api/v1/credentials/:provider
pub async fn handle_delete_credential(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    if state
        .matcher
        .clear_credential(params.user_id, &provider)
        .await?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!(
            "No {provider} credential stored for user {}",
            params.user_id
        )))
    }
}

/// DELETE /api/v1/credentials
/// Account deletion: every credential and the provider selection go.
pub async fn handle_delete_all_credentials(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    state.matcher.clear_user(params.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/settings/provider
pub async fn handle_select_provider(
    State(state): State<AppState>,
    Json(req): Json<SelectProviderRequest>,
) -> Result<StatusCode, AppError> {
    state
        .matcher
        .select_provider(req.user_id, &req.provider)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/settings/provider
pub async fn handle_get_provider(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<SelectedProviderResponse>, AppError> {
    let provider = state.matcher.selected_provider(params.user_id).await?;
    Ok(Json(SelectedProviderResponse { provider }))
}
