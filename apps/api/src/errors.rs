use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::credentials::CredentialError;
use crate::matching::provider::UnknownProvider;

/// Error type of the `MatchService` API.
/// Provider failures never appear here; the router absorbs them.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<UnknownProvider> for MatchError {
    fn from(e: UnknownProvider) -> Self {
        MatchError::Validation(e.to_string())
    }
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Decryption failed")]
    Decryption,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<MatchError> for AppError {
    fn from(e: MatchError) -> Self {
        match e {
            MatchError::Validation(msg) => AppError::Validation(msg),
            MatchError::Credential(CredentialError::Decryption) => AppError::Decryption,
            MatchError::Credential(e @ CredentialError::NoCredentialNeeded(_)) => {
                AppError::Validation(e.to_string())
            }
            MatchError::Credential(CredentialError::Storage(e)) => AppError::Database(e),
            MatchError::Credential(e) => AppError::Internal(e.into()),
            MatchError::Internal(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Decryption => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "DECRYPTION_ERROR",
                "The stored credential could not be decrypted with this password".to_string(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::provider::Provider;

    #[test]
    fn test_unknown_provider_maps_to_validation() {
        let err: MatchError = UnknownProvider("cohere".to_string()).into();
        assert!(matches!(err, MatchError::Validation(msg) if msg.contains("cohere")));
    }

    #[test]
    fn test_match_error_status_codes() {
        let cases = [
            (
                MatchError::Validation("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                MatchError::Credential(CredentialError::Decryption),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                MatchError::Credential(CredentialError::NoCredentialNeeded(Provider::Internal)),
                StatusCode::BAD_REQUEST,
            ),
            (
                MatchError::Credential(CredentialError::InvalidRecord("x".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                MatchError::Internal("join".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
