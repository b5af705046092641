pub mod health;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::credentials::handlers as credential_handlers;
use crate::matching::handlers as match_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Scoring
        .route("/api/v1/match/score", post(match_handlers::handle_score))
        .route(
            "/api/v1/match/score/user",
            post(match_handlers::handle_score_for_user),
        )
        // Credentials
        .route(
            "/api/v1/credentials",
            delete(credential_handlers::handle_delete_all_credentials),
        )
        .route(
            "/api/v1/credentials/:provider",
            put(credential_handlers::handle_save_credential)
                .delete(credential_handlers::handle_delete_credential),
        )
        // Provider selection
        .route(
            "/api/v1/settings/provider",
            put(credential_handlers::handle_select_provider)
                .get(credential_handlers::handle_get_provider),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::store::InMemoryCredentialStore;
    use crate::credentials::KdfParams;
    use crate::llm_client::{CompletionBackend, CompletionRequest, LlmError};
    use crate::matching::{AiRouter, MatchService, RouterConfig};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    struct FixedBackend(&'static str);

    #[async_trait]
    impl CompletionBackend for FixedBackend {
        async fn complete(&self, _request: CompletionRequest<'_>) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl CompletionBackend for FailingBackend {
        async fn complete(&self, _request: CompletionRequest<'_>) -> Result<String, LlmError> {
            Err(LlmError::Api {
                status: 503,
                message: "overloaded".to_string(),
            })
        }
    }

    fn app_with(backend: Arc<dyn CompletionBackend>) -> Router {
        let router = AiRouter::new(backend, RouterConfig::default());
        let service = MatchService::new(router, Arc::new(InMemoryCredentialStore::new()))
            .with_kdf_params(KdfParams { iterations: 1_000 });
        build_router(AppState::new(service))
    }

    fn app() -> Router {
        app_with(Arc::new(FixedBackend(
            r#"```json
{"score": 72, "summary": "Good overlap on the core stack."}
```"#,
        )))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "jobmatch-api");
    }

    #[tokio::test]
    async fn test_score_defaults_to_local() {
        let (status, body) = send(
            &app(),
            Method::POST,
            "/api/v1/match/score",
            Some(json!({"profile_text": "react node sql", "listing_text": "react node kafka"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["score"], 67);
        assert_eq!(body["explanation"], Value::Null);
        assert_eq!(body["path"], json!({"kind": "local"}));
        assert_eq!(body["missing_skills"], json!(["kafka"]));
    }

    #[tokio::test]
    async fn test_score_with_provider_key() {
        let (status, body) = send(
            &app(),
            Method::POST,
            "/api/v1/match/score",
            Some(json!({
                "profile_text": "react node",
                "listing_text": "react node kafka",
                "provider": "openai",
                "api_key": "sk-test"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["score"], 72);
        assert_eq!(body["explanation"], "Good overlap on the core stack.");
        assert_eq!(body["path"], json!({"kind": "provider", "provider": "openai"}));
    }

    #[tokio::test]
    async fn test_score_provider_failure_is_still_200() {
        let app = app_with(Arc::new(FailingBackend));
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/match/score",
            Some(json!({
                "profile_text": "react",
                "listing_text": "react node",
                "provider": "gemini",
                "api_key": "gk"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["score"], 50);
        assert_eq!(body["path"]["kind"], "fallback");
        assert_eq!(body["path"]["reason"], "provider_rejected");
    }

    #[tokio::test]
    async fn test_unknown_provider_is_400() {
        let (status, body) = send(
            &app(),
            Method::POST,
            "/api/v1/match/score",
            Some(json!({"profile_text": "a", "listing_text": "b", "provider": "cohere"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_credential_and_selection_flow() {
        let app = app();
        let user = Uuid::new_v4();

        let (status, record) = send(
            &app,
            Method::PUT,
            "/api/v1/credentials/mistral",
            Some(json!({"user_id": user, "secret": "mk-secret-value", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["provider"], "mistral");
        assert!(!record.to_string().contains("mk-secret-value"));

        let (status, _) = send(
            &app,
            Method::PUT,
            "/api/v1/settings/provider",
            Some(json!({"user_id": user, "provider": "mistral"})),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/v1/settings/provider?user_id={user}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["provider"], "mistral");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/match/score/user",
            Some(json!({
                "user_id": user,
                "profile_text": "react",
                "listing_text": "react node",
                "password": "pw"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["score"], 72);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/match/score/user",
            Some(json!({
                "user_id": user,
                "profile_text": "react",
                "listing_text": "react node",
                "password": "wrong"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "DECRYPTION_ERROR");

        let uri = format!("/api/v1/credentials/mistral?user_id={user}");
        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_saving_internal_credential_is_400() {
        let (status, _) = send(
            &app(),
            Method::PUT,
            "/api/v1/credentials/internal",
            Some(json!({"user_id": Uuid::new_v4(), "secret": "x", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_all_resets_selection() {
        let app = app();
        let user = Uuid::new_v4();
        send(
            &app,
            Method::PUT,
            "/api/v1/settings/provider",
            Some(json!({"user_id": user, "provider": "anthropic"})),
        )
        .await;

        let (status, _) = send(
            &app,
            Method::DELETE,
            &format!("/api/v1/credentials?user_id={user}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(
            &app,
            Method::GET,
            &format!("/api/v1/settings/provider?user_id={user}"),
            None,
        )
        .await;
        assert_eq!(body["provider"], "internal");
    }
}
