//! JSON HTTP API consumed by the browser front end.
//!
//! | Route                  | Body                   | Answer                                  |
//! |------------------------|------------------------|-----------------------------------------|
//! | `POST /api/topic` etc. | generation request     | canonical result or `{"error","kind"}`  |
//! | `POST /api/models`     | credential             | `{"models": [...], "error"?}`           |
//! | `GET /health`          | -                      | `{"status", "version"}`                 |
//!
//! Generation answers are always `200`; failures travel in the body so the
//! front end can show them next to the module that produced them.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::dispatch::Dispatcher;
use crate::models::{GenerationRequest, ModelCredential, Module};

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state of the HTTP handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

/// Errors surfaced by the HTTP layer itself
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("Failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::UnknownEndpoint(_) => (StatusCode::NOT_FOUND, "Unknown endpoint".to_string()),
            ApiError::Encode(_) | ApiError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Build the router with CORS, request tracing and the body limit
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/{endpoint}", post(handle_endpoint))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Serve the API until Ctrl+C or SIGTERM
pub async fn serve(state: AppState, addr: SocketAddr) -> ApiResult<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP API listening on http://{}", listener.local_addr()?);
    tracing::info!("  POST /api/{{topic,outline,draft,polish,search-refs,insert-refs,models}}");
    tracing::info!("  GET  /health");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
    }))
}

async fn handle_endpoint(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    if endpoint == "models" {
        let credential = parse_credential(&body);
        let listing = state.dispatcher.list_models(&credential).await;
        return Ok(Json(serde_json::to_value(listing)?));
    }

    let module = Module::ALL
        .into_iter()
        .find(|m| m.endpoint() == endpoint)
        .ok_or_else(|| ApiError::UnknownEndpoint(endpoint.clone()))?;

    let request = parse_request(&body);
    let value = match state.dispatcher.generate(module, &request).await {
        Ok(result) => serde_json::to_value(result)?,
        Err(err) => serde_json::to_value(err)?,
    };
    Ok(Json(value))
}

/// Parse a generation request, treating anything unreadable as empty
fn parse_request(body: &[u8]) -> GenerationRequest {
    if body.iter().all(u8::is_ascii_whitespace) {
        return GenerationRequest::default();
    }
    serde_json::from_slice(body).unwrap_or_else(|e| {
        tracing::warn!("Unreadable request body, treating as empty: {}", e);
        GenerationRequest::default()
    })
}

/// Parse a credential given either as `{"model": {...}}` or flat
fn parse_credential(body: &[u8]) -> ModelCredential {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            if !body.iter().all(u8::is_ascii_whitespace) {
                tracing::warn!("Unreadable model listing body, treating as empty: {}", e);
            }
            return ModelCredential::default();
        }
    };

    let credential = match value.get("model") {
        Some(nested @ Value::Object(_)) => nested.clone(),
        _ => value,
    };
    serde_json::from_value(credential).unwrap_or_default()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down gracefully"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down gracefully"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::FailurePolicy;
    use crate::providers::{GenerationSettings, MockProvider, ProviderRegistry};
    use crate::utils::HttpClient;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn router(mock: Arc<MockProvider>, policy: FailurePolicy) -> Router {
        let mut registry = ProviderRegistry::new(
            GenerationSettings::default(),
            Arc::new(HttpClient::new().unwrap()),
        );
        registry.register(mock);
        let dispatcher = Dispatcher::new(Arc::new(registry), policy);
        create_router(AppState::new(Arc::new(dispatcher)))
    }

    async fn post(router: Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(body.into())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(Arc::new(MockProvider::default()), FailurePolicy::Lenient)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], crate::VERSION);
    }

    #[tokio::test]
    async fn test_unknown_endpoint() {
        let (status, body) = post(
            router(Arc::new(MockProvider::default()), FailurePolicy::Lenient),
            "/api/summary",
            "{}",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Unknown endpoint"}));
    }

    #[tokio::test]
    async fn test_unreadable_body_is_empty_request() {
        let (status, body) = post(
            router(Arc::new(MockProvider::default()), FailurePolicy::Lenient),
            "/api/insert-refs",
            "{not json",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"citationBlock": "Suggested citations: Smith et al. (2023); Li & Zhao (2022)"})
        );
    }

    #[tokio::test]
    async fn test_provider_result_over_http() {
        let mock = Arc::new(MockProvider::new(
            r#"{"results": [{"title": "A", "year": 2020, "source": "Journal"}]}"#,
        ));
        let request = json!({
            "input": "adaptive learning",
            "model": {"provider": "mock", "model": "mock-model", "apiKey": "key"}
        });
        let (status, body) = post(
            router(mock.clone(), FailurePolicy::Lenient),
            "/api/search-refs",
            request.to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"results": [{"title": "A", "year": 2020, "source": "Journal"}]})
        );
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_strict_error_body() {
        let (status, body) = post(
            router(Arc::new(MockProvider::default()), FailurePolicy::Strict),
            "/api/draft",
            r#"{"input": "adaptive learning"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "configuration");
        assert_eq!(
            body["error"],
            "Please configure the API key and model ID on the home page."
        );
    }

    #[tokio::test]
    async fn test_models_nested_and_flat() {
        let mock = Arc::new(MockProvider::default());
        mock.set_models(&["mock-small"]);

        let nested = json!({"model": {"provider": "mock", "apiKey": "key"}});
        let (_, body) = post(
            router(mock.clone(), FailurePolicy::Lenient),
            "/api/models",
            nested.to_string(),
        )
        .await;
        assert_eq!(body, json!({"models": [{"id": "mock-small", "label": "mock-small"}]}));

        let flat = json!({"provider": "mock", "apiKey": "key"});
        let (_, body) = post(
            router(mock.clone(), FailurePolicy::Lenient),
            "/api/models",
            flat.to_string(),
        )
        .await;
        assert_eq!(body["models"][0]["id"], "mock-small");

        let (_, body) = post(
            router(mock, FailurePolicy::Lenient),
            "/api/models",
            "",
        )
        .await;
        assert_eq!(body, json!({"models": [], "error": "Missing API key"}));
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let body = format!("{{\"input\": \"{}\"}}", "x".repeat(MAX_BODY_BYTES + 1));
        let response = router(Arc::new(MockProvider::default()), FailurePolicy::Lenient)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/polish")
                    .header("content-length", body.len())
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
