use crate::config::{CorsConfig, RelayConfig};
use crate::error::{RelayError, Result};
use crate::logging::SharedLogger;
use crate::relay::{self, Upstream};
use crate::translate::chat_types::{ChatRequest, ChatResponse};

use axum::extract::State;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: RelayConfig,
    pub upstream: Upstream,
    pub logger: SharedLogger,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors);

    Router::new()
        .route("/api/chat", post(handle_chat))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Open policy by default. Wildcard origins never carry credentials: browsers
/// reject `Allow-Origin: *` together with `Allow-Credentials: true`.
fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    if cors.allow_origins.is_empty() || cors.allow_origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = cors
        .allow_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn handle_chat(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ChatResponse>> {
    // Parsed by hand so a bad body still gets a `{"detail": ...}` response.
    let req: ChatRequest = serde_json::from_slice(&body).map_err(|e| {
        state
            .logger
            .warn("server", format!("Rejected request body: {}", e));
        RelayError::invalid_request(e.to_string())
    })?;

    let resp = relay::relay_chat(&req, &state.upstream, &state.logger).await?;
    Ok(Json(resp))
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
