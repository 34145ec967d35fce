//! Route definitions and router construction (mirrors
//! `gglib-axum::routes`'s `create_router`/CORS-layering shape, trimmed to
//! this gateway's two endpoints).

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;
use crate::supervisor::{self, SupervisorDeps};

#[derive(Debug, Clone, Default)]
pub enum CorsConfig {
    #[default]
    AllowAll,
    AllowOrigins(Vec<String>),
}

fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    match config {
        CorsConfig::AllowAll => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
        CorsConfig::AllowOrigins(origins) => {
            use axum::http::HeaderValue;
            let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new().allow_origin(allowed).allow_methods(Any).allow_headers(Any)
        }
    }
}

/// Build the gateway's router: the control WebSocket plus a health route
/// (spec.md Non-goals exclude health endpoints as a *feature*, but the
/// expanded spec keeps this as ambient ops wiring, see `SPEC_FULL.md` §10).
pub fn create_router(deps: Arc<SupervisorDeps>, cors_config: &CorsConfig) -> Router {
    let cors = build_cors_layer(cors_config);
    Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_upgrade))
        .layer(cors)
        .with_state(deps)
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| supervisor::handle_connection(socket, state))
}

/// `GET /healthz` — process liveness plus per-component error counts
/// (spec §4.10 "errors{component} counter", supplemented ambient feature).
async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "errors": state.error_counters.snapshot(),
    }))
}
