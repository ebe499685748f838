//! HTTP surface: the session snapshot endpoint, the WebSocket route and the
//! static client assets.

use axum::{extract::State, routing::get, Json, Router};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::runtime::SessionHandle;
use crate::types::SessionSnapshot;
use crate::ws;

/// Build the application router around a running session
pub fn router(session: SessionHandle, config: &ServerConfig) -> Router {
    Router::new()
        .route("/api/session", get(session_snapshot))
        .route("/ws", get(ws::ws_handler))
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(session)
}

/// Current phase, round, roster, deadline and history
pub async fn session_snapshot(
    State(session): State<SessionHandle>,
) -> Result<Json<SessionSnapshot>, axum::http::StatusCode> {
    session
        .snapshot()
        .await
        .map(Json)
        .ok_or(axum::http::StatusCode::SERVICE_UNAVAILABLE)
}
