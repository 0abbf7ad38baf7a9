//! Admin HTTP server
//!
//! Operator surface for liveness, refresh diagnostics and manually
//! triggered full reloads. This is not the authorization decision path;
//! the gateway filter consumes the cache in-process.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::AdminConfig;
use crate::policy::PolicyCache;
use crate::refresh::RefreshCoordinator;

/// Shared state for admin handlers
#[derive(Clone)]
pub struct AdminState {
    pub coordinator: Arc<RefreshCoordinator>,
    pub cache: Arc<PolicyCache>,
}

#[derive(Serialize)]
struct StatusBody {
    mode: &'static str,
    broker_healthy: bool,
    cached_policies: usize,
    override_count: usize,
    tracked_events: usize,
}

#[derive(Serialize)]
struct RefreshBody {
    reloaded: usize,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

async fn healthz() -> &'static str {
    "ok"
}

async fn status(State(state): State<AdminState>) -> Json<StatusBody> {
    Json(StatusBody {
        mode: state.coordinator.mode().as_str(),
        broker_healthy: state.coordinator.broker_healthy(),
        cached_policies: state.cache.size(),
        override_count: state.coordinator.override_count(),
        tracked_events: state.coordinator.tracked_event_count(),
    })
}

async fn refresh(State(state): State<AdminState>) -> Response {
    match state.coordinator.load_all().await {
        Ok(count) => (StatusCode::OK, Json(RefreshBody { reloaded: count })).into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorBody {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// Build the admin router (exposed separately for tests)
pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/status", get(status))
        .route("/refresh", post(refresh))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the admin server until the cancellation token fires
pub async fn run_admin(
    config: &AdminConfig,
    state: AdminState,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Admin server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    Ok(())
}
