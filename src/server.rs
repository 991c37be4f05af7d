//! HTTP front end: refresh triggers, build status, and the static public
//! directory the snapshots are served from.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use subtle::ConstantTimeEq;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::snapshot::Builder;
use crate::systemd::SystemdNotifier;
use crate::types::BuildKind;

pub struct AppState {
    pub builder: Arc<Builder>,
    pub refresh_token: String,
}

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    let public = ServeDir::new(state.builder.public_dir());
    Router::new()
        .route("/refresh/:token", get(refresh_photos))
        .route("/refresh/:token/albums", get(refresh_albums))
        .route("/status", get(status))
        .fallback_service(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn refresh_photos(State(state): State<SharedState>, Path(token): Path<String>) -> Response {
    refresh(&state, &token, BuildKind::Photos)
}

async fn refresh_albums(State(state): State<SharedState>, Path(token): Path<String>) -> Response {
    refresh(&state, &token, BuildKind::Albums)
}

/// Acknowledge before the build runs; its outcome only reaches the logs
/// and `/status`.
fn refresh(state: &AppState, token: &str, kind: BuildKind) -> Response {
    let matches: bool = token
        .as_bytes()
        .ct_eq(state.refresh_token.as_bytes())
        .into();
    if !matches {
        return StatusCode::NOT_FOUND.into_response();
    }
    state.builder.trigger(kind);
    format!("{} will be refreshed momentarily.", kind.file_name()).into_response()
}

async fn status(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.builder.reports())
}

/// Bind `listen` and serve until `shutdown` is cancelled.
pub async fn serve(
    listen: SocketAddr,
    state: SharedState,
    shutdown: CancellationToken,
    notifier: SystemdNotifier,
) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("Error binding {listen}"))?;
    tracing::info!("Server is listening at {}", listener.local_addr()?);
    notifier.notify_ready();

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server error")?;

    notifier.notify_stopping();
    tracing::info!("Server stopped");
    Ok(())
}
