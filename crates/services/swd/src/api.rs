//! HTTP API.
//!
//! Everything but `POST /api/scan` is a point-in-time read of the output
//! directory; live progress is only available on `/ws`.

use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::Html,
    routing::{any, get, post},
};
use sw_fs::{events::read_event_log, index::list_jobs};
use sw_models::{
    job::{JobRequest, LaunchAck},
    phase::PhaseRecord,
    record::JobRecord,
};
use tokio::task::JoinHandle;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::info;

use crate::{coordinator::JobContext, live::live_handler, prelude::*, state::AppState};

fn api(path: &str) -> String {
    format!("/api/{path}")
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(&api("scan"), post(launch_scan))
        .route(&api("scans"), get(list_scans))
        .route(&api("scans/{id}/report"), get(scan_report))
        .route(&api("scans/{id}/events"), get(scan_events))
        .route(&api("jobs/active"), get(active_jobs))
        .route("/ws", any(live_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `address` and serve the API in the background.
pub async fn setup_api(
    state: AppState,
    address: &str,
) -> Result<(SocketAddr, JoinHandle<Result<()>>)> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(address).await?;
    let local_addr = listener.local_addr()?;
    info!("Listening on {local_addr}");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await?;
        Ok(())
    });
    Ok((local_addr, handle))
}

async fn launch_scan(
    State(state): State<AppState>,
    Json(payload): Json<JobRequest>,
) -> Result<Json<LaunchAck>> {
    Ok(Json(state.coordinator.launch(payload).await?))
}

async fn list_scans(State(state): State<AppState>) -> Result<Json<Vec<JobRecord>>> {
    let layout = state.layout.clone();
    let jobs = tokio::task::spawn_blocking(move || list_jobs(&layout)).await??;
    Ok(Json(jobs))
}

async fn scan_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>> {
    let path = state
        .layout
        .report_path(&id)
        .ok_or_else(|| Error::NotFound(format!("scan {id}")))?;
    match tokio::fs::read_to_string(&path).await {
        Ok(report) => Ok(Html(report)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::NotFound(format!("report of {id}")))
        }
        Err(err) => Err(err.into()),
    }
}

async fn scan_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<PhaseRecord>>> {
    let path = state
        .layout
        .events_path(&id)
        .ok_or_else(|| Error::NotFound(format!("scan {id}")))?;
    let records = tokio::task::spawn_blocking(move || read_event_log(&path)).await??;
    Ok(Json(records))
}

async fn active_jobs(State(state): State<AppState>) -> Result<Json<Vec<JobContext>>> {
    Ok(Json(state.coordinator.active_jobs().await?))
}
