//! Error types for the scanwatch daemon.
//!
//! Launch requests fail synchronously with a validation, configuration or
//! busy-domain error; everything that happens after a launch is accepted is
//! reported on the live channel instead.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::error;

use crate::coordinator::CoordinatorEvent;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] sw_config::error::Error),

    #[error(transparent)]
    Fs(#[from] sw_fs::error::Error),

    #[error(transparent)]
    Process(sw_io::error::Error),

    #[error(transparent)]
    Validation(#[from] sw_models::error::Error),

    #[error("{0}")]
    Configuration(String),

    #[error("a scan for {0} is still waiting for its output folder")]
    DomainBusy(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    CoordinatorEventSendError(#[from] tokio::sync::mpsc::error::SendError<CoordinatorEvent>),

    #[error("Coordinator dropped the request")]
    CoordinatorReplyDropped(#[from] tokio::sync::oneshot::error::RecvError),

    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),

    #[error("WebSocket error {0}")]
    Axum(#[from] axum::Error),
}

impl From<sw_io::error::Error> for Error {
    fn from(err: sw_io::error::Error) -> Self {
        match err {
            sw_io::error::Error::EntryPointMissing(path) => {
                Error::Configuration(format!("scanner entry point {} not found", path.display()))
            }
            err => Error::Process(err),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::DomainBusy(_) => (StatusCode::CONFLICT, self.to_string()),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            Error::Configuration(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                String::from("Internal server error"),
            ),
        };
        if status.is_server_error() {
            error!("Creating API error response for error: {:?}", self);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
