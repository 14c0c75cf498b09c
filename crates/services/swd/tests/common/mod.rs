use std::{fs, path::Path, time::Duration};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use sw_config::ScanwatchConfig;
use swd::{api::router, state::AppState};
use tempfile::TempDir;
use tower::ServiceExt;

/// A throwaway toolkit checkout plus a daemon wired to it.
pub struct TestContext {
    pub toolkit: TempDir,
    pub state: AppState,
    pub app: Router,
}

impl TestContext {
    /// Daemon over an empty toolkit without any scanner.
    pub fn new() -> Self {
        let toolkit = tempfile::tempdir().expect("Couldn't create toolkit dir");
        let mut config = ScanwatchConfig::default();
        config.toolkit.root = toolkit.path().to_path_buf();
        config.telemetry.poll_interval_ms = 25;
        config.telemetry.drain_timeout_ms = 2000;
        fs::create_dir_all(config.output_root()).expect("Couldn't create output dir");

        let (state, _handle) = AppState::create(&config);
        let app = router(state.clone());
        Self {
            toolkit,
            state,
            app,
        }
    }

    pub fn output_root(&self) -> std::path::PathBuf {
        self.toolkit.path().join("output")
    }

    /// Install `script` as the scanner entry point.
    pub fn with_scanner(self, script: &str) -> Self {
        fs::write(self.toolkit.path().join("bounty.sh"), script).expect("Couldn't write scanner");
        self
    }

    pub fn add_job_file(&self, job_id: &str, relative: &str, contents: &str) {
        let path = self.output_root().join(job_id).join(relative);
        fs::create_dir_all(path.parent().unwrap_or(Path::new("."))).expect("Couldn't create dirs");
        fs::write(path, contents).expect("Couldn't write job file");
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, String) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, body: &str) -> (StatusCode, String) {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Couldn't read body");
        (status, String::from_utf8_lossy(&body).into_owned())
    }
}

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(15);
