use std::time::Duration;

use clap::Parser;
use swd::{
    api::setup_api, cli::Cli, index_watcher::spawn_index_watcher, prelude::*, state::AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Burst window for output-root changes.
const INDEX_SETTLE: Duration = Duration::from_millis(500);

/// Entry point of the scanwatch daemon.
///
/// Runs the coordinator, the API server and the output-root watcher until one
/// of them stops or Ctrl-C is received.
///
/// # Examples
///
/// ```bash
/// export SWD_TOOLKIT_ROOT=/opt/bounty
/// swd --address 0.0.0.0:3000
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,tower_http=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Cli::parse().load_config()?;
    let output_root = config.output_root();
    tokio::fs::create_dir_all(&output_root).await?;
    tracing::info!("Serving jobs from {}", output_root.display());

    let (state, coordinator_handle) = AppState::create(&config);
    let index_handle = spawn_index_watcher(&output_root, state.hub.clone(), INDEX_SETTLE)?;
    let (_, api_handle) = setup_api(state.clone(), &config.server.address).await?;

    tokio::select! {
        result = coordinator_handle => {
            tracing::error!("Coordinator task stopped: {:?}", result);
        }
        result = api_handle => {
            tracing::error!("API server stopped: {:?}", result);
        }
        result = index_handle => {
            tracing::error!("Output watcher stopped: {:?}", result);
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
            state.coordinator.shutdown().await?;
        }
    }

    Ok(())
}
