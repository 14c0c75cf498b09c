//! Shared state handed to every request handler.

use sw_config::ScanwatchConfig;
use sw_fs::layout::OutputLayout;
use tokio::task::JoinHandle;

use crate::{
    coordinator::{Coordinator, CoordinatorSettings},
    hub::Hub,
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub coordinator: Coordinator,
    pub hub: Hub,
    pub layout: OutputLayout,
}

impl AppState {
    /// Build the hub and start the coordinator task.
    pub fn create(config: &ScanwatchConfig) -> (AppState, JoinHandle<()>) {
        let hub = Hub::new(config.telemetry.hub_capacity);
        let settings = CoordinatorSettings::from_config(config);
        let layout = settings.layout.clone();
        let (coordinator, handle) = Coordinator::create(hub.clone(), settings);
        (
            AppState {
                coordinator,
                hub,
                layout,
            },
            handle,
        )
    }
}
