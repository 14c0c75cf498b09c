//! Publishes `jobs_updated` when job folders appear or disappear.

use std::{path::Path, time::Duration};

use sw_fs::watch::{RecursiveMode, change_trigger, is_entry_change};
use sw_models::live::LiveEvent;
use tokio::{task::JoinHandle, time::sleep};
use tracing::{debug, warn};

use crate::{hub::Hub, prelude::*};

/// Watch `root` and publish a single `jobs_updated` per burst of changes.
///
/// `settle` is how long a burst may last: changes seen while waiting are
/// folded into the same signal.
pub fn spawn_index_watcher(root: &Path, hub: Hub, settle: Duration) -> Result<JoinHandle<()>> {
    let mut trigger = change_trigger(root, RecursiveMode::NonRecursive, is_entry_change)?;
    let root = root.to_path_buf();
    Ok(tokio::spawn(async move {
        while trigger.changed().await {
            sleep(settle).await;
            trigger.clear();
            debug!("Job folders under {} changed", root.display());
            hub.publish(LiveEvent::JobsUpdated);
        }
        warn!("Watcher on {} stopped", root.display());
    }))
}

#[cfg(test)]
mod tests {
    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn new_folder_publishes_jobs_updated() {
        let dir = tempfile::tempdir().unwrap();
        let hub = Hub::new(8);
        let mut rx = hub.subscribe();
        let _watcher =
            spawn_index_watcher(dir.path(), hub.clone(), Duration::from_millis(50)).unwrap();

        std::fs::create_dir(dir.path().join("acme.com_20240501_120000_fast")).unwrap();

        let event = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        assert_eq!(event, LiveEvent::JobsUpdated);
    }
}
