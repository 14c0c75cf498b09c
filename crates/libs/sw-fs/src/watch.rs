//! Filesystem change notifications as coalesced wake-ups.
//!
//! Consumers never look at individual `notify` events: they rescan whatever
//! they are interested in whenever the trigger fires. A capacity-1 channel is
//! enough for that, extra events while a wake-up is pending are dropped.

use std::path::Path;

use notify::{Config, Event, EventKind, RecommendedWatcher, Watcher, event::ModifyKind};
pub use notify::RecursiveMode;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::prelude::*;

/// Keeps the watcher alive alongside the wake-up channel.
pub struct ChangeTrigger {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<()>,
}

impl ChangeTrigger {
    /// Wait for the next change. Returns `false` if the watcher is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }

    /// Discard a wake-up that is already pending.
    pub fn clear(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }
}

/// Anything but plain access is a change.
pub fn is_change(event: &Event) -> bool {
    !matches!(event.kind, EventKind::Access(_))
}

/// Entries created, removed or renamed.
pub fn is_entry_change(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))
    )
}

/// Watch `path` and wake up whenever `filter` accepts an event.
///
/// Watcher errors are logged and turned into a wake-up so consumers rescan.
pub fn change_trigger<F>(path: &Path, mode: RecursiveMode, filter: F) -> Result<ChangeTrigger>
where
    F: Fn(&Event) -> bool + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    let watched = path.to_path_buf();
    let mut watcher = RecommendedWatcher::new(
        move |res: std::result::Result<Event, notify::Error>| {
            let wake = match res {
                Ok(event) => filter(&event),
                Err(err) => {
                    warn!("Watcher error on {}: {err}", watched.display());
                    true
                }
            };
            if wake {
                if let Err(mpsc::error::TrySendError::Closed(_)) = tx.try_send(()) {
                    debug!("Change trigger for {} dropped", watched.display());
                }
            }
        },
        Config::default(),
    )?;
    watcher.watch(path, mode)?;
    Ok(ChangeTrigger {
        _watcher: watcher,
        rx,
    })
}
