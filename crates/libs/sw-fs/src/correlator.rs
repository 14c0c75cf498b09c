//! Folder correlation.
//!
//! The scanner picks its own folder name, so a launch only learns its job id
//! by watching the output root for a folder that wasn't there before the
//! process started and whose name begins with the requested domain.

use std::{collections::HashSet, time::Duration};

use notify::RecursiveMode;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{
    index::list_job_folders,
    layout::OutputLayout,
    prelude::*,
    watch::{ChangeTrigger, change_trigger, is_change},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrelatorState {
    Idle,
    Watching,
    Correlated(String),
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrelationOutcome {
    Correlated(String),
    TimedOut,
}

#[derive(Debug)]
pub struct FolderCorrelator {
    layout: OutputLayout,
    domain: String,
    known: HashSet<String>,
    state: CorrelatorState,
}

impl FolderCorrelator {
    pub fn new(layout: OutputLayout, domain: impl Into<String>) -> Self {
        Self {
            layout,
            domain: domain.into(),
            known: HashSet::new(),
            state: CorrelatorState::Idle,
        }
    }

    pub fn state(&self) -> &CorrelatorState {
        &self.state
    }

    /// Snapshot the folders that already exist. Must run before the scanner
    /// is spawned so its folder is guaranteed to be new.
    pub fn arm(&mut self) -> Result<()> {
        self.known = list_job_folders(&self.layout)?.into_iter().collect();
        self.state = CorrelatorState::Watching;
        debug!(
            "Correlator for {} armed with {} existing folders",
            self.domain,
            self.known.len()
        );
        Ok(())
    }

    /// Feed the current folder names. Returns the job id the first time a new
    /// folder matching the domain shows up.
    pub fn observe<I>(&mut self, folders: I) -> Option<String>
    where
        I: IntoIterator<Item = String>,
    {
        if self.state != CorrelatorState::Watching {
            return None;
        }

        let matched = folders
            .into_iter()
            .filter(|name| !self.known.contains(name) && name.starts_with(&self.domain))
            .min()?;

        info!("Correlated {} to folder {}", self.domain, matched);
        self.state = CorrelatorState::Correlated(matched.clone());
        Some(matched)
    }

    /// List the output root and observe it.
    pub fn rescan(&mut self) -> Result<Option<String>> {
        let folders = list_job_folders(&self.layout)?;
        Ok(self.observe(folders))
    }

    /// Stop watching. A correlated id is kept.
    pub fn close(&mut self) {
        if self.state != CorrelatorState::Closed {
            debug!("Correlator for {} closed", self.domain);
        }
        self.state = CorrelatorState::Closed;
    }

    /// Wait until the job folder appears or `timeout` elapses.
    ///
    /// Filesystem notifications wake the correlator up early; the poll
    /// interval is the fallback when the platform watcher misses something.
    /// A `None` timeout waits forever. Each rescan is a single directory
    /// listing on the task driving this future.
    pub async fn watch(
        mut self,
        poll_interval: Duration,
        timeout: Option<Duration>,
    ) -> Result<CorrelationOutcome> {
        if self.state == CorrelatorState::Idle {
            self.arm()?;
        }

        let mut trigger = match change_trigger(&self.layout.root, RecursiveMode::NonRecursive, is_change) {
            Ok(trigger) => Some(trigger),
            Err(err) => {
                warn!(
                    "Can't watch {}, falling back to polling: {err}",
                    self.layout.root.display()
                );
                None
            }
        };

        let mut interval = time::interval(poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            match self.rescan() {
                Ok(Some(job_id)) => {
                    self.close();
                    return Ok(CorrelationOutcome::Correlated(job_id));
                }
                Ok(None) => {}
                Err(err) => warn!("Failed to scan {}: {err}", self.layout.root.display()),
            }

            tokio::select! {
                changed = next_change(&mut trigger) => {
                    if !changed {
                        warn!("Watcher on {} stopped, polling only", self.layout.root.display());
                        trigger = None;
                    }
                }
                _ = interval.tick() => {}
                _ = sleep_until(deadline) => {
                    warn!("No folder for {} after {:?}", self.domain, timeout);
                    self.close();
                    return Ok(CorrelationOutcome::TimedOut);
                }
            }
        }
    }
}

async fn next_change(trigger: &mut Option<ChangeTrigger>) -> bool {
    match trigger {
        Some(trigger) => trigger.changed().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
