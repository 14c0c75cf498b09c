//! Incremental event-log tailing.
//!
//! Only bytes appended since the last read are parsed, so every record is
//! delivered once. A line without its terminating newline stays buffered until
//! the rest of it arrives.

use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
    time::Duration,
};

use notify::RecursiveMode;
use sw_models::phase::PhaseRecord;
use tokio::{
    sync::{mpsc, oneshot},
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    prelude::*,
    watch::{ChangeTrigger, change_trigger, is_change},
};

/// Read cursor over a growing JSON-lines file.
#[derive(Debug)]
pub struct EventTail {
    path: PathBuf,
    offset: u64,
    pending: Vec<u8>,
}

impl EventTail {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
            pending: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes consumed so far. Never decreases.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Parse the complete lines appended since the previous call.
    ///
    /// A missing or shrunk file reads as nothing new.
    pub fn read_appended(&mut self) -> io::Result<Vec<PhaseRecord>> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        let len = file.metadata()?.len();
        if len <= self.offset {
            if len < self.offset {
                debug!(
                    "{} shrank from {} to {} bytes, ignoring",
                    self.path.display(),
                    self.offset,
                    len
                );
            }
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(self.offset))?;
        let read = file.take(len - self.offset).read_to_end(&mut self.pending)?;
        self.offset += read as u64;

        let Some(last_newline) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return Ok(Vec::new());
        };
        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        Ok(complete
            .split(|b| *b == b'\n')
            .filter_map(|line| self.parse(line))
            .collect())
    }

    /// Flush a trailing line that never got its newline.
    pub fn finish(&mut self) -> Option<PhaseRecord> {
        let line = std::mem::take(&mut self.pending);
        self.parse(&line)
    }

    fn parse(&self, line: &[u8]) -> Option<PhaseRecord> {
        let line = String::from_utf8_lossy(line);
        if line.trim().is_empty() {
            return None;
        }
        match PhaseRecord::from_line(&line) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!("Dropping malformed event line in {}: {err}", self.path.display());
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailSettings {
    pub poll_interval: Duration,
    /// How many poll intervals to wait for the log to appear. `None` waits
    /// until stopped.
    pub max_wait_attempts: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailOutcome {
    Finished,
    LogNeverAppeared,
}

/// Follow the event log at `path`, forwarding records to `tx` until `stop`
/// fires or the receiver goes away.
///
/// Stopping always performs a last read so records written right before the
/// scanner exited are not lost. Reads only cover the appended bytes and run
/// on the caller's task, which must not be the coordinator.
pub async fn follow(
    path: PathBuf,
    settings: TailSettings,
    tx: mpsc::Sender<PhaseRecord>,
    mut stop: oneshot::Receiver<()>,
) -> Result<TailOutcome> {
    let mut tail = EventTail::new(path);

    let mut attempts = 0u32;
    while !tail.path().is_file() {
        if settings.max_wait_attempts.is_some_and(|max| attempts >= max) {
            warn!(
                "Event log {} did not appear after {} attempts",
                tail.path().display(),
                attempts
            );
            return Ok(TailOutcome::LogNeverAppeared);
        }
        attempts += 1;

        tokio::select! {
            _ = &mut stop => {
                drain(&mut tail, &tx).await?;
                return Ok(TailOutcome::Finished);
            }
            _ = time::sleep(settings.poll_interval) => {}
        }
    }

    info!("Tailing {}", tail.path().display());

    let mut trigger = match tail.path().parent() {
        Some(dir) => match change_trigger(dir, RecursiveMode::NonRecursive, is_change) {
            Ok(trigger) => Some(trigger),
            Err(err) => {
                warn!("Can't watch {}, polling only: {err}", dir.display());
                None
            }
        },
        None => None,
    };

    let mut interval = time::interval(settings.poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        for record in tail.read_appended()? {
            if tx.send(record).await.is_err() {
                debug!("Tail receiver for {} closed", tail.path().display());
                return Ok(TailOutcome::Finished);
            }
        }

        tokio::select! {
            _ = &mut stop => {
                drain(&mut tail, &tx).await?;
                return Ok(TailOutcome::Finished);
            }
            changed = next_change(&mut trigger) => {
                if !changed {
                    trigger = None;
                }
            }
            _ = interval.tick() => {}
        }
    }
}

async fn drain(tail: &mut EventTail, tx: &mpsc::Sender<PhaseRecord>) -> Result<()> {
    let mut records = tail.read_appended()?;
    records.extend(tail.finish());
    for record in records {
        if tx.send(record).await.is_err() {
            break;
        }
    }
    debug!("Drained {} at offset {}", tail.path().display(), tail.offset());
    Ok(())
}

async fn next_change(trigger: &mut Option<ChangeTrigger>) -> bool {
    match trigger {
        Some(trigger) => trigger.changed().await,
        None => std::future::pending().await,
    }
}
