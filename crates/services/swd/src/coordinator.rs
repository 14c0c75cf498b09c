//! Job lifecycle coordinator.
//!
//! One background task owns every active job. Launch requests, process output,
//! correlation results and event-log records all reach it as
//! [`CoordinatorEvent`]s on a single channel, which gives each job a single
//! ordering point in front of the [`Hub`]:
//!
//! `launched` → `log`* → `started` → (`log` | `phase_event`)* → `done`
//!
//! A job's helpers (output relay, correlator, tail reader) are independent
//! tasks that only ever talk back through that channel, so job state has a
//! single writer.

use std::{collections::HashMap, path::PathBuf, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sw_config::ScanwatchConfig;
use sw_fs::{
    correlator::{CorrelationOutcome, FolderCorrelator},
    layout::OutputLayout,
    tail::{self, TailOutcome, TailSettings},
};
use sw_io::{
    process::locate_entry_point,
    runner::{RunEvent, RunHandle, Runner},
};
use sw_models::{
    job::{JobRequest, LaunchAck, ScanMode, ScanTarget},
    live::LiveEvent,
    output::OutputLine,
    phase::{PhaseEvent, PhaseRecord},
};
use tokio::{
    sync::{
        mpsc::{Receiver, Sender, channel},
        oneshot,
    },
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::{hub::Hub, prelude::*};

/// Events handled by the coordinator task.
#[derive(Debug)]
pub enum CoordinatorEvent {
    Launch {
        target: ScanTarget,
        reply: oneshot::Sender<Result<LaunchAck>>,
    },
    Output {
        launch_id: Uuid,
        line: OutputLine,
    },
    Phase {
        launch_id: Uuid,
        record: PhaseRecord,
    },
    Correlated {
        launch_id: Uuid,
        job_id: String,
    },
    /// Structured telemetry won't be available for this launch.
    Degraded {
        launch_id: Uuid,
        reason: String,
    },
    Exited {
        launch_id: Uuid,
        exit_code: Option<i32>,
    },
    /// The event log was drained after the process exited.
    Finalized {
        launch_id: Uuid,
        exit_code: Option<i32>,
    },
    ActiveJobs {
        reply: oneshot::Sender<Vec<JobContext>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Identity of one launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobContext {
    pub launch_id: Uuid,
    pub domain: String,
    pub mode: ScanMode,
    /// Output folder name, set once correlated and never changed afterwards.
    pub job_id: Option<String>,
    pub launched_at: DateTime<Utc>,
    pub pid: Option<u32>,
}

/// Everything the coordinator needs to start and follow a scan.
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub toolkit_root: PathBuf,
    pub entry_point: PathBuf,
    pub interpreter: String,
    pub layout: OutputLayout,
    pub poll_interval: Duration,
    pub correlation_timeout: Option<Duration>,
    pub max_wait_attempts: Option<u32>,
    pub drain_timeout: Duration,
}

impl CoordinatorSettings {
    pub fn from_config(config: &ScanwatchConfig) -> Self {
        let telemetry = &config.telemetry;
        Self {
            toolkit_root: config.toolkit.root.clone(),
            entry_point: config.toolkit.entry_point.clone(),
            interpreter: config.toolkit.interpreter.clone(),
            layout: OutputLayout::new(
                config.output_root(),
                &telemetry.events_log,
                &telemetry.report_file,
            ),
            poll_interval: telemetry.poll_interval(),
            correlation_timeout: telemetry.correlation_timeout(),
            max_wait_attempts: telemetry.max_wait_attempts(),
            drain_timeout: telemetry.drain_timeout(),
        }
    }

    fn tail_settings(&self) -> TailSettings {
        TailSettings {
            poll_interval: self.poll_interval,
            max_wait_attempts: self.max_wait_attempts,
        }
    }
}

/// Handle used by the API to talk to the coordinator task.
#[derive(Debug, Clone)]
pub struct Coordinator {
    tx: Sender<CoordinatorEvent>,
}

impl Coordinator {
    /// Start the coordinator task.
    pub fn create(hub: Hub, settings: CoordinatorSettings) -> (Coordinator, JoinHandle<()>) {
        CoordinatorPrivate::create(hub, settings)
    }

    /// Validate `request` and start the scanner.
    ///
    /// Returns as soon as the process is running; the job id is only known
    /// later and is announced on the live channel.
    pub async fn launch(&self, request: JobRequest) -> Result<LaunchAck> {
        let target = request.validate()?;
        let (reply, rx) = oneshot::channel();
        self.tx.send(CoordinatorEvent::Launch { target, reply }).await?;
        rx.await?
    }

    pub async fn active_jobs(&self) -> Result<Vec<JobContext>> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(CoordinatorEvent::ActiveJobs { reply }).await?;
        Ok(rx.await?)
    }

    /// Ask every running scanner to terminate.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(CoordinatorEvent::Shutdown { reply }).await?;
        Ok(rx.await?)
    }
}

#[derive(Debug)]
struct TailTask {
    stop: Option<oneshot::Sender<()>>,
    follow: JoinHandle<()>,
    relay: JoinHandle<()>,
}

impl TailTask {
    fn start(
        launch_id: Uuid,
        path: PathBuf,
        settings: TailSettings,
        tx: Sender<CoordinatorEvent>,
    ) -> Self {
        let (stop_tx, stop_rx) = oneshot::channel();
        let (record_tx, mut record_rx) = channel(64);

        let follow_tx = tx.clone();
        let follow = tokio::spawn(async move {
            let reason = match tail::follow(path.clone(), settings, record_tx, stop_rx).await {
                Ok(TailOutcome::Finished) => return,
                Ok(TailOutcome::LogNeverAppeared) => {
                    format!("event log {} never appeared", path.display())
                }
                Err(err) => {
                    error!("Tailing {} failed: {err}", path.display());
                    format!("event log {} unreadable", path.display())
                }
            };
            if let Err(err) = follow_tx
                .send(CoordinatorEvent::Degraded { launch_id, reason })
                .await
            {
                error!("Failed to send Degraded event for {launch_id} - {err}");
            }
        });

        let relay = tokio::spawn(async move {
            while let Some(record) = record_rx.recv().await {
                if tx
                    .send(CoordinatorEvent::Phase { launch_id, record })
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });

        Self {
            stop: Some(stop_tx),
            follow,
            relay,
        }
    }

    /// Stop following and wait for the last records to be relayed.
    async fn drain(mut self, limit: Duration) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let drained = timeout(limit, async {
            let _ = (&mut self.follow).await;
            let _ = (&mut self.relay).await;
        })
        .await;
        if drained.is_err() {
            warn!("Event log drain did not finish within {:?}", limit);
            self.follow.abort();
            self.relay.abort();
        }
    }
}

#[derive(Debug)]
struct RunningJob {
    context: JobContext,
    process: RunHandle,
    /// Still looking for the output folder.
    correlating: bool,
    output_relay: JoinHandle<()>,
    correlator: Option<JoinHandle<()>>,
    tail: Option<TailTask>,
    finalizer: Option<JoinHandle<()>>,
}

impl RunningJob {
    fn stop_correlator(&mut self) {
        self.correlating = false;
        if let Some(correlator) = self.correlator.take() {
            correlator.abort();
        }
    }
}

impl Drop for RunningJob {
    fn drop(&mut self) {
        self.output_relay.abort();
        self.stop_correlator();
        if let Some(tail) = self.tail.take() {
            tail.follow.abort();
            tail.relay.abort();
        }
        if let Some(finalizer) = self.finalizer.take() {
            finalizer.abort();
        }
    }
}

struct CoordinatorPrivate {
    coordinator: Coordinator,
    hub: Hub,
    settings: CoordinatorSettings,
    jobs: HashMap<Uuid, RunningJob>,
}

impl CoordinatorPrivate {
    fn create(hub: Hub, settings: CoordinatorSettings) -> (Coordinator, JoinHandle<()>) {
        let (tx, rx) = channel(256);
        let coordinator = Coordinator { tx };
        let private = Self {
            coordinator: coordinator.clone(),
            hub,
            settings,
            jobs: HashMap::new(),
        };
        let handle = private.start_thread(rx);
        (coordinator, handle)
    }

    fn start_thread(mut self, mut rx: Receiver<CoordinatorEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                trace!("New coordinator event {:?}", event);
                match event {
                    CoordinatorEvent::Launch { target, reply } => {
                        let result = self.handle_launch(target).await;
                        if let Err(err) = &result {
                            warn!("Launch rejected: {err}");
                        }
                        if reply.send(result).is_err() {
                            warn!("Launch requester went away before the reply");
                        }
                    }
                    CoordinatorEvent::Output { launch_id, line } => {
                        self.handle_output(launch_id, line)
                    }
                    CoordinatorEvent::Phase { launch_id, record } => {
                        self.handle_phase(launch_id, record)
                    }
                    CoordinatorEvent::Correlated { launch_id, job_id } => {
                        self.handle_correlated(launch_id, job_id)
                    }
                    CoordinatorEvent::Degraded { launch_id, reason } => {
                        self.handle_degraded(launch_id, reason)
                    }
                    CoordinatorEvent::Exited {
                        launch_id,
                        exit_code,
                    } => self.handle_exited(launch_id, exit_code),
                    CoordinatorEvent::Finalized {
                        launch_id,
                        exit_code,
                    } => self.finalize(launch_id, exit_code),
                    CoordinatorEvent::ActiveJobs { reply } => {
                        let mut jobs: Vec<JobContext> =
                            self.jobs.values().map(|job| job.context.clone()).collect();
                        jobs.sort_by_key(|job| job.launched_at);
                        let _ = reply.send(jobs);
                    }
                    CoordinatorEvent::Shutdown { reply } => {
                        info!("Stopping {} running scans", self.jobs.len());
                        for job in self.jobs.values_mut() {
                            job.process.stop();
                        }
                        let _ = reply.send(());
                    }
                }
            }
        })
    }

    async fn handle_launch(&mut self, target: ScanTarget) -> Result<LaunchAck> {
        if let Some(busy) = self
            .jobs
            .values()
            .find(|job| job.correlating && domains_overlap(&job.context.domain, &target.domain))
        {
            return Err(Error::DomainBusy(busy.context.domain.clone()));
        }

        let (entry_point, correlator) = prepare_launch(&self.settings, &target.domain).await?;

        let runner = Runner::new(
            self.settings.interpreter.clone(),
            vec![
                entry_point.to_string_lossy().into_owned(),
                String::from("-d"),
                target.domain.clone(),
                String::from("-m"),
                target.mode.to_string(),
            ],
        )
        .with_cwd(&self.settings.toolkit_root);

        let (run_tx, run_rx) = channel(256);
        let process = runner.spawn(run_tx)?;

        let launch_id = Uuid::new_v4();
        let context = JobContext {
            launch_id,
            domain: target.domain.clone(),
            mode: target.mode,
            job_id: None,
            launched_at: Utc::now(),
            pid: process.pid(),
        };
        info!("Launched {} as {launch_id}", target);
        self.hub.publish(LiveEvent::Launched {
            domain: target.domain.clone(),
            mode: target.mode,
        });

        let tx = self.coordinator.tx.clone();
        let output_relay = tokio::spawn(relay_output(launch_id, run_rx, tx.clone()));
        let correlator = tokio::spawn(correlate(
            launch_id,
            correlator,
            self.settings.poll_interval,
            self.settings.correlation_timeout,
            tx,
        ));

        self.jobs.insert(
            launch_id,
            RunningJob {
                context,
                process,
                correlating: true,
                output_relay,
                correlator: Some(correlator),
                tail: None,
                finalizer: None,
            },
        );

        Ok(LaunchAck::from(&target))
    }

    fn handle_output(&self, launch_id: Uuid, mut line: OutputLine) {
        let Some(job) = self.jobs.get(&launch_id) else {
            debug!("Dropping output of finished launch {launch_id}");
            return;
        };
        line.job_id = job.context.job_id.clone();
        self.hub.publish(LiveEvent::Log(line));
    }

    fn handle_phase(&self, launch_id: Uuid, record: PhaseRecord) {
        let Some(job_id) = self
            .jobs
            .get(&launch_id)
            .and_then(|job| job.context.job_id.clone())
        else {
            debug!("Dropping phase record of unknown launch {launch_id}");
            return;
        };
        self.hub
            .publish(LiveEvent::PhaseEvent(PhaseEvent { job_id, record }));
    }

    fn handle_correlated(&mut self, launch_id: Uuid, job_id: String) {
        let Some(job) = self.jobs.get_mut(&launch_id) else {
            debug!("Launch {launch_id} finished before {job_id} was correlated");
            return;
        };
        if let Some(existing) = &job.context.job_id {
            warn!("Launch {launch_id} already correlated to {existing}, ignoring {job_id}");
            return;
        }

        job.correlating = false;
        job.correlator = None;
        job.context.job_id = Some(job_id.clone());
        self.hub.publish(LiveEvent::Started {
            job_id: job_id.clone(),
            domain: job.context.domain.clone(),
            mode: job.context.mode,
        });

        match self.settings.layout.events_path(&job_id) {
            Some(path) => {
                job.tail = Some(TailTask::start(
                    launch_id,
                    path,
                    self.settings.tail_settings(),
                    self.coordinator.tx.clone(),
                ));
            }
            None => warn!("Job folder {job_id} can't hold an event log"),
        }
    }

    fn handle_degraded(&mut self, launch_id: Uuid, reason: String) {
        let Some(job) = self.jobs.get_mut(&launch_id) else {
            return;
        };
        if job.context.job_id.is_none() {
            job.stop_correlator();
        }
        warn!("Launch {launch_id} degraded: {reason}");
        self.hub.publish(LiveEvent::Degraded {
            job_id: job.context.job_id.clone(),
            domain: job.context.domain.clone(),
            reason,
        });
    }

    fn handle_exited(&mut self, launch_id: Uuid, exit_code: Option<i32>) {
        let Some(job) = self.jobs.get_mut(&launch_id) else {
            warn!("Exit of unknown launch {launch_id}");
            return;
        };
        info!(
            "Scanner for {} exited with {:?}",
            job.context.domain, exit_code
        );
        job.stop_correlator();

        match job.tail.take() {
            Some(tail) => {
                let tx = self.coordinator.tx.clone();
                let limit = self.settings.drain_timeout;
                job.finalizer = Some(tokio::spawn(async move {
                    tail.drain(limit).await;
                    if let Err(err) = tx
                        .send(CoordinatorEvent::Finalized {
                            launch_id,
                            exit_code,
                        })
                        .await
                    {
                        error!("Failed to send Finalized event for {launch_id} - {err}");
                    }
                }));
            }
            None => self.finalize(launch_id, exit_code),
        }
    }

    /// Publish the terminal event and forget the job.
    fn finalize(&mut self, launch_id: Uuid, exit_code: Option<i32>) {
        let Some(job) = self.jobs.remove(&launch_id) else {
            return;
        };
        self.hub.publish(LiveEvent::Done {
            job_id: job.context.job_id.clone(),
            exit_code,
        });
        self.hub.publish(LiveEvent::JobsUpdated);
        debug!("Launch {launch_id} torn down, {} still active", self.jobs.len());
    }
}

/// Two launches can't be told apart by folder prefix when one domain is a
/// prefix of the other.
fn domains_overlap(a: &str, b: &str) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

async fn relay_output(launch_id: Uuid, mut rx: Receiver<RunEvent>, tx: Sender<CoordinatorEvent>) {
    while let Some(event) = rx.recv().await {
        let event = match event {
            RunEvent::Line(line) => CoordinatorEvent::Output { launch_id, line },
            RunEvent::End(exit_code) => CoordinatorEvent::Exited {
                launch_id,
                exit_code,
            },
        };
        if tx.send(event).await.is_err() {
            break;
        }
    }
}

async fn correlate(
    launch_id: Uuid,
    correlator: FolderCorrelator,
    poll_interval: Duration,
    limit: Option<Duration>,
    tx: Sender<CoordinatorEvent>,
) {
    let event = match correlator.watch(poll_interval, limit).await {
        Ok(CorrelationOutcome::Correlated(job_id)) => {
            CoordinatorEvent::Correlated { launch_id, job_id }
        }
        Ok(CorrelationOutcome::TimedOut) => CoordinatorEvent::Degraded {
            launch_id,
            reason: format!("no output folder appeared within {:?}", limit.unwrap_or_default()),
        },
        Err(err) => CoordinatorEvent::Degraded {
            launch_id,
            reason: format!("output folder correlation failed: {err}"),
        },
    };
    if let Err(err) = tx.send(event).await {
        error!("Failed to send correlation result for {launch_id} - {err}");
    }
}

/// Resolve the entry point and snapshot the output root off the actor task.
/// Both must succeed before the scanner is spawned.
async fn prepare_launch(
    settings: &CoordinatorSettings,
    domain: &str,
) -> Result<(PathBuf, FolderCorrelator)> {
    let root = settings.toolkit_root.clone();
    let entry_point = settings.entry_point.clone();
    let mut correlator = FolderCorrelator::new(settings.layout.clone(), domain);
    tokio::task::spawn_blocking(move || -> Result<(PathBuf, FolderCorrelator)> {
        let entry_point = std::path::absolute(locate_entry_point(&root, &entry_point)?)?;
        correlator.arm()?;
        Ok((entry_point, correlator))
    })
    .await?
}
