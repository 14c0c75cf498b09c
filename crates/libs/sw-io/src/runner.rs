//! High-level process runner with event handling.

use std::{path::PathBuf, time::Duration};

use sw_models::output::{OutputLine, OutputStream};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Child,
    sync::{mpsc::Sender, oneshot},
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, info, warn};

use crate::{
    demux::LineSplitter,
    prelude::*,
    process::{capture_exit_status, spawn_process, stop_child},
};

/// Grace period for the output pipes to close once the process has exited.
///
/// Descendants that inherited the pipes can keep them open after the main
/// process is gone.
const STREAM_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Events emitted during process execution.
#[derive(Debug, PartialEq)]
pub enum RunEvent {
    /// New output line from the process.
    Line(OutputLine),
    /// Process ended; `None` when it was killed by a signal. Always the last event.
    End(Option<i32>),
}

/// High-level process runner with event-driven output handling.
#[derive(Debug, Clone)]
pub struct Runner {
    /// Command to execute.
    command: String,
    /// Command line arguments.
    args: Vec<String>,
    /// Working directory of the child.
    cwd: Option<PathBuf>,
}

/// Handle on a running process.
#[derive(Debug)]
pub struct RunHandle {
    pid: Option<u32>,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl Runner {
    /// Create a new runner with command and arguments.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sw_io::runner::Runner;
    ///
    /// let runner = Runner::new("bash", vec!["bounty.sh", "-d", "example.com"]);
    /// assert_eq!(runner.get_full_command(), "bash bounty.sh -d example.com");
    /// ```
    pub fn new(command: impl Into<String>, args: Vec<impl Into<String>>) -> Self {
        Self {
            command: command.into(),
            args: args.into_iter().map(|a| a.into()).collect(),
            cwd: None,
        }
    }

    /// Run the child inside `cwd`.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Get the full command string with arguments.
    pub fn get_full_command(&self) -> String {
        format!("{} {}", &self.command, &self.args.join(" "))
    }

    /// Start the process and return immediately.
    ///
    /// Output lines and the final [`RunEvent::End`] are delivered through `tx`.
    /// Lines keep their order within each stream; `End` is only sent once both
    /// streams are drained.
    pub fn spawn(&self, tx: Sender<RunEvent>) -> Result<RunHandle> {
        let mut child = spawn_process(&self.command, &self.args, self.cwd.as_deref())?;
        let pid = child.id();
        info!("Spawned `{}` with pid {:?}", self.get_full_command(), pid);

        let stdout = child.stdout.take().ok_or(Error::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(Error::MissingPipe("stderr"))?;
        let readers = [
            tokio::spawn(read_stream(OutputStream::Stdout, stdout, tx.clone())),
            tokio::spawn(read_stream(OutputStream::Stderr, stderr, tx.clone())),
        ];

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(supervise(child, stop_rx, readers, tx));

        Ok(RunHandle {
            pid,
            stop: Some(stop_tx),
            task,
        })
    }
}

impl RunHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Ask the process to terminate. Calling it again is a no-op.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }

    /// Wait until the process ended and its `End` event was sent.
    pub async fn join(self) {
        if let Err(err) = self.task.await {
            warn!("Process supervisor task failed: {err}");
        }
    }
}

async fn read_stream<R>(stream: OutputStream, mut reader: R, tx: Sender<RunEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut splitter = LineSplitter::new(stream);
    let mut buffer = [0; 4096];
    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => break, // EOF
            Ok(n) => {
                for line in splitter.push(&buffer[..n]) {
                    if tx.send(RunEvent::Line(line)).await.is_err() {
                        debug!("{stream} receiver dropped, discarding output");
                        return;
                    }
                }
            }
            Err(err) => {
                warn!("Failed to read {stream}: {err}");
                break;
            }
        }
    }
    if let Some(line) = splitter.finish() {
        let _ = tx.send(RunEvent::Line(line)).await;
    }
}

async fn supervise(
    mut child: Child,
    mut stop: oneshot::Receiver<()>,
    readers: [JoinHandle<()>; 2],
    tx: Sender<RunEvent>,
) {
    let status = tokio::select! {
        status = capture_exit_status(&mut child) => status,
        Ok(()) = &mut stop => {
            info!("Stopping process {:?}", child.id());
            if let Err(err) = stop_child(&mut child).await {
                warn!("Failed to kill process: {err}");
            }
            capture_exit_status(&mut child).await
        }
    };

    for mut reader in readers {
        if timeout(STREAM_DRAIN_TIMEOUT, &mut reader).await.is_err() {
            warn!("Output pipe still open after process exit, abandoning it");
            reader.abort();
        }
    }

    let code = match status {
        Ok(status) => status.code(),
        Err(err) => {
            warn!("Failed to get exit status: {err}");
            None
        }
    };
    info!("Process exited with code {:?}", code);
    let _ = tx.send(RunEvent::End(code)).await;
}

#[cfg(test)]
mod tests {
    use sw_models::output::LineClass;
    use tokio::sync::mpsc::{Receiver, channel};

    use super::*;

    async fn collect(mut rx: Receiver<RunEvent>) -> (Vec<OutputLine>, Option<i32>) {
        let mut lines = Vec::new();
        loop {
            let event = timeout(Duration::from_secs(10), rx.recv())
                .await
                .expect("Process didn't finish in time")
                .expect("Channel closed before End");
            match event {
                RunEvent::Line(line) => lines.push(line),
                RunEvent::End(code) => {
                    assert!(rx.recv().await.is_none(), "End must be the last event");
                    return (lines, code);
                }
            }
        }
    }

    #[tokio::test]
    async fn captures_both_streams_and_exit_code() {
        let runner = Runner::new(
            "sh",
            vec![
                "-c",
                "echo '[+] one'; echo 'two' 1>&2; echo; printf 'three'; exit 3",
            ],
        );
        let (tx, rx) = channel(16);
        let handle = runner.spawn(tx).unwrap();
        assert!(handle.pid().is_some());

        let (lines, code) = collect(rx).await;
        assert_eq!(code, Some(3));

        let stdout: Vec<_> = lines
            .iter()
            .filter(|l| l.stream == OutputStream::Stdout)
            .map(|l| l.text.as_str())
            .collect();
        let stderr: Vec<_> = lines
            .iter()
            .filter(|l| l.stream == OutputStream::Stderr)
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(stdout, vec!["[+] one", "three"]);
        assert_eq!(stderr, vec!["two"]);
        assert_eq!(lines[0].class, LineClass::Success);
    }

    #[tokio::test]
    async fn runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here\n").unwrap();

        let runner = Runner::new("cat", vec!["marker.txt"]).with_cwd(dir.path());
        let (tx, rx) = channel(16);
        let _handle = runner.spawn(tx).unwrap();

        let (lines, code) = collect(rx).await;
        assert_eq!(code, Some(0));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "here");
    }

    #[tokio::test]
    async fn stop_kills_the_process() {
        let runner = Runner::new("sleep", vec!["30"]);
        let (tx, rx) = channel(16);
        let mut handle = runner.spawn(tx).unwrap();

        handle.stop();
        handle.stop();

        let (lines, code) = collect(rx).await;
        assert!(lines.is_empty());
        assert_eq!(code, None);
        timeout(Duration::from_secs(5), handle.join())
            .await
            .expect("Supervisor didn't finish");
    }
}
