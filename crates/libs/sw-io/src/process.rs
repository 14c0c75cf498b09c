//! Low-level async process management utilities.

use std::{
    ffi::OsStr,
    io,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
};

use tokio::process::{Child, Command};

use crate::prelude::*;

/// Resolve the scanner entry point inside the toolkit root.
///
/// Launching must fail up front, before any process exists, when the entry
/// point is not on disk.
///
/// # Examples
///
/// ```rust
/// use std::path::Path;
/// use sw_io::process::locate_entry_point;
///
/// assert!(locate_entry_point(Path::new("/nonexistent"), Path::new("bounty.sh")).is_err());
/// ```
pub fn locate_entry_point(root: &Path, entry_point: &Path) -> Result<PathBuf> {
    let path = root.join(entry_point);
    if path.is_file() {
        Ok(path)
    } else {
        Err(Error::EntryPointMissing(path))
    }
}

/// Spawn a new async process with piped stdout and stderr.
///
/// Stdin is closed so the scanner can never block waiting for input, and the
/// child is killed if its handle is dropped.
///
/// # Examples
///
/// ```rust
/// use sw_io::process::spawn_process;
///
/// #[tokio::main]
/// async fn main() {
///     let mut child = spawn_process("echo", &[String::from("Hello")], None).unwrap();
///     let output = child.stdout.take().unwrap();
/// }
/// ```
pub fn spawn_process(cmd: &str, args: &[String], cwd: Option<&Path>) -> Result<Child> {
    let mut command = Command::new(OsStr::new(cmd));
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }
    command.spawn().map_err(Error::SpawnProcessFail)
}

/// Asynchronously terminate a child process.
///
/// Sends a kill signal and reaps the process.
pub async fn stop_child(child: &mut Child) -> io::Result<()> {
    child.kill().await
}

/// Asynchronously capture the exit status of a child process.
pub async fn capture_exit_status(child: &mut Child) -> io::Result<ExitStatus> {
    child.wait().await
}
