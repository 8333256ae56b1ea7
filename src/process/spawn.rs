//! Process spawning and lifecycle management.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::process::{Child, Command};

use super::io::{async_output, merged_pipe, InputStream, OutputStream};
use super::MIN_EXIFTOOL_VERSION;
use crate::config::SessionConfig;
use crate::{Error, Result};

/// Version check state. We only check once per process.
static VERSION_CHECKED: AtomicBool = AtomicBool::new(false);

/// A running exiftool process in `-stay_open` mode.
///
/// Stdout and stderr are merged into one stream, see
/// [`take_output`](Self::take_output).
///
/// # Cancellation
///
/// Dropping an `ExifToolProcess` will kill the subprocess if it's still running.
pub struct ExifToolProcess {
    child: Child,
    stdin: Option<InputStream>,
    output: Option<OutputStream>,
}

impl ExifToolProcess {
    /// Spawn exiftool, optionally loading a generated config file.
    pub async fn spawn(config: &SessionConfig, config_file: Option<&Path>) -> Result<Self> {
        check_version_once(config).await;

        let (reader, writer) = merged_pipe().map_err(Error::ProcessSpawn)?;
        let writer_err = writer.try_clone().map_err(Error::ProcessSpawn)?;

        let mut cmd = Command::new(config.binary_path());
        cmd.args(build_args(config, config_file));
        cmd.stdin(Stdio::piped());
        cmd.stdout(writer);
        cmd.stderr(writer_err);
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| spawn_error(config, e))?;
        // Release our copies of the pipe's write end so the output stream
        // reaches EOF when the child exits.
        drop(cmd);

        let stdin = child.stdin.take().expect("stdin was configured");
        let output = async_output(reader).map_err(Error::ProcessSpawn)?;

        tracing::debug!(
            pid = ?child.id(),
            binary = %config.binary_path().display(),
            "spawned exiftool"
        );

        Ok(Self {
            child,
            stdin: Some(Box::new(stdin)),
            output: Some(output),
        })
    }

    /// Take the stdin writer. Can only be taken once.
    pub fn take_stdin(&mut self) -> Option<InputStream> {
        self.stdin.take()
    }

    /// Take the merged stdout/stderr reader. Can only be taken once.
    pub fn take_output(&mut self) -> Option<OutputStream> {
        self.output.take()
    }

    /// Get the process ID of the running exiftool.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for the process to exit and return its exit status.
    pub async fn wait(&mut self) -> Result<std::process::ExitStatus> {
        self.child.wait().await.map_err(Error::io)
    }

    /// Kill the process and wait for it.
    pub async fn kill(&mut self) -> Result<()> {
        self.child.kill().await.map_err(Error::io)
    }

    /// Try to kill the process without waiting.
    pub fn start_kill(&mut self) -> Result<()> {
        self.child.start_kill().map_err(Error::io)
    }
}

impl Drop for ExifToolProcess {
    fn drop(&mut self) {
        // Try to kill the process if it's still running
        let _ = self.start_kill();
    }
}

fn spawn_error(config: &SessionConfig, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::BinaryNotFound {
            searched: config.binary_path().display().to_string(),
        }
    } else {
        Error::ProcessSpawn(e)
    }
}

/// Build startup arguments. Per-file arguments arrive later on stdin.
fn build_args(config: &SessionConfig, config_file: Option<&Path>) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();

    // exiftool only honours -config as the very first argument
    if let Some(path) = config_file {
        args.push("-config".into());
        args.push(path.as_os_str().to_owned());
    }

    for arg in ["-stay_open", "True", "-@", "-", "-common_args"] {
        args.push(arg.into());
    }

    if config.overwrite_original {
        args.push("-overwrite_original".into());
    }

    args.extend(config.common_args.iter().map(OsString::from));

    args
}

/// Check exiftool version once per process.
async fn check_version_once(config: &SessionConfig) {
    if VERSION_CHECKED.swap(true, Ordering::SeqCst) {
        return;
    }

    if let Err(e) = check_exiftool_version(config).await {
        tracing::debug!("exiftool version check failed: {}", e);
    }
}

/// Check the exiftool version and warn if below minimum.
async fn check_exiftool_version(config: &SessionConfig) -> Result<()> {
    let output = Command::new(config.binary_path())
        .arg("-ver")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| spawn_error(config, e))?;

    if !output.status.success() {
        tracing::debug!("exiftool -ver returned non-zero exit code");
        return Ok(());
    }

    let version_str = String::from_utf8_lossy(&output.stdout);
    match parse_version(&version_str) {
        Some(version) if version_below_min(version) => {
            tracing::warn!(
                "exiftool version {} is below minimum supported version {}. \
                 Custom tag writes may not work correctly.",
                version_str.trim(),
                MIN_EXIFTOOL_VERSION
            );
        }
        Some(_) => tracing::debug!("exiftool version: {}", version_str.trim()),
        None => tracing::debug!("Could not parse exiftool version from: {}", version_str.trim()),
    }

    Ok(())
}

/// Parse an exiftool version like "12.76" into (major, minor).
fn parse_version(s: &str) -> Option<(u32, u32)> {
    let word = s.split_whitespace().next()?;
    let (major, minor) = word.split_once('.')?;
    let minor: String = minor.chars().take_while(|c| c.is_ascii_digit()).collect();
    Some((major.parse().ok()?, minor.parse().ok()?))
}

/// Check if a version is below the minimum supported.
fn version_below_min(version: (u32, u32)) -> bool {
    let min = parse_version(MIN_EXIFTOOL_VERSION).unwrap_or((12, 15));
    version < min
}
