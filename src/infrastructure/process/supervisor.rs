//! Mock Listener Process Supervisor
//!
//! Owns the lifecycle of one background mock process per attempt: spawn,
//! readiness wait, liveness check, and a SIGTERM-then-SIGKILL teardown that
//! runs on every exit path.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::{sleep, sleep_until, timeout, Instant};
use tracing::{debug, error, info, warn};

use super::capture::OutputCapture;
use crate::domain::errors::QaError;
use crate::domain::models::{ProcessConfig, ReadinessProbe};

/// How long to wait for pipes to close once the process is gone.
const PIPE_DRAIN: Duration = Duration::from_secs(1);

/// Poll interval of the port readiness probe.
const PROBE_INTERVAL: Duration = Duration::from_millis(50);

/// Kernel socket tables listing bound UDP ports.
const UDP_TABLES: [&str; 2] = ["/proc/net/udp", "/proc/net/udp6"];

/// Output and exit status collected from a supervised process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessLogs {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
}

/// The mock could not be brought up: spawn failed or it exited during the
/// grace period.
#[derive(Debug, Clone)]
pub struct StartFailure {
    pub message: String,
    pub logs: ProcessLogs,
}

impl fmt::Display for StartFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(code) = self.logs.exit_code {
            write!(f, " (exit code {code})")?;
        }
        let stderr = self.logs.stderr.trim();
        if !stderr.is_empty() {
            write!(f, "; stderr: {stderr}")?;
        }
        Ok(())
    }
}

impl From<StartFailure> for QaError {
    fn from(failure: StartFailure) -> Self {
        Self::ProcessStartFailure(failure.to_string())
    }
}

/// Launches mock artifacts as supervised background processes.
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    config: ProcessConfig,
}

impl ProcessSupervisor {
    pub const fn new(config: ProcessConfig) -> Self {
        Self { config }
    }

    /// Start `artifact` in `working_dir` and wait until it is observed alive.
    ///
    /// With `ReadinessProbe::Port` and a `port`, readiness is the UDP port
    /// becoming bound (bounded by the grace period); otherwise the full grace
    /// period is slept. Liveness is then checked once.
    pub async fn start(
        &self,
        artifact: &Path,
        working_dir: &Path,
        port: Option<u16>,
    ) -> Result<SupervisedProcess, StartFailure> {
        let label = artifact
            .file_name()
            .map_or_else(|| artifact.display().to_string(), |n| n.to_string_lossy().into_owned());
        let artifact = std::path::absolute(artifact).map_err(|e| StartFailure {
            message: format!("cannot resolve {}: {e}", artifact.display()),
            logs: ProcessLogs::default(),
        })?;

        info!(artifact = %artifact.display(), cwd = %working_dir.display(), "starting mock process");

        let mut child = Command::new(&self.config.interpreter)
            .args(&self.config.interpreter_args)
            .arg(&artifact)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| StartFailure {
                message: format!("failed to spawn {} {}: {e}", self.config.interpreter, label),
                logs: ProcessLogs::default(),
            })?;

        let max = self.config.max_output_bytes;
        let stdout = child.stdout.take().map(|s| OutputCapture::spawn(s, max));
        let stderr = child.stderr.take().map(|s| OutputCapture::spawn(s, max));

        let mut process = SupervisedProcess {
            label,
            pid: child.id(),
            child: Some(child),
            stdout,
            stderr,
            stop_timeout: Duration::from_millis(self.config.stop_timeout_ms),
            logs: None,
        };

        self.await_ready(&mut process, port).await;

        match process.exit_status() {
            Ok(None) => {
                info!(pid = ?process.pid, mock = %process.label, "mock process is running");
                Ok(process)
            }
            Ok(Some(code)) => {
                warn!(mock = %process.label, exit_code = ?code, "mock process exited during startup");
                let logs = process.stop().await;
                Err(StartFailure {
                    message: format!("{} exited during startup", process.label),
                    logs,
                })
            }
            Err(e) => {
                let logs = process.stop().await;
                Err(StartFailure {
                    message: format!("cannot poll {}: {e}", process.label),
                    logs,
                })
            }
        }
    }

    async fn await_ready(&self, process: &mut SupervisedProcess, port: Option<u16>) {
        let grace = Duration::from_millis(self.config.grace_period_ms);

        let port = match (self.config.readiness, port) {
            (ReadinessProbe::Port, Some(port)) => port,
            _ => {
                sleep(grace).await;
                return;
            }
        };

        let deadline = Instant::now() + grace;
        loop {
            if !matches!(process.exit_status(), Ok(None)) {
                return;
            }
            match udp_port_bound(port).await {
                Some(true) => {
                    debug!(port, mock = %process.label, "mock bound its port");
                    return;
                }
                Some(false) => {}
                None => {
                    debug!(port, "UDP socket tables unreadable, waiting out grace period");
                    sleep_until(deadline).await;
                    return;
                }
            }
            if Instant::now() >= deadline {
                warn!(port, mock = %process.label, "port not bound within grace period");
                return;
            }
            sleep(PROBE_INTERVAL).await;
        }
    }
}

/// Whether any UDP socket is bound to `port`, read from the kernel's socket
/// tables so the port is never touched. `None` when no table is readable.
async fn udp_port_bound(port: u16) -> Option<bool> {
    let mut readable = false;
    for table in UDP_TABLES {
        match tokio::fs::read_to_string(table).await {
            Ok(text) => {
                readable = true;
                if table_lists_port(&text, port) {
                    return Some(true);
                }
            }
            Err(e) => debug!(table, error = %e, "cannot read UDP socket table"),
        }
    }
    readable.then_some(false)
}

/// Scan a `/proc/net/udp{,6}` table for a local address on `port`.
///
/// Rows look like `0: 0100007F:14E9 00000000:0000 07 ...`; the port is the
/// hex suffix of the second column.
fn table_lists_port(table: &str, port: u16) -> bool {
    table.lines().skip(1).any(|row| {
        row.split_whitespace()
            .nth(1)
            .and_then(|local| local.rsplit_once(':'))
            .and_then(|(_, hex)| u16::from_str_radix(hex, 16).ok())
            == Some(port)
    })
}

/// Exclusive handle to one live background process.
///
/// Call [`SupervisedProcess::stop`] on every path; dropping an unstopped
/// handle still SIGKILLs the child.
#[derive(Debug)]
pub struct SupervisedProcess {
    label: String,
    pid: Option<u32>,
    child: Option<Child>,
    stdout: Option<OutputCapture>,
    stderr: Option<OutputCapture>,
    stop_timeout: Duration,
    logs: Option<ProcessLogs>,
}

impl SupervisedProcess {
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// `Ok(None)` while running, `Ok(Some(code))` once exited.
    fn exit_status(&mut self) -> std::io::Result<Option<Option<i32>>> {
        match self.child.as_mut() {
            Some(child) => Ok(child.try_wait()?.map(|status| status.code())),
            None => Ok(Some(self.logs.as_ref().and_then(|l| l.exit_code))),
        }
    }

    pub fn is_running(&mut self) -> bool {
        matches!(self.exit_status(), Ok(None))
    }

    /// Output captured so far, without stopping the process.
    pub async fn peek_logs(&self) -> ProcessLogs {
        if let Some(logs) = &self.logs {
            return logs.clone();
        }
        ProcessLogs {
            stdout: snapshot(self.stdout.as_ref()).await,
            stderr: snapshot(self.stderr.as_ref()).await,
            exit_code: None,
        }
    }

    /// Terminate the process and collect its output. Idempotent.
    ///
    /// Sends SIGTERM, waits up to the stop timeout, then SIGKILLs and reaps.
    pub async fn stop(&mut self) -> ProcessLogs {
        if let Some(logs) = &self.logs {
            return logs.clone();
        }

        let exit_code = match self.child.take() {
            Some(mut child) => terminate(&mut child, self.stop_timeout, &self.label).await,
            None => None,
        };

        let stdout = match self.stdout.take() {
            Some(capture) => capture.finish(PIPE_DRAIN).await,
            None => String::new(),
        };
        let stderr = match self.stderr.take() {
            Some(capture) => capture.finish(PIPE_DRAIN).await,
            None => String::new(),
        };

        let logs = ProcessLogs {
            stdout,
            stderr,
            exit_code,
        };
        self.logs = Some(logs.clone());
        logs
    }
}

impl Drop for SupervisedProcess {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            warn!(mock = %self.label, pid = ?self.pid, "mock handle dropped without stop, killing");
            if let Err(e) = child.start_kill() {
                warn!(mock = %self.label, error = %e, "failed to kill dropped mock process");
            }
        }
    }
}

async fn snapshot(capture: Option<&OutputCapture>) -> String {
    match capture {
        Some(capture) => capture.snapshot().await,
        None => String::new(),
    }
}

async fn terminate(child: &mut Child, grace: Duration, label: &str) -> Option<i32> {
    if let Ok(Some(status)) = child.try_wait() {
        debug!(mock = %label, "mock process already exited");
        return status.code();
    }

    match child.id().and_then(|pid| i32::try_from(pid).ok()) {
        Some(raw) => {
            if let Err(e) = kill(Pid::from_raw(raw), Signal::SIGTERM) {
                warn!(mock = %label, error = %e, "failed to send SIGTERM");
            }
        }
        None => warn!(mock = %label, "mock pid unavailable, skipping SIGTERM"),
    }

    match timeout(grace, child.wait()).await {
        Ok(Ok(status)) => {
            info!(mock = %label, ?status, "mock process stopped");
            status.code()
        }
        Ok(Err(e)) => {
            error!(mock = %label, error = %e, "error waiting for mock process, killing");
            let _ = child.kill().await;
            None
        }
        Err(_) => {
            warn!(mock = %label, grace_ms = grace.as_millis(), "mock ignored SIGTERM, sending SIGKILL");
            if let Err(e) = child.kill().await {
                error!(mock = %label, error = %e, "failed to kill mock process");
            }
            None
        }
    }
}
