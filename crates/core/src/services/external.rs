use std::ffi::OsStr;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Poll interval while waiting for an external process to exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// An external program plus fixed leading arguments.
///
/// The per-call subject (a file path or a feature line) is appended as the
/// final argument, e.g. `python extract_features.py <path>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    fn display_name(&self) -> String {
        self.program.display().to_string()
    }
}

#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} did not finish within {seconds}s and was killed")]
    Timeout { program: String, seconds: u64 },
    #[error("{program} exited with {status}")]
    Exit { program: String, status: ExitStatus },
    #[error("{program} produced no output")]
    NoOutput { program: String },
    #[error("I/O error talking to {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Run `tool` with `subject` appended and return the first line of its stdout.
///
/// Same contract as [`run_for_raw_line`], decoded as UTF-8 (lossily).
pub fn run_for_line(
    tool: &ToolConfig,
    subject: &OsStr,
    timeout: Duration,
) -> Result<String, ExternalError> {
    run_for_raw_line(tool, subject, timeout).map(|line| String::from_utf8_lossy(&line).into_owned())
}

/// Run `tool` with `subject` appended and return the raw first line of its stdout.
///
/// The call is bounded by `timeout`: on expiry the child is killed and reaped and
/// `ExternalError::Timeout` is returned. A non-zero exit or an empty first line
/// are errors too. The line ends at the first `\n`, one trailing `\r` is dropped,
/// and every other byte is returned untouched.
pub fn run_for_raw_line(
    tool: &ToolConfig,
    subject: &OsStr,
    timeout: Duration,
) -> Result<Vec<u8>, ExternalError> {
    let program = tool.display_name();
    let started = Instant::now();

    let mut child = Command::new(&tool.program)
        .args(&tool.args)
        .arg(subject)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| ExternalError::Spawn { program: program.clone(), source })?;

    // Drain stdout on a helper thread so a chatty child never blocks on a full pipe.
    let mut stdout = child.stdout.take().ok_or_else(|| ExternalError::Io {
        program: program.clone(),
        source: io::Error::new(io::ErrorKind::Other, "stdout was not captured"),
    })?;
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = stdout.read_to_end(&mut buf).map(|_| buf);
        let _ = tx.send(result);
    });

    let status = wait_with_deadline(&mut child, started + timeout)
        .map_err(|source| ExternalError::Io { program: program.clone(), source })?
        .ok_or_else(|| {
            tracing::warn!(program = %program, seconds = timeout.as_secs(), "External call timed out");
            ExternalError::Timeout { program: program.clone(), seconds: timeout.as_secs() }
        })?;

    if !status.success() {
        return Err(ExternalError::Exit { program, status });
    }

    // A grandchild may still hold the pipe open; do not wait past the deadline for EOF.
    let remaining = timeout.saturating_sub(started.elapsed()).max(POLL_INTERVAL);
    let bytes = match rx.recv_timeout(remaining) {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(source)) => return Err(ExternalError::Io { program, source }),
        Err(_) => return Err(ExternalError::Timeout { program, seconds: timeout.as_secs() }),
    };

    let line = first_line(&bytes);
    if line.is_empty() {
        return Err(ExternalError::NoOutput { program });
    }
    Ok(line.to_vec())
}

fn first_line(bytes: &[u8]) -> &[u8] {
    let line = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Wait for `child` to exit, killing it once `deadline` passes.
///
/// Returns `Ok(None)` when the child had to be killed.
fn wait_with_deadline(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}
