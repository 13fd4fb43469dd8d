//! Bounded external process execution.
//!
//! Every call has a deadline. On timeout we stop waiting and report; the
//! child is not killed and may keep running, so callers must treat a
//! timed-out start as possibly started.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::process::Command;

/// Captured result of a finished process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Diagnostic text for failure reports: stderr, or stdout if stderr is empty.
    pub fn diagnostics(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{program}: not found")]
    NotFound { program: String },
    #[error("{program}: timed out after {}s", .elapsed.as_secs())]
    Timeout { program: String, elapsed: Duration },
    #[error("{program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Run `program args...`, capturing output, bounded by `timeout`.
pub async fn run_with_timeout(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
    timeout: Duration,
) -> Result<CommandOutput, CommandError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    tracing::debug!(program, ?args, timeout_secs = timeout.as_secs(), "Running external command");

    let started = Instant::now();
    let child = command.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CommandError::NotFound {
            program: program.to_string(),
        },
        _ => CommandError::Io {
            program: program.to_string(),
            source: e,
        },
    })?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(CommandOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }),
        Ok(Err(e)) => Err(CommandError::Io {
            program: program.to_string(),
            source: e,
        }),
        Err(_) => Err(CommandError::Timeout {
            program: program.to_string(),
            elapsed: started.elapsed(),
        }),
    }
}
