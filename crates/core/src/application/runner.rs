// Process Runner
// Gate admission + spawn + output relay + exit status mapping

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::gate::ConcurrencyGate;
use crate::domain::Invocation;
use crate::port::{ExecutionError, LogSink, TaskExecutor};

/// Why a run did not succeed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("failed to start dlfmt: {0}")]
    Spawn(String),

    #[error("dlfmt timed out after {deadline_ms}ms{}", detail(.stderr))]
    Timeout { deadline_ms: u64, stderr: String },

    #[error("dlfmt exited with code {code}{}", detail(.stderr))]
    NonZeroExit { code: i32, stderr: String },

    #[error("dlfmt was terminated by a signal{}", detail(.stderr))]
    Terminated { stderr: String },

    #[error("failed to stop dlfmt: {0}")]
    Killed(String),

    #[error("I/O error while running dlfmt: {0}")]
    Io(String),
}

fn detail(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!("\n{}", stderr)
    }
}

impl RunError {
    /// Exit code, if the process ran and exited on its own
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RunError::NonZeroExit { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<ExecutionError> for RunError {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::SpawnFailed(msg) => RunError::Spawn(msg),
            ExecutionError::Timeout {
                deadline_ms,
                stderr,
                ..
            } => RunError::Timeout { deadline_ms, stderr },
            ExecutionError::Killed(msg) => RunError::Killed(msg),
            ExecutionError::IoError(msg) => RunError::Io(msg),
        }
    }
}

/// Runs invocations through a shared concurrency gate
///
/// No retries: a failing process is reported to the caller as-is.
pub struct ProcessRunner {
    gate: ConcurrencyGate,
    executor: Arc<dyn TaskExecutor>,
}

impl ProcessRunner {
    pub fn new(gate: ConcurrencyGate, executor: Arc<dyn TaskExecutor>) -> Self {
        Self { gate, executor }
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Run one invocation to completion
    ///
    /// Writes the audit line, then (once the process exits or is stopped at
    /// its deadline) its stdout and then its stderr to `sink`. The gate slot is held for the whole run and
    /// released on every exit path.
    ///
    /// # Errors
    /// - RunError::Spawn if the executable could not be started
    /// - RunError::NonZeroExit carrying the exit code and captured stderr
    /// - RunError::Terminated if the process died from a signal
    /// - RunError::Timeout if the invocation deadline expired
    pub async fn run(&self, invocation: &Invocation, sink: &dyn LogSink) -> Result<(), RunError> {
        let _permit = self.gate.acquire().await;

        sink.append_line(&invocation.command_line());
        info!(
            program = %invocation.program().display(),
            args = ?invocation.args(),
            working_dir = %invocation.working_dir().display(),
            "Running dlfmt"
        );

        let output = match self.executor.execute(invocation).await {
            Ok(output) => output,
            Err(ExecutionError::Timeout {
                deadline_ms,
                stdout,
                stderr,
            }) => {
                warn!(deadline_ms, "dlfmt stopped at its deadline");
                relay(sink, &stdout, &stderr);
                return Err(RunError::Timeout { deadline_ms, stderr });
            }
            Err(e) => {
                warn!(error = %e, "dlfmt execution failed");
                return Err(e.into());
            }
        };

        relay(sink, &output.stdout, &output.stderr);

        info!(
            exit_code = ?output.exit_code,
            duration_ms = output.duration_ms,
            "dlfmt finished"
        );

        match output.exit_code {
            Some(0) => Ok(()),
            Some(code) => Err(RunError::NonZeroExit {
                code,
                stderr: output.stderr,
            }),
            None => Err(RunError::Terminated {
                stderr: output.stderr,
            }),
        }
    }
}

fn relay(sink: &dyn LogSink, stdout: &str, stderr: &str) {
    if !stdout.is_empty() {
        sink.append(stdout);
    }
    if !stderr.is_empty() {
        sink.append(stderr);
    }
}
