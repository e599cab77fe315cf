// Task Executor Port
// Abstraction for running one invocation to completion

use crate::domain::{Invocation, ProcessOutput};
use async_trait::async_trait;
use thiserror::Error;

/// Execution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    /// Carries whatever the process wrote before it was stopped
    #[error("Process timeout after {deadline_ms}ms")]
    Timeout {
        deadline_ms: u64,
        stdout: String,
        stderr: String,
    },

    #[error("Process killed: {0}")]
    Killed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Task Executor trait
///
/// Implementations:
/// - SubprocessExecutor: spawns the external process (infra-system)
/// - MockTaskExecutor: scripted outcomes for tests
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Spawn the invocation, capture both output streams and wait for exit
    ///
    /// A nonzero exit is NOT an error here; it is reported through
    /// `ProcessOutput::exit_code` and interpreted by the caller.
    ///
    /// # Errors
    /// - ExecutionError::SpawnFailed if the process cannot be started
    /// - ExecutionError::Timeout if the invocation deadline expired
    /// - ExecutionError::IoError if reading the output streams fails
    async fn execute(&self, invocation: &Invocation) -> Result<ProcessOutput, ExecutionError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Mock executor behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Exit with the given code and output
        Exit {
            code: i32,
            stdout: String,
            stderr: String,
        },
        /// Fail to spawn with message
        SpawnFail(String),
        /// Hit the deadline after `deadline_ms`, having written `stderr`
        Timeout { deadline_ms: u64, stderr: String },
    }

    /// Mock Task Executor for testing
    ///
    /// Records every invocation and tracks how many are in flight at once.
    pub struct MockTaskExecutor {
        behavior: MockBehavior,
        delay: Duration,
        calls: Arc<Mutex<Vec<Invocation>>>,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    impl MockTaskExecutor {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior,
                delay: Duration::ZERO,
                calls: Arc::new(Mutex::new(Vec::new())),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
            }
        }

        pub fn new_success() -> Self {
            Self::new_exit(0, "", "")
        }

        pub fn new_exit(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
            Self::new(MockBehavior::Exit {
                code,
                stdout: stdout.into(),
                stderr: stderr.into(),
            })
        }

        pub fn new_spawn_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::SpawnFail(message.into()))
        }

        /// Sleep this long inside every execution
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().unwrap().clone()
        }

        /// Highest number of concurrent executions observed
        pub fn peak_in_flight(&self) -> usize {
            self.peak_in_flight.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TaskExecutor for MockTaskExecutor {
        async fn execute(&self, invocation: &Invocation) -> Result<ProcessOutput, ExecutionError> {
            self.calls.lock().unwrap().push(invocation.clone());

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.behavior.clone() {
                MockBehavior::Exit {
                    code,
                    stdout,
                    stderr,
                } => Ok(ProcessOutput {
                    exit_code: Some(code),
                    stdout,
                    stderr,
                    duration_ms: self.delay.as_millis() as i64,
                }),
                MockBehavior::SpawnFail(msg) => Err(ExecutionError::SpawnFailed(msg)),
                MockBehavior::Timeout { deadline_ms, stderr } => Err(ExecutionError::Timeout {
                    deadline_ms,
                    stdout: String::new(),
                    stderr,
                }),
            }
        }
    }
}
