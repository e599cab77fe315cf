// Command handlers
// Resolve the executable, run the operation, report the outcome to the user

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::runner::ProcessRunner;
use crate::domain::{Invocation, Operation};
use crate::error::{AppError, Result};
use crate::port::{ExecutableResolver, LogSink, Notifier};

/// Entry point for every user-triggered operation
///
/// Failures are appended to the log sink as `[error] ...` and raised as a
/// notification, then returned to the caller as well.
pub struct CommandService {
    runner: Arc<ProcessRunner>,
    resolver: Arc<dyn ExecutableResolver>,
    sink: Arc<dyn LogSink>,
    notifier: Arc<dyn Notifier>,
    deadline: Option<Duration>,
}

impl CommandService {
    pub fn new(
        runner: Arc<ProcessRunner>,
        resolver: Arc<dyn ExecutableResolver>,
        sink: Arc<dyn LogSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            runner,
            resolver,
            sink,
            notifier,
            deadline: None,
        }
    }

    /// Per-invocation deadline (none by default)
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Run an operation and report the outcome
    pub async fn execute(&self, operation: &Operation) -> Result<()> {
        match self.execute_inner(operation).await {
            Ok(()) => {
                info!(operation = operation.name(), path = %operation.path().display(), "Operation completed");
                if operation.notifies_on_success() {
                    self.notifier
                        .info(&format!("dlfmt: {}", operation.describe()));
                }
                Ok(())
            }
            Err(e) => {
                self.report_error(&e);
                Err(e)
            }
        }
    }

    async fn execute_inner(&self, operation: &Operation) -> Result<()> {
        operation.validate()?;

        let program = self.resolver.resolve(self.sink.as_ref()).await?;
        let invocation = Invocation::for_operation(program, operation).with_deadline(self.deadline);

        self.runner.run(&invocation, self.sink.as_ref()).await?;
        Ok(())
    }

    fn report_error(&self, err: &AppError) {
        error!(error = %err, "Operation failed");
        self.sink.append_line(&format!("[error] {}", err));
        self.notifier.error(&format!("dlfmt failed: {}", err));
    }
}
