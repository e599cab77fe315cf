// Document formatting
// Formats in-memory text by round-tripping it through a temp file

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::constants::{TEMP_FILE_EXTENSION, TEMP_FILE_PREFIX};
use super::runner::ProcessRunner;
use crate::domain::{FormatMode, Invocation, Operation};
use crate::error::Result;
use crate::port::{ExecutableResolver, LogSink, TimeProvider};

/// Formats the text of an open document
///
/// The result is either "no change" or a single full-document replacement.
pub struct DocumentFormatter {
    runner: Arc<ProcessRunner>,
    resolver: Arc<dyn ExecutableResolver>,
    sink: Arc<dyn LogSink>,
    time_provider: Arc<dyn TimeProvider>,
    temp_dir: PathBuf,
    deadline: Option<Duration>,
}

impl DocumentFormatter {
    pub fn new(
        runner: Arc<ProcessRunner>,
        resolver: Arc<dyn ExecutableResolver>,
        sink: Arc<dyn LogSink>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            runner,
            resolver,
            sink,
            time_provider,
            temp_dir: std::env::temp_dir(),
            deadline: None,
        }
    }

    /// Directory for scratch files (defaults to the OS temp dir)
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Format `text`
    ///
    /// Returns `Ok(None)` when the formatter left the text unchanged and
    /// `Ok(Some(formatted))` otherwise. The scratch file is removed on every
    /// path.
    pub async fn format_text(&self, text: &str, mode: FormatMode) -> Result<Option<String>> {
        let program = self.resolver.resolve(self.sink.as_ref()).await?;
        let scratch = self.scratch_path();

        tokio::fs::write(&scratch, text).await?;
        let result = self.format_scratch(program, &scratch, mode).await;

        if let Err(e) = tokio::fs::remove_file(&scratch).await {
            debug!(path = %scratch.display(), error = %e, "Failed to remove scratch file");
        }

        let formatted = result?;
        if formatted == text {
            debug!("Document already formatted");
            return Ok(None);
        }
        info!(bytes = formatted.len(), "Document formatted");
        Ok(Some(formatted))
    }

    async fn format_scratch(
        &self,
        program: PathBuf,
        scratch: &Path,
        mode: FormatMode,
    ) -> Result<String> {
        let operation = Operation::FormatFile {
            path: scratch.to_path_buf(),
            mode,
        };
        let invocation = Invocation::new(program, operation.args(), &self.temp_dir)
            .with_deadline(self.deadline);

        self.runner.run(&invocation, self.sink.as_ref()).await?;
        Ok(tokio::fs::read_to_string(scratch).await?)
    }

    fn scratch_path(&self) -> PathBuf {
        let name = format!(
            "{}{}_{}.{}",
            TEMP_FILE_PREFIX,
            self.time_provider.now_millis(),
            uuid::Uuid::new_v4().simple(),
            TEMP_FILE_EXTENSION
        );
        self.temp_dir.join(name)
    }
}
