// Invocation Domain Model
// What to spawn, and what came back

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::operation::Operation;

/// One request to run the external executable
///
/// Arguments are passed to the OS verbatim, as raw OS strings. They are
/// never joined into a shell command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
    working_dir: PathBuf,
    deadline: Option<Duration>,
}

impl Invocation {
    pub fn new(
        program: impl Into<PathBuf>,
        args: impl IntoIterator<Item = impl Into<OsString>>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            working_dir: working_dir.into(),
            deadline: None,
        }
    }

    /// Build the invocation for an operation against a resolved executable
    pub fn for_operation(program: impl Into<PathBuf>, operation: &Operation) -> Self {
        Self::new(program, operation.args(), operation.working_dir())
    }

    /// Kill the child if it runs longer than `deadline`
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Audit line written to the log sink before spawning
    ///
    /// The program is always quoted; an argument is quoted only when it
    /// contains whitespace. Non-UTF-8 bytes are shown as U+FFFD here only.
    ///
    /// # Example
    /// ```text
    /// > "/opt/dlfmt" --format-file "my file.lua" --param auto
    /// ```
    pub fn command_line(&self) -> String {
        let mut line = format!("> \"{}\"", self.program.display());
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            line.push(' ');
            if arg.chars().any(char::is_whitespace) {
                line.push('"');
                line.push_str(&arg);
                line.push('"');
            } else {
                line.push_str(&arg);
            }
        }
        line
    }
}

/// Raw outcome of a finished child process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// None when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: i64,
}
