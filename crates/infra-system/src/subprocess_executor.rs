// Subprocess executor implementation
// reason: tokio for async process management, nix for graceful termination
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use dlfmt_core::application::constants::{
    GRACEFUL_SHUTDOWN_TIMEOUT_MS, KILL_POLL_INTERVAL_MS, OUTPUT_DRAIN_GRACE_MS,
};
use dlfmt_core::domain::{Invocation, ProcessOutput};
use dlfmt_core::port::{ExecutionError, TaskExecutor, TimeProvider};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Subprocess executor
///
/// Spawns the program directly (no shell), drains stdout and stderr on
/// background tasks so neither pipe can fill up and stall the child, then
/// waits for exit. Output read before a deadline kill is kept.
pub struct SubprocessExecutor {
    time_provider: Arc<dyn TimeProvider>,
}

impl SubprocessExecutor {
    /// Create a new subprocess executor
    ///
    /// # Arguments
    /// * `time_provider` - Time provider for duration tracking
    ///
    /// # Example
    /// ```ignore
    /// let executor = SubprocessExecutor::new(Arc::new(SystemTimeProvider));
    /// ```
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self { time_provider }
    }

    fn spawn(invocation: &Invocation) -> Result<Child, ExecutionError> {
        let mut command = Command::new(invocation.program());
        command
            .args(invocation.args())
            .current_dir(invocation.working_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);

        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        command.spawn().map_err(|e| {
            ExecutionError::SpawnFailed(format!("{}: {}", invocation.program().display(), e))
        })
    }

    /// Stop a child that outlived its deadline: SIGTERM first, SIGKILL if needed
    async fn terminate(&self, child: &mut Child) -> Result<(), ExecutionError> {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = child.id() {
                info!(pid = %pid, "Sending SIGTERM to timed-out process");
                if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                    warn!(pid = %pid, error = %e, "SIGTERM failed");
                }

                let start_time = self.time_provider.now_millis();
                loop {
                    match child.try_wait() {
                        Ok(Some(_)) => {
                            info!(pid = %pid, "Process exited after SIGTERM");
                            return Ok(());
                        }
                        Ok(None) => {}
                        Err(e) => return Err(ExecutionError::Killed(e.to_string())),
                    }

                    if self.time_provider.now_millis() - start_time
                        > GRACEFUL_SHUTDOWN_TIMEOUT_MS as i64
                    {
                        warn!(pid = %pid, "Process did not exit after SIGTERM, sending SIGKILL");
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(KILL_POLL_INTERVAL_MS)).await;
                }
            }
        }

        child
            .kill()
            .await
            .map_err(|e| ExecutionError::Killed(e.to_string()))
    }
}

/// One output pipe, read to EOF on a background task
struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<std::io::Result<()>>,
}

impl Capture {
    fn spawn<R>(stream: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let shared = Arc::clone(&buf);
        let task: JoinHandle<std::io::Result<()>> = tokio::spawn(async move {
            let Some(mut stream) = stream else {
                return Ok(());
            };
            let mut chunk = [0u8; 8192];
            loop {
                let n = stream.read(&mut chunk).await?;
                if n == 0 {
                    return Ok(());
                }
                shared
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(&chunk[..n]);
            }
        });
        Self { buf, task }
    }

    /// Wait for EOF and return everything read
    async fn finish(self) -> std::io::Result<String> {
        let Capture { buf, task } = self;
        task.await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;
        Ok(take(&buf))
    }

    /// Return what was read so far, giving the pipe `grace` to reach EOF
    async fn salvage(self, grace: Duration) -> String {
        let Capture { buf, mut task } = self;
        if timeout(grace, &mut task).await.is_err() {
            task.abort();
        }
        take(&buf)
    }
}

fn take(buf: &Mutex<Vec<u8>>) -> String {
    let bytes = std::mem::take(&mut *buf.lock().unwrap_or_else(PoisonError::into_inner));
    String::from_utf8_lossy(&bytes).into_owned()
}

#[async_trait]
impl TaskExecutor for SubprocessExecutor {
    async fn execute(&self, invocation: &Invocation) -> Result<ProcessOutput, ExecutionError> {
        let start_time = self.time_provider.now_millis();

        let mut child = Self::spawn(invocation)?;
        let stdout = Capture::spawn(child.stdout.take());
        let stderr = Capture::spawn(child.stderr.take());
        debug!(pid = ?child.id(), "Subprocess spawned");

        let waited = match invocation.deadline() {
            Some(deadline) => {
                let waited = timeout(deadline, child.wait()).await;
                match waited {
                    Ok(waited) => waited,
                    Err(_) => {
                        let deadline_ms = deadline.as_millis() as u64;
                        warn!(
                            program = %invocation.program().display(),
                            deadline_ms = deadline_ms,
                            "Subprocess exceeded deadline"
                        );
                        self.terminate(&mut child).await?;

                        let grace = Duration::from_millis(OUTPUT_DRAIN_GRACE_MS);
                        return Err(ExecutionError::Timeout {
                            deadline_ms,
                            stdout: stdout.salvage(grace).await,
                            stderr: stderr.salvage(grace).await,
                        });
                    }
                }
            }
            None => child.wait().await,
        };
        let status = waited.map_err(|e| ExecutionError::IoError(e.to_string()))?;

        let out = stdout
            .finish()
            .await
            .map_err(|e| ExecutionError::IoError(format!("reading stdout: {}", e)))?;
        let err = stderr
            .finish()
            .await
            .map_err(|e| ExecutionError::IoError(format!("reading stderr: {}", e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                warn!(signal = signal, "Subprocess terminated by signal");
            }
        }

        Ok(ProcessOutput {
            exit_code: status.code(),
            stdout: out,
            stderr: err,
            duration_ms: self.time_provider.now_millis() - start_time,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use dlfmt_core::port::time_provider::SystemTimeProvider;

    fn executor() -> SubprocessExecutor {
        SubprocessExecutor::new(Arc::new(SystemTimeProvider))
    }

    fn sh(script: &str) -> Invocation {
        Invocation::new("sh", ["-c", script], std::env::temp_dir())
    }

    #[tokio::test]
    async fn test_execute_success() {
        let output = executor().execute(&sh("printf hello")).await.unwrap();

        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout, "hello");
        assert_eq!(output.stderr, "");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_not_an_error() {
        let output = executor()
            .execute(&sh("echo boom >&2; exit 2"))
            .await
            .unwrap();

        assert_eq!(output.exit_code, Some(2));
        assert_eq!(output.stderr, "boom\n");
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let invocation = Invocation::new("/nonexistent/dlfmt-12345", ["--help"], ".");
        let result = executor().execute(&invocation).await;

        match result {
            Err(ExecutionError::SpawnFailed(msg)) => assert!(msg.contains("/nonexistent/dlfmt-12345")),
            other => panic!("expected SpawnFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_arguments_are_not_shell_expanded() {
        let invocation = Invocation::new("printf", ["%s|", "$HOME", "a b", "*"], ".");
        let output = executor().execute(&invocation).await.unwrap();

        assert_eq!(output.stdout, "$HOME|a b|*|");
    }

    #[tokio::test]
    async fn test_working_dir_is_honored() {
        let dir = std::env::temp_dir().join(format!("dlfmt-cwd-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        let invocation = Invocation::new("sh", ["-c", "pwd -P"], &dir);
        let output = executor().execute(&invocation).await.unwrap();

        assert_eq!(
            output.stdout.trim(),
            dir.canonicalize().unwrap().to_string_lossy()
        );
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_large_output_on_both_streams() {
        // More than a pipe buffer on each stream
        let script = "i=0; while [ $i -lt 2000 ]; do \
                      echo 'stdout line padding padding padding padding padding'; \
                      echo 'stderr line padding padding padding padding padding' >&2; \
                      i=$((i+1)); done";
        let output = executor().execute(&sh(script)).await.unwrap();

        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout.lines().count(), 2000);
        assert_eq!(output.stderr.lines().count(), 2000);
    }

    #[tokio::test]
    async fn test_deadline_kills_process() {
        let invocation = sh("sleep 10").with_deadline(Some(Duration::from_millis(100)));
        let started = std::time::Instant::now();

        let result = executor().execute(&invocation).await;

        assert!(matches!(
            result,
            Err(ExecutionError::Timeout { deadline_ms: 100, .. })
        ));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_deadline_keeps_output_written_so_far() {
        let invocation = sh("echo reading config; echo stuck on a.lua >&2; sleep 10")
            .with_deadline(Some(Duration::from_millis(300)));

        match executor().execute(&invocation).await {
            Err(ExecutionError::Timeout { stdout, stderr, .. }) => {
                assert_eq!(stdout, "reading config\n");
                assert_eq!(stderr, "stuck on a.lua\n");
            }
            other => panic!("expected Timeout, got {:?}", other),
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_non_utf8_argument_reaches_process() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let invocation = Invocation::new(
            "printf",
            [OsStr::new("%s"), OsStr::from_bytes(b"caf\xe9")],
            ".",
        );
        let output = executor().execute(&invocation).await.unwrap();

        // Byte 0xE9 comes back unchanged, then is decoded lossily
        assert_eq!(output.stdout, "caf\u{FFFD}");
    }

    #[tokio::test]
    async fn test_signal_exit_has_no_code() {
        let output = executor().execute(&sh("kill -9 $$")).await.unwrap();
        assert_eq!(output.exit_code, None);
    }
}
