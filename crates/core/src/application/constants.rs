// Runner constants (no magic values)

/// Default number of dlfmt processes allowed to run at once
pub const DEFAULT_MAX_CONCURRENCY: usize = 2;

/// Grace period between SIGTERM and SIGKILL for a timed-out process (ms)
pub const GRACEFUL_SHUTDOWN_TIMEOUT_MS: u64 = 2000;

/// Poll interval while waiting for a terminated process to exit (ms)
pub const KILL_POLL_INTERVAL_MS: u64 = 50;

/// How long to keep reading a stopped process's output pipes (ms)
///
/// A grandchild that survived the kill can hold them open indefinitely.
pub const OUTPUT_DRAIN_GRACE_MS: u64 = 200;

/// Prefix of temp files used for document formatting
pub const TEMP_FILE_PREFIX: &str = "dlfmt_";

/// Extension of temp files used for document formatting
pub const TEMP_FILE_EXTENSION: &str = "lua";

/// Permission bits applied to the bundled executable on unix
pub const BUNDLED_EXECUTABLE_MODE: u32 = 0o755;
