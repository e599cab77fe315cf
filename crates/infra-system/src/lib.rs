// dlfmt Infrastructure - System Adapters
// Implements: TaskExecutor, ExecutableResolver, LogSink

pub mod executable_resolver;
pub mod log_sink;
pub mod subprocess_executor;

pub use executable_resolver::FsExecutableResolver;
pub use log_sink::{FileSink, WriterSink};
pub use subprocess_executor::SubprocessExecutor;
