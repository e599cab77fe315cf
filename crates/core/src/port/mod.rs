// Port Layer - Interfaces for external dependencies

pub mod executable_resolver;
pub mod log_sink;
pub mod notifier;
pub mod task_executor;
pub mod time_provider;

// Re-exports
pub use executable_resolver::{ConfigError, ExecutableResolver};
pub use log_sink::LogSink;
pub use notifier::Notifier;
pub use task_executor::{ExecutionError, TaskExecutor};
pub use time_provider::TimeProvider;
