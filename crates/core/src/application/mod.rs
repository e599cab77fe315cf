// Application Layer - Use Cases

pub mod commands;
pub mod constants;
pub mod document;
pub mod gate;
pub mod runner;

// Re-exports
pub use commands::CommandService;
pub use document::DocumentFormatter;
pub use gate::{ConcurrencyGate, GatePermit};
pub use runner::{ProcessRunner, RunError};
