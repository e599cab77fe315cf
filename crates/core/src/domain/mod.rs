// Domain Layer - Pure types describing what to run

pub mod error;
pub mod invocation;
pub mod operation;
pub mod platform;

// Re-exports
pub use error::DomainError;
pub use invocation::{Invocation, ProcessOutput};
pub use operation::{FormatMode, Operation};
pub use platform::BundledPlatform;
