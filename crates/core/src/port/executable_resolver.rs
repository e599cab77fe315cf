// Executable Resolver Port
// Finds the dlfmt binary before anything is spawned

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use super::LogSink;

/// Configuration errors, reported before any gate slot is taken
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("configured dlfmt path does not exist: {0}")]
    ConfiguredPathMissing(String),

    #[error("bundled dlfmt executable not found: {0}")]
    BundledBinaryMissing(String),

    #[error("invalid setting {key}: {message}")]
    InvalidSetting { key: String, message: String },
}

#[async_trait]
pub trait ExecutableResolver: Send + Sync {
    /// Resolve the executable to run
    ///
    /// Best-effort repairs (e.g. marking a bundled binary executable) report
    /// warnings to `sink` instead of failing.
    ///
    /// # Errors
    /// - ConfigError::ConfiguredPathMissing if the override does not exist
    /// - ConfigError::BundledBinaryMissing if no bundled binary is shipped for this platform
    async fn resolve(&self, sink: &dyn LogSink) -> Result<PathBuf, ConfigError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;

    /// Resolver that always returns the same answer
    pub struct StaticResolver {
        result: Result<PathBuf, ConfigError>,
    }

    impl StaticResolver {
        pub fn found(path: impl Into<PathBuf>) -> Self {
            Self {
                result: Ok(path.into()),
            }
        }

        pub fn failing(error: ConfigError) -> Self {
            Self { result: Err(error) }
        }
    }

    #[async_trait]
    impl ExecutableResolver for StaticResolver {
        async fn resolve(&self, _sink: &dyn LogSink) -> Result<PathBuf, ConfigError> {
            self.result.clone()
        }
    }
}
