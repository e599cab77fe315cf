//! Diagnostic logging setup
//!
//! Diagnostics go to stderr through `tracing`; the user-facing output sink
//! is separate.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is not set
const DEFAULT_FILTER: &str = "dlfmt=warn";

/// Install the global subscriber
///
/// # Arguments
/// * `format` - `json` for structured output, anything else for pretty output
pub fn init_logging(format: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

    match format {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?,
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_is_quiet_below_warn() {
        assert_eq!(DEFAULT_FILTER, "dlfmt=warn");
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}
