// Runner configuration
// Values come from DLFMT_* environment variables (or CLI flags mirroring them)

use std::path::PathBuf;
use std::time::Duration;

use crate::application::constants::DEFAULT_MAX_CONCURRENCY;
use crate::domain::FormatMode;
use crate::port::ConfigError;

/// Override for the dlfmt executable path
pub const ENV_PATH: &str = "DLFMT_PATH";
/// Default mode for document formatting (`auto` | `manual`)
pub const ENV_FORMAT_MODE: &str = "DLFMT_FORMAT_MODE";
/// Maximum number of concurrently running dlfmt processes
pub const ENV_MAX_CONCURRENCY: &str = "DLFMT_MAX_CONCURRENCY";
/// Directory containing the bundled `bin/` folder
pub const ENV_BUNDLE_DIR: &str = "DLFMT_BUNDLE_DIR";
/// Per-invocation deadline in milliseconds (unset or 0 = none)
pub const ENV_TIMEOUT_MS: &str = "DLFMT_TIMEOUT_MS";

/// Validated runner configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Non-blank executable override, trimmed
    pub executable_override: Option<String>,
    pub format_mode: FormatMode,
    pub max_concurrency: usize,
    pub bundle_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            executable_override: None,
            format_mode: FormatMode::Auto,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            bundle_dir: None,
            timeout: None,
        }
    }
}

impl RunnerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup
    ///
    /// Blank values count as unset.
    ///
    /// # Example
    /// ```text
    /// let config = RunnerConfig::from_lookup(|key| match key {
    ///     "DLFMT_MAX_CONCURRENCY" => Some("4".to_string()),
    ///     _ => None,
    /// })?;
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        config.executable_override = get(ENV_PATH);

        if let Some(mode) = get(ENV_FORMAT_MODE) {
            config.format_mode = mode.parse().map_err(|e: crate::domain::DomainError| {
                ConfigError::InvalidSetting {
                    key: ENV_FORMAT_MODE.to_string(),
                    message: e.to_string(),
                }
            })?;
        }

        if let Some(raw) = get(ENV_MAX_CONCURRENCY) {
            config.max_concurrency = match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidSetting {
                        key: ENV_MAX_CONCURRENCY.to_string(),
                        message: format!("expected a positive integer, got '{}'", raw),
                    })
                }
            };
        }

        config.bundle_dir = get(ENV_BUNDLE_DIR).map(PathBuf::from);

        if let Some(raw) = get(ENV_TIMEOUT_MS) {
            let ms = raw
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidSetting {
                    key: ENV_TIMEOUT_MS.to_string(),
                    message: format!("expected milliseconds, got '{}'", raw),
                })?;
            config.timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, RunnerConfig::default());
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn test_all_values() {
        let config = RunnerConfig::from_lookup(lookup(&[
            (ENV_PATH, "  /opt/dlfmt  "),
            (ENV_FORMAT_MODE, "manual"),
            (ENV_MAX_CONCURRENCY, "4"),
            (ENV_BUNDLE_DIR, "/opt/ext"),
            (ENV_TIMEOUT_MS, "1500"),
        ]))
        .unwrap();

        assert_eq!(config.executable_override.as_deref(), Some("/opt/dlfmt"));
        assert_eq!(config.format_mode, FormatMode::Manual);
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.bundle_dir, Some(PathBuf::from("/opt/ext")));
        assert_eq!(config.timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_blank_override_is_unset() {
        let config = RunnerConfig::from_lookup(lookup(&[(ENV_PATH, "   ")])).unwrap();
        assert_eq!(config.executable_override, None);
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let config = RunnerConfig::from_lookup(lookup(&[(ENV_TIMEOUT_MS, "0")])).unwrap();
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = RunnerConfig::from_lookup(lookup(&[(ENV_MAX_CONCURRENCY, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { ref key, .. } if key == ENV_MAX_CONCURRENCY));

        let err = RunnerConfig::from_lookup(lookup(&[(ENV_FORMAT_MODE, "fast")])).unwrap_err();
        assert!(err.to_string().contains("fast"));

        assert!(RunnerConfig::from_lookup(lookup(&[(ENV_TIMEOUT_MS, "soon")])).is_err());
    }
}
