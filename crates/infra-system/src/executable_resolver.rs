// Filesystem executable resolver
// Configured override first, then the binary bundled for this platform
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use dlfmt_core::domain::BundledPlatform;
use dlfmt_core::port::{ConfigError, ExecutableResolver, LogSink};

/// Sets the executable bit on a bundled binary
type MarkExecutable = fn(&Path) -> std::io::Result<()>;

fn mark_executable(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use dlfmt_core::application::constants::BUNDLED_EXECUTABLE_MODE;
        use std::os::unix::fs::PermissionsExt;

        std::fs::set_permissions(path, std::fs::Permissions::from_mode(BUNDLED_EXECUTABLE_MODE))
    }

    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(())
    }
}

/// Resolves the dlfmt executable on the local filesystem
pub struct FsExecutableResolver {
    configured: Option<String>,
    bundle_dir: PathBuf,
    platform: BundledPlatform,
    mark_executable: MarkExecutable,
}

impl FsExecutableResolver {
    /// # Arguments
    /// * `configured` - Executable override; blank means "use the bundled binary"
    /// * `bundle_dir` - Directory containing the bundled `bin/` folder
    pub fn new(configured: Option<String>, bundle_dir: impl Into<PathBuf>) -> Self {
        Self {
            configured: configured
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            bundle_dir: bundle_dir.into(),
            platform: BundledPlatform::current(),
            mark_executable,
        }
    }

    /// Resolve for a different platform than the running one
    pub fn with_platform(mut self, platform: BundledPlatform) -> Self {
        self.platform = platform;
        self
    }

    pub fn bundled_path(&self) -> PathBuf {
        self.bundle_dir.join(self.platform.relative_path())
    }

    /// Best effort: a failure here only produces a warning, the spawn
    /// reports the real problem if the bit is actually missing
    fn ensure_executable(&self, path: &Path, sink: &dyn LogSink) {
        if self.platform.is_windows() {
            return;
        }

        if let Err(e) = (self.mark_executable)(path) {
            warn!(path = %path.display(), error = %e, "Failed to mark bundled dlfmt executable");
            sink.append_line(&format!(
                "[warning] failed to set executable permission: {}",
                e
            ));
        }
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}

#[async_trait]
impl ExecutableResolver for FsExecutableResolver {
    async fn resolve(&self, sink: &dyn LogSink) -> Result<PathBuf, ConfigError> {
        if let Some(configured) = &self.configured {
            let expanded = PathBuf::from(shellexpand::tilde(configured).into_owned());
            if !exists(&expanded).await {
                return Err(ConfigError::ConfiguredPathMissing(configured.clone()));
            }
            debug!(path = %expanded.display(), "Using configured dlfmt executable");
            return Ok(expanded);
        }

        let bundled = self.bundled_path();
        if !exists(&bundled).await {
            return Err(ConfigError::BundledBinaryMissing(
                bundled.display().to_string(),
            ));
        }
        self.ensure_executable(&bundled, sink);

        debug!(path = %bundled.display(), "Using bundled dlfmt executable");
        Ok(bundled)
    }
}
