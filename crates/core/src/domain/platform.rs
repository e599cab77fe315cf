// Bundled executable layout per host platform

use std::path::PathBuf;

/// Host platform, as reported by `std::env::consts`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundledPlatform {
    pub os: String,
    pub arch: String,
}

impl BundledPlatform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Platform this binary was compiled for
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }

    /// Path of the bundled dlfmt binary, relative to the bundle directory
    pub fn relative_path(&self) -> PathBuf {
        match self.os.as_str() {
            "windows" => PathBuf::from("bin").join("dlfmt-windows.exe"),
            "linux" => PathBuf::from("bin").join("dlfmt-linux"),
            "macos" => PathBuf::from("bin").join("dlfmt-macos"),
            other => PathBuf::from("bin").join(other).join(&self.arch).join("dlfmt"),
        }
    }
}
