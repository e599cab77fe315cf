// Operation Domain Model
// One variant per command the bridge can hand to the dlfmt executable

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::error::{DomainError, Result};

/// Formatting mode passed through `--param`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatMode {
    #[default]
    Auto,
    Manual,
}

impl FormatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatMode::Auto => "auto",
            FormatMode::Manual => "manual",
        }
    }
}

impl std::fmt::Display for FormatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "auto" => Ok(FormatMode::Auto),
            "manual" => Ok(FormatMode::Manual),
            _ => Err(DomainError::UnknownFormatMode(trimmed.to_string())),
        }
    }
}

/// A single request to the external formatter
///
/// Argument vectors are part of the executable's command-line contract and
/// must stay byte-for-byte stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    FormatFile { path: PathBuf, mode: FormatMode },
    FormatDirectory { path: PathBuf, mode: FormatMode },
    CompressFile { path: PathBuf },
    CompressDirectory { path: PathBuf },
    JsonTask { path: PathBuf },
}

impl Operation {
    /// Target file or directory
    pub fn path(&self) -> &Path {
        match self {
            Operation::FormatFile { path, .. }
            | Operation::FormatDirectory { path, .. }
            | Operation::CompressFile { path }
            | Operation::CompressDirectory { path }
            | Operation::JsonTask { path } => path,
        }
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Operation::FormatFile { .. } => "format_file",
            Operation::FormatDirectory { .. } => "format_directory",
            Operation::CompressFile { .. } => "compress_file",
            Operation::CompressDirectory { .. } => "compress_directory",
            Operation::JsonTask { .. } => "json_task",
        }
    }

    /// Arguments handed to the executable, in order
    ///
    /// The path is passed as raw OS bytes, never re-encoded.
    pub fn args(&self) -> Vec<OsString> {
        let path = self.path().as_os_str().to_os_string();
        let flag = |f: &str| OsString::from(f);
        match self {
            Operation::FormatFile { mode, .. } => {
                vec![flag("--format-file"), path, flag("--param"), flag(mode.as_str())]
            }
            Operation::FormatDirectory { mode, .. } => {
                vec![flag("--format-directory"), path, flag("--param"), flag(mode.as_str())]
            }
            Operation::CompressFile { .. } => vec![flag("--compress-file"), path],
            Operation::CompressDirectory { .. } => vec![flag("--compress-directory"), path],
            Operation::JsonTask { .. } => vec![flag("--json-task"), path],
        }
    }

    /// Directory the child process runs in
    ///
    /// File-shaped operations run next to the file, directory operations
    /// inside the directory.
    pub fn working_dir(&self) -> PathBuf {
        match self {
            Operation::FormatDirectory { path, .. } | Operation::CompressDirectory { path } => {
                path.clone()
            }
            Operation::FormatFile { path, .. }
            | Operation::CompressFile { path }
            | Operation::JsonTask { path } => match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
        }
    }

    /// Reject requests the executable cannot act on
    pub fn validate(&self) -> Result<()> {
        if let Operation::JsonTask { path } = self {
            let is_json = path
                .extension()
                .map(|ext| ext == "json")
                .unwrap_or(false);
            if !is_json {
                return Err(DomainError::NotAJsonTask(path.display().to_string()));
            }
        }
        Ok(())
    }

    /// Automatic file formatting runs on every save, so it stays quiet
    pub fn notifies_on_success(&self) -> bool {
        !matches!(
            self,
            Operation::FormatFile {
                mode: FormatMode::Auto,
                ..
            }
        )
    }

    /// Human-readable summary shown after a successful run
    pub fn describe(&self) -> String {
        let file_name = || {
            self.path()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.path().display().to_string())
        };
        match self {
            Operation::FormatFile { mode, .. } => {
                format!("{} formatted file {}", mode, file_name())
            }
            Operation::FormatDirectory { mode, path } => {
                format!("{} formatted directory {}", mode, path.display())
            }
            Operation::CompressFile { .. } => format!("compressed file {}", file_name()),
            Operation::CompressDirectory { path } => {
                format!("compressed directory {}", path.display())
            }
            Operation::JsonTask { .. } => format!("ran JSON task {}", file_name()),
        }
    }
}
