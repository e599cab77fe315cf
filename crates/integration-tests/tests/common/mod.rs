//! Shared fixtures: scratch directories and fake dlfmt scripts
#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dlfmt_core::application::{ConcurrencyGate, ProcessRunner};
use dlfmt_core::port::time_provider::SystemTimeProvider;
use dlfmt_infra_system::SubprocessExecutor;

/// Scratch directory removed on drop
pub struct TestDir {
    path: PathBuf,
}

impl TestDir {
    pub fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("dlfmt-it-{}-{}", name, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Write an executable `sh` script standing in for dlfmt
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.file(name, &format!("#!/bin/sh\n{}\n", body));
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.path.join(name)).unwrap_or_default()
    }
}

impl Drop for TestDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

/// Runner backed by real subprocesses
pub fn runner(max_concurrency: usize) -> Arc<ProcessRunner> {
    let executor = Arc::new(SubprocessExecutor::new(Arc::new(SystemTimeProvider)));
    Arc::new(ProcessRunner::new(
        ConcurrencyGate::new(max_concurrency),
        executor,
    ))
}
