//! Common test utilities for bindery integration tests.
//!
//! Provides `TestEnv` for isolated test environments that never read the
//! user's own `~/.config/bindery/config.kdl`.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// A test environment with isolated config and working directories.
///
/// - `work_dir`: current directory of every command (project config lives here)
/// - `config_dir`: system config directory (via `BINDERY_CONFIG_DIR`)
pub struct TestEnv {
    pub work_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            work_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the bindery binary inside this environment.
    pub fn bindery(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_bindery"));
        cmd.current_dir(self.work_dir.path());
        cmd.env("BINDERY_CONFIG_DIR", self.config_dir.path());
        cmd.env_remove("BINDERY_CONFIG");
        cmd.env_remove("BINDERY_LOG");
        cmd
    }

    pub fn path(&self) -> &Path {
        self.work_dir.path()
    }

    /// Copy a fixture into the working directory and return its path.
    pub fn fixture(&self, name: &str) -> PathBuf {
        let src = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name);
        let dst = self.work_dir.path().join(name);
        std::fs::copy(&src, &dst).unwrap();
        dst
    }

    /// Write a file into the working directory.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.work_dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Write the system config file.
    pub fn write_system_config(&self, contents: &str) {
        std::fs::write(self.config_dir.path().join("config.kdl"), contents).unwrap();
    }
}

/// Parse JSON from command stdout.
pub fn parse_json(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).unwrap()
}
