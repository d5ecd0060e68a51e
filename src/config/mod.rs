//! Run settings: tree locations, remotes, external tools and timeouts.
//!
//! Settings are stored as JSON (see [`loader`]); every field has a default so a
//! partial file, or no file at all, is valid.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::kernel::sources::{BACKPORTS_REMOTE, MAINLINE_REMOTE};

/// Which text-search implementation the engine uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackendKind {
    /// External ripgrep process per symbol
    Ripgrep,
    /// In-process walk + regex
    Native,
}

/// Locator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root holding mainline trees, one directory per version
    pub kernels_root: PathBuf,
    /// Root holding backport tool trees, one directory per backport tag
    pub backports_root: PathBuf,
    /// Mainline (stable) kernel remote
    pub mainline_url: String,
    /// Backports tooling remote
    pub backports_url: String,
    pub search_backend: SearchBackendKind,
    pub ripgrep_binary: String,
    /// Interpreter used to run the backport generator
    pub python: String,
    /// Generator script, relative to the backport tool tree
    pub generator_script: String,
    pub two_to_three: String,
    pub reindent: String,
    /// Kernel image unpacker / kallsyms recovery tool
    pub unpacker: String,
    pub clone_timeout_secs: u64,
    pub generate_timeout_secs: u64,
    pub search_timeout_secs: u64,
    pub unpack_timeout_secs: u64,
    /// Directory receiving the per-run log file
    pub log_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            kernels_root: PathBuf::from("/kernels"),
            backports_root: PathBuf::from("/backports"),
            mainline_url: MAINLINE_REMOTE.to_string(),
            backports_url: BACKPORTS_REMOTE.to_string(),
            search_backend: SearchBackendKind::Ripgrep,
            ripgrep_binary: "rg".to_string(),
            python: "python3".to_string(),
            generator_script: "gentree.py".to_string(),
            two_to_three: "2to3".to_string(),
            reindent: "reindent".to_string(),
            unpacker: "vmlinux-to-elf".to_string(),
            clone_timeout_secs: 3600,
            generate_timeout_secs: 7200,
            search_timeout_secs: 600,
            unpack_timeout_secs: 900,
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl Settings {
    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_secs)
    }

    pub fn generate_timeout(&self) -> Duration {
        Duration::from_secs(self.generate_timeout_secs)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn unpack_timeout(&self) -> Duration {
        Duration::from_secs(self.unpack_timeout_secs)
    }

    /// Reject settings that would make a run fail in a confusing way later.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("mainline_url", self.mainline_url.as_str()),
            ("backports_url", self.backports_url.as_str()),
            ("ripgrep_binary", self.ripgrep_binary.as_str()),
            ("python", self.python.as_str()),
            ("generator_script", self.generator_script.as_str()),
            ("unpacker", self.unpacker.as_str()),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "'{}' must not be empty",
                    name
                )));
            }
        }

        for (name, path) in [
            ("kernels_root", &self.kernels_root),
            ("backports_root", &self.backports_root),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "'{}' must not be empty",
                    name
                )));
            }
        }

        let timeouts = [
            ("clone_timeout_secs", self.clone_timeout_secs),
            ("generate_timeout_secs", self.generate_timeout_secs),
            ("search_timeout_secs", self.search_timeout_secs),
            ("unpack_timeout_secs", self.unpack_timeout_secs),
        ];
        for (name, secs) in timeouts {
            if secs == 0 {
                return Err(ConfigError::ValidationFailed(format!(
                    "'{}' must be greater than zero",
                    name
                )));
            }
        }

        Ok(())
    }
}
