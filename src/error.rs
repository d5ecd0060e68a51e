//! Unified error type hierarchy for ksym_locator
//!
//! Provides structured error handling with ConfigError, ImageError, ToolError,
//! BackportError, SearchError and the top-level LocatorError.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::kernel::git::GitError;
use crate::kernel::version::ParseVersionError;

/// Configuration file parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON in config: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Failures while running an external tool (unpacker, generator, rg, ...).
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error while waiting for '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' did not finish within {timeout:?}")]
    TimedOut { program: String, timeout: Duration },

    #[error("'{program}' exited with status {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
}

/// Kernel image inspection errors.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Cannot read kernel image {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No 'Linux version' banner found in the kernel image")]
    BannerNotFound,

    #[error("Invalid kernel version in banner: {0}")]
    InvalidVersion(#[from] ParseVersionError),

    #[error("Unsupported architecture: {0}")]
    UnsupportedArchitecture(String),

    #[error("Malformed ELF produced by the unpacker: {0}")]
    MalformedElf(String),

    #[error("Kernel unpacker failed: {0}")]
    Unpack(#[from] ToolError),
}

/// Backport resolution and tree generation errors.
#[derive(Error, Debug)]
pub enum BackportError {
    #[error("No backport available for Linux {version}")]
    NoBackportAvailable { version: String },

    #[error("Invalid backport rule: {0}")]
    InvalidRule(String),

    #[error("Backport tool failed: {0}")]
    Tool(#[from] ToolError),

    #[error("Failed to merge {scratch} into {target}: {source}")]
    Merge {
        scratch: PathBuf,
        target: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error during backport generation: {0}")]
    Io(#[from] io::Error),
}

/// Symbol search errors.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Invalid scope glob '{glob}': {reason}")]
    InvalidGlob { glob: String, reason: String },

    #[error("Search tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Search tool exited with status {code:?}: {stderr}")]
    ToolFailed { code: Option<i32>, stderr: String },

    #[error("Search task failed: {0}")]
    Task(String),
}

/// Global error type for a locator run.
///
/// Every variant is fatal for the run; the binary maps it to a non-zero exit.
#[derive(Error, Debug)]
pub enum LocatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Backport(#[from] BackportError),

    #[error(transparent)]
    Search(#[from] SearchError),
}

/// Top-level result type for locator operations.
pub type Result<T> = std::result::Result<T, LocatorError>;
