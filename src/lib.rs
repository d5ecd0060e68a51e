//! ksym_locator
//!
//! Maps the kallsyms symbols of a Linux kernel image to the upstream source
//! files that define, export or reference them.
//!
//! The crate is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Symbols and per-symbol matches
//! - **config**: JSON settings and their loader
//! - **system**: External tool execution with timeouts
//! - **kernel**: Versions, backports, git provisioning, architectures, image inspection
//! - **search**: Pattern synthesis, architecture scoping and search backends
//! - **report**: Progress lines, summary and JSON report
//! - **orchestrator**: The sequential run pipeline
//! - **log_collector**: `log` backend persisting every line to disk
//! - **cli**: Command line arguments

pub mod error;
pub mod models;

pub mod config;
pub mod system;

pub mod kernel;
pub mod search;

pub mod report;
pub mod orchestrator;

pub mod log_collector;
pub mod cli;

// Re-export the log crate for macro usage
pub use log;

pub use log_collector::{LogCollector, LogLine};

pub use error::{
    BackportError, ConfigError, ImageError, LocatorError, Result, SearchError, ToolError,
};
pub use models::{Symbol, SymbolMatches};
pub use config::{SearchBackendKind, Settings};
pub use kernel::arch::{ArchDir, ArchitectureName};
pub use kernel::version::KernelVersion;
pub use orchestrator::{Pipeline, SourcePreparer};
pub use report::RunReport;
pub use search::{SearchProgress, SymbolPatterns, SymbolSearchEngine, TextSearcher};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
