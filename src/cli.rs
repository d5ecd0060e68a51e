//! CLI argument definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::{SearchBackendKind, Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// ripgrep, one process per symbol
    Rg,
    /// In-process walk and regex
    Native,
}

impl From<BackendArg> for SearchBackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Rg => SearchBackendKind::Ripgrep,
            BackendArg::Native => SearchBackendKind::Native,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "ksym-locator",
    version,
    about = "Map the symbols of a Linux kernel image to the source files defining them",
    after_help = "\
EXAMPLES:
    ksym-locator vmlinuz                       Search with default settings
    ksym-locator --backend native zImage       Search without ripgrep
    ksym-locator --json bzImage > report.json  Machine readable report"
)]
pub struct Args {
    /// Kernel image to analyse
    #[arg(value_name = "KERNEL")]
    pub kernel: PathBuf,

    /// Settings JSON (default: ~/.config/ksym-locator/settings.json)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the final report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Override the configured search backend
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Apply command line overrides on top of loaded settings
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(backend) = self.backend {
            settings.search_backend = backend.into();
        }
    }

    pub fn log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let args = Args::try_parse_from(["ksym-locator", "vmlinuz"]).unwrap();
        assert_eq!(args.kernel, PathBuf::from("vmlinuz"));
        assert!(!args.json);
        assert_eq!(args.log_level(), log::LevelFilter::Info);
    }

    #[test]
    fn test_backend_override() {
        let args =
            Args::try_parse_from(["ksym-locator", "--backend", "native", "-v", "zImage"]).unwrap();
        let mut settings = Settings::default();
        args.apply_to(&mut settings);
        assert_eq!(settings.search_backend, SearchBackendKind::Native);
        assert_eq!(args.log_level(), log::LevelFilter::Debug);
    }

    #[test]
    fn test_kernel_is_required() {
        assert!(Args::try_parse_from(["ksym-locator"]).is_err());
    }
}
