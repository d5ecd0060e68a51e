//! Rendering of search progress and the final run report.
//!
//! Nothing here influences the search; it only formats what the engine
//! already computed.

use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::kernel::arch::{ArchDir, ArchitectureName};
use crate::models::SymbolMatches;
use crate::search::SearchProgress;

/// Per-symbol progress lines with elapsed time and an estimate of what is left
#[derive(Debug, Clone, Copy)]
pub struct StepLogger {
    started: Instant,
    first_step: Option<Instant>,
}

impl StepLogger {
    pub fn start() -> Self {
        StepLogger {
            started: Instant::now(),
            first_step: None,
        }
    }

    /// Log one finished symbol, its files and the running counters
    pub fn log(&mut self, matches: &SymbolMatches, progress: &SearchProgress) {
        let now = Instant::now();
        let first_step = *self.first_step.get_or_insert(now);
        let eta = remaining(now.duration_since(first_step), progress)
            .map(format_duration)
            .unwrap_or_else(|| "-:--:--".to_string());

        log::info!(
            "[Search] [{}/{} {:.0}%] {} -> {} file(s) | found {}/{} | elapsed {} | eta {}",
            progress.processed,
            progress.total,
            progress.percent_complete(),
            matches.symbol,
            matches.files.len(),
            progress.found,
            progress.processed,
            format_duration(now.duration_since(self.started)),
            eta
        );
        for file in &matches.files {
            log::info!("[Search]     {}", file.display());
        }
    }
}

/// Time left at the pace measured since the first finished symbol.
///
/// `since_first` covers `processed - 1` symbols, so there is no estimate
/// until two symbols are done.
pub fn remaining(since_first: Duration, progress: &SearchProgress) -> Option<Duration> {
    if progress.is_complete() {
        return Some(Duration::ZERO);
    }
    if progress.processed < 2 {
        return None;
    }
    let left = (progress.total - progress.processed) as u32;
    Some(since_first / (progress.processed - 1) as u32 * left)
}

/// `H:MM:SS`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

/// One-line summary of a finished run
pub fn summary_line(progress: &SearchProgress) -> String {
    match progress.success_ratio() {
        Some(ratio) => format!(
            "Located {} of {} symbols ({:.1}%)",
            progress.found,
            progress.processed,
            ratio * 100.0
        ),
        None => "No symbols to search".to_string(),
    }
}

/// Everything a run found, in serialisable form
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub kernel_version: String,
    pub architecture: ArchitectureName,
    pub arch_dir: ArchDir,
    pub source_tree: PathBuf,
    /// Whether backported sources were merged into `source_tree`
    pub backported: bool,
    pub symbols: Vec<SymbolMatches>,
    pub progress: SearchProgress,
}

impl RunReport {
    pub fn summary(&self) -> String {
        summary_line(&self.progress)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// `symbol: file` for every match, followed by the summary line
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.symbols {
            for file in &entry.files {
                out.push_str(&format!("{}: {}\n", entry.symbol, file.display()));
            }
        }
        out.push_str(&self.summary());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_without_symbols() {
        assert_eq!(summary_line(&SearchProgress::new(0)), "No symbols to search");
    }

    #[test]
    fn test_summary_ratio() {
        let progress = SearchProgress {
            total: 4,
            processed: 4,
            found: 3,
        };
        assert_eq!(summary_line(&progress), "Located 3 of 4 symbols (75.0%)");
    }

    #[test]
    fn test_remaining_follows_average_pace() {
        let progress = SearchProgress {
            total: 10,
            processed: 5,
            found: 1,
        };
        assert_eq!(
            remaining(Duration::from_secs(8), &progress),
            Some(Duration::from_secs(10))
        );
        let mut first = SearchProgress::new(10);
        first.record(true);
        assert_eq!(remaining(Duration::ZERO, &first), None);

        let done = SearchProgress {
            total: 2,
            processed: 2,
            found: 2,
        };
        assert_eq!(remaining(Duration::from_secs(5), &done), Some(Duration::ZERO));
    }

    #[test]
    fn test_step_logger_times_from_first_symbol() {
        let mut steps = StepLogger::start();
        let matches = SymbolMatches {
            symbol: "do_fork".to_string(),
            files: vec![PathBuf::from("/kernels/4.4/kernel/fork.c")],
        };
        let mut progress = SearchProgress::new(3);
        progress.record(true);
        steps.log(&matches, &progress);
        let first = steps.first_step;
        progress.record(true);
        steps.log(&matches, &progress);

        assert!(first.is_some());
        assert_eq!(steps.first_step, first);
        assert!(first.unwrap() >= steps.started);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0:00:00");
        assert_eq!(format_duration(Duration::from_millis(61_900)), "0:01:01");
        assert_eq!(format_duration(Duration::from_secs(3 * 3600 + 125)), "3:02:05");
    }

    #[test]
    fn test_text_report_lists_every_file() {
        let report = RunReport {
            kernel_version: "3.2.102".to_string(),
            architecture: ArchitectureName::Mipsle,
            arch_dir: ArchDir::Mips,
            source_tree: PathBuf::from("/kernels/3.2.102"),
            backported: true,
            symbols: vec![
                SymbolMatches {
                    symbol: "do_fork".to_string(),
                    files: vec![
                        PathBuf::from("/kernels/3.2.102/kernel/fork.c"),
                        PathBuf::from("/kernels/3.2.102/arch/mips/kernel/syscall.c"),
                    ],
                },
                SymbolMatches {
                    symbol: "missing_sym".to_string(),
                    files: Vec::new(),
                },
            ],
            progress: SearchProgress {
                total: 2,
                processed: 2,
                found: 1,
            },
        };
        assert_eq!(
            report.to_text(),
            "do_fork: /kernels/3.2.102/kernel/fork.c\n\
             do_fork: /kernels/3.2.102/arch/mips/kernel/syscall.c\n\
             Located 1 of 2 symbols (50.0%)"
        );
    }

    #[test]
    fn test_json_report() {
        let report = RunReport {
            kernel_version: "4.4.302".to_string(),
            architecture: ArchitectureName::X86_64,
            arch_dir: ArchDir::X86,
            source_tree: PathBuf::from("/kernels/4.4.302"),
            backported: true,
            symbols: vec![SymbolMatches {
                symbol: "do_fork".to_string(),
                files: vec![PathBuf::from("/kernels/4.4.302/kernel/fork.c")],
            }],
            progress: SearchProgress {
                total: 1,
                processed: 1,
                found: 1,
            },
        };
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["architecture"], "x86_64");
        assert_eq!(value["arch_dir"], "x86");
        assert_eq!(value["symbols"][0]["symbol"], "do_fork");
        assert_eq!(value["progress"]["found"], 1);
    }
}
