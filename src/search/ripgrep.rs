//! ripgrep backend.

use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

use super::{SearchQuery, TextSearcher};
use crate::config::Settings;
use crate::error::SearchError;
use crate::system::run_tool;

/// Runs `rg --files-with-matches` once per query
#[derive(Debug, Clone)]
pub struct RipgrepSearcher {
    binary: String,
    timeout: Duration,
}

impl RipgrepSearcher {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        RipgrepSearcher {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        RipgrepSearcher::new(settings.ripgrep_binary.clone(), settings.search_timeout())
    }

    /// Command line for one query
    pub fn command(&self, query: &SearchQuery) -> Command {
        let mut command = Command::new(&self.binary);
        command.args([
            "--with-filename",
            "--multiline",
            "--ignore-case",
            "--files-with-matches",
            "--no-ignore-dot",
        ]);
        for glob in query.scope.globs() {
            command.arg("--glob").arg(glob);
        }
        command.arg("--regexp").arg(&query.pattern).arg(&query.root);
        command
    }
}

/// One path per non-empty output line
pub fn parse_file_list(stdout: &[u8]) -> Vec<PathBuf> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect()
}

impl TextSearcher for RipgrepSearcher {
    async fn files_with_matches(&self, query: &SearchQuery) -> Result<Vec<PathBuf>, SearchError> {
        let output = run_tool(self.command(query), self.timeout).await?;

        match output.code() {
            Some(0) => Ok(parse_file_list(&output.stdout)),
            Some(1) => Ok(Vec::new()),
            Some(2) => {
                log::warn!(
                    "[Search] [RG] Partial results, some files could not be searched: {}",
                    output.stderr_lossy()
                );
                Ok(parse_file_list(&output.stdout))
            }
            code => Err(SearchError::ToolFailed {
                code,
                stderr: output.stderr_lossy(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::arch::ArchDir;
    use crate::search::scope::ScopeRules;

    #[test]
    fn test_parse_file_list() {
        let files = parse_file_list(b"/k/kernel/fork.c\n\n/k/include/linux/sched.h\n");
        assert_eq!(
            files,
            vec![
                PathBuf::from("/k/kernel/fork.c"),
                PathBuf::from("/k/include/linux/sched.h")
            ]
        );
        assert!(parse_file_list(b"").is_empty());
    }

    #[test]
    fn test_command_line() {
        let searcher = RipgrepSearcher::new("rg", Duration::from_secs(5));
        let query = SearchQuery {
            pattern: "#define do_fork".to_string(),
            root: PathBuf::from("/kernels/2.6.32.68"),
            scope: ScopeRules::for_arch(ArchDir::Mips),
        };
        let command = searcher.command(&query);
        let args: Vec<String> = command
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(command.as_std().get_program(), "rg");
        assert_eq!(&args[..5], &[
            "--with-filename",
            "--multiline",
            "--ignore-case",
            "--files-with-matches",
            "--no-ignore-dot",
        ]);
        assert_eq!(&args[5..7], &["--glob", "*"]);
        assert_eq!(&args[11..13], &["--glob", "**/arch/mips"]);
        assert_eq!(&args[13..], &["--regexp", "#define do_fork", "/kernels/2.6.32.68"]);
    }
}
