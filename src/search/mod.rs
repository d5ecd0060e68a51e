//! Symbol Pattern Search Engine
//!
//! For each symbol, one case-insensitive multiline search over the
//! architecture-scoped source tree, returning the files with at least one
//! match. Symbols are searched one at a time in input order.

pub mod native;
pub mod patterns;
pub mod progress;
pub mod ripgrep;
pub mod scope;

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::{SearchBackendKind, Settings};
use crate::error::SearchError;
use crate::kernel::arch::ArchDir;
use crate::models::{Symbol, SymbolMatches};

pub use native::NativeSearcher;
pub use patterns::SymbolPatterns;
pub use progress::SearchProgress;
pub use ripgrep::RipgrepSearcher;
pub use scope::{ScopeDecision, ScopeRules};

/// One search request: a regex, a tree, and the scope globs
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub pattern: String,
    pub root: PathBuf,
    pub scope: ScopeRules,
}

/// Recursive text search returning the files that match
#[allow(async_fn_in_trait)]
pub trait TextSearcher {
    async fn files_with_matches(&self, query: &SearchQuery) -> Result<Vec<PathBuf>, SearchError>;
}

/// Searcher chosen from configuration
#[derive(Debug, Clone)]
pub enum SearchBackend {
    Ripgrep(RipgrepSearcher),
    Native(NativeSearcher),
}

impl SearchBackend {
    pub fn from_settings(settings: &Settings) -> Self {
        match settings.search_backend {
            SearchBackendKind::Ripgrep => {
                SearchBackend::Ripgrep(RipgrepSearcher::from_settings(settings))
            }
            SearchBackendKind::Native => SearchBackend::Native(NativeSearcher::new()),
        }
    }
}

impl TextSearcher for SearchBackend {
    async fn files_with_matches(&self, query: &SearchQuery) -> Result<Vec<PathBuf>, SearchError> {
        match self {
            SearchBackend::Ripgrep(searcher) => searcher.files_with_matches(query).await,
            SearchBackend::Native(searcher) => searcher.files_with_matches(query).await,
        }
    }
}

/// Matches for every symbol plus the final progress counters
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub matches: Vec<SymbolMatches>,
    pub progress: SearchProgress,
}

pub struct SymbolSearchEngine<S: TextSearcher> {
    searcher: S,
    root: PathBuf,
    scope: ScopeRules,
}

impl<S: TextSearcher> SymbolSearchEngine<S> {
    pub fn new(searcher: S, root: impl Into<PathBuf>, arch_dir: ArchDir) -> Self {
        SymbolSearchEngine {
            searcher,
            root: root.into(),
            scope: ScopeRules::for_arch(arch_dir),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn searcher(&self) -> &S {
        &self.searcher
    }

    pub fn query_for(&self, symbol: &Symbol) -> SearchQuery {
        SearchQuery {
            pattern: SymbolPatterns::new(&symbol.name).to_regex(),
            root: self.root.clone(),
            scope: self.scope.clone(),
        }
    }

    /// Files referencing a single symbol
    pub async fn find_references(&self, symbol: &Symbol) -> Result<SymbolMatches, SearchError> {
        let files = self
            .searcher
            .files_with_matches(&self.query_for(symbol))
            .await?;
        Ok(SymbolMatches {
            symbol: symbol.name.clone(),
            files,
        })
    }

    /// Search every symbol in order, calling `on_step` after each one.
    ///
    /// The first search failure aborts the run.
    pub async fn search_all<F>(
        &self,
        symbols: &[Symbol],
        mut on_step: F,
    ) -> Result<SearchReport, SearchError>
    where
        F: FnMut(&SymbolMatches, &SearchProgress),
    {
        let mut progress = SearchProgress::new(symbols.len());
        let mut matches = Vec::with_capacity(symbols.len());

        log::info!(
            "[Search] [START] {} symbols under {}",
            symbols.len(),
            self.root.display()
        );

        for symbol in symbols {
            let found = self.find_references(symbol).await?;
            progress.record(found.is_found());
            on_step(&found, &progress);
            matches.push(found);
        }

        log::info!("[Search] [DONE] {}", progress);
        Ok(SearchReport { matches, progress })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records queries and answers from a fixed table
    struct ScriptedSearcher {
        queries: Mutex<Vec<String>>,
        hit: &'static str,
    }

    impl TextSearcher for ScriptedSearcher {
        async fn files_with_matches(
            &self,
            query: &SearchQuery,
        ) -> Result<Vec<PathBuf>, SearchError> {
            self.queries.lock().unwrap().push(query.pattern.clone());
            if query.pattern.contains(self.hit) {
                Ok(vec![query.root.join("kernel/fork.c")])
            } else {
                Ok(Vec::new())
            }
        }
    }

    #[tokio::test]
    async fn test_search_all_in_order_with_progress() {
        let engine = SymbolSearchEngine::new(
            ScriptedSearcher {
                queries: Mutex::new(Vec::new()),
                hit: "do_fork",
            },
            "/kernels/4.4",
            ArchDir::X86,
        );
        let symbols = vec![Symbol::new("do_fork"), Symbol::new("missing_sym")];

        let mut steps = Vec::new();
        let report = engine
            .search_all(&symbols, |m, p| steps.push((m.symbol.clone(), p.processed, p.found)))
            .await
            .unwrap();

        assert_eq!(
            steps,
            vec![("do_fork".to_string(), 1, 1), ("missing_sym".to_string(), 2, 1)]
        );
        assert_eq!(report.matches[0].files, vec![PathBuf::from("/kernels/4.4/kernel/fork.c")]);
        assert!(report.matches[1].files.is_empty());
        assert_eq!(report.progress.success_ratio(), Some(0.5));

        let queries = engine.searcher().queries.lock().unwrap();
        assert!(queries[0].contains(r"EXPORT_SYMBOL\(do_fork\)"));
        assert!(queries[1].contains("missing_sym"));
    }

    #[tokio::test]
    async fn test_query_uses_arch_scope() {
        let engine = SymbolSearchEngine::new(NativeSearcher::new(), "/src", ArchDir::Sparc);
        let query = engine.query_for(&Symbol::new("sun4v_init"));
        assert_eq!(query.scope.globs().last(), Some(&"**/arch/sparc"));
        assert_eq!(query.root, PathBuf::from("/src"));
    }
}
