//! In-process search backend: walkdir plus `regex::bytes`.
//!
//! Follows the same scope rules as the ripgrep backend. Hidden entries and
//! files containing a NUL byte are skipped.

use regex::bytes::{Regex, RegexBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use super::scope::ScopeRules;
use super::{SearchQuery, TextSearcher};
use crate::error::SearchError;

#[derive(Debug, Clone, Default)]
pub struct NativeSearcher;

impl NativeSearcher {
    pub fn new() -> Self {
        NativeSearcher
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

fn relative_str(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn file_matches(path: &Path, matcher: &Regex) -> bool {
    match fs::read(path) {
        Ok(contents) => !contents.contains(&0) && matcher.is_match(&contents),
        Err(e) => {
            log::debug!("[Search] [NATIVE] Skipping unreadable {}: {}", path.display(), e);
            false
        }
    }
}

/// Walk `query.root` and return every scoped file matching `query.pattern`
pub fn search_tree(query: &SearchQuery) -> Result<Vec<PathBuf>, SearchError> {
    let matcher = RegexBuilder::new(&query.pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()?;
    let root = query.root.as_path();
    let scope: &ScopeRules = &query.scope;

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        if is_hidden(entry) {
            return false;
        }
        if entry.depth() > 0 && entry.file_type().is_dir() {
            return scope.enters_dir(&relative_str(root, entry.path()));
        }
        true
    });

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("[Search] [NATIVE] {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if scope.admits(relative) && file_matches(entry.path(), &matcher) {
            files.push(entry.path().to_path_buf());
        }
    }
    Ok(files)
}

impl TextSearcher for NativeSearcher {
    async fn files_with_matches(&self, query: &SearchQuery) -> Result<Vec<PathBuf>, SearchError> {
        let query = query.clone();
        tokio::task::spawn_blocking(move || search_tree(&query))
            .await
            .map_err(|e| SearchError::Task(e.to_string()))?
    }
}
