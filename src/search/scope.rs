//! Architecture scoping with ripgrep-style `--glob` rules.
//!
//! Rules are evaluated in order and the last matching rule decides. A rule
//! prefixed with `!` excludes; any other rule includes. Once a whitelisting
//! rule exists, files matched by no rule are left out, as ripgrep does.

use regex::Regex;
use std::path::{Component, Path};

use crate::error::SearchError;
use crate::kernel::arch::ArchDir;

/// Outcome of evaluating the rules against one path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeDecision {
    Include,
    Exclude,
    Unmatched,
}

#[derive(Debug, Clone)]
struct ScopeRule {
    glob: String,
    exclude: bool,
    matcher: Regex,
}

/// Ordered include/exclude globs for one search
#[derive(Debug, Clone)]
pub struct ScopeRules {
    rules: Vec<ScopeRule>,
}

impl ScopeRules {
    /// Whole tree, minus `Documentation/` and every other architecture
    pub fn for_arch(dir: ArchDir) -> Self {
        let globs = [
            "*".to_string(),
            "!**/Documentation/*".to_string(),
            "!**/arch/*".to_string(),
            format!("**/arch/{}", dir.as_str()),
        ];
        Self::from_globs(&globs).expect("Invalid architecture scope globs")
    }

    pub fn from_globs<S: AsRef<str>>(globs: &[S]) -> Result<Self, SearchError> {
        let rules = globs
            .iter()
            .map(|glob| {
                let glob = glob.as_ref();
                let (exclude, pattern) = match glob.strip_prefix('!') {
                    Some(rest) => (true, rest),
                    None => (false, glob),
                };
                let matcher = glob_to_regex(pattern).map_err(|reason| SearchError::InvalidGlob {
                    glob: glob.to_string(),
                    reason,
                })?;
                Ok(ScopeRule {
                    glob: glob.to_string(),
                    exclude,
                    matcher,
                })
            })
            .collect::<Result<Vec<_>, SearchError>>()?;
        Ok(ScopeRules { rules })
    }

    /// Globs in evaluation order, as passed to `rg --glob`
    pub fn globs(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.glob.as_str()).collect()
    }

    fn has_whitelist(&self) -> bool {
        self.rules.iter().any(|r| !r.exclude)
    }

    /// Evaluate the rules for a `/`-separated path relative to the search root
    pub fn decision(&self, relative: &str) -> ScopeDecision {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.matcher.is_match(relative))
            .map(|rule| {
                if rule.exclude {
                    ScopeDecision::Exclude
                } else {
                    ScopeDecision::Include
                }
            })
            .unwrap_or(ScopeDecision::Unmatched)
    }

    /// Whether a directory should be descended into
    pub fn enters_dir(&self, relative: &str) -> bool {
        self.decision(relative) != ScopeDecision::Exclude
    }

    /// Whether a file is searched, given the directories that lead to it
    pub fn admits(&self, relative: &Path) -> bool {
        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        if parts.is_empty() {
            return false;
        }

        for depth in 1..parts.len() {
            if !self.enters_dir(&parts[..depth].join("/")) {
                return false;
            }
        }

        match self.decision(&parts.join("/")) {
            ScopeDecision::Include => true,
            ScopeDecision::Exclude => false,
            ScopeDecision::Unmatched => !self.has_whitelist(),
        }
    }
}

/// Translate a gitignore-style glob to an anchored regex.
///
/// A glob without `/` matches the final path component at any depth.
fn glob_to_regex(glob: &str) -> Result<Regex, String> {
    if glob.is_empty() {
        return Err("empty glob".to_string());
    }

    let anchored = glob.trim_start_matches('/');
    let mut out = String::from("^");
    if !glob.contains('/') {
        out.push_str("(?:.*/)?");
    }

    let chars: Vec<char> = anchored.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            '[' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&c| c == ']')
                    .ok_or_else(|| "unclosed character class".to_string())?;
                let body: String = chars[i + 1..i + 1 + close].iter().collect();
                let body = match body.strip_prefix('!') {
                    Some(rest) => format!("^{}", rest),
                    None => body,
                };
                out.push('[');
                out.push_str(&body);
                out.push(']');
                i += close + 2;
            }
            c => {
                out.push_str(&regex::escape(&c.to_string()));
                i += 1;
            }
        }
    }
    out.push('$');

    Regex::new(&out).map_err(|e| e.to_string())
}
