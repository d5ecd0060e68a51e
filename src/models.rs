//! Core data types for ksym_locator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A kernel symbol with its class marker split off.
///
/// Raw kallsyms names start with a one-character class marker (`T`, `t`,
/// `D`, ...). Only the name takes part in the search; the marker is kept for
/// reporting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub class: Option<char>,
    pub name: String,
}

impl Symbol {
    pub fn new(name: impl Into<String>) -> Self {
        Symbol {
            class: None,
            name: name.into(),
        }
    }

    /// Split a raw table entry into marker and name.
    ///
    /// Returns `None` for entries too short to hold a name.
    pub fn from_raw(raw: &str) -> Option<Self> {
        let mut chars = raw.chars();
        let class = chars.next()?;
        let name = chars.as_str();
        if name.is_empty() {
            return None;
        }
        Some(Symbol {
            class: Some(class),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Files referencing one symbol, in the order the search reported them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMatches {
    pub symbol: String,
    pub files: Vec<PathBuf>,
}

impl SymbolMatches {
    /// A symbol counts as found when at least one file matched
    pub fn is_found(&self) -> bool {
        !self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_strips_marker() {
        let symbol = Symbol::from_raw("Tdo_fork").unwrap();
        assert_eq!(symbol.class, Some('T'));
        assert_eq!(symbol.name, "do_fork");
    }

    #[test]
    fn test_from_raw_rejects_marker_only() {
        assert_eq!(Symbol::from_raw("t"), None);
        assert_eq!(Symbol::from_raw(""), None);
    }

    #[test]
    fn test_is_found() {
        let empty = SymbolMatches {
            symbol: "x".to_string(),
            files: vec![],
        };
        assert!(!empty.is_found());
    }
}
