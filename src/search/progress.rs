//! Per-run search progress accumulator.

use serde::Serialize;
use std::fmt;

/// Symbols processed so far, and how many of them matched at least one file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchProgress {
    pub total: usize,
    pub processed: usize,
    pub found: usize,
}

impl SearchProgress {
    pub fn new(total: usize) -> Self {
        SearchProgress {
            total,
            ..Default::default()
        }
    }

    /// Account for one finished symbol
    pub fn record(&mut self, matched: bool) {
        self.processed += 1;
        if matched {
            self.found += 1;
        }
    }

    /// `found / processed`, or `None` before anything was processed
    pub fn success_ratio(&self) -> Option<f64> {
        if self.processed == 0 {
            None
        } else {
            Some(self.found as f64 / self.processed as f64)
        }
    }

    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.processed as f64 / self.total as f64 * 100.0
        }
    }

    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}

impl fmt::Display for SearchProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} processed, {}/{} found",
            self.processed, self.total, self.found, self.processed
        )
    }
}
