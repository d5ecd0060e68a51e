//! Run phase tracking.
//!
//! A locator run moves through its phases strictly in order; the orchestrator
//! checks every transition and logs it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete phases of one locator run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunPhase {
    /// Unpack the image, read banner, architecture and symbols
    Inspection,

    /// Make sure the mainline (and backport tool) trees are on disk
    Provisioning,

    /// Generate and merge backported sources
    Backporting,

    /// Per-symbol pattern search
    Searching,

    Completed,

    Failed,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Inspection => "inspection",
            RunPhase::Provisioning => "provisioning",
            RunPhase::Backporting => "backporting",
            RunPhase::Searching => "searching",
            RunPhase::Completed => "completed",
            RunPhase::Failed => "failed",
        }
    }

    /// Phases reachable from this one
    pub fn valid_next_phases(&self) -> Vec<RunPhase> {
        match self {
            RunPhase::Inspection => vec![RunPhase::Provisioning, RunPhase::Failed],
            // Backporting is skipped for trees that need none
            RunPhase::Provisioning => {
                vec![RunPhase::Backporting, RunPhase::Searching, RunPhase::Failed]
            }
            RunPhase::Backporting => vec![RunPhase::Searching, RunPhase::Failed],
            RunPhase::Searching => vec![RunPhase::Completed, RunPhase::Failed],
            RunPhase::Completed | RunPhase::Failed => vec![],
        }
    }

    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        self.valid_next_phases().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Completed | RunPhase::Failed)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current phase plus the transitions taken so far
#[derive(Debug, Clone)]
pub struct RunState {
    phase: RunPhase,
    history: Vec<RunPhase>,
}

impl RunState {
    pub fn new() -> Self {
        RunState {
            phase: RunPhase::Inspection,
            history: vec![RunPhase::Inspection],
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn history(&self) -> &[RunPhase] {
        &self.history
    }

    /// Phases taken so far, e.g. `inspection -> provisioning -> searching`
    pub fn path(&self) -> String {
        self.history
            .iter()
            .map(|phase| phase.as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Move to `next`; invalid transitions are refused and logged
    pub fn transition(&mut self, next: RunPhase) -> bool {
        if !self.phase.can_transition_to(next) {
            log::error!(
                "[Orchestrator] [STATE] Invalid transition {} -> {}",
                self.phase,
                next
            );
            return false;
        }
        log::info!("[Orchestrator] [STATE] {} -> {}", self.phase, next);
        self.phase = next;
        self.history.push(next);
        true
    }
}

impl Default for RunState {
    fn default() -> Self {
        RunState::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_sequence() {
        let mut state = RunState::new();
        assert!(state.transition(RunPhase::Provisioning));
        assert!(state.transition(RunPhase::Searching));
        assert!(state.transition(RunPhase::Completed));
        assert!(state.phase().is_terminal());
        assert_eq!(state.history().len(), 4);
        assert_eq!(
            state.path(),
            "inspection -> provisioning -> searching -> completed"
        );
    }

    #[test]
    fn test_no_skipping_back() {
        let mut state = RunState::new();
        assert!(!state.transition(RunPhase::Searching));
        assert_eq!(state.phase(), RunPhase::Inspection);
        assert!(state.transition(RunPhase::Failed));
        assert!(!state.transition(RunPhase::Inspection));
    }
}
