//! Cascade reporting for account deletion.
//!
//! Deletion is intentionally not a transaction: each step runs regardless of
//! earlier failures, and the report makes the best-effort policy an explicit,
//! testable structure.

use serde::Serialize;

use vibe_core::Did;

/// Outcome of a single cascade step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum StepOutcome {
    Completed,
    /// Nothing to do (e.g. the resource was already gone).
    Skipped(String),
    /// The step failed; later steps still ran.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeStep {
    pub name: &'static str,
    pub outcome: StepOutcome,
}

/// Per-step record of one `delete_identity` run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub did: Did,
    pub steps: Vec<CascadeStep>,
}

impl CascadeReport {
    pub fn new(did: Did) -> Self {
        Self {
            did,
            steps: Vec::new(),
        }
    }

    pub fn record(&mut self, name: &'static str, outcome: StepOutcome) {
        self.steps.push(CascadeStep { name, outcome });
    }

    /// True when no step failed (skips count as success).
    pub fn fully_completed(&self) -> bool {
        self.steps
            .iter()
            .all(|s| !matches!(s.outcome, StepOutcome::Failed(_)))
    }
}
