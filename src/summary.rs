use std::sync::Mutex;
use std::time::Duration;

use crate::errors::PhaseError;

/// Accumulates non-fatal issues (`PositionMismatch`, `InsufficientTypedMarkers`)
/// raised across the parallel window/individual loops. One instance is shared
/// behind an `Arc` by the whole pipeline run; each task pushes its own findings
/// and the driver folds them into a [`PhaseSummary`] at the stage barrier.
#[derive(Default)]
pub struct IssueLog {
    issues: Mutex<Vec<PhaseError>>,
}

impl IssueLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, issue: PhaseError) {
        debug_assert!(issue.is_recoverable());
        self.issues.lock().unwrap().push(issue);
    }

    pub fn into_summary(self) -> PhaseSummary {
        let mut summary = PhaseSummary::default();
        for issue in self.issues.into_inner().unwrap() {
            match issue {
                PhaseError::PositionMismatch { .. } => summary.position_mismatches += 1,
                PhaseError::InsufficientTypedMarkers { .. } => {
                    summary.insufficient_typed_windows += 1
                }
                other => {
                    // A fatal kind should never reach the log; surface it loudly in
                    // debug builds rather than silently miscounting it.
                    debug_assert!(false, "non-recoverable issue pushed to IssueLog: {other}");
                }
            }
        }
        summary
    }
}

/// Counts of recoverable issues encountered during a run, reported alongside
/// [`crate::pipeline::StageTimings`] as the summary output.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSummary {
    pub position_mismatches: usize,
    pub insufficient_typed_windows: usize,
}

/// Per-stage wall-clock timings, the other half of the summary output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StageTimings {
    pub pair_search: Duration,
    pub connector: Duration,
    pub breakpoint: Duration,
    pub mosaic: Duration,
    pub impute: Duration,
}
