use thiserror::Error;

/// The error kinds the compute pipeline can raise.
///
/// Fatal kinds (`EmptyWindow`, `InvalidGenotype`, `NumericalAnomaly`,
/// `BreakpointInvariantViolation`) are meant to propagate with `?` and abort
/// the run. `PositionMismatch` and `InsufficientTypedMarkers` are recoverable
/// and are collected into a [`crate::summary::PhaseSummary`] instead of being
/// returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhaseError {
    #[error("window {window} is empty (p={p}, d={d})")]
    EmptyWindow { window: usize, p: usize, d: usize },

    #[error("sample {sample} has invalid genotype {value} at typed position index {position}")]
    InvalidGenotype {
        sample: usize,
        position: usize,
        value: i8,
    },

    #[error("typed position {position} is absent from the reference panel")]
    PositionMismatch { position: u32 },

    #[error("non-finite value encountered in {context}")]
    NumericalAnomaly { context: String },

    #[error("window {window} has {typed} typed markers, below min_typed_snps={min_typed_snps}")]
    InsufficientTypedMarkers {
        window: usize,
        typed: usize,
        min_typed_snps: usize,
    },

    #[error(
        "breakpoint at reference position {position} fell outside the expected span [{expected_start}, {expected_end})"
    )]
    BreakpointInvariantViolation {
        position: usize,
        expected_start: usize,
        expected_end: usize,
    },
}

impl PhaseError {
    /// `true` for the two kinds that degrade gracefully instead of aborting
    /// the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PhaseError::PositionMismatch { .. } | PhaseError::InsufficientTypedMarkers { .. }
        )
    }
}
