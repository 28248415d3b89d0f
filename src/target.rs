use ndarray::Array2;

use crate::errors::PhaseError;
use crate::panel::ReferencePanel;
use crate::summary::IssueLog;

/// Sentinel for a missing genotype call in [`TargetGenotypes::calls`].
pub const MISSING: i8 = -1;

/// The unphased, partially-missing target genotype matrix.
pub struct TargetGenotypes {
    /// Pt × N, entries in `{0, 1, 2, MISSING}`.
    pub calls: Array2<i8>,
    /// Reference-marker index (0-based) each typed row maps to, length Pt.
    /// Computed once at ingestion; positions absent from the reference are
    /// dropped before this struct is built (see [`TargetGenotypes::new`]).
    pub x_to_h_idx: Vec<usize>,
    pub x_pos: Vec<u32>,
    pub sample_ids: Vec<String>,
}

impl TargetGenotypes {
    /// Builds a `TargetGenotypes` from a raw typed matrix, validating and
    /// computing the `x_to_h_idx` bijection against `panel`.
    ///
    /// `raw_pos` must be sorted strictly increasing (the target loader's
    /// contract). Positions absent from `panel` are dropped from the
    /// matrix entirely and reported via `issues` as `PositionMismatch`
    /// (non-fatal). A non-missing entry outside `{0,1,2}` is
    /// `InvalidGenotype` and aborts ingestion (fatal).
    pub fn new(
        raw_calls: Array2<i8>,
        raw_pos: Vec<u32>,
        sample_ids: Vec<String>,
        panel: &ReferencePanel,
        issues: &IssueLog,
    ) -> Result<Self, PhaseError> {
        let (pt, n) = raw_calls.dim();
        assert_eq!(pt, raw_pos.len(), "raw_calls row count must match raw_pos");

        for row in 0..pt {
            for col in 0..n {
                let v = raw_calls[[row, col]];
                if v != MISSING && !(0..=2).contains(&v) {
                    return Err(PhaseError::InvalidGenotype {
                        sample: col,
                        position: row,
                        value: v,
                    });
                }
            }
        }

        let mut keep_rows = Vec::with_capacity(pt);
        let mut x_to_h_idx = Vec::with_capacity(pt);
        let mut x_pos = Vec::with_capacity(pt);
        for (row, &p) in raw_pos.iter().enumerate() {
            match panel.pos.binary_search(&p) {
                Ok(ref_idx) => {
                    keep_rows.push(row);
                    x_to_h_idx.push(ref_idx);
                    x_pos.push(p);
                }
                Err(_) => issues.push(PhaseError::PositionMismatch { position: p }),
            }
        }

        let mut calls = Array2::<i8>::from_elem((keep_rows.len(), n), MISSING);
        for (new_row, &old_row) in keep_rows.iter().enumerate() {
            calls.row_mut(new_row).assign(&raw_calls.row(old_row));
        }

        Ok(TargetGenotypes {
            calls,
            x_to_h_idx,
            x_pos,
            sample_ids,
        })
    }

    pub fn n_typed_markers(&self) -> usize {
        self.calls.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.calls.ncols()
    }

    /// Typed row indices whose `x_to_h_idx` falls within `[start, end)`.
    pub fn rows_in_reference_range(&self, start: usize, end: usize) -> std::ops::Range<usize> {
        let lo = self.x_to_h_idx.partition_point(|&r| r < start);
        let hi = self.x_to_h_idx.partition_point(|&r| r < end);
        lo..hi
    }
}
