//! Records segment starts, window indices, and haplotype labels into each
//! individual's two-strand mosaic.

use crate::breakpoint::{BreakpointDecision, SpanView};
use crate::errors::PhaseError;
use crate::panel::Window;

/// One contiguous run of a mosaic: `hap_label` applies from `start_marker`
/// (reference-marker index, 0-based) until the next segment's start or the
/// reference end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start_marker: u32,
    pub window_id: u32,
    pub hap_label: u32,
}

/// A single strand's segment sequence, append-only. Invariants: the first
/// `start_marker` is 0 (the first reference position), and `start_marker`
/// is strictly increasing thereafter.
#[derive(Debug, Clone, Default)]
pub struct Mosaic {
    pub segments: Vec<Segment>,
}

impl Mosaic {
    /// Seeds the mosaic at the first reference marker with the first
    /// window's chosen haplotype.
    pub fn seed(hap_label: u32, window_id: u32) -> Self {
        Mosaic { segments: vec![Segment { start_marker: 0, window_id, hap_label }] }
    }

    /// Appends a segment. A zero-width append (same `start_marker` as the
    /// last segment) overwrites it instead of creating a degenerate
    /// segment; an append sharing the last segment's `hap_label` is dropped
    /// (adjacent same-label segments are collapsed eagerly, so the
    /// strictly-increasing invariant always holds on the label boundaries
    /// that remain).
    pub fn push(&mut self, seg: Segment) {
        if let Some(last) = self.segments.last_mut() {
            assert!(
                seg.start_marker >= last.start_marker,
                "mosaic segments must be appended in non-decreasing marker order"
            );
            if seg.start_marker == last.start_marker {
                *last = seg;
                return;
            }
            if last.hap_label == seg.hap_label {
                return;
            }
        }
        self.segments.push(seg);
    }

    pub fn is_monotone(&self) -> bool {
        self.segments.first().map(|s| s.start_marker == 0).unwrap_or(false)
            && self.segments.windows(2).all(|w| w[0].start_marker < w[1].start_marker)
    }
}

/// Both strands' mosaics for one target individual.
#[derive(Debug, Clone)]
pub struct PhaseResult {
    pub strands: [Mosaic; 2],
}

/// Applies one window's [`BreakpointDecision`] to both strand mosaics,
/// converting span offsets to reference-marker indices via the combined
/// span's `XtoH_idx` lookup.
pub fn apply_window_decision(
    strands: &mut [Mosaic; 2],
    decision: &BreakpointDecision,
    prev_pair: (u32, u32),
    window_g: &Window,
    window_g_index: u32,
    span: &SpanView,
) -> Result<(), PhaseError> {
    apply_strand(
        &mut strands[0],
        decision.t1,
        prev_pair.0,
        decision.pair.0,
        window_g,
        window_g_index,
        span,
    )?;
    apply_strand(
        &mut strands[1],
        decision.t2,
        prev_pair.1,
        decision.pair.1,
        window_g,
        window_g_index,
        span,
    )?;
    Ok(())
}

fn apply_strand(
    mosaic: &mut Mosaic,
    t: i64,
    hap_prev: u32,
    hap_curr: u32,
    window_g: &Window,
    window_g_index: u32,
    span: &SpanView,
) -> Result<(), PhaseError> {
    let window_g_first_marker = window_g.range.0 as u32;

    if t == -1 {
        // Case 1: no breakpoint. Current window is one segment starting at
        // its first reference marker.
        mosaic.push(Segment {
            start_marker: window_g_first_marker,
            window_id: window_g_index,
            hap_label: hap_curr,
        });
        return Ok(());
    }

    let l = span.len();
    if t as usize == l {
        // Case 2: the previous haplotype fully covers the current window.
        mosaic.push(Segment {
            start_marker: window_g_first_marker,
            window_id: window_g_index,
            hap_label: hap_prev,
        });
        return Ok(());
    }

    // Case 3: a breakpoint strictly inside the span.
    let t = t as usize;
    let x_bkpt = span.reference_marker_at(t).ok_or_else(|| PhaseError::BreakpointInvariantViolation {
        position: t,
        expected_start: span.prev_window_first_marker(),
        expected_end: window_g.range.1,
    })?;

    if x_bkpt >= window_g.range.0 && x_bkpt < window_g.range.1 {
        // Normal case: breakpoint falls inside window g itself.
        mosaic.push(Segment {
            start_marker: window_g_first_marker,
            window_id: window_g_index,
            hap_label: hap_prev,
        });
        mosaic.push(Segment {
            start_marker: x_bkpt as u32,
            window_id: window_g_index,
            hap_label: hap_curr,
        });
    } else if x_bkpt >= span.prev_window_first_marker() && x_bkpt < window_g.range.0 {
        // The new haplotype actually started earlier, in window g-1:
        // rewrite so window g-1 gets a late segment, and window g starts
        // clean with hap_curr.
        mosaic.push(Segment {
            start_marker: x_bkpt as u32,
            window_id: window_g_index - 1,
            hap_label: hap_curr,
        });
        mosaic.push(Segment {
            start_marker: window_g_first_marker,
            window_id: window_g_index,
            hap_label: hap_curr,
        });
    } else {
        return Err(PhaseError::BreakpointInvariantViolation {
            position: x_bkpt,
            expected_start: span.prev_window_first_marker(),
            expected_end: window_g.range.1,
        });
    }
    Ok(())
}
