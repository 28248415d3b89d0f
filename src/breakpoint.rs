//! Between two consecutive windows, resolve strand orientation and locate
//! up to one breakpoint per strand.

use crate::panel::Window;
use crate::target::{TargetGenotypes, MISSING};

/// A read-only view over the typed-marker span `[(g-2)*w+1, min(g*w, Pt))`
/// spanning the previous and current windows combined, for one individual.
/// Span positions `0..prev_len` belong to the previous window; the rest
/// belong to the current one.
pub struct SpanView<'a> {
    rows: Vec<(bool, usize)>, // (is_current_window, local row within that window)
    x: Vec<Option<i8>>,
    prev_window: &'a Window,
    cur_window: &'a Window,
    prev_len: usize,
    abs_row_start: usize,
    x_to_h_idx: &'a [usize],
}

impl<'a> SpanView<'a> {
    pub fn build(
        target: &'a TargetGenotypes,
        individual: usize,
        prev_window: &'a Window,
        cur_window: &'a Window,
    ) -> Self {
        let prev_range = target.rows_in_reference_range(prev_window.range.0, prev_window.range.1);
        let cur_range = target.rows_in_reference_range(cur_window.range.0, cur_window.range.1);

        let mut rows = Vec::with_capacity(prev_range.len() + cur_range.len());
        let mut x = Vec::with_capacity(rows.capacity());

        for row in prev_range.clone() {
            rows.push((false, row - prev_range.start));
            x.push(value_at(target, row, individual));
        }
        for row in cur_range.clone() {
            rows.push((true, row - cur_range.start));
            x.push(value_at(target, row, individual));
        }

        SpanView {
            rows,
            x,
            prev_window,
            cur_window,
            prev_len: prev_range.len(),
            abs_row_start: prev_range.start,
            x_to_h_idx: &target.x_to_h_idx,
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn prev_len(&self) -> usize {
        self.prev_len
    }

    /// Allele of haplotype `hap_label` at span position `idx`, 0 or 1.
    pub fn allele(&self, hap_label: u32, idx: usize) -> u8 {
        let (is_cur, local_row) = self.rows[idx];
        let window = if is_cur { self.cur_window } else { self.prev_window };
        let col = window.hapmap[hap_label as usize];
        window.unique_h[[local_row, col as usize]].round() as u8
    }

    /// Reference-marker index (0-based, panel-wide) that span offset `t`
    /// maps to, via `XtoH_idx`. `None` when `t` is out of range (the
    /// "entire span" sentinel).
    pub fn reference_marker_at(&self, t: usize) -> Option<usize> {
        if t >= self.len() {
            None
        } else {
            Some(self.x_to_h_idx[self.abs_row_start + t])
        }
    }

    pub fn prev_window_first_marker(&self) -> usize {
        self.prev_window.range.0
    }

    pub fn cur_window_first_marker(&self) -> usize {
        self.cur_window.range.0
    }
}

fn value_at(target: &TargetGenotypes, row: usize, individual: usize) -> Option<i8> {
    let v = target.calls[[row, individual]];
    if v == MISSING {
        None
    } else {
        Some(v)
    }
}

fn mismatch(span: &SpanView, idx: usize, hap_a: u32, hap_b: u32) -> bool {
    match span.x[idx] {
        None => false,
        Some(x) => (x as u8) != span.allele(hap_a, idx) + span.allele(hap_b, idx),
    }
}

/// One strand held at `s_const`, the other switches from `a` to `b` at
/// offset `t`. Returns `(t*, err(t*))`, ties broken by smallest `t`.
/// Maintains one running error counter, flipping a single term per step
/// rather than recomputing from scratch.
pub fn search_1d(span: &SpanView, s_const: u32, a: u32, b: u32) -> (usize, u32) {
    let l = span.len();
    let mismatch_a: Vec<bool> = (0..l).map(|idx| mismatch(span, idx, s_const, a)).collect();
    let mismatch_b: Vec<bool> = (0..l).map(|idx| mismatch(span, idx, s_const, b)).collect();

    let mut err: i64 = mismatch_b.iter().filter(|&&m| m).count() as i64;
    let mut best_err = err;
    let mut best_t = 0usize;

    for t in 1..=l {
        let idx = t - 1;
        if mismatch_b[idx] {
            err -= 1;
        }
        if mismatch_a[idx] {
            err += 1;
        }
        if err < best_err {
            best_err = err;
            best_t = t;
        }
    }
    (best_t, best_err as u32)
}

/// Both strands switch independently at `t1` (strand A, old `a_old` -> new
/// `a_new`) and `t2` (strand B, old `b_old` -> new `b_new`). `O(L^2)`; the
/// outer loop rebuilds the per-position strand-A allele in `O(L)`, the
/// inner loop over `t2` is incremental.
pub fn search_2d(
    span: &SpanView,
    a_old: u32,
    a_new: u32,
    b_old: u32,
    b_new: u32,
) -> (usize, usize, u32) {
    let l = span.len();
    let mut best_err = u32::MAX;
    let mut best_t1 = 0usize;
    let mut best_t2 = 0usize;

    for t1 in 0..=l {
        let allele_a: Vec<u32> = (0..l).map(|idx| if idx < t1 { a_old } else { a_new }).collect();

        let mismatch_old: Vec<bool> = (0..l)
            .map(|idx| match span.x[idx] {
                None => false,
                Some(x) => (x as u8) != span.allele(allele_a[idx], idx) + span.allele(b_old, idx),
            })
            .collect();
        let mismatch_new: Vec<bool> = (0..l)
            .map(|idx| match span.x[idx] {
                None => false,
                Some(x) => (x as u8) != span.allele(allele_a[idx], idx) + span.allele(b_new, idx),
            })
            .collect();

        let mut err: i64 = mismatch_new.iter().filter(|&&m| m).count() as i64;
        if (err as u32) < best_err {
            best_err = err as u32;
            best_t1 = t1;
            best_t2 = 0;
        }

        for t2 in 1..=l {
            let idx = t2 - 1;
            if mismatch_new[idx] {
                err -= 1;
            }
            if mismatch_old[idx] {
                err += 1;
            }
            if (err as u32) < best_err {
                best_err = err as u32;
                best_t1 = t1;
                best_t2 = t2;
            }
        }
    }
    (best_t1, best_t2, best_err)
}

/// One strand's resolved breakpoint offset: `-1` means "no breakpoint" (the
/// new haplotype covers the current window from its first marker); any
/// other value is an offset into the combined span, `span.len()` meaning
/// "the old haplotype covers the whole current window too".
pub type StrandBreak = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakpointDecision {
    /// `(strand1_label, strand2_label)` for the current window, orientation
    /// resolved against the previous window's pair.
    pub pair: (u32, u32),
    pub t1: StrandBreak,
    pub t2: StrandBreak,
}

fn to_strand_break(t: usize) -> StrandBreak {
    if t == 0 {
        -1
    } else {
        t as i64
    }
}

/// Resolves orientation and breakpoints between `prev` (the previous
/// window's already strand-labelled pair) and `next` (the current window's
/// unordered candidate pair).
pub fn resolve(span: &SpanView, prev: (u32, u32), next: (u32, u32)) -> BreakpointDecision {
    let (i, j) = prev;
    let (k, l) = next;

    let same_set = (i == k && j == l) || (i == l && j == k);
    if same_set {
        return BreakpointDecision { pair: (i, j), t1: -1, t2: -1 };
    }

    let i_in_next = i == k || i == l;
    let j_in_next = j == k || j == l;

    if i_in_next && !j_in_next {
        let new_label = if i == k { l } else { k };
        let (t, _err) = search_1d(span, i, j, new_label);
        return BreakpointDecision { pair: (i, new_label), t1: -1, t2: to_strand_break(t) };
    }
    if j_in_next && !i_in_next {
        let new_label = if j == k { l } else { k };
        let (t, _err) = search_1d(span, j, i, new_label);
        return BreakpointDecision { pair: (new_label, j), t1: to_strand_break(t), t2: -1 };
    }

    // Both strands differ: 2-d search over both pairings, pick the one
    // with the lower joint error.
    let (t1_s, t2_s, err_s) = search_2d(span, i, k, j, l);
    let (t1_c, t2_c, err_c) = search_2d(span, i, l, j, k);

    if err_s <= err_c {
        BreakpointDecision { pair: (k, l), t1: to_strand_break(t1_s), t2: to_strand_break(t2_s) }
    } else {
        BreakpointDecision { pair: (l, k), t1: to_strand_break(t1_c), t2: to_strand_break(t2_c) }
    }
}
