//! Per-window optimal-pair search: for each individual, find the pair of
//! unique haplotype columns whose sum best reconstructs the observed typed
//! genotypes.

use ndarray::{Array1, Array2, Axis};

use crate::errors::PhaseError;
use crate::scratch::PAIR_SEARCH_SCRATCH;

/// Sentinel for "no call at this marker/individual" in a raw `Xw` matrix
/// before [`prepare_xw`] fills it in. Must be a value `prepare_xw`'s
/// equality check can actually match, which rules out `NaN`.
pub const MISSING_F32: f32 = f32::MIN;

/// Per-individual optimal unique-haplotype pair and its score, for one
/// window.
pub struct PairSearchResult {
    /// `j[i] <= k[i]`, both 0-based indices into the window's unique columns.
    pub j: Vec<u32>,
    pub k: Vec<u32>,
    /// `s[i] = min_{j<=k} ||Xw[:,i] - Hw[:,j] - Hw[:,k]||^2`.
    pub score: Vec<f64>,
}

/// Fills missing entries of a raw typed-genotype window with `2 * altfreq`
/// for that marker (or zero if the whole row is missing), and rejects any
/// row that is still non-finite afterwards.
pub fn prepare_xw(
    raw: &Array2<f32>,
    missing: f32,
    altfreq: &[f32],
    window_index: usize,
) -> Result<Array2<f32>, PhaseError> {
    let (p, n) = raw.dim();
    if p == 0 {
        return Err(PhaseError::EmptyWindow { window: window_index, p: 0, d: 0 });
    }
    assert_eq!(altfreq.len(), p, "altfreq must have one entry per marker");

    let mut xw = raw.clone();
    for row in 0..p {
        let fill = 2.0 * altfreq[row];
        for col in 0..n {
            if xw[[row, col]] == missing {
                xw[[row, col]] = fill;
            }
        }
    }

    for v in xw.iter() {
        if !v.is_finite() {
            return Err(PhaseError::NumericalAnomaly {
                context: format!("prepare_xw window {window_index}"),
            });
        }
    }

    Ok(xw)
}

/// Fills a row whose every entry is missing with zero rather than `2*altfreq`.
/// Call this before [`prepare_xw`] when a caller cannot guarantee altfreq is
/// meaningful for all-missing rows; `prepare_xw` alone would otherwise fill
/// with `2*altfreq` even for an all-missing row, which is also a valid
/// finite value but meaningless when altfreq itself is undefined for such a
/// row (e.g. computed from zero observations).
pub fn zero_fill_all_missing_rows(raw: &mut Array2<f32>, missing: f32) {
    let (p, n) = raw.dim();
    for row in 0..p {
        if (0..n).all(|col| raw[[row, col]] == missing) {
            for col in 0..n {
                raw[[row, col]] = 0.0;
            }
        }
    }
}

/// The core `O(d^2 n)` search: expand the squared distance into a constant
/// part, a pairwise `M[j,k]` term, and a per-individual `N[i,j]` term, then
/// scan all `j<=k` for the minimiser.
pub fn search_window(
    xw: &Array2<f32>,
    hw: &Array2<f32>,
    window_index: usize,
) -> Result<PairSearchResult, PhaseError> {
    let (p, n) = xw.dim();
    let (p_h, d) = hw.dim();
    assert_eq!(p, p_h, "Xw and Hw must share the same marker dimension");
    if d == 0 || p == 0 {
        return Err(PhaseError::EmptyWindow { window: window_index, p, d });
    }

    // G[j,k] = h_j . h_k
    let g: Array2<f64> = {
        let hw64 = hw.mapv(|v| v as f64);
        hw64.t().dot(&hw64)
    };
    // N[i,j] = 2 * x_i . h_j
    let nmat: Array2<f64> = {
        let xw64 = xw.mapv(|v| v as f64);
        let hw64 = hw.mapv(|v| v as f64);
        let mut n_mat = xw64.t().dot(&hw64);
        n_mat.mapv_inplace(|v| 2.0 * v);
        n_mat
    };

    let sum_sq_x: Array1<f64> = xw
        .mapv(|v| (v as f64) * (v as f64))
        .sum_axis(Axis(0));

    for v in g.iter().chain(nmat.iter()) {
        if !v.is_finite() {
            return Err(PhaseError::NumericalAnomaly {
                context: format!("pair search window {window_index}"),
            });
        }
    }

    let mut j_out = vec![0u32; n];
    let mut k_out = vec![0u32; n];
    let mut score_out = vec![f64::INFINITY; n];

    for individual in 0..n {
        let mut best_score = f64::INFINITY;
        let mut best_j = 0u32;
        let mut best_k = 0u32;

        for k in 0..d {
            let m_kk = 4.0 * g[[k, k]];
            for j in 0..=k {
                let m_jk = if j == k {
                    m_kk
                } else {
                    2.0 * g[[j, k]] + g[[j, j]] + g[[k, k]]
                };
                let score = m_jk - nmat[[individual, j]] - nmat[[individual, k]];
                if score < best_score {
                    best_score = score;
                    best_j = j as u32;
                    best_k = k as u32;
                }
            }
        }

        j_out[individual] = best_j;
        k_out[individual] = best_k;
        score_out[individual] = best_score + sum_sq_x[individual];
    }

    Ok(PairSearchResult { j: j_out, k: k_out, score: score_out })
}

/// Scale guard for `d > max_haplotypes`. Selects `keep` candidate columns per
/// individual by a cheap score — `N[i,.]`, optionally weighted by
/// `1/altfreq` per marker before the dot product — then runs the exact
/// `O(keep^2)` search restricted to that subset and maps the winning pair
/// back to full window-column indices. This is a performance lever, not a
/// correctness one: the only contract is that the returned `j <= k` is
/// feasible.
pub fn search_window_thinned(
    xw: &Array2<f32>,
    hw: &Array2<f32>,
    keep: usize,
    scale_by_inverse_altfreq: bool,
    altfreq: Option<&[f32]>,
    window_index: usize,
) -> Result<PairSearchResult, PhaseError> {
    let (p, n) = xw.dim();
    let (_, d) = hw.dim();
    if d == 0 || p == 0 {
        return Err(PhaseError::EmptyWindow { window: window_index, p, d });
    }
    let keep = keep.min(d).max(1);

    let mut j_out = vec![0u32; n];
    let mut k_out = vec![0u32; n];
    let mut score_out = vec![f64::INFINITY; n];

    // Runs the whole thinned search inside the scratch pool's borrow scope:
    // the guard can't outlive this closure, so everything that touches the
    // weight buffer has to happen in here.
    PAIR_SEARCH_SCRATCH.with(|pool| {
        let mut weights = pool.acquire(Vec::new);
        weights.clear();
        weights.resize(p, 1.0);
        if scale_by_inverse_altfreq {
            if let Some(af) = altfreq {
                for (w, &f) in weights.iter_mut().zip(af.iter()) {
                    *w = if f > 0.0 { 1.0 / f as f64 } else { 1.0 };
                }
            }
        }

        for individual in 0..n {
            let mut thin_scores: Vec<(f64, u32)> = (0..d)
                .map(|col| {
                    let mut acc = 0.0f64;
                    for row in 0..p {
                        acc += (xw[[row, individual]] as f64) * (hw[[row, col]] as f64) * weights[row];
                    }
                    (acc, col as u32)
                })
                .collect();
            // Largest score first; ties broken by lowest column index.
            thin_scores.sort_by(|a, b| {
                b.0.partial_cmp(&a.0)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.1.cmp(&b.1))
            });
            let subset: Vec<u32> = thin_scores.into_iter().take(keep).map(|(_, col)| col).collect();

            let mut best_score = f64::INFINITY;
            let mut best_j = subset[0];
            let mut best_k = subset[0];
            for (ci, &col_k) in subset.iter().enumerate() {
                for &col_j in &subset[..=ci] {
                    let (lo, hi) = if col_j <= col_k { (col_j, col_k) } else { (col_k, col_j) };
                    let h_j = hw.column(lo as usize);
                    let h_k = hw.column(hi as usize);
                    let mut dist = 0.0f64;
                    for row in 0..p {
                        let x = xw[[row, individual]] as f64;
                        let reconstructed = h_j[row] as f64 + h_k[row] as f64;
                        let diff = x - reconstructed;
                        dist += diff * diff;
                    }
                    if dist < best_score {
                        best_score = dist;
                        best_j = lo;
                        best_k = hi;
                    }
                }
            }

            j_out[individual] = best_j;
            k_out[individual] = best_k;
            score_out[individual] = best_score;
        }
    });

    Ok(PairSearchResult { j: j_out, k: k_out, score: score_out })
}
