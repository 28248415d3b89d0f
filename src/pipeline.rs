//! Orchestration: wires the six compute stages into two task-barrier phases
//! (a per-window loop, then a per-individual loop) and produces the dense
//! imputed output plus the summary the caller sees.

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use ndarray::Array2;
use rayon::prelude::*;

use crate::breakpoint::{self, SpanView};
use crate::config::PhaseConfig;
use crate::connector;
use crate::errors::PhaseError;
use crate::imputer;
use crate::mosaic::{self, Mosaic, PhaseResult};
use crate::pair_search::{self, MISSING_F32};
use crate::panel::ReferencePanel;
use crate::redundant::{self, BitPair, RedundantPairs};
use crate::summary::{IssueLog, PhaseSummary, StageTimings};
use crate::target::{TargetGenotypes, MISSING};

/// Per-window candidates for every individual, in whichever mode
/// `PhaseConfig::dynamic_programming` selects.
#[derive(Clone)]
enum WindowCandidates {
    Dp(Vec<RedundantPairs>),
    Intersect(Vec<BitPair>),
}

/// Final output of a full pipeline run.
pub struct PipelineOutput {
    pub results: Vec<PhaseResult>,
    pub imputed: Option<Array2<u8>>,
    pub summary: PhaseSummary,
    pub timings: StageTimings,
}

/// Orchestration entry point. Mirrors the `anyhow`-at-the-seams split used
/// elsewhere in this ecosystem: the engine underneath returns typed
/// [`PhaseError`]s, this boundary collapses them into `anyhow::Error`.
pub fn run(
    panel: &ReferencePanel,
    target: &TargetGenotypes,
    config: &PhaseConfig,
) -> anyhow::Result<PipelineOutput> {
    Ok(phase(panel, target, config)?)
}

/// Runs the full three-stage pipeline for every target individual.
pub fn phase(
    panel: &ReferencePanel,
    target: &TargetGenotypes,
    config: &PhaseConfig,
) -> Result<PipelineOutput, PhaseError> {
    panel.validate()?;
    info!(
        "starting phase run: {} windows, {} individuals",
        panel.n_windows(),
        target.n_samples()
    );
    let issues = IssueLog::new();

    let t0 = Instant::now();
    let candidates = run_pair_search_and_redundancy(panel, target, config, &issues)?;
    let pair_search_time = t0.elapsed();
    debug!("pair search + redundant expansion finished in {pair_search_time:?}");

    let t1 = Instant::now();
    let results = build_phase_results(panel, target, &candidates, config)?;
    // Connector, BreakpointSearch, and MosaicAssembler run as one
    // per-individual parallel region, so their timings aren't separable
    // without instrumenting every call site; the combined duration is
    // attributed to `connector` and the other two fields are left at zero
    // (see DESIGN.md).
    let per_individual_time = t1.elapsed();
    debug!("connector + breakpoint + mosaic finished in {per_individual_time:?}");

    let t2 = Instant::now();
    let imputed = if config.impute {
        Some(build_dense_output(panel, target, &results))
    } else {
        None
    };
    let impute_time = t2.elapsed();

    let timings = StageTimings {
        pair_search: pair_search_time,
        connector: per_individual_time,
        breakpoint: Duration::ZERO,
        mosaic: Duration::ZERO,
        impute: impute_time,
    };

    let summary = issues.into_summary();
    info!(
        "phase run complete: {} position mismatches, {} windows backfilled from a neighbour",
        summary.position_mismatches, summary.insufficient_typed_windows
    );

    Ok(PipelineOutput { results, imputed, summary, timings })
}

/// Stage 1: per-window parallelism over pair search and redundant
/// expansion. Windows with fewer than `min_typed_snps` typed markers are
/// left unset and backfilled from a neighbouring window afterward.
fn run_pair_search_and_redundancy(
    panel: &ReferencePanel,
    target: &TargetGenotypes,
    config: &PhaseConfig,
    issues: &IssueLog,
) -> Result<Vec<WindowCandidates>, PhaseError> {
    let n_windows = panel.n_windows();
    debug!("window loop starting over {n_windows} windows");

    let per_window: Vec<Result<Option<WindowCandidates>, PhaseError>> = (0..n_windows)
        .into_par_iter()
        .map(|g| pair_search_one_window(panel, target, config, g))
        .collect();

    // Rate-limits the InsufficientTypedMarkers warning to once per window id,
    // rather than once per borrowing individual.
    let mut warned_windows: std::collections::HashSet<usize> = std::collections::HashSet::new();

    let mut slots: Vec<Option<WindowCandidates>> = Vec::with_capacity(n_windows);
    for (g, result) in per_window.into_iter().enumerate() {
        match result? {
            Some(candidates) => slots.push(Some(candidates)),
            None => {
                let window = &panel.windows[g];
                let typed = target.rows_in_reference_range(window.range.0, window.range.1).len();
                if warned_windows.insert(g) {
                    warn!(
                        "window {g} has {typed} typed markers, below min_typed_snps={}; \
                         borrowing a neighbouring window's candidates",
                        config.min_typed_snps
                    );
                }
                issues.push(PhaseError::InsufficientTypedMarkers {
                    window: g,
                    typed,
                    min_typed_snps: config.min_typed_snps,
                });
                slots.push(None);
            }
        }
    }

    fill_neighbours(&mut slots);
    debug!("window loop finished, all {n_windows} windows have candidates");
    Ok(slots
        .into_iter()
        .map(|s| s.expect("every window must have candidates after neighbour backfill"))
        .collect())
}

fn pair_search_one_window(
    panel: &ReferencePanel,
    target: &TargetGenotypes,
    config: &PhaseConfig,
    g: usize,
) -> Result<Option<WindowCandidates>, PhaseError> {
    let window = &panel.windows[g];
    let rows = target.rows_in_reference_range(window.range.0, window.range.1);
    if rows.len() < config.min_typed_snps {
        return Ok(None);
    }

    let (mut raw, observed_altfreq) = build_xw(panel, target, g);
    let altfreq: Vec<f32> = window.altfreq.clone().unwrap_or(observed_altfreq);

    pair_search::zero_fill_all_missing_rows(&mut raw, MISSING_F32);
    let xw = pair_search::prepare_xw(&raw, MISSING_F32, &altfreq, g)?;

    let search_result = if window.n_unique() > config.max_haplotypes {
        pair_search::search_window_thinned(
            &xw,
            &window.unique_h,
            config.thinning_keep(),
            config.thinning_scale_allelefreq,
            Some(&altfreq),
            g,
        )?
    } else {
        pair_search::search_window(&xw, &window.unique_h, g)?
    };

    if config.dynamic_programming {
        let per_individual: Vec<RedundantPairs> = (0..target.n_samples())
            .map(|i| redundant::expand_dp(window, search_result.j[i], search_result.k[i]))
            .collect();
        Ok(Some(WindowCandidates::Dp(per_individual)))
    } else {
        let per_individual: Vec<BitPair> = (0..target.n_samples())
            .map(|i| redundant::expand_bitsets(window, search_result.j[i], search_result.k[i]))
            .collect();
        Ok(Some(WindowCandidates::Intersect(per_individual)))
    }
}

/// Builds one window's raw typed-genotype matrix (missing entries flagged
/// with [`MISSING_F32`]) plus its per-marker observed alt-allele frequency,
/// used as the missing-initialisation fallback when the window carries no
/// precomputed `altfreq`.
fn build_xw(
    panel: &ReferencePanel,
    target: &TargetGenotypes,
    window_index: usize,
) -> (Array2<f32>, Vec<f32>) {
    let window = &panel.windows[window_index];
    let rows = target.rows_in_reference_range(window.range.0, window.range.1);
    let p = rows.len();
    let n = target.n_samples();

    let mut raw = Array2::<f32>::from_elem((p, n), MISSING_F32);
    for (local_row, global_row) in rows.enumerate() {
        for col in 0..n {
            let v = target.calls[[global_row, col]];
            if v != MISSING {
                raw[[local_row, col]] = v as f32;
            }
        }
    }

    let altfreq: Vec<f32> = (0..p)
        .map(|row| {
            let mut sum = 0.0f32;
            let mut count = 0usize;
            for col in 0..n {
                let v = raw[[row, col]];
                if v != MISSING_F32 {
                    sum += v;
                    count += 1;
                }
            }
            if count == 0 {
                0.0
            } else {
                (sum / count as f32) / 2.0
            }
        })
        .collect();

    (raw, altfreq)
}

fn fill_neighbours(slots: &mut [Option<WindowCandidates>]) {
    let n = slots.len();
    for i in 1..n {
        if slots[i].is_none() {
            if let Some(prev) = slots[i - 1].clone() {
                slots[i] = Some(prev);
            }
        }
    }
    for i in (0..n.saturating_sub(1)).rev() {
        if slots[i].is_none() {
            if let Some(next) = slots[i + 1].clone() {
                slots[i] = Some(next);
            }
        }
    }
}

/// Stage 2: per-individual parallelism over the connector, breakpoint
/// search, and mosaic assembly.
fn build_phase_results(
    panel: &ReferencePanel,
    target: &TargetGenotypes,
    candidates: &[WindowCandidates],
    config: &PhaseConfig,
) -> Result<Vec<PhaseResult>, PhaseError> {
    (0..target.n_samples())
        .into_par_iter()
        .map(|individual| build_phase_result_for_individual(panel, target, candidates, config, individual))
        .collect()
}

fn build_phase_result_for_individual(
    panel: &ReferencePanel,
    target: &TargetGenotypes,
    candidates: &[WindowCandidates],
    config: &PhaseConfig,
    individual: usize,
) -> Result<PhaseResult, PhaseError> {
    let n_windows = panel.n_windows();

    let connect_start = Instant::now();
    let chosen: Vec<(u32, u32)> = if config.dynamic_programming {
        let per_window: Vec<RedundantPairs> = candidates
            .iter()
            .map(|c| match c {
                WindowCandidates::Dp(v) => v[individual].clone(),
                WindowCandidates::Intersect(_) => {
                    unreachable!("candidates built in the configured mode only")
                }
            })
            .collect();
        let result = connector::connect_dp(&per_window, config.lambda).chosen;
        debug!("individual {individual}: DP connector solved in {:?}", connect_start.elapsed());
        result
    } else {
        let per_window: Vec<BitPair> = candidates
            .iter()
            .map(|c| match c {
                WindowCandidates::Intersect(v) => v[individual].clone(),
                WindowCandidates::Dp(_) => {
                    unreachable!("candidates built in the configured mode only")
                }
            })
            .collect();
        connector::connect_set_intersection(&per_window).chosen
    };

    let mut strands = [Mosaic::seed(chosen[0].0, 0), Mosaic::seed(chosen[0].1, 0)];
    let mut prev_pair = chosen[0];

    for g in 1..n_windows {
        let span = SpanView::build(target, individual, &panel.windows[g - 1], &panel.windows[g]);
        let decision = breakpoint::resolve(&span, prev_pair, chosen[g]);
        mosaic::apply_window_decision(
            &mut strands,
            &decision,
            prev_pair,
            &panel.windows[g],
            g as u32,
            &span,
        )?;
        prev_pair = decision.pair;
    }

    Ok(PhaseResult { strands })
}

fn build_dense_output(
    panel: &ReferencePanel,
    target: &TargetGenotypes,
    results: &[PhaseResult],
) -> Array2<u8> {
    let p = panel.n_reference_markers();
    let n = results.len();

    let columns: Vec<Vec<u8>> = (0..n)
        .into_par_iter()
        .map(|i| imputer::impute_individual(panel, target, i, &results[i], false))
        .collect();

    let mut out = Array2::<u8>::zeros((p, n));
    for (col, values) in columns.into_iter().enumerate() {
        for (row, value) in values.into_iter().enumerate() {
            out[[row, col]] = value;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haplotype_source::HaplotypeSource;
    use crate::panel::Window;
    use ndarray::array;
    use std::sync::Arc;

    fn trivial_two_haplotype_panel() -> ReferencePanel {
        // A 2-column panel: column 1 all zeros, column 2 all ones, 8 markers.
        let full: Arc<dyn HaplotypeSource> =
            Arc::new(Array2::from_shape_fn((8, 2), |(_, c)| c as f32));
        ReferencePanel::new(
            (0..8).collect(),
            vec![Window {
                unique_h: Array2::from_shape_fn((8, 2), |(_, c)| c as f32),
                hapmap: vec![0, 1],
                range: (0, 8),
                altfreq: Some(vec![0.5; 8]),
            }],
            8,
            full,
        )
    }

    #[test]
    fn trivial_identity_end_to_end() {
        let panel = trivial_two_haplotype_panel();
        let issues = IssueLog::new();
        let calls = array![[2i8], [2], [2], [2], [2], [2], [2], [2]];
        let target = TargetGenotypes::new(
            calls,
            (0..8).collect(),
            vec!["sample1".to_string()],
            &panel,
            &issues,
        )
        .unwrap();

        let config = PhaseConfig { min_typed_snps: 0, ..PhaseConfig::default() };
        let output = phase(&panel, &target, &config).unwrap();

        assert_eq!(output.results.len(), 1);
        let strands = &output.results[0].strands;
        assert_eq!(strands[0].segments.len(), 1);
        assert_eq!(strands[0].segments[0].hap_label, 1);
        assert_eq!(strands[1].segments[0].hap_label, 1);

        let dosage = output.imputed.unwrap();
        for r in 0..8 {
            assert_eq!(dosage[[r, 0]], 2);
        }
    }

    #[test]
    fn determinism_across_thread_counts() {
        let panel = trivial_two_haplotype_panel();
        let issues = IssueLog::new();
        let calls = array![[2i8], [2], [2], [2], [2], [2], [2], [2]];
        let target = TargetGenotypes::new(
            calls,
            (0..8).collect(),
            vec!["sample1".to_string()],
            &panel,
            &issues,
        )
        .unwrap();
        let config = PhaseConfig { min_typed_snps: 0, ..PhaseConfig::default() };

        let pool1 = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let pool4 = rayon::ThreadPoolBuilder::new().num_threads(4).build().unwrap();

        let out1 = pool1.install(|| phase(&panel, &target, &config).unwrap());
        let out4 = pool4.install(|| phase(&panel, &target, &config).unwrap());

        assert_eq!(out1.results[0].strands[0].segments, out4.results[0].strands[0].segments);
        assert_eq!(out1.results[0].strands[1].segments, out4.results[0].strands[1].segments);
        assert_eq!(out1.imputed.unwrap(), out4.imputed.unwrap());
    }
}
