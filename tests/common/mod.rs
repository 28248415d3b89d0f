//! Shared test fixtures for the integration tests in `tests/scenarios.rs`.

use std::sync::Arc;

use mosaic_phase::{HaplotypeSource, PhaseConfig, ReferencePanel, TargetGenotypes};
use ndarray::Array2;
use mosaic_phase::summary::IssueLog;
use mosaic_phase::panel::Window;

/// Initialises `env_logger` once per test binary. Library crates never call
/// `Builder::init()` themselves; tests are the one place in this crate that
/// behave like a binary entry point.
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A config with `min_typed_snps` relaxed to 0, since the small fixtures used
/// throughout these tests have far fewer than the default 50 typed markers
/// per window.
pub fn small_fixture_config() -> PhaseConfig {
    PhaseConfig { min_typed_snps: 0, ..PhaseConfig::default() }
}

/// A trivial single-window panel: 8 markers, 2 full haplotypes (column 0
/// all-zero, column 1 all-one, already unique).
pub fn trivial_two_haplotype_panel() -> ReferencePanel {
    let full: Arc<dyn HaplotypeSource> = Arc::new(Array2::from_shape_fn((8, 2), |(_, c)| c as f32));
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

/// A single-marker panel with 5 full haplotypes collapsing to 3 unique
/// columns (0,1 -> unique 0; 2,3 -> unique 1; 4 -> unique 2).
pub fn redundant_five_to_three_panel() -> ReferencePanel {
    let full: Arc<dyn HaplotypeSource> =
        Arc::new(Array2::from_shape_fn((1, 5), |(_, c)| if c < 2 { 0.0 } else if c < 4 { 1.0 } else { 1.0 }));
    ReferencePanel::new(
        vec![0],
        vec![Window {
            unique_h: Array2::from_shape_fn((1, 3), |(_, c)| c as f32),
            hapmap: vec![0, 0, 1, 1, 2],
            range: (0, 1),
            altfreq: Some(vec![0.6]),
        }],
        1,
        full,
    )
}

pub fn target_from_calls(
    calls: Array2<i8>,
    pos: Vec<u32>,
    panel: &ReferencePanel,
) -> TargetGenotypes {
    let issues = IssueLog::new();
    let n = calls.ncols();
    let sample_ids = (0..n).map(|i| format!("sample{i}")).collect();
    TargetGenotypes::new(calls, pos, sample_ids, panel, &issues).unwrap()
}
