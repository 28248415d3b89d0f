//! End-to-end scenarios and the testable properties that don't already have
//! a natural home inside a single module's `#[cfg(test)]` block.

mod common;

use mosaic_phase::connector::connect_dp;
use mosaic_phase::haplotype_source::HaplotypeSource;
use mosaic_phase::panel::Window;
use mosaic_phase::pipeline::phase;
use mosaic_phase::redundant::RedundantPairs;
use mosaic_phase::{PhaseConfig, ReferencePanel};
use ndarray::{array, Array2};
use std::sync::Arc;

#[test]
fn trivial_identity_single_window() {
    common::init_test_logging();
    let panel = common::trivial_two_haplotype_panel();
    let calls = array![[2i8], [2], [2], [2], [2], [2], [2], [2]];
    let target = common::target_from_calls(calls, (0..8).collect(), &panel);

    let output = phase(&panel, &target, &common::small_fixture_config()).unwrap();

    let strands = &output.results[0].strands;
    assert_eq!(strands[0].segments.len(), 1);
    assert_eq!(strands[0].segments[0].hap_label, 1);
    assert_eq!(strands[1].segments[0].hap_label, 1);

    let dosage = output.imputed.unwrap();
    for r in 0..8 {
        assert_eq!(dosage[[r, 0]], 2);
    }
}

/// Two windows, 4 haplotypes: strand2 stays on hap1 throughout; strand1
/// uses hap0 for the first 12 typed markers then hap2 for the last 4,
/// switching exactly at the start of window2's local row 4.
#[test]
fn single_clean_breakpoint_across_two_windows() {
    common::init_test_logging();

    // Window1 (markers 0-7): hap0 all-zero, hap1 all-one, hap2/hap3 filler
    // patterns that don't tie with (hap0,hap1)'s exact reconstruction.
    let w1 = Array2::from_shape_fn((8, 4), |(r, c)| match c {
        0 => 0.0,
        1 => 1.0,
        2 => (r % 2) as f32,
        _ => if r < 4 { 0.0 } else { 1.0 },
    });
    // Window2 (markers 8-15): hap0 all-zero, hap1 all-one, hap2 steps from
    // 0 to 1 at local row 4 (the switch), hap3 unrelated filler.
    let w2 = Array2::from_shape_fn((8, 4), |(r, c)| match c {
        0 => 0.0,
        1 => 1.0,
        2 => if r < 4 { 0.0 } else { 1.0 },
        _ => if r % 2 == 0 { 1.0 } else { 0.0 },
    });

    let full: Arc<dyn HaplotypeSource> = {
        let mut dense = Array2::<f32>::zeros((16, 4));
        dense.slice_mut(ndarray::s![0..8, ..]).assign(&w1);
        dense.slice_mut(ndarray::s![8..16, ..]).assign(&w2);
        Arc::new(dense)
    };

    let panel = ReferencePanel::new(
        (0..16).collect(),
        vec![
            Window { unique_h: w1, hapmap: vec![0, 1, 2, 3], range: (0, 8), altfreq: None },
            Window { unique_h: w2, hapmap: vec![0, 1, 2, 3], range: (8, 16), altfreq: None },
        ],
        8,
        full,
    );

    // Truth: rows 0-11 genotype 1 (hap0+hap1), rows 12-15 genotype 2
    // (hap2+hap1, after the strand1 switch).
    let mut calls = Array2::<i8>::zeros((16, 1));
    for r in 0..12 {
        calls[[r, 0]] = 1;
    }
    for r in 12..16 {
        calls[[r, 0]] = 2;
    }
    let target = common::target_from_calls(calls, (0..16).collect(), &panel);

    let output = phase(&panel, &target, &common::small_fixture_config()).unwrap();
    let strands = &output.results[0].strands;

    // Strand2 (hap1) never breaks: one segment, start 0.
    assert_eq!(strands[1].segments.len(), 1);
    assert_eq!(strands[1].segments[0].start_marker, 0);
    assert_eq!(strands[1].segments[0].hap_label, 1);

    // Strand1 breaks exactly once, at reference marker 12.
    assert_eq!(strands[0].segments.len(), 2);
    assert_eq!(strands[0].segments[0], mosaic_phase::Segment { start_marker: 0, window_id: 0, hap_label: 0 });
    assert_eq!(strands[0].segments[1].start_marker, 12);
    assert_eq!(strands[0].segments[1].hap_label, 2);
}

#[test]
fn tie_handling_prefers_lexicographic_first() {
    common::init_test_logging();
    // h0=[1,0], h1=[0,1], h2=[0,1] over 2 markers; x=[1,1]. Columns 1 and 2
    // both exactly reconstruct x with column 0; (0,1) must win.
    let hw = array![[1.0f32, 0.0, 0.0], [0.0, 1.0, 1.0]];
    let full: Arc<dyn HaplotypeSource> = Arc::new(hw.clone());
    let panel = ReferencePanel::new(
        vec![0, 1],
        vec![Window { unique_h: hw, hapmap: vec![0, 1, 2], range: (0, 2), altfreq: Some(vec![0.5, 0.5]) }],
        2,
        full,
    );
    let calls = array![[1i8], [1]];
    let target = common::target_from_calls(calls, vec![0, 1], &panel);

    let output = phase(&panel, &target, &common::small_fixture_config()).unwrap();
    let strands = &output.results[0].strands;
    assert_eq!(strands[0].segments[0].hap_label, 0);
    assert_eq!(strands[1].segments[0].hap_label, 1);
}

#[test]
fn redundant_expansion_through_connector() {
    common::init_test_logging();
    let panel = common::redundant_five_to_three_panel();
    // Unique column 0 (full haps 0,1) value 0; unique column 1 (full haps
    // 2,3) value 1; genotype = 0 + 1 = 1 at the single marker.
    let calls = array![[1i8]];
    let target = common::target_from_calls(calls, vec![0], &panel);

    let output = phase(&panel, &target, &common::small_fixture_config()).unwrap();
    let strands = &output.results[0].strands;
    // Lexicographically smallest full-pair reconstructing the redundant set
    // {(0,2),(0,3),(1,2),(1,3)} is (0,2).
    assert_eq!(strands[0].segments[0].hap_label, 0);
    assert_eq!(strands[1].segments[0].hap_label, 2);
}

#[test]
fn dp_switch_cost_tie_break() {
    // W1: {(A,B),(C,D)}; W2: {(A,B),(E,F)}; W3: {(E,F),(G,H)}. With lambda=1
    // the DP must prefer (A,B)->(A,B)->(E,F) (cost 2) over
    // (C,D)->(E,F)->(E,F) (also cost 2), breaking the tie via the earlier
    // window's lexicographically smaller pair.
    let rp = |pairs: &[(u32, u32)]| RedundantPairs { pairs: pairs.to_vec() };
    let candidates = vec![
        rp(&[(1, 2), (3, 4)]),
        rp(&[(1, 2), (5, 6)]),
        rp(&[(5, 6), (7, 8)]),
    ];
    let result = connect_dp(&candidates, 1.0);
    assert_eq!(result.chosen, vec![(1, 2), (1, 2), (5, 6)]);
}

/// Property 2: segment starts are strictly increasing and the first is 0,
/// for every strand of every individual.
#[test]
fn property_monotone_mosaic() {
    common::init_test_logging();
    let panel = common::trivial_two_haplotype_panel();
    let calls = array![[2i8, 0], [2, 0], [2, 0], [2, 0], [2, 0], [2, 0], [2, 0], [2, 0]];
    let target = common::target_from_calls(calls, (0..8).collect(), &panel);

    let output = phase(&panel, &target, &common::small_fixture_config()).unwrap();
    for result in &output.results {
        for strand in &result.strands {
            assert!(strand.is_monotone());
        }
    }
}

/// Property 1: for every individual and every reference position, the
/// imputed dosage equals the sum of both strands' alleles read straight off
/// the full-panel haplotype source at the mosaic's chosen label — i.e. the
/// dense output is exactly a function of the mosaics, not some separate
/// computation that could silently diverge from them.
#[test]
fn property_sum_decomposition_invariant() {
    use mosaic_phase::imputer::impute_individual;

    common::init_test_logging();
    let panel = common::trivial_two_haplotype_panel();
    let calls = array![[2i8, 0], [2, 0], [2, 0], [2, 0], [2, 0], [2, 0], [2, 0], [2, 0]];
    let target = common::target_from_calls(calls, (0..8).collect(), &panel);

    let config = PhaseConfig { impute: true, ..common::small_fixture_config() };
    let output = phase(&panel, &target, &config).unwrap();

    for (i, result) in output.results.iter().enumerate() {
        let dosage = impute_individual(&panel, &target, i, result, true);
        for r in 0..panel.n_reference_markers() {
            let seg0 = result.strands[0]
                .segments
                .iter()
                .rev()
                .find(|s| s.start_marker as usize <= r)
                .unwrap();
            let seg1 = result.strands[1]
                .segments
                .iter()
                .rev()
                .find(|s| s.start_marker as usize <= r)
                .unwrap();
            let expected = panel.full_haplotypes.get(r, seg0.hap_label as usize)
                + panel.full_haplotypes.get(r, seg1.hap_label as usize);
            assert_eq!(dosage[r] as f32, expected);
        }
    }
}

/// Property 6: imputing an already fully-typed, missing-free input at every
/// reference position reproduces it exactly (the observed-value-preferred
/// default means the mosaic never overrides a real call).
#[test]
fn property_idempotent_reimputation() {
    common::init_test_logging();
    let panel = common::trivial_two_haplotype_panel();
    let calls = array![[2i8], [0], [2], [0], [2], [2], [0], [0]];
    let target = common::target_from_calls(calls, (0..8).collect(), &panel);

    let config = PhaseConfig { impute: true, ..common::small_fixture_config() };
    let first = phase(&panel, &target, &config).unwrap();
    let dosage = first.imputed.unwrap();

    // Re-impute from a target built entirely from the first run's dense
    // output (fully typed, no missing entries).
    let full_calls = Array2::from_shape_fn((8, 1), |(r, _)| dosage[[r, 0]] as i8);
    let retyped_target = common::target_from_calls(full_calls, (0..8).collect(), &panel);
    let second = phase(&panel, &retyped_target, &config).unwrap();
    let dosage2 = second.imputed.unwrap();

    assert_eq!(dosage, dosage2);
}
