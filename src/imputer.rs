//! Walks each mosaic and emits the diploid genotype (or phased allele pair)
//! at every reference marker.

use crate::haplotype_source::HaplotypeSource;
use crate::mosaic::{Mosaic, PhaseResult, Segment};
use crate::panel::ReferencePanel;
use crate::target::{TargetGenotypes, MISSING};

/// Locates the segment covering reference marker `r` by binary search on
/// segment starts.
pub fn segment_at(mosaic: &Mosaic, r: u32) -> &Segment {
    match mosaic.segments.binary_search_by_key(&r, |s| s.start_marker) {
        Ok(i) => &mosaic.segments[i],
        Err(0) => &mosaic.segments[0],
        Err(i) => &mosaic.segments[i - 1],
    }
}

fn allele_on_strand(mosaic: &Mosaic, source: &dyn HaplotypeSource, r: usize) -> u8 {
    let seg = segment_at(mosaic, r as u32);
    source.get(r, seg.hap_label as usize).round() as u8
}

fn typed_value_at_reference(target: &TargetGenotypes, individual: usize, r: usize) -> Option<i8> {
    match target.x_to_h_idx.binary_search(&r) {
        Ok(row) => {
            let v = target.calls[[row, individual]];
            if v == MISSING {
                None
            } else {
                Some(v)
            }
        }
        Err(_) => None,
    }
}

/// Per-reference-marker unphased dosage: the sum of both strands' alleles.
/// At typed, non-missing positions the observed value is preferred unless
/// `prefer_mosaic` asks for the full extrapolated output.
pub fn impute_individual(
    panel: &ReferencePanel,
    target: &TargetGenotypes,
    individual: usize,
    phase: &PhaseResult,
    prefer_mosaic: bool,
) -> Vec<u8> {
    let p = panel.n_reference_markers();
    (0..p)
        .map(|r| {
            if !prefer_mosaic {
                if let Some(v) = typed_value_at_reference(target, individual, r) {
                    return v as u8;
                }
            }
            let a1 = allele_on_strand(&phase.strands[0], panel.full_haplotypes.as_ref(), r);
            let a2 = allele_on_strand(&phase.strands[1], panel.full_haplotypes.as_ref(), r);
            a1 + a2
        })
        .collect()
}

/// Per-reference-marker phased allele pair, one entry per strand.
pub fn impute_individual_phased(
    panel: &ReferencePanel,
    phase: &PhaseResult,
) -> (Vec<u8>, Vec<u8>) {
    let p = panel.n_reference_markers();
    let source = panel.full_haplotypes.as_ref();
    let strand1 = (0..p).map(|r| allele_on_strand(&phase.strands[0], source, r)).collect();
    let strand2 = (0..p).map(|r| allele_on_strand(&phase.strands[1], source, r)).collect();
    (strand1, strand2)
}
