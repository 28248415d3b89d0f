use serde::{Deserialize, Serialize};

/// Pipeline configuration: every tunable knob exposed by the compute stages.
///
/// This crate never reads a config file itself — that's a collaborator's job
/// — but derives `serde` so a caller can load one from disk or CLI flags and
/// hand the crate a fully-populated struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    /// Window size in markers. Last window absorbs the remainder.
    pub width: usize,
    /// Emit untyped reference markers in the output dosage matrix.
    pub impute: bool,
    /// Use the DP window connector (`true`) or set-intersection mode (`false`).
    pub dynamic_programming: bool,
    /// Thinning kicks in once a window's unique-haplotype count exceeds this.
    pub max_haplotypes: usize,
    /// Haplotypes retained per individual per window before full search, once
    /// thinning triggers. `None` falls back to `max_haplotypes`.
    pub thinning_factor: Option<usize>,
    /// Weight thinning's per-haplotype score by `1/altfreq`.
    pub thinning_scale_allelefreq: bool,
    /// Rescreen top-k coarse candidates against observed-only data.
    pub rescreen: bool,
    /// Alternate large-window solver parameter; `None` disables it.
    pub lasso: Option<f64>,
    /// Windows with fewer typed markers than this reuse a neighbour's pair.
    pub min_typed_snps: usize,
    /// DP switch-cost weight. Fixed at 1.0; not meant to be tuned, but kept
    /// as a field rather than a bare constant so the DP code reads as
    /// configuration, matching how the rest of this struct works.
    pub lambda: f64,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        PhaseConfig {
            width: 2048,
            impute: true,
            dynamic_programming: true,
            max_haplotypes: 2000,
            thinning_factor: None,
            thinning_scale_allelefreq: false,
            rescreen: false,
            lasso: None,
            min_typed_snps: 50,
            lambda: 1.0,
        }
    }
}

impl PhaseConfig {
    pub fn thinning_keep(&self) -> usize {
        self.thinning_factor.unwrap_or(self.max_haplotypes)
    }
}
