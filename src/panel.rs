use std::sync::Arc;

use indexmap::IndexMap;
use ndarray::Array2;

use crate::errors::PhaseError;
use crate::haplotype_source::HaplotypeSource;

/// One reference window: a de-duplicated haplotype matrix plus the mapping
/// back to the full panel.
pub struct Window {
    /// p × d_g, columns are the distinct haplotype columns over this
    /// window's typed markers.
    pub unique_h: Array2<f32>,
    /// `hapmap[full_idx] = unique column index` for `full_idx` in
    /// `0..hapmap.len()` (`D` full-panel haplotypes).
    pub hapmap: Vec<u32>,
    /// Reference-marker index range covered by this window, half-open.
    pub range: (usize, usize),
    /// Per-marker alt-allele frequency, if the reference loader computed one.
    pub altfreq: Option<Vec<f32>>,
}

impl Window {
    pub fn n_markers(&self) -> usize {
        self.unique_h.nrows()
    }

    pub fn n_unique(&self) -> usize {
        self.unique_h.ncols()
    }

    pub fn n_full_haplotypes(&self) -> usize {
        self.hapmap.len()
    }

    pub fn validate(&self, window_index: usize) -> Result<(), PhaseError> {
        if self.n_markers() == 0 || self.n_unique() == 0 {
            return Err(PhaseError::EmptyWindow {
                window: window_index,
                p: self.n_markers(),
                d: self.n_unique(),
            });
        }
        Ok(())
    }

    /// Inverts `hapmap` into, for each unique column, the full-panel
    /// haplotype indices it represents — computed on demand rather than
    /// cached on the struct. Entries within each set are in
    /// ascending full-index order, which is what gives C2's redundant-pair
    /// enumeration its lexicographic ordering.
    pub fn inverse_hapmap(&self) -> IndexMap<u32, Vec<u32>> {
        let mut inverse: IndexMap<u32, Vec<u32>> = IndexMap::with_capacity(self.n_unique());
        for (full_idx, &unique_col) in self.hapmap.iter().enumerate() {
            inverse
                .entry(unique_col)
                .or_insert_with(Vec::new)
                .push(full_idx as u32);
        }
        inverse
    }
}

/// The windowed reference panel. Read-only for the lifetime of a compute
/// run.
///
/// `full_haplotypes` is the panel's complete P×D haplotype matrix (every
/// reference marker, every full-panel haplotype), distinct from each
/// window's typed-marker-only `unique_h`. C1–C5 never touch it; C6 (the
/// imputer) is the only consumer, since it must emit a value at every
/// reference marker, including ones no window's de-duplicated matrix
/// covers. Modelled through [`HaplotypeSource`] so a caller can hand in a
/// dense matrix or a bit-packed panel interchangeably.
pub struct ReferencePanel {
    /// Sorted reference marker positions, length `P`.
    pub pos: Vec<u32>,
    pub windows: Vec<Window>,
    pub width: usize,
    pub full_haplotypes: Arc<dyn HaplotypeSource>,
}

impl ReferencePanel {
    pub fn new(
        pos: Vec<u32>,
        windows: Vec<Window>,
        width: usize,
        full_haplotypes: Arc<dyn HaplotypeSource>,
    ) -> Self {
        ReferencePanel { pos, windows, width, full_haplotypes }
    }

    pub fn n_reference_markers(&self) -> usize {
        self.pos.len()
    }

    pub fn n_windows(&self) -> usize {
        self.windows.len()
    }

    /// First reference-marker index (0-based) of window `g`.
    pub fn first_marker_of_window(&self, g: usize) -> usize {
        self.windows[g].range.0
    }

    /// Binary search for the window containing reference-marker index `r`.
    pub fn window_for_reference_marker(&self, r: usize) -> Option<usize> {
        self.windows
            .binary_search_by(|w| {
                if r < w.range.0 {
                    std::cmp::Ordering::Greater
                } else if r >= w.range.1 {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .ok()
    }

    pub fn validate(&self) -> Result<(), PhaseError> {
        for (g, window) in self.windows.iter().enumerate() {
            window.validate(g)?;
        }
        Ok(())
    }
}
