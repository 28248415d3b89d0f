use ndarray::Array2;

/// Any source of p×d 0/1 values with a column materialisation primitive
/// into floats. Pair search only needs to read out full `f32` columns; it
/// doesn't care whether the backing storage is a dense matrix or a
/// bit-packed panel.
pub trait HaplotypeSource: Send + Sync {
    fn n_markers(&self) -> usize;
    fn n_haplotypes(&self) -> usize;

    /// Writes the `col`-th haplotype's alleles as 0.0/1.0 into `out`.
    /// `out.len()` must equal `n_markers()`.
    fn materialize_column(&self, col: usize, out: &mut [f32]);

    /// Single-entry random access, used by the imputer to read
    /// `H[r, hap_label]` for one reference marker at a time without
    /// materialising the whole column. The default goes through
    /// `materialize_column`; backends with genuinely random-access storage
    /// (a dense matrix) should override it.
    fn get(&self, row: usize, col: usize) -> f32 {
        let mut buf = vec![0.0f32; self.n_markers()];
        self.materialize_column(col, &mut buf);
        buf[row]
    }

    /// Materializes every column into a dense matrix. The default
    /// implementation is the common path; storage backends with a cheaper
    /// bulk conversion can override it.
    fn to_dense(&self) -> Array2<f32> {
        let p = self.n_markers();
        let d = self.n_haplotypes();
        let mut dense = Array2::<f32>::zeros((p, d));
        for col in 0..d {
            let mut buf = vec![0.0f32; p];
            self.materialize_column(col, &mut buf);
            dense.column_mut(col).assign(&ndarray::ArrayView1::from(&buf));
        }
        dense
    }
}

impl HaplotypeSource for Array2<f32> {
    fn n_markers(&self) -> usize {
        self.nrows()
    }

    fn n_haplotypes(&self) -> usize {
        self.ncols()
    }

    fn materialize_column(&self, col: usize, out: &mut [f32]) {
        out.copy_from_slice(self.column(col).as_slice().unwrap_or_else(|| {
            // non-contiguous column (e.g. a view with custom strides): fall
            // back to an element-wise copy.
            panic!("materialize_column requires a contiguous column")
        }));
    }

    fn get(&self, row: usize, col: usize) -> f32 {
        self[[row, col]]
    }
}

/// A bit-packed panel: one `u64` word per 64 markers, per haplotype column.
/// No loader in this crate produces this representation (reference-panel
/// compression is a downstream concern), but the type is kept as a second,
/// fully working implementation of [`HaplotypeSource`] to exercise the
/// trait boundary.
pub struct BitPackedHaplotypes {
    words_per_column: usize,
    n_markers: usize,
    /// column-major: `words[col * words_per_column + word_idx]`.
    words: Vec<u64>,
}

impl BitPackedHaplotypes {
    pub fn from_bits(n_markers: usize, columns: &[Vec<bool>]) -> Self {
        let words_per_column = (n_markers + 63) / 64;
        let mut words = vec![0u64; words_per_column * columns.len()];
        for (col_idx, column) in columns.iter().enumerate() {
            assert_eq!(column.len(), n_markers);
            let base = col_idx * words_per_column;
            for (marker, &bit) in column.iter().enumerate() {
                if bit {
                    words[base + marker / 64] |= 1u64 << (marker % 64);
                }
            }
        }
        BitPackedHaplotypes {
            words_per_column,
            n_markers,
            words,
        }
    }
}

impl HaplotypeSource for BitPackedHaplotypes {
    fn n_markers(&self) -> usize {
        self.n_markers
    }

    fn n_haplotypes(&self) -> usize {
        if self.words_per_column == 0 {
            0
        } else {
            self.words.len() / self.words_per_column
        }
    }

    fn materialize_column(&self, col: usize, out: &mut [f32]) {
        let base = col * self.words_per_column;
        for marker in 0..self.n_markers {
            let word = self.words[base + marker / 64];
            out[marker] = ((word >> (marker % 64)) & 1) as f32;
        }
    }
}
