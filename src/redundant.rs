//! Maps a unique-column pair back to the full-panel haplotype index pairs
//! it represents in one window.

use itertools::iproduct;

use crate::panel::Window;

/// Redundant pair sets are truncated at this many entries in DP mode.
pub const MAX_REDUNDANT_PAIRS: usize = 1000;

/// Full-panel pair candidates for one individual at one window, DP mode.
/// Pairs are enumerated lexicographically (`S1` ascending outer, `S2`
/// ascending inner) and truncated at [`MAX_REDUNDANT_PAIRS`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedundantPairs {
    pub pairs: Vec<(u32, u32)>,
}

/// Full-panel candidates for one individual at one window, set-intersection
/// mode: one bitset per strand over the window's `1..D` full-panel
/// haplotype indices.
#[derive(Debug, Clone)]
pub struct BitPair {
    pub strand1: Bitset,
    pub strand2: Bitset,
}

/// A plain bitset over `u64` words; no dedicated bitset crate is pulled in
/// for this, since the sets involved are small and the operations needed
/// (intersection, length, min-index) are a handful of lines over words.
#[derive(Debug, Clone)]
pub struct Bitset {
    words: Vec<u64>,
}

impl Bitset {
    pub fn with_capacity(n: usize) -> Self {
        Bitset { words: vec![0u64; (n + 63) / 64] }
    }

    pub fn from_indices(n: usize, indices: &[u32]) -> Self {
        let mut bs = Self::with_capacity(n);
        for &i in indices {
            bs.insert(i as usize);
        }
        bs
    }

    pub fn insert(&mut self, i: usize) {
        self.words[i / 64] |= 1u64 << (i % 64);
    }

    pub fn contains(&self, i: usize) -> bool {
        (self.words[i / 64] >> (i % 64)) & 1 == 1
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn intersect_with(&mut self, other: &Bitset) {
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            *a &= *b;
        }
    }

    pub fn intersection_len(&self, other: &Bitset) -> usize {
        self.words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| (a & b).count_ones() as usize)
            .sum()
    }

    /// Smallest-index member, used as the chosen representative haplotype
    /// when a set-intersection run closes.
    pub fn min_index(&self) -> Option<u32> {
        for (wi, &w) in self.words.iter().enumerate() {
            if w != 0 {
                return Some((wi * 64 + w.trailing_zeros() as usize) as u32);
            }
        }
        None
    }

    pub fn indices(&self) -> Vec<u32> {
        let mut out = Vec::new();
        for (wi, &w) in self.words.iter().enumerate() {
            let mut w = w;
            while w != 0 {
                let tz = w.trailing_zeros();
                out.push((wi * 64 + tz as usize) as u32);
                w &= w - 1;
            }
        }
        out
    }
}

/// Expands one individual's optimal unique pair `(unique_j, unique_k)` into
/// its redundant full-panel pair set `S1 x S2`, DP mode.
pub fn expand_dp(window: &Window, unique_j: u32, unique_k: u32) -> RedundantPairs {
    let inv = window.inverse_hapmap();
    let empty = Vec::new();
    let s1 = inv.get(&unique_j).unwrap_or(&empty);
    let s2 = inv.get(&unique_k).unwrap_or(&empty);

    let pairs = iproduct!(s1.iter(), s2.iter())
        .take(MAX_REDUNDANT_PAIRS)
        .map(|(&a, &b)| (a, b))
        .collect();
    RedundantPairs { pairs }
}

/// Same expansion, set-intersection mode: two bitsets instead of an
/// enumerated pair list.
pub fn expand_bitsets(window: &Window, unique_j: u32, unique_k: u32) -> BitPair {
    let inv = window.inverse_hapmap();
    let d = window.n_full_haplotypes();
    let empty = Vec::new();
    let s1 = inv.get(&unique_j).unwrap_or(&empty);
    let s2 = inv.get(&unique_k).unwrap_or(&empty);
    BitPair {
        strand1: Bitset::from_indices(d, s1),
        strand2: Bitset::from_indices(d, s2),
    }
}
