//! Fixed-width sparse count vectors.
//!
//! Fingerprints are overwhelmingly sparse (a few hundred set indices out of
//! 2^16), so descriptors are stored as sorted index/count pairs and only
//! densified where a model requires it.

use serde::{Deserialize, Serialize};

/// A sparse vector of counts with a fixed logical width.
///
/// Invariant: `indices` is strictly increasing, every index is `< size`, and
/// `counts` is parallel to `indices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    size: u32,
    indices: Vec<u32>,
    counts: Vec<f64>,
}

impl SparseVector {
    /// An all-zero vector of the given width
    pub fn empty(size: u32) -> Self {
        Self {
            size,
            indices: Vec::new(),
            counts: Vec::new(),
        }
    }

    /// Build from an unsorted index multiset, folding duplicates into counts.
    /// With `count_bits` false every present index gets count 1.
    pub fn from_indices(size: u32, mut raw: Vec<u32>, count_bits: bool) -> Self {
        debug_assert!(raw.iter().all(|&i| i < size));
        raw.sort_unstable();

        let mut indices = Vec::new();
        let mut counts = Vec::new();
        for idx in raw {
            if indices.last() == Some(&idx) {
                if count_bits {
                    if let Some(last) = counts.last_mut() {
                        *last += 1.0;
                    }
                }
            } else {
                indices.push(idx);
                counts.push(1.0);
            }
        }

        Self {
            size,
            indices,
            counts,
        }
    }

    /// Build from already-sorted index/count pairs (e.g. a parsed CSV cell)
    pub fn from_pairs(size: u32, pairs: Vec<(u32, f64)>) -> Self {
        let mut indices = Vec::with_capacity(pairs.len());
        let mut counts = Vec::with_capacity(pairs.len());
        for (idx, count) in pairs {
            debug_assert!(idx < size);
            debug_assert!(indices.last().map_or(true, |&last| last < idx));
            indices.push(idx);
            counts.push(count);
        }
        Self {
            size,
            indices,
            counts,
        }
    }

    /// Logical width of the vector
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of non-zero entries
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Iterate over (index, count) pairs in index order
    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.indices
            .iter()
            .copied()
            .zip(self.counts.iter().copied())
    }

    /// Dot product against a dense weight vector of the full logical width
    pub fn dot(&self, dense: &[f64]) -> f64 {
        debug_assert_eq!(dense.len(), self.size as usize);
        self.iter().map(|(idx, count)| count * dense[idx as usize]).sum()
    }

    /// Expand to a dense vector of the full logical width
    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.size as usize];
        for (idx, count) in self.iter() {
            dense[idx as usize] = count;
        }
        dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_duplicate_indices_into_counts() {
        let v = SparseVector::from_indices(16, vec![3, 7, 3, 3, 12], true);
        assert_eq!(v.nnz(), 3);
        let pairs: Vec<_> = v.iter().collect();
        assert_eq!(pairs, vec![(3, 3.0), (7, 1.0), (12, 1.0)]);
    }

    #[test]
    fn binary_mode_clamps_counts() {
        let v = SparseVector::from_indices(16, vec![3, 3, 3], false);
        let pairs: Vec<_> = v.iter().collect();
        assert_eq!(pairs, vec![(3, 1.0)]);
    }

    #[test]
    fn dot_and_dense_agree() {
        let v = SparseVector::from_indices(8, vec![1, 1, 6], true);
        let weights = vec![0.0, 0.5, 0.0, 0.0, 0.0, 0.0, 2.0, 0.0];
        assert!((v.dot(&weights) - (2.0 * 0.5 + 2.0)).abs() < 1e-12);

        let dense = v.to_dense();
        assert_eq!(dense.len(), 8);
        assert_eq!(dense[1], 2.0);
        assert_eq!(dense[6], 1.0);
    }

    #[test]
    fn empty_vector_behaves() {
        let v = SparseVector::empty(4);
        assert_eq!(v.nnz(), 0);
        assert_eq!(v.to_dense(), vec![0.0; 4]);
    }
}
