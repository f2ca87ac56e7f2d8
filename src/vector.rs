//! Distributed dense vector ownership

/// The local part of a distributed dense vector's ownership map
///
/// Each of the n global components is owned by exactly one rank;
/// ownership is total and unique across the job. A rank stores only the
/// map from its local slots to global indices: `index[i]` is the global
/// component held in local slot i. Values live in a separate `Vec` of the
/// same length, indexed by local slot.
#[derive(Clone, Debug)]
pub struct VectorDistribution {
    /// Global length of the vector
    pub n: usize,

    /// Global index of each local component (size: nv)
    pub index: Vec<usize>,
}

impl VectorDistribution {
    /// Creates a distribution from the local-to-global map
    ///
    /// # Panics
    ///
    /// Panics if an index is out of range or appears twice locally.
    pub fn new(n: usize, index: Vec<usize>) -> Self {
        for &g in &index {
            assert!(g < n, "global index {} out of bounds (n = {})", g, n);
        }
        let mut sorted = index.clone();
        sorted.sort_unstable();
        assert!(
            sorted.windows(2).all(|w| w[0] < w[1]),
            "a global index is owned twice by the same rank"
        );

        Self { n, index }
    }

    /// Returns the number of locally owned components
    pub fn local_len(&self) -> usize {
        self.index.len()
    }

    /// Extracts this rank's components from a full global value array
    ///
    /// Mostly a test convenience: build a global vector once, then hand
    /// each rank its owned slice.
    pub fn localize<T: Copy>(&self, global: &[T]) -> Vec<T> {
        assert_eq!(global.len(), self.n);
        self.index.iter().map(|&g| global[g]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_localize() {
        let d = VectorDistribution::new(5, vec![4, 0, 2]);
        assert_eq!(d.local_len(), 3);
        assert_eq!(d.localize(&[10.0, 11.0, 12.0, 13.0, 14.0]), vec![14.0, 10.0, 12.0]);
    }

    #[test]
    #[should_panic(expected = "owned twice")]
    fn test_duplicate_ownership() {
        VectorDistribution::new(4, vec![1, 3, 1]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_out_of_range() {
        VectorDistribution::new(4, vec![1, 4]);
    }
}
