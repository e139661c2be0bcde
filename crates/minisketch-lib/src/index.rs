//! The global minimizer index
//!
//! A [`MinimizerIndex`] is the sorted, duplicate-free set of minimizer hashes
//! of a read collection, together with the parameters that produced it.
//! Downstream stages treat it as an opaque set of hashes.

/// Counters gathered while building an index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SketchStatistics {
    /// Records pulled from the source
    pub reads_total: usize,
    /// Records long enough to be sketched
    pub reads_sketched: usize,
    /// Records shorter than `k + w - 1`
    pub reads_filtered: usize,
    /// Hashes appended to the collector, duplicates included
    pub hashes_collected: usize,
    /// Hashes in the final index
    pub distinct_hashes: usize,
}

impl SketchStatistics {
    /// Log the statistics via tracing
    pub fn print_summary(&self) {
        tracing::info!("Sketch Statistics:");
        tracing::info!("  reads: {}", self.reads_total);
        tracing::info!("  sketched: {}", self.reads_sketched);
        tracing::info!("  filtered (too short): {}", self.reads_filtered);
        tracing::info!("  hashes collected: {}", self.hashes_collected);
        tracing::info!("  distinct minimizers: {}", self.distinct_hashes);
    }
}

/// Sorted, deduplicated minimizer hashes of a read collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinimizerIndex {
    k: usize,
    w: usize,
    seed: u64,
    canonical: bool,
    hashes: Vec<u64>,
    statistics: SketchStatistics,
}

impl MinimizerIndex {
    /// Assemble an index from hashes that are already strictly ascending
    pub(crate) fn from_sorted(
        k: usize,
        w: usize,
        seed: u64,
        canonical: bool,
        hashes: Vec<u64>,
        statistics: SketchStatistics,
    ) -> Self {
        debug_assert!(hashes.windows(2).all(|pair| pair[0] < pair[1]));
        Self {
            k,
            w,
            seed,
            canonical,
            hashes,
            statistics,
        }
    }

    /// K-mer length
    pub fn k(&self) -> usize {
        self.k
    }

    /// Window size
    pub fn w(&self) -> usize {
        self.w
    }

    /// Hash seed
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Whether reverse complements were collapsed
    pub fn canonical(&self) -> bool {
        self.canonical
    }

    /// Hashes in ascending order
    pub fn hashes(&self) -> &[u64] {
        &self.hashes
    }

    /// Number of distinct minimizers
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Whether no minimizer was found
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Whether `hash` is one of the minimizers
    pub fn contains(&self, hash: u64) -> bool {
        self.hashes.binary_search(&hash).is_ok()
    }

    /// Build statistics (only `distinct_hashes` is known for a loaded index)
    pub fn statistics(&self) -> &SketchStatistics {
        &self.statistics
    }

    /// Take the hashes out of the index
    pub fn into_hashes(self) -> Vec<u64> {
        self.hashes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let index = MinimizerIndex::from_sorted(
            15,
            10,
            1,
            false,
            vec![1, 3, 7, 9],
            SketchStatistics::default(),
        );
        assert_eq!(index.len(), 4);
        assert!(index.contains(7));
        assert!(!index.contains(8));
        assert_eq!(index.into_hashes(), vec![1, 3, 7, 9]);
    }
}
