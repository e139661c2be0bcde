//! Windowed minimizer sketching
//!
//! For a sequence of length `L >= k + w - 1` there are `n = L - k + 1` k-mer
//! positions and `n - w + 1` windows of `w` consecutive positions. Each window
//! selects its minimum hash, ties going to the leftmost position. A hash is
//! emitted whenever the selected position differs from the previous window's,
//! so every minimizer occurrence is reported once even if it wins several
//! overlapping windows. Distinct occurrences of an equal hash are reported
//! separately; deduplication is left to the caller.

use std::collections::VecDeque;

use crate::encoding::EncodingError;
use crate::hasher::KmerHash;

/// A selected minimizer occurrence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MinimizerInfo {
    /// Hash value of the minimizer k-mer
    pub hash: u64,
    /// Start position of the k-mer in the sequence
    pub position: usize,
}

/// Computes minimizer sketches of single sequences
pub struct MinimizerSketcher<'h, H: KmerHash + ?Sized> {
    hasher: &'h H,
    w: usize,
}

impl<'h, H: KmerHash + ?Sized> MinimizerSketcher<'h, H> {
    /// Create a sketcher with window size `w` (in k-mer positions)
    ///
    /// # Panics
    /// Panics if `w` is zero.
    pub fn new(hasher: &'h H, w: usize) -> Self {
        assert!(w > 0, "window size must be positive");
        Self { hasher, w }
    }

    /// Window size
    pub fn w(&self) -> usize {
        self.w
    }

    /// Shortest sequence that holds one full window
    pub fn min_sequence_length(&self) -> usize {
        self.hasher.k() + self.w - 1
    }

    /// Minimizer occurrences of `seq`, in position order
    pub fn minimizers(&self, seq: &[u8]) -> Result<Vec<MinimizerInfo>, EncodingError> {
        if seq.len() < self.min_sequence_length() {
            return Ok(Vec::new());
        }
        let hashes = self.hasher.kmer_hashes(seq)?;
        Ok(select_minimizers(&hashes, self.w))
    }

    /// Minimizer hashes of `seq`, in position order
    pub fn minimizer_hashes(&self, seq: &[u8]) -> Result<Vec<u64>, EncodingError> {
        Ok(self.minimizers(seq)?.into_iter().map(|m| m.hash).collect())
    }
}

/// Minimizer hashes of `seq` for window size `w`
pub fn minimizer_hashes<H: KmerHash + ?Sized>(
    seq: &[u8],
    hasher: &H,
    w: usize,
) -> Result<Vec<u64>, EncodingError> {
    MinimizerSketcher::new(hasher, w).minimizer_hashes(seq)
}

/// Select window minimizers from per-position k-mer hashes
///
/// Keeps a deque of candidate positions whose hashes increase strictly from
/// front to back. A new hash evicts every candidate with a greater or equal
/// hash only when it is strictly smaller, so equal hashes stay queued and the
/// leftmost one is at the front.
fn select_minimizers(hashes: &[u64], w: usize) -> Vec<MinimizerInfo> {
    if hashes.len() < w {
        return Vec::new();
    }
    let mut result = Vec::with_capacity(2 * hashes.len() / (w + 1) + 1);
    let mut candidates: VecDeque<usize> = VecDeque::with_capacity(w);
    let mut last_selected: Option<usize> = None;

    for (i, &hash) in hashes.iter().enumerate() {
        while let Some(&back) = candidates.back() {
            if hashes[back] > hash {
                candidates.pop_back();
            } else {
                break;
            }
        }
        candidates.push_back(i);

        if i + 1 < w {
            continue;
        }
        let window_start = i + 1 - w;
        while let Some(&front) = candidates.front() {
            if front < window_start {
                candidates.pop_front();
            } else {
                break;
            }
        }
        if let Some(&selected) = candidates.front() {
            if last_selected != Some(selected) {
                result.push(MinimizerInfo {
                    hash: hashes[selected],
                    position: selected,
                });
                last_selected = Some(selected);
            }
        }
    }
    result
}
