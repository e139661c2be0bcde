//! K-mer hashing
//!
//! [`KmerHash`] is the capability the sketcher consumes: a k-mer length and a
//! deterministic map from k-mers to `u64`. [`RollingKmerHasher`] rolls a 2-bit
//! packed code along the sequence and finalizes every code with a seeded
//! AHasher, so equal k-mers hash equally regardless of where they occur.

use ahash::RandomState;
use std::hash::{BuildHasher, Hasher};

use crate::constants::{is_valid_k, MAX_K, MIN_K};
use crate::encoding::{complement_base, encode_base, encode_kmer, EncodingError};

/// Hash function over k-mers of a fixed length
pub trait KmerHash: Sync {
    /// K-mer length
    fn k(&self) -> usize;

    /// Hash a single k-mer (`kmer.len() == self.k()`)
    fn hash_kmer(&self, kmer: &[u8]) -> Result<u64, EncodingError>;

    /// Hashes of every k-mer of `seq`, in position order
    ///
    /// Returns an empty vector for sequences shorter than `k`.
    fn kmer_hashes(&self, seq: &[u8]) -> Result<Vec<u64>, EncodingError> {
        if seq.len() < self.k() {
            return Ok(Vec::new());
        }
        seq.windows(self.k()).map(|kmer| self.hash_kmer(kmer)).collect()
    }
}

/// Seeded rolling hasher over 2-bit packed k-mers
#[derive(Clone)]
pub struct RollingKmerHasher {
    k: usize,
    seed: u64,
    canonical: bool,
    mask: u128,
    state: RandomState,
}

impl std::fmt::Debug for RollingKmerHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollingKmerHasher")
            .field("k", &self.k)
            .field("seed", &self.seed)
            .field("canonical", &self.canonical)
            .finish()
    }
}

impl RollingKmerHasher {
    /// Create a hasher for k-mers of length `k`
    ///
    /// In canonical mode a k-mer and its reverse complement hash to the same value.
    ///
    /// # Panics
    /// Panics if `k` is outside `MIN_K..=MAX_K`; configurations are validated
    /// before a hasher is built.
    pub fn new(k: usize, seed: u64, canonical: bool) -> Self {
        assert!(is_valid_k(k), "k must be in [{MIN_K}, {MAX_K}], got k={k}");
        let state = RandomState::with_seeds(seed, !seed, seed, !seed);
        let mask = (1u128 << (2 * k)) - 1;
        Self {
            k,
            seed,
            canonical,
            mask,
            state,
        }
    }

    /// Get the seed value
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Whether reverse complements collapse to one hash
    pub fn canonical(&self) -> bool {
        self.canonical
    }

    #[inline]
    fn finalize(&self, code: u128) -> u64 {
        let mut hasher = self.state.build_hasher();
        hasher.write_u128(code);
        hasher.finish()
    }

    #[inline]
    fn hash_codes(&self, forward: u128, reverse: u128) -> u64 {
        if self.canonical {
            self.finalize(forward.min(reverse))
        } else {
            self.finalize(forward)
        }
    }
}

impl KmerHash for RollingKmerHasher {
    fn k(&self) -> usize {
        self.k
    }

    fn hash_kmer(&self, kmer: &[u8]) -> Result<u64, EncodingError> {
        debug_assert_eq!(kmer.len(), self.k);
        let forward = encode_kmer(kmer)?;
        let reverse = if self.canonical {
            reverse_code(forward, self.k)
        } else {
            0
        };
        Ok(self.hash_codes(forward, reverse))
    }

    fn kmer_hashes(&self, seq: &[u8]) -> Result<Vec<u64>, EncodingError> {
        if seq.len() < self.k {
            return Ok(Vec::new());
        }
        let top_shift = 2 * (self.k - 1);
        let mut forward = 0u128;
        let mut reverse = 0u128;
        let mut hashes = Vec::with_capacity(seq.len() - self.k + 1);

        for (position, &base) in seq.iter().enumerate() {
            let code = encode_base(base).ok_or(EncodingError::InvalidBase { base, position })?;
            forward = ((forward << 2) | code as u128) & self.mask;
            reverse = (reverse >> 2) | ((complement_base(code) as u128) << top_shift);
            if position + 1 >= self.k {
                hashes.push(self.hash_codes(forward, reverse));
            }
        }
        Ok(hashes)
    }
}

/// Reverse complement of a packed k-mer
fn reverse_code(code: u128, k: usize) -> u128 {
    (0..k).fold(0u128, |acc, i| {
        let base = ((code >> (2 * i)) & 0b11) as u8;
        (acc << 2) | complement_base(base) as u128
    })
}
