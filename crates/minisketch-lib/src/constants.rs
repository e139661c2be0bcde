//! Constants and defaults for minisketch
//!
//! Default batch and bucket limits for the parallel pipeline and the
//! parameters of minimizer sketch construction.

/// Default seed for k-mer hash functions
pub const DEFAULT_SEED: u64 = 1;

/// Default k-mer length
pub const DEFAULT_K: usize = 15;

/// Default minimizer window size (number of consecutive k-mer positions)
pub const DEFAULT_W: usize = 10;

/// Largest k-mer length the 2-bit rolling hasher can hold in a `u128`
pub const MAX_K: usize = 63;

/// Smallest supported k-mer length
pub const MIN_K: usize = 1;

/// Bytes per MiB
pub const MIB: usize = 1024 * 1024;

/// Bytes per GiB
pub const GIB: usize = 1024 * MIB;

/// Maximum number of records buffered in one pipeline batch
pub const DEFAULT_MAX_BATCH_ITEMS: usize = 1024 * 1024;

/// Maximum cumulative record length buffered in one pipeline batch
pub const DEFAULT_MAX_BATCH_BYTES: usize = GIB;

/// Cumulative record length at which a bucket is cut and dispatched
pub const DEFAULT_BUCKET_BYTES: usize = MIB;

/// Number of objects per bucket when processing borrowed objects
pub const DEFAULT_BUCKET_ITEMS: usize = 1024;

/// Per-record minimizer count above which hashes are deduplicated
/// before being handed to the collector
pub const LOCAL_DEDUP_THRESHOLD: usize = 10;

/// Version number
pub const VERSION: (u8, u8, u8) = (0, 1, 0);

/// Smallest record length that holds one full minimizer window
#[inline]
pub const fn min_record_length(k: usize, w: usize) -> usize {
    k + w - 1
}

/// Check if a k-mer length is supported by the rolling hasher
#[inline]
pub const fn is_valid_k(k: usize) -> bool {
    k >= MIN_K && k <= MAX_K
}
