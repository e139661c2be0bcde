//! Configuration for minimizer sketch construction
//!
//! Hash parameters, worker count and the batch limits of the underlying
//! pipeline, passed explicitly to the builder.

use thiserror::Error;

use crate::constants::{
    is_valid_k, DEFAULT_BUCKET_BYTES, DEFAULT_K, DEFAULT_MAX_BATCH_BYTES, DEFAULT_MAX_BATCH_ITEMS,
    DEFAULT_SEED, DEFAULT_W,
};
use crate::pipeline::PipelineConfig;

/// Rejected configuration parameters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// k outside the supported range
    #[error("k must be in range [1, 63], got k={0}")]
    InvalidK(usize),
    /// Window size of zero
    #[error("w must be positive")]
    InvalidW,
    /// A batch or bucket limit of zero
    #[error("{0} must be positive")]
    InvalidLimit(&'static str),
}

/// Configuration parameters for building a minimizer index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SketchConfiguration {
    /// K-mer length
    pub k: usize,

    /// Window size in consecutive k-mer positions
    pub w: usize,

    /// Seed for the k-mer hash function
    pub seed: u64,

    /// Hash a k-mer and its reverse complement to the same value
    pub canonical: bool,

    /// Number of worker threads (0 = all available cores)
    pub num_threads: usize,

    /// Maximum number of reads buffered per batch
    pub max_batch_items: usize,

    /// Maximum cumulative read length buffered per batch
    pub max_batch_bytes: usize,

    /// Cumulative read length per dispatched bucket
    pub bucket_bytes: usize,
}

impl Default for SketchConfiguration {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            w: DEFAULT_W,
            seed: DEFAULT_SEED,
            canonical: false,
            num_threads: 0,
            max_batch_items: DEFAULT_MAX_BATCH_ITEMS,
            max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
            bucket_bytes: DEFAULT_BUCKET_BYTES,
        }
    }
}

impl SketchConfiguration {
    /// Create a configuration with the given k-mer length and window size
    pub fn new(k: usize, w: usize) -> Result<Self, ConfigError> {
        let config = Self {
            k,
            w,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_k(self.k) {
            return Err(ConfigError::InvalidK(self.k));
        }
        if self.w == 0 {
            return Err(ConfigError::InvalidW);
        }
        if self.max_batch_items == 0 {
            return Err(ConfigError::InvalidLimit("max_batch_items"));
        }
        if self.max_batch_bytes == 0 {
            return Err(ConfigError::InvalidLimit("max_batch_bytes"));
        }
        if self.bucket_bytes == 0 {
            return Err(ConfigError::InvalidLimit("bucket_bytes"));
        }
        Ok(())
    }

    /// Shortest read that contributes minimizers
    pub fn min_read_length(&self) -> usize {
        crate::constants::min_record_length(self.k, self.w)
    }

    /// Pipeline limits derived from this configuration
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            num_threads: self.num_threads,
            max_batch_items: self.max_batch_items,
            max_batch_bytes: self.max_batch_bytes,
            bucket_bytes: self.bucket_bytes,
            ..PipelineConfig::default()
        }
    }

    /// Log configuration parameters via tracing
    pub fn print(&self) {
        tracing::info!("Sketch Configuration:");
        tracing::info!("  k = {}", self.k);
        tracing::info!("  w = {}", self.w);
        tracing::debug!("  seed = {}", self.seed);
        tracing::info!("  canonical = {}", self.canonical);
        if self.num_threads == 0 {
            tracing::info!("  num_threads = all available cores");
        } else {
            tracing::info!("  num_threads = {}", self.num_threads);
        }
        tracing::debug!("  max_batch_items = {}", self.max_batch_items);
        tracing::debug!("  max_batch_bytes = {}", self.max_batch_bytes);
        tracing::debug!("  bucket_bytes = {}", self.bucket_bytes);
    }
}
