//! Builder module for constructing minimizer indexes
//!
//! The build runs in three steps:
//! 1. Read records lazily from the source (FASTA/FASTQ or any iterator)
//! 2. Sketch every long enough record in parallel into per-worker shards
//! 3. Merge, sort and deduplicate the shards into the global index

pub mod config;
pub mod index_builder;
pub mod parse;

pub use config::{ConfigError, SketchConfiguration};
pub use index_builder::MinimizerIndexBuilder;
pub use parse::FastxSource;
