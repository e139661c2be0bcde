// minisketch: parallel minimizer sketching of sequencing reads
//
// A bounded batch-parallel pipeline, a per-worker sharded collector and a
// minimizer index builder on top of them, plus process isolation helpers.

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod constants;
pub mod encoding;
pub mod hasher;
pub mod minimizer;
pub mod record;
pub mod collector;
pub mod pipeline;
pub mod index;
pub mod builder;
pub mod serialization;
pub mod isolation;

// Re-export common types at crate root
pub use hasher::{KmerHash, RollingKmerHasher};
pub use minimizer::{minimizer_hashes, MinimizerInfo, MinimizerSketcher};
pub use record::{Record, SequenceRecord};
pub use collector::{ShardedCollector, ShardedCounter};
pub use pipeline::{build_pool, ParallelProcessor, PipelineConfig, PipelineError, PipelineSummary, WorkerId};
pub use index::{MinimizerIndex, SketchStatistics};
pub use builder::{FastxSource, MinimizerIndexBuilder, SketchConfiguration};
pub use isolation::{run_isolated, run_isolated_or_exit, IsolatedJobs, IsolationError};

/// Version information
pub fn version() -> (u8, u8, u8) {
    constants::VERSION
}
