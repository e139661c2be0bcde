//! Minimizer index construction
//!
//! Runs the parallel pipeline over a read source with a task that sketches
//! every read and appends its minimizer hashes to the worker's shard. After
//! the pipeline drains, the shards are merged, sorted and deduplicated into
//! the global [`MinimizerIndex`].

use std::path::Path;
use std::sync::Arc;

use rayon::ThreadPool;

use tracing::{info, warn};

use crate::{
    builder::{config::SketchConfiguration, parse::FastxSource},
    collector::{ShardedCollector, ShardedCounter},
    constants::LOCAL_DEDUP_THRESHOLD,
    hasher::{KmerHash, RollingKmerHasher},
    index::{MinimizerIndex, SketchStatistics},
    minimizer::MinimizerSketcher,
    pipeline::{ParallelProcessor, PipelineError, WorkerId},
    record::Record,
};

/// Builder for minimizer indexes
pub struct MinimizerIndexBuilder {
    config: SketchConfiguration,
    pool: Option<Arc<ThreadPool>>,
}

impl MinimizerIndexBuilder {
    /// Create a new index builder with the given configuration
    pub fn new(config: SketchConfiguration) -> Result<Self, crate::builder::ConfigError> {
        config.validate()?;
        Ok(Self { config, pool: None })
    }

    /// Run every build on `pool` instead of a pool created per build
    ///
    /// The pool size takes precedence over `config.num_threads`.
    pub fn with_pool(mut self, pool: Arc<ThreadPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Configuration of this builder
    pub fn config(&self) -> &SketchConfiguration {
        &self.config
    }

    /// Build the index of `source` with the configured rolling hasher
    ///
    /// # Parallelism
    /// The number of threads is controlled by `config.num_threads`:
    /// - `0`: use all available CPU cores (rayon default)
    /// - `N`: use exactly N worker threads
    ///
    /// The calling thread reads the source and is not counted as a worker.
    pub fn build<I, R>(&self, source: I) -> Result<MinimizerIndex, PipelineError>
    where
        I: IntoIterator<Item = R>,
        R: Record + AsRef<[u8]> + Send,
    {
        let hasher = RollingKmerHasher::new(self.config.k, self.config.seed, self.config.canonical);
        self.build_with_hasher(&hasher, source)
    }

    /// Build the index of `source` with a caller-supplied hash function
    ///
    /// The length filter uses `hasher.k()`.
    pub fn build_with_hasher<H, I, R>(&self, hasher: &H, source: I) -> Result<MinimizerIndex, PipelineError>
    where
        H: KmerHash + ?Sized,
        I: IntoIterator<Item = R>,
        R: Record + AsRef<[u8]> + Send,
    {
        let k = hasher.k();
        let w = self.config.w;
        let sketcher = MinimizerSketcher::new(hasher, w);
        let min_read_size = sketcher.min_sequence_length();

        let pipeline_config = self.config.pipeline_config();
        let num_workers = match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => pipeline_config.worker_count(),
        };
        let mut hashes: ShardedCollector<u64> = ShardedCollector::new(num_workers);
        let sketched = ShardedCounter::new(num_workers);
        let filtered = ShardedCounter::new(num_workers);

        info!("Reading reads");
        let summary = {
            let task = |worker: WorkerId, id: usize, record: &mut R| {
                let seq = record.as_ref();
                if seq.len() < min_read_size {
                    filtered.increment(worker);
                    return;
                }
                let mut minimizers = match sketcher.minimizer_hashes(seq) {
                    Ok(minimizers) => minimizers,
                    Err(e) => panic!("Failed to sketch read {id}: {e}"),
                };
                if minimizers.len() > LOCAL_DEDUP_THRESHOLD {
                    minimizers.sort_unstable();
                    minimizers.dedup();
                }
                sketched.increment(worker);
                hashes.append_all(worker, minimizers);
            };
            let mut processor = match &self.pool {
                Some(pool) => ParallelProcessor::with_pool(pipeline_config, Arc::clone(pool), task)?,
                None => ParallelProcessor::new(pipeline_config, task)?,
            };
            info!("Extracting minimizers");
            processor.process_records(source)
        };
        info!("Finished read processing");

        let hashes_collected = hashes.len();
        info!("{} hashes collected. Starting sorting.", hashes_collected);
        let hash_list = hashes.drain_unique_sorted();
        info!("Finished sorting. Total distinct minimizers: {}", hash_list.len());
        if hash_list.is_empty() {
            warn!("no reads passed the length filter {}.", min_read_size);
        }

        let statistics = SketchStatistics {
            reads_total: summary.items,
            reads_sketched: sketched.get(),
            reads_filtered: filtered.get(),
            hashes_collected,
            distinct_hashes: hash_list.len(),
        };

        Ok(MinimizerIndex::from_sorted(
            k,
            w,
            self.config.seed,
            self.config.canonical,
            hash_list,
            statistics,
        ))
    }

    /// Build the index of a FASTA/FASTQ file (may be gzipped)
    ///
    /// # Errors
    /// Returns error if the file cannot be opened, a record cannot be parsed,
    /// or the worker pool cannot be started
    pub fn build_from_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<MinimizerIndex> {
        let mut source = FastxSource::open(path)?;
        let index = self.build(&mut source)?;
        info!("  Read {} records", source.records_read());
        source.finish()?;
        Ok(index)
    }
}
