//! Bounded-memory parallel record pipeline
//!
//! [`ParallelProcessor`] drains a lazy, single-pass record source in batches.
//! The calling thread acts as coordinator: it pulls records into the current
//! batch, cuts the batch into contiguous buckets and hands every bucket to the
//! worker pool as soon as it is cut. Once the source or one of the batch caps
//! is reached, the coordinator waits for all buckets of the batch before the
//! next batch is pulled.
//!
//! ## Identifiers
//!
//! The task receives `(worker, id, item)` where `id = total + i`: `total` is
//! the number of records in all earlier batches and `i` the position of the
//! record in the current batch. Ids are therefore `0..n` in source order,
//! whatever the scheduling.
//!
//! ## Read-ahead
//!
//! The coordinator peeks the source to detect its end, so one record of the
//! next batch is already pulled while the current batch runs.
//!
//! ## Worker pool
//!
//! [`ParallelProcessor::new`] builds a pool of its own. To share one pool
//! across several runs, build it once with [`build_pool`] and pass it to
//! [`ParallelProcessor::with_pool`].
//!
//! ## Failures
//!
//! There is no per-task recovery. A panicking task is re-raised on the
//! coordinating thread once the buckets of its batch have finished, which
//! aborts the whole run.

use std::fmt;
use std::sync::Arc;

use rayon::{Scope, ThreadPool, ThreadPoolBuilder};
use thiserror::Error;
use tracing::trace;

use crate::constants::{
    DEFAULT_BUCKET_BYTES, DEFAULT_BUCKET_ITEMS, DEFAULT_MAX_BATCH_BYTES, DEFAULT_MAX_BATCH_ITEMS,
};
use crate::record::Record;

/// Errors raised while setting up a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A batch or bucket limit is unusable
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
    /// The worker pool could not be started
    #[error("failed to create thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Identity of the pool worker executing a task
///
/// Values are dense in `0..num_workers` and a worker never runs two tasks at
/// once, so a `WorkerId` can select a private output shard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerId(usize);

impl WorkerId {
    /// Wrap a worker index
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Worker index
    pub const fn index(self) -> usize {
        self.0
    }

    /// Worker running the current thread
    ///
    /// Bucket and side tasks always run on pool threads; outside a pool the
    /// first shard is used.
    fn current() -> Self {
        Self(rayon::current_thread_index().unwrap_or(0))
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Batch and bucket limits of a pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Number of worker threads (0 = all available cores)
    pub num_threads: usize,

    /// Maximum number of records held in one batch
    pub max_batch_items: usize,

    /// Maximum cumulative record size held in one batch
    pub max_batch_bytes: usize,

    /// Cumulative record size at which a bucket is cut
    pub bucket_bytes: usize,

    /// Records per bucket when processing borrowed objects
    pub bucket_items: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_threads: 0,
            max_batch_items: DEFAULT_MAX_BATCH_ITEMS,
            max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
            bucket_bytes: DEFAULT_BUCKET_BYTES,
            bucket_items: DEFAULT_BUCKET_ITEMS,
        }
    }
}

impl PipelineConfig {
    /// Default limits with a fixed number of workers
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads,
            ..Self::default()
        }
    }

    /// Validate the limits
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_batch_items == 0 {
            return Err(PipelineError::InvalidConfig("max_batch_items must be positive".into()));
        }
        if self.max_batch_bytes == 0 {
            return Err(PipelineError::InvalidConfig("max_batch_bytes must be positive".into()));
        }
        if self.bucket_bytes == 0 {
            return Err(PipelineError::InvalidConfig("bucket_bytes must be positive".into()));
        }
        if self.bucket_items == 0 {
            return Err(PipelineError::InvalidConfig("bucket_items must be positive".into()));
        }
        Ok(())
    }

    /// Number of workers a pool built from this configuration will have
    pub fn worker_count(&self) -> usize {
        if self.num_threads == 0 {
            rayon::current_num_threads()
        } else {
            self.num_threads
        }
    }
}

/// Totals of a finished pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    /// Records handed to the task
    pub items: usize,
    /// Sum of record sizes (zero for borrowed objects)
    pub total_bytes: usize,
    /// Number of batches
    pub batches: usize,
}

type Task<'a, V> = dyn Fn(WorkerId, usize, &mut V) + Sync + 'a;
type Hook<'a> = dyn FnMut() + 'a;

/// Batch-synchronous parallel driver for a per-record task
///
/// Hooks default to no-ops:
/// - `before_batch` runs on the coordinator before a batch is pulled;
/// - `in_parallel` runs once per batch on a worker, alongside the buckets;
/// - `after_batch` runs on the coordinator once every bucket has finished;
/// - `in_one_thread` runs on the coordinator for each borrowed object, in
///   source order, before the object's bucket is dispatched;
/// - `end_of_stream` runs once after the last batch.
pub struct ParallelProcessor<'a, V> {
    task: Box<Task<'a, V>>,
    before_batch: Box<Hook<'a>>,
    in_parallel: Box<dyn Fn() + Sync + 'a>,
    after_batch: Box<Hook<'a>>,
    in_one_thread: Box<dyn FnMut(&mut V) + 'a>,
    end_of_stream: Box<Hook<'a>>,
    config: PipelineConfig,
    pool: Arc<ThreadPool>,
}

/// Build a worker pool sized by `config`
///
/// The pool can be shared by any number of processors; its thread count is
/// the number of distinct [`WorkerId`]s they hand out.
pub fn build_pool(config: &PipelineConfig) -> Result<Arc<ThreadPool>, PipelineError> {
    config.validate()?;
    let pool = ThreadPoolBuilder::new()
        .num_threads(config.worker_count())
        .thread_name(|i| format!("minisketch-worker-{i}"))
        .build()?;
    Ok(Arc::new(pool))
}

/// Run `task` over owned records with default hooks
pub fn process_records<V, I, F>(
    config: PipelineConfig,
    source: I,
    task: F,
) -> Result<PipelineSummary, PipelineError>
where
    V: Record + Send,
    I: IntoIterator<Item = V>,
    F: Fn(WorkerId, usize, &mut V) + Sync,
{
    let mut processor = ParallelProcessor::new(config, task)?;
    Ok(processor.process_records(source))
}

/// Run `task` over borrowed objects, calling `in_one_thread` on each first
pub fn process_objects<'o, V, I, F, G>(
    config: PipelineConfig,
    source: I,
    in_one_thread: G,
    task: F,
) -> Result<PipelineSummary, PipelineError>
where
    V: Send + 'o,
    I: IntoIterator<Item = &'o mut V>,
    F: Fn(WorkerId, usize, &mut V) + Sync,
    G: FnMut(&mut V),
{
    let mut processor = ParallelProcessor::new(config, task)?.in_one_thread(in_one_thread);
    Ok(processor.process_objects(source))
}

impl<'a, V> ParallelProcessor<'a, V> {
    /// Create a processor running `task` on a pool sized by `config`
    pub fn new<F>(config: PipelineConfig, task: F) -> Result<Self, PipelineError>
    where
        F: Fn(WorkerId, usize, &mut V) + Sync + 'a,
    {
        let pool = build_pool(&config)?;
        Self::with_pool(config, pool, task)
    }

    /// Create a processor running `task` on an existing pool
    ///
    /// The pool size overrides `config.num_threads`.
    pub fn with_pool<F>(config: PipelineConfig, pool: Arc<ThreadPool>, task: F) -> Result<Self, PipelineError>
    where
        F: Fn(WorkerId, usize, &mut V) + Sync + 'a,
    {
        config.validate()?;
        Ok(Self {
            task: Box::new(task),
            before_batch: Box::new(|| {}),
            in_parallel: Box::new(|| {}),
            after_batch: Box::new(|| {}),
            in_one_thread: Box::new(|_| {}),
            end_of_stream: Box::new(|| {}),
            config,
            pool,
        })
    }

    /// Set the hook run before every batch
    pub fn before_batch(mut self, hook: impl FnMut() + 'a) -> Self {
        self.before_batch = Box::new(hook);
        self
    }

    /// Set the side task run once per batch, concurrently with the buckets
    pub fn in_parallel(mut self, hook: impl Fn() + Sync + 'a) -> Self {
        self.in_parallel = Box::new(hook);
        self
    }

    /// Set the hook run after every batch
    pub fn after_batch(mut self, hook: impl FnMut() + 'a) -> Self {
        self.after_batch = Box::new(hook);
        self
    }

    /// Set the per-object hook of [`Self::process_objects`]
    pub fn in_one_thread(mut self, hook: impl FnMut(&mut V) + 'a) -> Self {
        self.in_one_thread = Box::new(hook);
        self
    }

    /// Set the hook run once the source is exhausted
    pub fn end_of_stream(mut self, hook: impl FnMut() + 'a) -> Self {
        self.end_of_stream = Box::new(hook);
        self
    }

    /// Number of pool workers, i.e. the number of distinct [`WorkerId`]s
    pub fn num_workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Configuration of this processor
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process owned records produced lazily by `source`
    ///
    /// A batch ends when it holds `max_batch_items` records, when its records
    /// add up to `max_batch_bytes`, or when the source is exhausted. Within a
    /// batch a bucket is cut whenever the records pulled since the previous cut
    /// add up to `bucket_bytes`, and at the batch boundary.
    pub fn process_records<I>(&mut self, source: I) -> PipelineSummary
    where
        I: IntoIterator<Item = V>,
        V: Record + Send,
    {
        let Self {
            task,
            before_batch,
            in_parallel,
            after_batch,
            end_of_stream,
            config,
            pool,
            ..
        } = self;
        let task: &Task<'a, V> = &**task;
        let in_parallel: &(dyn Fn() + Sync + 'a) = &**in_parallel;

        trace!(
            "Starting parallel calculation using {} threads",
            pool.current_num_threads()
        );

        let mut source = source.into_iter().peekable();
        let mut summary = PipelineSummary::default();

        while source.peek().is_some() {
            before_batch();
            let total = summary.items;

            let (batch_items, batch_bytes) = pool.in_place_scope(|scope| {
                scope.spawn(move |_| in_parallel());

                let mut batch_items = 0usize;
                let mut batch_bytes = 0usize;
                let mut bucket: Vec<V> = Vec::new();
                let mut bucket_bytes = 0usize;
                let mut left = 0usize;

                while batch_items < config.max_batch_items && batch_bytes < config.max_batch_bytes {
                    let Some(item) = source.next() else {
                        break;
                    };
                    let size = item.approx_size();
                    batch_items += 1;
                    batch_bytes += size;
                    bucket_bytes += size;
                    bucket.push(item);

                    let batch_full = batch_items >= config.max_batch_items
                        || batch_bytes >= config.max_batch_bytes
                        || source.peek().is_none();
                    if bucket_bytes >= config.bucket_bytes || batch_full {
                        dispatch(scope, task, total + left, std::mem::take(&mut bucket));
                        left = batch_items;
                        bucket_bytes = 0;
                    }
                }
                (batch_items, batch_bytes)
            });

            after_batch();
            trace!("{} items of total length {} processed", batch_items, batch_bytes);
            summary.items += batch_items;
            summary.total_bytes += batch_bytes;
            summary.batches += 1;
        }

        end_of_stream();
        trace!(
            "Finished parallel processing. Processed {} items with total length {}",
            summary.items,
            summary.total_bytes
        );
        summary
    }

    /// Process objects the source lends out by mutable reference
    ///
    /// `in_one_thread` sees every object on the coordinating thread, in
    /// source order, before the object's bucket is dispatched. Buckets hold
    /// `bucket_items` objects and batches at most `max_batch_items`.
    pub fn process_objects<'o, I>(&mut self, source: I) -> PipelineSummary
    where
        I: IntoIterator<Item = &'o mut V>,
        V: Send + 'o,
    {
        let Self {
            task,
            before_batch,
            in_parallel,
            after_batch,
            in_one_thread,
            end_of_stream,
            config,
            pool,
        } = self;
        let task: &Task<'a, V> = &**task;
        let in_parallel: &(dyn Fn() + Sync + 'a) = &**in_parallel;

        trace!("Starting parallel calculation");

        let mut source = source.into_iter().peekable();
        let mut summary = PipelineSummary::default();

        while source.peek().is_some() {
            before_batch();
            let total = summary.items;

            let batch_items = pool.in_place_scope(|scope| {
                scope.spawn(move |_| in_parallel());

                let mut batch_items = 0usize;
                while batch_items < config.max_batch_items && source.peek().is_some() {
                    let left = batch_items;
                    let mut bucket: Vec<&'o mut V> = Vec::with_capacity(config.bucket_items);
                    while batch_items < config.max_batch_items && bucket.len() < config.bucket_items {
                        let Some(object) = source.next() else {
                            break;
                        };
                        in_one_thread(&mut *object);
                        bucket.push(object);
                        batch_items += 1;
                    }
                    dispatch_borrowed(scope, task, total + left, bucket);
                }
                batch_items
            });

            after_batch();
            trace!("Processed {} items", batch_items);
            summary.items += batch_items;
            summary.batches += 1;
        }

        end_of_stream();
        trace!("Finished parallel processing. Processed {} items", summary.items);
        summary
    }
}

/// Submit a bucket of owned records as one task
fn dispatch<'s, 'a: 's, V: Send + 's>(
    scope: &Scope<'s>,
    task: &'s Task<'a, V>,
    first_id: usize,
    mut bucket: Vec<V>,
) {
    scope.spawn(move |_| {
        let worker = WorkerId::current();
        for (offset, item) in bucket.iter_mut().enumerate() {
            task(worker, first_id + offset, item);
        }
    });
}

/// Submit a bucket of borrowed objects as one task
fn dispatch_borrowed<'s, 'a: 's, 'o: 's, V: Send + 'o>(
    scope: &Scope<'s>,
    task: &'s Task<'a, V>,
    first_id: usize,
    bucket: Vec<&'o mut V>,
) {
    scope.spawn(move |_| {
        let worker = WorkerId::current();
        for (offset, object) in bucket.into_iter().enumerate() {
            task(worker, first_id + offset, object);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::ShardedCollector;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn records(lengths: &[usize]) -> Vec<Vec<u8>> {
        lengths.iter().map(|&len| vec![b'A'; len]).collect()
    }

    fn config(threads: usize, max_items: usize, max_bytes: usize, bucket_bytes: usize) -> PipelineConfig {
        PipelineConfig {
            num_threads: threads,
            max_batch_items: max_items,
            max_batch_bytes: max_bytes,
            bucket_bytes,
            bucket_items: 2,
        }
    }

    /// Run `process_records` and return every id the task saw, sorted
    fn collect_ids(config: PipelineConfig, source: Vec<Vec<u8>>) -> (Vec<usize>, PipelineSummary) {
        let mut collector = ShardedCollector::new(config.worker_count());
        let summary = {
            let collector = &collector;
            let mut processor = ParallelProcessor::new(config, move |worker, id, _item: &mut Vec<u8>| {
                collector.append(worker, id);
            })
            .unwrap();
            processor.process_records(source)
        };
        let mut ids = collector.drain_ordered();
        ids.sort_unstable();
        (ids, summary)
    }

    #[test]
    fn test_ids_are_dense_for_any_shape() {
        let lengths: Vec<usize> = (0..97).map(|i| 1 + (i * 7) % 13).collect();
        for threads in [1, 2, 8] {
            for (max_items, max_bytes, bucket_bytes) in
                [(1, 1000, 1), (3, 1000, 5), (1000, 20, 4), (1000, 1000, 1000), (10, 50, 1)]
            {
                let (ids, summary) = collect_ids(
                    config(threads, max_items, max_bytes, bucket_bytes),
                    records(&lengths),
                );
                assert_eq!(ids, (0..lengths.len()).collect::<Vec<_>>());
                assert_eq!(summary.items, lengths.len());
                assert_eq!(summary.total_bytes, lengths.iter().sum::<usize>());
            }
        }
    }

    #[test]
    fn test_ids_follow_source_order() {
        let source: Vec<Vec<u8>> = (0..50u8).map(|i| vec![i; 3]).collect();
        let seen = Mutex::new(vec![None; 50]);
        {
            let mut processor =
                ParallelProcessor::new(config(4, 7, 1000, 6), |_, id, item: &mut Vec<u8>| {
                    seen.lock().unwrap()[id] = Some(item[0]);
                })
                .unwrap();
            processor.process_records(source);
        }
        let seen = seen.into_inner().unwrap();
        for (id, value) in seen.into_iter().enumerate() {
            assert_eq!(value, Some(id as u8));
        }
    }

    #[test]
    fn test_batch_caps() {
        // 10 items, 3 per batch -> 4 batches
        let (_, summary) = collect_ids(config(2, 3, 1000, 1000), records(&[1; 10]));
        assert_eq!(summary.batches, 4);

        // items of size 5, batch closes once 12 bytes are reached -> 3 per batch
        let (_, summary) = collect_ids(config(2, 1000, 12, 1000), records(&[5; 9]));
        assert_eq!(summary.batches, 3);
    }

    #[test]
    fn test_buckets_run_sequentially_inside() {
        // One bucket per batch: every id of a batch must be seen in order by one worker
        let order = Mutex::new(Vec::new());
        {
            let mut processor =
                ParallelProcessor::new(config(4, 1000, 1000, 1000), |worker, id, _: &mut Vec<u8>| {
                    order.lock().unwrap().push((worker, id));
                })
                .unwrap();
            processor.process_records(records(&[2; 20]));
        }
        let order = order.into_inner().unwrap();
        let ids: Vec<usize> = order.iter().map(|&(_, id)| id).collect();
        assert_eq!(ids, (0..20).collect::<Vec<_>>());
        assert!(order.iter().all(|&(worker, _)| worker == order[0].0));
    }

    #[test]
    fn test_hooks() {
        let before = AtomicUsize::new(0);
        let side = AtomicUsize::new(0);
        let after = AtomicUsize::new(0);
        let end = AtomicUsize::new(0);
        let summary = {
            let mut processor = ParallelProcessor::new(config(3, 4, 1000, 2), |_, _, _: &mut Vec<u8>| {})
                .unwrap()
                .before_batch(|| {
                    before.fetch_add(1, Ordering::SeqCst);
                })
                .in_parallel(|| {
                    side.fetch_add(1, Ordering::SeqCst);
                })
                .after_batch(|| {
                    // every side task of this batch has finished by now
                    assert_eq!(side.load(Ordering::SeqCst), before.load(Ordering::SeqCst));
                    after.fetch_add(1, Ordering::SeqCst);
                })
                .end_of_stream(|| {
                    end.fetch_add(1, Ordering::SeqCst);
                });
            processor.process_records(records(&[1; 10]))
        };
        assert_eq!(summary.batches, 3);
        assert_eq!(before.load(Ordering::SeqCst), 3);
        assert_eq!(side.load(Ordering::SeqCst), 3);
        assert_eq!(after.load(Ordering::SeqCst), 3);
        assert_eq!(end.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_source() {
        let before = AtomicUsize::new(0);
        let end = AtomicUsize::new(0);
        let summary = {
            let mut processor = ParallelProcessor::new(PipelineConfig::with_threads(2), |_, _, _: &mut Vec<u8>| {
                panic!("no items expected");
            })
            .unwrap()
            .before_batch(|| {
                before.fetch_add(1, Ordering::SeqCst);
            })
            .end_of_stream(|| {
                end.fetch_add(1, Ordering::SeqCst);
            });
            processor.process_records(Vec::<Vec<u8>>::new())
        };
        assert_eq!(summary, PipelineSummary::default());
        assert_eq!(before.load(Ordering::SeqCst), 0);
        assert_eq!(end.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lazy_source_is_pulled_in_bounded_batches() {
        // An unbounded generator, cut off by `take`, never materializes as a whole
        let pulled = AtomicUsize::new(0);
        let max_seen_ahead = AtomicUsize::new(0);
        let done = AtomicUsize::new(0);
        {
            let source = std::iter::repeat_with(|| {
                pulled.fetch_add(1, Ordering::SeqCst);
                vec![b'C'; 4]
            })
            .take(100);
            let mut processor = ParallelProcessor::new(config(2, 10, 1000, 8), |_, _, _: &mut Vec<u8>| {
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap()
            .before_batch(|| {
                let ahead = pulled.load(Ordering::SeqCst) - done.load(Ordering::SeqCst);
                max_seen_ahead.fetch_max(ahead, Ordering::SeqCst);
            });
            processor.process_records(source);
        }
        assert_eq!(done.load(Ordering::SeqCst), 100);
        // at most the one record peeked at the batch boundary is held between batches
        assert!(max_seen_ahead.load(Ordering::SeqCst) <= 1);
    }

    #[test]
    fn test_task_panic_is_fatal_to_the_run() {
        let result = std::panic::catch_unwind(|| {
            let mut processor =
                ParallelProcessor::new(config(2, 1000, 1000, 1), |_, id, _: &mut Vec<u8>| {
                    if id == 5 {
                        panic!("malformed record");
                    }
                })
                .unwrap();
            processor.process_records(records(&[1; 10]));
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_process_objects() {
        let mut objects: Vec<(usize, usize)> = (0..25).map(|i| (i, 0)).collect();
        let mut arrival = Vec::new();
        let summary = {
            let mut processor =
                ParallelProcessor::new(config(3, 10, 1000, 1000), |_, id, object: &mut (usize, usize)| {
                    assert_eq!(object.0, id);
                    // set by the in-one-thread hook before dispatch
                    assert_eq!(object.1, id + 1);
                    object.1 *= 10;
                })
                .unwrap()
                .in_one_thread(|object| {
                    arrival.push(object.0);
                    object.1 = object.0 + 1;
                });
            processor.process_objects(objects.iter_mut())
        };
        assert_eq!(summary.items, 25);
        assert_eq!(summary.batches, 3);
        assert_eq!(arrival, (0..25).collect::<Vec<_>>());
        for (i, object) in objects.iter().enumerate() {
            assert_eq!(object.1, (i + 1) * 10);
        }
    }

    #[test]
    fn test_invalid_config() {
        let bad = PipelineConfig {
            bucket_bytes: 0,
            ..PipelineConfig::default()
        };
        assert!(bad.validate().is_err());
        assert!(ParallelProcessor::new(bad, |_, _, _: &mut Vec<u8>| {}).is_err());
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_worker_count() {
        assert_eq!(PipelineConfig::with_threads(3).worker_count(), 3);
        let processor = ParallelProcessor::new(PipelineConfig::with_threads(3), |_, _, _: &mut Vec<u8>| {})
            .unwrap();
        assert_eq!(processor.num_workers(), 3);
        assert_eq!(WorkerId::new(2).to_string(), "worker-2");
    }

    #[test]
    fn test_shared_pool_is_reused_across_runs() {
        let pool = build_pool(&PipelineConfig::with_threads(3)).unwrap();
        let worker_threads = Mutex::new(std::collections::HashSet::new());
        for _ in 0..3 {
            let mut processor = ParallelProcessor::with_pool(
                config(8, 5, 1000, 2),
                Arc::clone(&pool),
                |worker, _, _: &mut Vec<u8>| {
                    assert!(worker.index() < 3);
                    worker_threads
                        .lock()
                        .unwrap()
                        .insert(std::thread::current().id());
                },
            )
            .unwrap();
            assert_eq!(processor.num_workers(), 3);
            let summary = processor.process_records(records(&[3; 40]));
            assert_eq!(summary.items, 40);
        }
        // every run executed on the same three pool threads
        assert!(worker_threads.into_inner().unwrap().len() <= 3);
    }

    #[test]
    fn test_process_records_fn() {
        let total = AtomicUsize::new(0);
        let summary = process_records(config(2, 4, 1000, 3), records(&[1, 2, 3, 4, 5]), |_, _, item| {
            total.fetch_add(item.len(), Ordering::SeqCst);
        })
        .unwrap();
        assert_eq!(summary.items, 5);
        assert_eq!(summary.batches, 2);
        assert_eq!(total.load(Ordering::SeqCst), 15);

        let bad = PipelineConfig {
            max_batch_items: 0,
            ..PipelineConfig::default()
        };
        assert!(process_records(bad, records(&[1]), |_, _, _| {}).is_err());
    }

    #[test]
    fn test_process_objects_fn() {
        let mut objects: Vec<usize> = vec![0; 12];
        let mut next = 0;
        let summary = process_objects(
            config(3, 5, 1000, 1000),
            objects.iter_mut(),
            |object| {
                *object = next;
                next += 1;
            },
            |_, id, object| assert_eq!(*object, id),
        )
        .unwrap();
        assert_eq!(summary.items, 12);
        assert_eq!(summary.batches, 3);
        assert_eq!(objects, (0..12).collect::<Vec<_>>());
    }
}
