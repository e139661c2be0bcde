//! Integration tests for the sketching pipeline
//!
//! These tests exercise the full path from a read file to a saved index.

use std::fs;
use std::io::Write;

use minisketch_lib::builder::parse::count_sequences;
use minisketch_lib::{
    minimizer_hashes, FastxSource, MinimizerIndex, MinimizerIndexBuilder, ParallelProcessor,
    PipelineConfig, RollingKmerHasher, SequenceRecord, ShardedCollector, SketchConfiguration,
};
use tempfile::{NamedTempFile, TempDir};

/// Deterministic pseudo-random DNA
fn random_dna(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            b"ACGT"[(state >> 33) as usize & 3]
        })
        .collect()
}

fn write_fasta(reads: &[Vec<u8>]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for (i, read) in reads.iter().enumerate() {
        writeln!(file, ">read{i} sample=test").unwrap();
        file.write_all(read).unwrap();
        writeln!(file).unwrap();
    }
    file.flush().unwrap();
    file
}

fn small_batches(threads: usize) -> SketchConfiguration {
    let mut config = SketchConfiguration::new(11, 5).unwrap();
    config.num_threads = threads;
    config.max_batch_items = 7;
    config.max_batch_bytes = 2_000;
    config.bucket_bytes = 300;
    config
}

#[test]
fn test_end_to_end_file_to_saved_index() {
    let reads: Vec<Vec<u8>> = (0..60).map(|i| random_dna(50 + (i * 37) % 400, i as u64)).collect();
    let fasta = write_fasta(&reads);

    let (num_seqs, total_bases) = count_sequences(fasta.path()).unwrap();
    assert_eq!(num_seqs, reads.len());
    assert_eq!(total_bases, reads.iter().map(Vec::len).sum::<usize>());

    let builder = MinimizerIndexBuilder::new(small_batches(4)).unwrap();
    let index = builder.build_from_file(fasta.path()).unwrap();

    // Every read is long enough, so the index is the union of per-read minimizers
    let hasher = RollingKmerHasher::new(11, 1, false);
    let mut expected: Vec<u64> = reads
        .iter()
        .flat_map(|read| minimizer_hashes(read, &hasher, 5).unwrap())
        .collect();
    expected.sort_unstable();
    expected.dedup();
    assert_eq!(index.hashes(), expected.as_slice());
    assert_eq!(index.statistics().reads_sketched, reads.len());

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reads.msk");
    index.save(&path).unwrap();
    let loaded = MinimizerIndex::load(&path).unwrap();
    assert_eq!(loaded.hashes(), index.hashes());
    assert_eq!((loaded.k(), loaded.w(), loaded.seed()), (11, 5, 1));
}

#[test]
fn test_thread_count_does_not_change_the_index() {
    let reads: Vec<Vec<u8>> = (0..80).map(|i| random_dna(20 + (i * 53) % 300, 1000 + i as u64)).collect();

    let single = MinimizerIndexBuilder::new(small_batches(1))
        .unwrap()
        .build(reads.clone())
        .unwrap();
    let many = MinimizerIndexBuilder::new(small_batches(8))
        .unwrap()
        .build(reads)
        .unwrap();
    assert_eq!(single.hashes(), many.hashes());
    assert_eq!(single.statistics(), many.statistics());
}

#[test]
fn test_ambiguous_bases_split_reads() {
    let left = random_dna(30, 7);
    let right = random_dna(30, 8);
    let mut joined = left.clone();
    joined.extend_from_slice(b"NNNN");
    joined.extend_from_slice(&right);
    let fasta = write_fasta(&[joined]);

    let mut source = FastxSource::open(fasta.path()).unwrap();
    let fragments: Vec<SequenceRecord> = (&mut source).collect();
    source.finish().unwrap();
    assert_eq!(fragments.len(), 2);
    assert_eq!(fragments[0].seq, left);
    assert_eq!(fragments[1].seq, right);
}

#[test]
fn test_malformed_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.fq");
    fs::write(&path, "@r1\nACGTACGT\n+\nIIII\n").unwrap();

    let builder = MinimizerIndexBuilder::new(small_batches(2)).unwrap();
    assert!(builder.build_from_file(&path).is_err());
}

#[test]
fn test_pipeline_with_collector_counts_bases() {
    let reads: Vec<Vec<u8>> = (0..200).map(|i| random_dna(1 + i % 17, i as u64)).collect();
    let config = PipelineConfig {
        num_threads: 3,
        max_batch_items: 16,
        max_batch_bytes: 100,
        bucket_bytes: 10,
        ..PipelineConfig::default()
    };
    let mut lengths = ShardedCollector::new(config.worker_count());
    let summary = {
        let lengths = &lengths;
        let mut processor = ParallelProcessor::new(config, move |worker, id, read: &mut Vec<u8>| {
            lengths.append(worker, (id, read.len()));
        })
        .unwrap();
        processor.process_records(reads.clone())
    };

    let mut seen = lengths.drain_unique_sorted();
    assert_eq!(seen.len(), reads.len());
    seen.sort_unstable();
    for (id, len) in seen {
        assert_eq!(len, reads[id].len());
    }
    assert_eq!(summary.items, reads.len());
    assert!(lengths.is_empty());
}
