//! Sequence records flowing through the pipeline

use crate::encoding::is_acgt;

/// Unit of pipeline input
///
/// The reported size is only used to bound batch and bucket memory.
pub trait Record {
    /// Approximate size of the record in bytes
    fn approx_size(&self) -> usize;
}

impl Record for Vec<u8> {
    fn approx_size(&self) -> usize {
        self.len()
    }
}

impl Record for String {
    fn approx_size(&self) -> usize {
        self.len()
    }
}

impl Record for &[u8] {
    fn approx_size(&self) -> usize {
        self.len()
    }
}

/// A named DNA sequence
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SequenceRecord {
    /// Record identifier (FASTA/FASTQ header up to the first whitespace)
    pub id: String,
    /// Sequence bases
    pub seq: Vec<u8>,
}

impl SequenceRecord {
    /// Create a record from an id and its bases
    pub fn new(id: impl Into<String>, seq: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            seq: seq.into(),
        }
    }

    /// Number of bases
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    /// Whether the record has no bases
    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

impl Record for SequenceRecord {
    fn approx_size(&self) -> usize {
        self.seq.len()
    }
}

impl AsRef<[u8]> for SequenceRecord {
    fn as_ref(&self) -> &[u8] {
        &self.seq
    }
}

/// Cut a record at every non-ACGT base into ACGT-only fragments
///
/// Fragments keep the record id with a `_<n>` suffix when the record is
/// actually split. Empty fragments are dropped.
pub fn split_on_ambiguous(record: SequenceRecord) -> Vec<SequenceRecord> {
    if record.seq.iter().all(|&b| is_acgt(b)) {
        return vec![record];
    }
    record
        .seq
        .split(|&b| !is_acgt(b))
        .filter(|fragment| !fragment.is_empty())
        .enumerate()
        .map(|(n, fragment)| SequenceRecord::new(format!("{}_{}", record.id, n), fragment))
        .collect()
}
