//! FASTA/FASTQ record source with automatic decompression
//!
//! [`FastxSource`] reads records lazily, one at a time, so it can feed the
//! pipeline without holding the file in memory. Sequences are uppercased and
//! cut at non-ACGT bases. Iteration stops at the first read error, which is
//! kept and returned by [`FastxSource::finish`].

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use needletail::errors::ParseErrorKind;
use needletail::{parse_fastx_file, FastxReader};

use crate::record::{split_on_ambiguous, SequenceRecord};

/// Lazy, single-pass reader over a FASTA/FASTQ file (may be gzipped)
pub struct FastxSource {
    path: PathBuf,
    reader: Option<Box<dyn FastxReader>>,
    pending: VecDeque<SequenceRecord>,
    error: Option<anyhow::Error>,
    exhausted: bool,
    records_read: usize,
}

impl FastxSource {
    /// Open a sequence file
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or its format is not recognized
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = open_reader(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            exhausted: reader.is_none(),
            reader,
            pending: VecDeque::new(),
            error: None,
            records_read: 0,
        })
    }

    /// Number of file records read so far (before splitting)
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Finish reading, reporting the error that stopped iteration, if any
    pub fn finish(self) -> Result<()> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Iterator for FastxSource {
    type Item = SequenceRecord;

    fn next(&mut self) -> Option<SequenceRecord> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(record);
            }
            let reader = match self.reader.as_mut() {
                Some(reader) if !self.exhausted => reader,
                _ => return None,
            };
            match reader.next() {
                None => self.exhausted = true,
                Some(Err(error)) => {
                    self.error = Some(anyhow::Error::new(error).context(format!(
                        "Failed to parse sequence record in {}",
                        self.path.display()
                    )));
                    self.exhausted = true;
                }
                Some(Ok(record)) => {
                    self.records_read += 1;
                    let id = String::from_utf8_lossy(record.id())
                        .split_whitespace()
                        .next()
                        .unwrap_or_default()
                        .to_string();
                    let seq = record.seq().to_ascii_uppercase();
                    self.pending
                        .extend(split_on_ambiguous(SequenceRecord::new(id, seq)));
                }
            }
        }
    }
}

/// Open `path` for reading, or `None` when the file is empty
fn open_reader(path: &Path) -> Result<Option<Box<dyn FastxReader>>> {
    // needletail automatically handles gzip decompression
    match parse_fastx_file(path) {
        Ok(reader) => Ok(Some(reader)),
        Err(error) if error.kind == ParseErrorKind::EmptyFile => Ok(None),
        Err(error) => Err(anyhow::Error::new(error)
            .context(format!("Failed to open sequence file: {}", path.display()))),
    }
}

/// Count sequences and total bases in a file
///
/// # Returns
/// `(num_sequences, total_bases)`, counted before ambiguous bases are cut
pub fn count_sequences<P: AsRef<Path>>(path: P) -> Result<(usize, usize)> {
    let path = path.as_ref();
    let Some(mut reader) = open_reader(path)? else {
        return Ok((0, 0));
    };
    let mut num_sequences = 0;
    let mut total_bases = 0;

    while let Some(record) = reader.next() {
        let record = record
            .with_context(|| format!("Failed to parse sequence record in {}", path.display()))?;
        num_sequences += 1;
        total_bases += record.num_bases();
    }

    Ok((num_sequences, total_bases))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_fasta_file() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, ">seq1 first read")?;
        writeln!(temp_file, "acgt")?;
        writeln!(temp_file, ">seq2")?;
        writeln!(temp_file, "TGCANNGGA")?;
        temp_file.flush()?;

        let mut source = FastxSource::open(temp_file.path())?;
        let records: Vec<SequenceRecord> = source.by_ref().collect();
        assert_eq!(source.records_read(), 2);
        source.finish()?;

        assert_eq!(
            records,
            vec![
                SequenceRecord::new("seq1", "ACGT"),
                SequenceRecord::new("seq2_0", "TGCA"),
                SequenceRecord::new("seq2_1", "GGA"),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_read_fastq_file() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "@r1")?;
        writeln!(temp_file, "ACGTACGT")?;
        writeln!(temp_file, "+")?;
        writeln!(temp_file, "IIIIIIII")?;
        temp_file.flush()?;

        let mut source = FastxSource::open(temp_file.path())?;
        let records: Vec<SequenceRecord> = source.by_ref().collect();
        source.finish()?;
        assert_eq!(records, vec![SequenceRecord::new("r1", "ACGTACGT")]);
        Ok(())
    }

    #[test]
    fn test_empty_file_is_an_empty_source() -> Result<()> {
        let temp_file = NamedTempFile::new()?;

        let mut source = FastxSource::open(temp_file.path())?;
        assert_eq!(source.by_ref().count(), 0);
        assert_eq!(source.records_read(), 0);
        source.finish()?;

        assert_eq!(count_sequences(temp_file.path())?, (0, 0));
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        assert!(FastxSource::open("/nonexistent/reads.fa").is_err());
    }

    #[test]
    fn test_count_sequences() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, ">seq1")?;
        writeln!(temp_file, "ACGT")?;
        writeln!(temp_file, ">seq2")?;
        writeln!(temp_file, "TGCATGCA")?;
        temp_file.flush()?;

        let (num_seqs, total_bases) = count_sequences(temp_file.path())?;
        assert_eq!(num_seqs, 2);
        assert_eq!(total_bases, 12); // 4 + 8

        Ok(())
    }
}
