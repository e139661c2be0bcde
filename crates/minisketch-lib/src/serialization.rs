//! Serialization and deserialization support for MinimizerIndex
//!
//! # File Format
//!
//! ```text
//! IndexSerializationHeader
//!   ├─ magic: "MSKIDX01"
//!   ├─ version_major: u32
//!   ├─ version_minor: u32
//!   ├─ k: u64
//!   ├─ w: u64
//!   ├─ seed: u64
//!   ├─ canonical: u8
//!   └─ num_hashes: u64
//! Hashes ([num_hashes] little-endian u64, strictly ascending)
//! ```
//!
//! Loading memory-maps the file and validates the header, the payload length
//! and the ordering of the hashes.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use crate::index::{MinimizerIndex, SketchStatistics};

/// Magic bytes for the minimizer index format
const MAGIC: &[u8; 8] = b"MSKIDX01";

/// File format version: (major, minor)
/// Increment major on breaking changes, minor on compatible changes
const FORMAT_VERSION: (u32, u32) = (1, 0);

/// Serialized size of [`IndexSerializationHeader`]
pub const HEADER_SIZE_BYTES: usize = 8 + 4 + 4 + 8 + 8 + 8 + 1 + 8;

/// Header for the serialized MinimizerIndex
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexSerializationHeader {
    /// Magic number for format identification ("MSKIDX01")
    pub magic: [u8; 8],
    /// Format version major number
    pub version_major: u32,
    /// Format version minor number
    pub version_minor: u32,
    /// K-mer length
    pub k: usize,
    /// Window size
    pub w: usize,
    /// Hash seed
    pub seed: u64,
    /// Whether canonical mode is enabled
    pub canonical: bool,
    /// Number of hashes that follow the header
    pub num_hashes: u64,
}

impl IndexSerializationHeader {
    /// Create the header describing `index`
    pub fn for_index(index: &MinimizerIndex) -> Self {
        Self {
            magic: *MAGIC,
            version_major: FORMAT_VERSION.0,
            version_minor: FORMAT_VERSION.1,
            k: index.k(),
            w: index.w(),
            seed: index.seed(),
            canonical: index.canonical(),
            num_hashes: index.len() as u64,
        }
    }

    /// Write header to a writer
    pub fn write(&self, writer: &mut dyn Write) -> io::Result<()> {
        writer.write_all(&self.magic)?;
        writer.write_all(&self.version_major.to_le_bytes())?;
        writer.write_all(&self.version_minor.to_le_bytes())?;
        writer.write_all(&(self.k as u64).to_le_bytes())?;
        writer.write_all(&(self.w as u64).to_le_bytes())?;
        writer.write_all(&self.seed.to_le_bytes())?;
        writer.write_all(&[self.canonical as u8])?;
        writer.write_all(&self.num_hashes.to_le_bytes())?;
        Ok(())
    }

    /// Read header from a reader
    pub fn read(reader: &mut dyn Read) -> io::Result<Self> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;

        if &magic != MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Invalid magic number for minimizer index file",
            ));
        }

        let version_major = read_u32(reader)?;
        let version_minor = read_u32(reader)?;
        if version_major != FORMAT_VERSION.0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Incompatible format version: {}.{}, expected {}.{}",
                    version_major, version_minor, FORMAT_VERSION.0, FORMAT_VERSION.1
                ),
            ));
        }

        let k = read_u64(reader)? as usize;
        let w = read_u64(reader)? as usize;
        let seed = read_u64(reader)?;
        let mut canonical = [0u8; 1];
        reader.read_exact(&mut canonical)?;
        let num_hashes = read_u64(reader)?;

        Ok(Self {
            magic,
            version_major,
            version_minor,
            k,
            w,
            seed,
            canonical: canonical[0] != 0,
            num_hashes,
        })
    }
}

fn read_u32(reader: &mut dyn Read) -> io::Result<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_u64(reader: &mut dyn Read) -> io::Result<u64> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes)?;
    Ok(u64::from_le_bytes(bytes))
}

impl MinimizerIndex {
    /// Write the index to a writer
    pub fn write_to(&self, writer: &mut dyn Write) -> io::Result<()> {
        IndexSerializationHeader::for_index(self).write(writer)?;
        for hash in self.hashes() {
            writer.write_all(&hash.to_le_bytes())?;
        }
        Ok(())
    }

    /// Save the index to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        debug!("Saved {} minimizers to {}", self.len(), path.display());
        Ok(())
    }

    /// Read an index from a byte buffer holding a complete file
    pub fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        let mut cursor = bytes;
        let header = IndexSerializationHeader::read(&mut cursor)?;

        let expected = header
            .num_hashes
            .checked_mul(8)
            .and_then(|n| usize::try_from(n).ok());
        if expected != Some(cursor.len()) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Index payload holds {} bytes, header announces {} hashes",
                    cursor.len(),
                    header.num_hashes
                ),
            ));
        }

        let hashes: Vec<u64> = cursor
            .chunks_exact(8)
            .map(|chunk| {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(chunk);
                u64::from_le_bytes(bytes)
            })
            .collect();
        if hashes.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Index hashes are not strictly ascending",
            ));
        }

        let statistics = SketchStatistics {
            distinct_hashes: hashes.len(),
            ..SketchStatistics::default()
        };
        Ok(Self::from_sorted(
            header.k,
            header.w,
            header.seed,
            header.canonical,
            hashes,
            statistics,
        ))
    }

    /// Load an index from a file
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        // SAFETY: the mapping is read once into owned memory and dropped before returning
        let mmap = unsafe { Mmap::map(&file)? };
        let index = Self::from_bytes(&mmap)?;
        debug!("Loaded {} minimizers from {}", index.len(), path.display());
        Ok(index)
    }
}
