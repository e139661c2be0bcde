//! DNA nucleotide encoding
//!
//! 2-bit codes used by the rolling k-mer hasher:
//! - A (65/97)  -> 00
//! - C (67/99)  -> 01
//! - G (71/103) -> 11
//! - T (84/116) -> 10
//!
//! With this layout the complement of a base is `code ^ 0b10`.

use thiserror::Error;

/// Error type for encoding operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The input byte is not a valid DNA base (A/C/G/T)
    #[error("Invalid DNA base {base:?} at position {position}")]
    InvalidBase {
        /// Offending byte
        base: u8,
        /// Position in the input
        position: usize,
    },
    /// The input does not fit into a packed k-mer
    #[error("K-mer of length {0} exceeds the maximum packed length")]
    TooLong(usize),
}

/// Encode a single DNA nucleotide to 2 bits, `None` for anything but A/C/G/T
#[inline]
pub const fn encode_base(base: u8) -> Option<u8> {
    match base {
        b'A' | b'a' => Some(0b00),
        b'C' | b'c' => Some(0b01),
        b'G' | b'g' => Some(0b11),
        b'T' | b't' => Some(0b10),
        _ => None,
    }
}

/// Decode a 2-bit value to DNA nucleotide (uppercase)
#[inline]
pub const fn decode_base(bits: u8) -> u8 {
    match bits & 0b11 {
        0b00 => b'A',
        0b01 => b'C',
        0b11 => b'G',
        _ => b'T',
    }
}

/// Get the complement of an encoded base
#[inline]
pub const fn complement_base(bits: u8) -> u8 {
    bits ^ 0b10
}

/// Whether a byte is one of A/C/G/T (either case)
#[inline]
pub const fn is_acgt(base: u8) -> bool {
    encode_base(base).is_some()
}

/// Pack a k-mer into a `u128`, first base in the most significant position
///
/// # Errors
/// Returns an error if the k-mer is longer than 64 bases or holds a non-ACGT byte
pub fn encode_kmer(kmer: &[u8]) -> Result<u128, EncodingError> {
    if kmer.len() > 64 {
        return Err(EncodingError::TooLong(kmer.len()));
    }
    kmer.iter().enumerate().try_fold(0u128, |acc, (position, &base)| {
        let code = encode_base(base).ok_or(EncodingError::InvalidBase { base, position })?;
        Ok((acc << 2) | code as u128)
    })
}

/// Unpack `k` bases from a packed k-mer
pub fn decode_kmer(bits: u128, k: usize) -> Vec<u8> {
    (0..k)
        .rev()
        .map(|i| decode_base(((bits >> (2 * i)) & 0b11) as u8))
        .collect()
}

/// Reverse complement of an ACGT sequence; other bytes are kept in place
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&base| match encode_base(base) {
            Some(code) => decode_base(complement_base(code)),
            None => base,
        })
        .collect()
}
