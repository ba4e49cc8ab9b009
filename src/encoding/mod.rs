//! Wire codec shared by every on-disk format in the crate.
//!
//! Two families of encodings live here:
//!
//! - **Uvarint** — unsigned LEB128, 1–10 bytes for a `u64`. Used for the
//!   `shared`/`unshared`/`value_len` fields of block entries, for block
//!   handles on the wire, and for every length prefix.
//! - **Varstr** — a length-prefixed byte string: `uvarint(len) ‖ bytes`.
//!   Used by write-batch operations and memtable records.
//!
//! Fixed-width integers in the formats (restart offsets, CRCs, the batch
//! header, the table footer) are **big-endian**; the helpers for those are
//! here too.
//!
//! Encoders append to a growable `Vec<u8>` and cannot fail. Decoders take a
//! byte slice, return `(value, bytes_consumed)`, and fail on truncation or
//! on a declared length overrunning the buffer.

#[cfg(test)]
mod tests;

use thiserror::Error;

/// Largest number of bytes a `u64` Uvarint can occupy.
pub const MAX_UVARINT_LEN: usize = 10;

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Errors produced while decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    /// The buffer ran out of bytes before decoding completed.
    #[error("unexpected end of buffer (need {needed} bytes, have {available})")]
    UnexpectedEof {
        /// Bytes required to continue decoding.
        needed: usize,
        /// Bytes actually remaining.
        available: usize,
    },

    /// A varint ran past 10 bytes or past the range of a `u64`.
    #[error("varint overflows u64")]
    VarintOverflow,

    /// A varstr length prefix pointed past the end of the buffer.
    #[error("varstr length {declared} overruns buffer of {available} bytes")]
    LengthOverrun {
        /// Length claimed by the prefix.
        declared: usize,
        /// Bytes available after the prefix.
        available: usize,
    },

    /// An internal-key tag carried an unknown value-type byte.
    #[error("invalid value type byte {0:#04x}")]
    InvalidValueType(u8),
}

// ------------------------------------------------------------------------------------------------
// Uvarint
// ------------------------------------------------------------------------------------------------

/// Number of bytes `put_uvarint` will use for `n`.
///
/// `1` for `n = 0`, otherwise `⌈bits(n) / 7⌉`.
pub fn varint_len(mut n: u64) -> usize {
    let mut len = 1;
    while n >= 0x80 {
        n >>= 7;
        len += 1;
    }
    len
}

/// Appends `n` as an unsigned LEB128 varint. Returns the bytes written.
pub fn put_uvarint(dst: &mut Vec<u8>, mut n: u64) -> usize {
    let start = dst.len();
    while n >= 0x80 {
        dst.push(n as u8 | 0x80);
        n >>= 7;
    }
    dst.push(n as u8);
    dst.len() - start
}

/// Decodes one Uvarint from the front of `src`.
///
/// Returns `(value, bytes_consumed)`.
pub fn get_uvarint(src: &[u8]) -> Result<(u64, usize), EncodingError> {
    let mut value = 0u64;
    let mut shift = 0u32;
    for (i, &byte) in src.iter().enumerate() {
        if i >= MAX_UVARINT_LEN || (i == MAX_UVARINT_LEN - 1 && byte > 1) {
            return Err(EncodingError::VarintOverflow);
        }
        if byte < 0x80 {
            return Ok((value | (u64::from(byte) << shift), i + 1));
        }
        value |= u64::from(byte & 0x7f) << shift;
        shift += 7;
    }
    Err(EncodingError::UnexpectedEof {
        needed: src.len() + 1,
        available: src.len(),
    })
}

// ------------------------------------------------------------------------------------------------
// Varstr
// ------------------------------------------------------------------------------------------------

/// Encoded size of `s` as a varstr.
pub fn varstr_len(s: &[u8]) -> usize {
    varint_len(s.len() as u64) + s.len()
}

/// Appends `uvarint(len) ‖ s`. Returns the bytes written.
pub fn put_varstr(dst: &mut Vec<u8>, s: &[u8]) -> usize {
    let prefix = put_uvarint(dst, s.len() as u64);
    dst.extend_from_slice(s);
    prefix + s.len()
}

/// Decodes one varstr from the front of `src`.
///
/// Returns the string as a subslice of `src` together with the total bytes
/// consumed (prefix + payload).
pub fn get_varstr(src: &[u8]) -> Result<(&[u8], usize), EncodingError> {
    let (len, prefix) = get_uvarint(src)?;
    let len = usize::try_from(len).map_err(|_| EncodingError::VarintOverflow)?;
    let available = src.len() - prefix;
    if len > available {
        return Err(EncodingError::LengthOverrun {
            declared: len,
            available,
        });
    }
    Ok((&src[prefix..prefix + len], prefix + len))
}

// ------------------------------------------------------------------------------------------------
// Fixed-width big-endian helpers
// ------------------------------------------------------------------------------------------------

/// Appends `n` as 4 big-endian bytes.
pub fn put_fixed32_be(dst: &mut Vec<u8>, n: u32) {
    dst.extend_from_slice(&n.to_be_bytes());
}

/// Appends `n` as 8 big-endian bytes.
pub fn put_fixed64_be(dst: &mut Vec<u8>, n: u64) {
    dst.extend_from_slice(&n.to_be_bytes());
}

/// Reads 4 big-endian bytes from the front of `src`.
pub fn decode_fixed32_be(src: &[u8]) -> Result<u32, EncodingError> {
    let bytes: [u8; 4] = src
        .get(..4)
        .and_then(|s| s.try_into().ok())
        .ok_or(EncodingError::UnexpectedEof {
            needed: 4,
            available: src.len(),
        })?;
    Ok(u32::from_be_bytes(bytes))
}

/// Reads 8 big-endian bytes from the front of `src`.
pub fn decode_fixed64_be(src: &[u8]) -> Result<u64, EncodingError> {
    let bytes: [u8; 8] = src
        .get(..8)
        .and_then(|s| s.try_into().ok())
        .ok_or(EncodingError::UnexpectedEof {
            needed: 8,
            available: src.len(),
        })?;
    Ok(u64::from_be_bytes(bytes))
}
