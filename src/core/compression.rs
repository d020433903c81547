//! Block compression support: zlib encoding, byte shuffle, CRC32.
//!
//! Blocks are described externally (the archive index records stored length,
//! raw length and flags), so these helpers work on bare byte runs.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::{Compression, Crc};

use crate::util::{Error, Result};

/// Compress a block with zlib at the given level (1-9).
pub fn deflate(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level.min(9)));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompress a zlib block; `raw_len` is the expected decoded size.
pub fn inflate(data: &[u8], raw_len: usize) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(raw_len);
    decoder.read_to_end(&mut out)?;
    if out.len() != raw_len {
        return Err(Error::invalid(format!(
            "decompressed block is {} bytes, index says {}",
            out.len(),
            raw_len
        )));
    }
    Ok(out)
}

/// Byte-shuffle: regroup element bytes by byte position, so that all first
/// bytes come first, then all second bytes, and so on. Slowly varying numeric
/// data deflates much better in this arrangement.
pub fn shuffle(data: &[u8], elem_bytes: usize) -> Vec<u8> {
    if elem_bytes <= 1 || data.len() % elem_bytes != 0 {
        return data.to_vec();
    }
    let n = data.len() / elem_bytes;
    let mut out = vec![0u8; data.len()];
    for i in 0..n {
        for b in 0..elem_bytes {
            out[b * n + i] = data[i * elem_bytes + b];
        }
    }
    out
}

/// Inverse of [`shuffle`].
pub fn unshuffle(data: &[u8], elem_bytes: usize) -> Vec<u8> {
    if elem_bytes <= 1 || data.len() % elem_bytes != 0 {
        return data.to_vec();
    }
    let n = data.len() / elem_bytes;
    let mut out = vec![0u8; data.len()];
    for i in 0..n {
        for b in 0..elem_bytes {
            out[i * elem_bytes + b] = data[b * n + i];
        }
    }
    out
}

/// CRC32 of a stored block.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(data);
    crc.sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deflate_inflate_roundtrip() {
        let original: Vec<u8> = b"0123456789".repeat(500);
        let packed = deflate(&original, 9).unwrap();
        assert!(packed.len() < original.len());
        let unpacked = inflate(&packed, original.len()).unwrap();
        assert_eq!(unpacked, original);
    }

    #[test]
    fn test_inflate_length_mismatch() {
        let packed = deflate(b"abcdef", 6).unwrap();
        assert!(inflate(&packed, 5).is_err());
    }

    #[test]
    fn test_shuffle_roundtrip() {
        let data: Vec<u8> = (0u8..64).collect();
        let shuffled = shuffle(&data, 8);
        assert_ne!(shuffled, data);
        assert_eq!(unshuffle(&shuffled, 8), data);
    }

    #[test]
    fn test_shuffle_single_byte_elems_is_identity() {
        let data = vec![1u8, 2, 3];
        assert_eq!(shuffle(&data, 1), data);
    }

    #[test]
    fn test_crc_detects_change() {
        let a = crc32(b"block contents");
        let b = crc32(b"block contentz");
        assert_ne!(a, b);
    }
}
