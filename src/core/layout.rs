//! Dataset storage layout: shape, dtype, chunking, compression, checksums.

use serde::{Deserialize, Serialize};

use crate::util::Dtype;

/// Compression codec for stored blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Codec {
    /// Portable zlib/deflate
    Deflate,
}

/// Compression spec for a dataset.
///
/// `codec == None` means the dataset is stored raw. The spec is preserved
/// verbatim when a dataset is copied without recompression, so a "no
/// compression" spec survives a copy as-is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compression {
    pub codec: Option<Codec>,
    /// Codec level (0-9 for deflate); meaningless when codec is None
    pub level: u32,
    /// Byte-shuffle elements before encoding
    pub shuffle: bool,
}

impl Compression {
    /// No compression.
    pub const fn none() -> Self {
        Self { codec: None, level: 0, shuffle: false }
    }

    /// Deflate at the given level, optionally byte-shuffled.
    pub const fn deflate(level: u32, shuffle: bool) -> Self {
        Self { codec: Some(Codec::Deflate), level, shuffle }
    }

    #[inline]
    pub const fn is_enabled(&self) -> bool {
        self.codec.is_some()
    }
}

impl Default for Compression {
    fn default() -> Self {
        Self::none()
    }
}

/// Full storage description of a dataset.
///
/// Dimension 0 counts rows; trailing dimensions describe one row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub dtype: Dtype,
    pub shape: Vec<u64>,
    /// Per-dimension growth limit; `None` entries are unlimited.
    /// Absent means the dataset cannot grow past `shape`.
    pub max_shape: Option<Vec<Option<u64>>>,
    /// Chunk shape, absent for contiguous storage.
    pub chunk: Option<Vec<u64>>,
    pub compression: Compression,
    /// Store per-block checksums.
    pub checksum: bool,
}

impl DatasetInfo {
    /// Contiguous, uncompressed dataset of the given dtype and shape.
    pub fn new(dtype: Dtype, shape: Vec<u64>) -> Self {
        Self {
            dtype,
            shape,
            max_shape: None,
            chunk: None,
            compression: Compression::none(),
            checksum: false,
        }
    }

    /// Builder-style chunk shape.
    pub fn with_chunk(mut self, chunk: Vec<u64>) -> Self {
        self.chunk = Some(chunk);
        self
    }

    /// Builder-style compression spec.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Builder-style checksum flag.
    pub fn with_checksum(mut self, checksum: bool) -> Self {
        self.checksum = checksum;
        self
    }

    /// Number of rows (extent of dimension 0; scalar datasets count one row).
    #[inline]
    pub fn rows(&self) -> u64 {
        self.shape.first().copied().unwrap_or(1)
    }

    /// Elements in one row (product of trailing dimensions).
    #[inline]
    pub fn row_elems(&self) -> usize {
        self.shape.iter().skip(1).product::<u64>() as usize
    }

    /// Bytes in one row.
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.row_elems() * self.dtype.num_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_geometry() {
        let info = DatasetInfo::new(Dtype::Float64, vec![10, 3, 2]);
        assert_eq!(info.rows(), 10);
        assert_eq!(info.row_elems(), 6);
        assert_eq!(info.row_bytes(), 48);
    }

    #[test]
    fn test_scalar_and_vector_shapes() {
        let scalar = DatasetInfo::new(Dtype::Int64, vec![]);
        assert_eq!(scalar.rows(), 1);
        assert_eq!(scalar.row_elems(), 1);

        let vector = DatasetInfo::new(Dtype::Float32, vec![7]);
        assert_eq!(vector.rows(), 7);
        assert_eq!(vector.row_elems(), 1);
    }

    #[test]
    fn test_compression_spec() {
        assert!(!Compression::none().is_enabled());
        let c = Compression::deflate(9, true);
        assert!(c.is_enabled());
        assert_eq!(c.level, 9);
        assert!(c.shuffle);
    }
}
