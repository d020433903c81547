//! Storage layout planning for reconstructed datasets.

use crate::core::{Compression, DatasetInfo};
use crate::util::Dtype;

use super::FilterOptions;

/// Chunk row count forced onto recompressed datasets.
const FORCED_CHUNK_ROWS: u64 = 4000;

/// Decide the layout of the copy of a dataset.
///
/// `retained_rows` is the retained-row count when filtering narrowed the
/// dataset, `None` for an identity copy. Rules:
/// - dtype is the source dtype, or `Float32` under the global `single`
///   override;
/// - only dimension 0 changes, to the retained count;
/// - chunking is dropped when any source chunk dimension exceeds the
///   corresponding final extent;
/// - compression is on iff the source was compressed or `gzip` is set, and a
///   chunk shape survived; recompression forces chunk `(4000, trailing...)`
///   and deflate level 9 with byte shuffle. Otherwise the source compression
///   spec is preserved unmodified;
/// - the checksum flag is copied verbatim.
pub fn plan_dataset(
    src: &DatasetInfo,
    retained_rows: Option<u64>,
    opts: &FilterOptions,
) -> DatasetInfo {
    let dtype = if opts.single { Dtype::Float32 } else { src.dtype };

    let mut shape = src.shape.clone();
    if let (Some(n), Some(first)) = (retained_rows, shape.first_mut()) {
        *first = n;
    }

    let mut chunk = src.chunk.clone();
    if let Some(c) = &chunk {
        if c.iter().zip(shape.iter()).any(|(c, s)| c > s) {
            chunk = None;
        }
    }

    let recompress = (src.compression.is_enabled() || opts.gzip) && chunk.is_some();
    let compression = if recompress {
        let mut forced = vec![FORCED_CHUNK_ROWS];
        forced.extend(shape.iter().skip(1).copied());
        chunk = Some(forced);
        Compression::deflate(9, true)
    } else {
        src.compression
    };

    DatasetInfo {
        dtype,
        shape,
        max_shape: src.max_shape.clone(),
        chunk,
        compression,
        checksum: src.checksum,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> FilterOptions {
        FilterOptions::default()
    }

    fn src(shape: &[u64]) -> DatasetInfo {
        DatasetInfo::new(Dtype::Float64, shape.to_vec())
    }

    #[test]
    fn test_identity_plan_keeps_everything() {
        let s = src(&[100, 3]).with_chunk(vec![10, 3]).with_checksum(true);
        let p = plan_dataset(&s, None, &opts());
        assert_eq!(p, s);
    }

    #[test]
    fn test_narrowing_rewrites_leading_dimension_only() {
        let s = src(&[100, 3, 2]);
        let p = plan_dataset(&s, Some(7), &opts());
        assert_eq!(p.shape, [7, 3, 2]);
    }

    #[test]
    fn test_chunk_dropped_when_exceeding_final_shape() {
        let s = src(&[100, 3]).with_chunk(vec![64, 3]);
        let p = plan_dataset(&s, Some(10), &opts());
        assert_eq!(p.chunk, None);
        // no valid chunk, so even a compressed source stays unrecompressed
        let s = s.with_compression(Compression::deflate(6, false));
        let p = plan_dataset(&s, Some(10), &opts());
        assert_eq!(p.chunk, None);
        assert_eq!(p.compression, Compression::deflate(6, false));
    }

    #[test]
    fn test_gzip_forces_chunk_and_codec() {
        let s = src(&[10_000, 3]).with_chunk(vec![100, 3]);
        let mut o = opts();
        o.gzip = true;
        let p = plan_dataset(&s, None, &o);
        assert_eq!(p.chunk, Some(vec![4000, 3]));
        assert_eq!(p.compression, Compression::deflate(9, true));
    }

    #[test]
    fn test_compressed_source_is_recompressed_at_max_level() {
        let s = src(&[10_000, 3])
            .with_chunk(vec![100, 3])
            .with_compression(Compression::deflate(4, false));
        let p = plan_dataset(&s, None, &opts());
        assert_eq!(p.chunk, Some(vec![4000, 3]));
        assert_eq!(p.compression, Compression::deflate(9, true));
    }

    #[test]
    fn test_gzip_without_chunks_stays_contiguous() {
        let s = src(&[100, 3]);
        let mut o = opts();
        o.gzip = true;
        let p = plan_dataset(&s, None, &o);
        assert_eq!(p.chunk, None);
        assert!(!p.compression.is_enabled());
    }

    #[test]
    fn test_single_precision_override() {
        let s = src(&[5]);
        let mut o = opts();
        o.single = true;
        let p = plan_dataset(&s, None, &o);
        assert_eq!(p.dtype, Dtype::Float32);
    }

    #[test]
    fn test_checksum_copied_verbatim() {
        let s = src(&[5]).with_checksum(true);
        assert!(plan_dataset(&s, None, &opts()).checksum);
    }
}
