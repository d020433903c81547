//! SAF reader.
//!
//! Memory-maps the file, validates header and footer, parses the JSON index,
//! then serves row reads by decoding the covering blocks. Reads keep a
//! one-block decode cache, which makes clustered row lists (the engine's
//! access pattern) cheap.

use std::fs::File;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use memmap2::Mmap;

use super::format::{resolve, DatasetIndex, GroupIndex, NodeRef, FOOTER_SIZE, HEADER_SIZE, MAGIC, VERSION};
use crate::core::{compression, ArchiveSource, Attrs, DatasetInfo, NodeKind, RowBlock};
use crate::util::{Error, Result};

/// Read-only SAF archive.
pub struct Reader {
    mmap: Mmap,
    index: GroupIndex,
}

impl Reader {
    /// Open and validate an archive.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let size = file.metadata()?.len();
        if size < (HEADER_SIZE + FOOTER_SIZE) as u64 {
            return Err(Error::UnexpectedEof(size));
        }

        // Safety: the file is opened read-only and mapped privately
        let mmap = unsafe { Mmap::map(&file) }?;
        if &mmap[..MAGIC.len()] != MAGIC {
            return Err(Error::InvalidMagic);
        }
        let version = LittleEndian::read_u32(&mmap[MAGIC.len()..HEADER_SIZE]);
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        let footer = &mmap[mmap.len() - FOOTER_SIZE..];
        let index_offset = LittleEndian::read_u64(&footer[..8]) as usize;
        let index_len = LittleEndian::read_u64(&footer[8..]) as usize;
        let index_end = index_offset
            .checked_add(index_len)
            .filter(|end| *end <= mmap.len() - FOOTER_SIZE && index_offset >= HEADER_SIZE)
            .ok_or_else(|| Error::invalid("index footer points outside the file"))?;
        let index = serde_json::from_slice(&mmap[index_offset..index_end])?;

        Ok(Self { mmap, index })
    }

    fn resolve(&self, path: &str) -> Result<NodeRef<'_>> {
        resolve(&self.index, path).ok_or_else(|| Error::NodeNotFound(path.to_string()))
    }

    fn dataset(&self, path: &str) -> Result<&DatasetIndex> {
        match self.resolve(path)? {
            NodeRef::Dataset(d) => Ok(d),
            NodeRef::Group(_) => Err(Error::NotADataset(path.to_string())),
        }
    }

    /// Decode block `bi` of a dataset: CRC check, inflate, unshuffle.
    fn decode_block(&self, path: &str, ds: &DatasetIndex, bi: usize) -> Result<Vec<u8>> {
        let b = &ds.blocks[bi];
        let start = b.offset as usize;
        let end = start
            .checked_add(b.stored_len as usize)
            .filter(|e| *e <= self.mmap.len() - FOOTER_SIZE)
            .ok_or(Error::UnexpectedEof(b.offset + b.stored_len))?;
        let stored = &self.mmap[start..end];

        if let Some(crc) = b.crc {
            if compression::crc32(stored) != crc {
                return Err(Error::ChecksumMismatch { path: path.to_string(), block: bi });
            }
        }
        let mut raw = if b.compressed {
            compression::inflate(stored, b.raw_len as usize)?
        } else {
            if stored.len() != b.raw_len as usize {
                return Err(Error::invalid(format!(
                    "{path}: block {bi} stored length disagrees with index"
                )));
            }
            stored.to_vec()
        };
        if b.shuffled {
            raw = compression::unshuffle(&raw, ds.info.dtype.num_bytes());
        }
        Ok(raw)
    }
}

impl ArchiveSource for Reader {
    fn contains(&self, path: &str) -> bool {
        resolve(&self.index, path).is_some()
    }

    fn children(&self, path: &str) -> Result<Vec<(String, NodeKind)>> {
        match self.resolve(path)? {
            NodeRef::Group(g) => Ok(g
                .children
                .iter()
                .map(|(name, node)| {
                    let kind = match node {
                        super::format::NodeIndex::Group(_) => NodeKind::Group,
                        super::format::NodeIndex::Dataset(_) => NodeKind::Dataset,
                    };
                    (name.clone(), kind)
                })
                .collect()),
            NodeRef::Dataset(_) => Err(Error::invalid(format!("{path} is not a group"))),
        }
    }

    fn attributes(&self, path: &str) -> Result<Attrs> {
        Ok(match self.resolve(path)? {
            NodeRef::Group(g) => g.attrs.clone(),
            NodeRef::Dataset(d) => d.attrs.clone(),
        })
    }

    fn dataset_info(&self, path: &str) -> Result<DatasetInfo> {
        Ok(self.dataset(path)?.info.clone())
    }

    fn read_rows(&self, path: &str, rows: &[u64]) -> Result<RowBlock> {
        let ds = self.dataset(path)?;
        let info = &ds.info;
        let rb = info.row_bytes();
        let total = info.rows();

        let mut out = Vec::with_capacity(rows.len() * rb);
        let mut cached: Option<(usize, Vec<u8>)> = None;
        for &row in rows {
            if row >= total {
                return Err(Error::RowOutOfBounds { path: path.to_string(), row, rows: total });
            }
            if rb == 0 {
                continue;
            }
            let bi = ds.blocks.partition_point(|b| b.row_start + b.rows <= row);
            let b = ds
                .blocks
                .get(bi)
                .filter(|b| b.row_start <= row)
                .ok_or_else(|| {
                    Error::invalid(format!("{path}: row {row} not covered by any block"))
                })?;
            if cached.as_ref().map_or(true, |(i, _)| *i != bi) {
                cached = Some((bi, self.decode_block(path, ds, bi)?));
            }
            if let Some((_, data)) = &cached {
                let at = (row - b.row_start) as usize * rb;
                out.extend_from_slice(&data[at..at + rb]);
            }
        }
        Ok(RowBlock::from_raw(info.dtype, info.row_elems(), out))
    }
}
