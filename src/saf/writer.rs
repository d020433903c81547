//! SAF writer.
//!
//! Exclusive-create, append-only: data blocks stream out as rows arrive, the
//! JSON index and footer are written by [`Writer::finish`]. A file dropped
//! before `finish` has no footer and will not open.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use super::format::{
    resolve, resolve_mut, BlockRef, DatasetIndex, GroupIndex, NodeIndex, NodeRefMut,
    DEFAULT_BLOCK_ROWS, MAGIC, VERSION,
};
use crate::core::{compression, path_segments, ArchiveSink, Attrs, DatasetInfo, RowBlock};
use crate::util::{Error, Result};

/// Buffered output stream with position tracking.
#[derive(Debug)]
struct OutStream {
    writer: BufWriter<File>,
    pos: u64,
}

impl OutStream {
    fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    Error::TargetExists(path.to_path_buf())
                } else {
                    Error::Io(e)
                }
            })?;
        Ok(Self {
            writer: BufWriter::with_capacity(2 * 1024 * 1024, file),
            pos: 0,
        })
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.writer.write_u32::<LittleEndian>(value)?;
        self.pos += 4;
        Ok(())
    }

    fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(value)?;
        self.pos += 8;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// The dataset currently receiving rows.
#[derive(Debug)]
struct OpenDataset {
    path: String,
    info: DatasetInfo,
    block_rows: u64,
    pending: Vec<u8>,
    pending_rows: u64,
    written_rows: u64,
    blocks: Vec<BlockRef>,
}

impl OpenDataset {
    fn total_rows(&self) -> u64 {
        self.written_rows + self.pending_rows
    }
}

/// Create-only SAF archive writer.
#[derive(Debug)]
pub struct Writer {
    stream: OutStream,
    index: GroupIndex,
    open: Option<OpenDataset>,
    finished: bool,
}

impl Writer {
    /// Create a new archive. Fails with [`Error::TargetExists`] if `path`
    /// already exists.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let mut stream = OutStream::create(path.as_ref())?;
        stream.write_bytes(MAGIC)?;
        stream.write_u32(VERSION)?;
        Ok(Self {
            stream,
            index: GroupIndex::default(),
            open: None,
            finished: false,
        })
    }

    /// Flush pending rows, write the index and footer. Must be called once;
    /// a writer dropped without it leaves an unreadable file behind.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Err(Error::invalid("archive already finalized"));
        }
        self.finalize_open()?;
        let index_offset = self.stream.pos;
        let bytes = serde_json::to_vec(&self.index)?;
        self.stream.write_bytes(&bytes)?;
        self.stream.write_u64(index_offset)?;
        self.stream.write_u64(bytes.len() as u64)?;
        self.stream.flush()?;
        self.finished = true;
        Ok(())
    }

    /// Walk to the group at `path`, creating missing segments.
    fn ensure_groups(&mut self, path: &str) -> Result<&mut GroupIndex> {
        let mut group = &mut self.index;
        for seg in path_segments(path) {
            if group.child(seg).is_none() {
                group
                    .children
                    .push((seg.to_string(), NodeIndex::Group(GroupIndex::default())));
            }
            group = match group.child_mut(seg) {
                Some(NodeIndex::Group(g)) => g,
                Some(NodeIndex::Dataset(_)) => {
                    return Err(Error::invalid(format!("{path}: {seg} is not a group")))
                }
                None => return Err(Error::NodeNotFound(path.to_string())),
            };
        }
        Ok(group)
    }

    /// Seal the currently open dataset: pad unwritten rows with zeros, flush
    /// the remainder block, move the block table into the index.
    fn finalize_open(&mut self) -> Result<()> {
        let Some(mut open) = self.open.take() else {
            return Ok(());
        };
        let rb = open.info.row_bytes();
        let mut missing = open.info.rows().saturating_sub(open.total_rows());
        while missing > 0 {
            let n = missing.min(open.block_rows);
            open.pending.resize(open.pending.len() + n as usize * rb, 0);
            open.pending_rows += n;
            missing -= n;
            while open.pending_rows >= open.block_rows {
                let take = open.block_rows;
                Self::flush_block(&mut self.stream, &mut open, take)?;
            }
        }
        if open.pending_rows > 0 {
            let take = open.pending_rows;
            Self::flush_block(&mut self.stream, &mut open, take)?;
        }
        match resolve_mut(&mut self.index, &open.path) {
            Some(NodeRefMut::Dataset(d)) => {
                d.blocks = open.blocks;
                Ok(())
            }
            _ => Err(Error::NodeNotFound(open.path)),
        }
    }

    /// Encode and append one block of `rows` pending rows.
    fn flush_block(stream: &mut OutStream, open: &mut OpenDataset, rows: u64) -> Result<()> {
        let take = rows.min(open.pending_rows);
        if take == 0 {
            return Ok(());
        }
        let rb = open.info.row_bytes();
        let raw_len = take as usize * rb;
        let mut data: Vec<u8> = open.pending.drain(..raw_len).collect();

        let comp = open.info.compression;
        let shuffled = comp.shuffle;
        if shuffled {
            data = compression::shuffle(&data, open.info.dtype.num_bytes());
        }
        let compressed = comp.is_enabled();
        if compressed {
            data = compression::deflate(&data, comp.level)?;
        }
        let crc = open.info.checksum.then(|| compression::crc32(&data));

        let offset = stream.pos;
        stream.write_bytes(&data)?;
        open.blocks.push(BlockRef {
            row_start: open.written_rows,
            rows: take,
            offset,
            stored_len: data.len() as u64,
            raw_len: raw_len as u64,
            compressed,
            shuffled,
            crc,
        });
        open.written_rows += take;
        open.pending_rows -= take;
        Ok(())
    }
}

/// Rows per block: the chunk row count when chunked, a fixed default
/// otherwise.
fn dataset_block_rows(info: &DatasetInfo) -> u64 {
    match info.chunk.as_deref() {
        Some([first, ..]) if *first > 0 => *first,
        _ => DEFAULT_BLOCK_ROWS,
    }
}

impl ArchiveSink for Writer {
    fn has_node(&self, path: &str) -> bool {
        resolve(&self.index, path).is_some()
    }

    fn create_group(&mut self, path: &str) -> Result<()> {
        if self.finished {
            return Err(Error::invalid("archive already finalized"));
        }
        self.ensure_groups(path).map(|_| ())
    }

    fn create_dataset(&mut self, path: &str, info: &DatasetInfo) -> Result<()> {
        if self.finished {
            return Err(Error::invalid("archive already finalized"));
        }
        self.finalize_open()?;
        let (parent, name) = path.rsplit_once('/').unwrap_or(("", path));
        if name.is_empty() {
            return Err(Error::invalid("dataset path is empty"));
        }
        let group = self.ensure_groups(parent)?;
        if group.child(name).is_some() {
            return Err(Error::NodeExists(path.to_string()));
        }
        group.children.push((
            name.to_string(),
            NodeIndex::Dataset(DatasetIndex {
                info: info.clone(),
                attrs: Attrs::new(),
                blocks: Vec::new(),
            }),
        ));
        self.open = Some(OpenDataset {
            path: path.to_string(),
            info: info.clone(),
            block_rows: dataset_block_rows(info),
            pending: Vec::new(),
            pending_rows: 0,
            written_rows: 0,
            blocks: Vec::new(),
        });
        Ok(())
    }

    fn write_attributes(&mut self, path: &str, attrs: &Attrs) -> Result<()> {
        match resolve_mut(&mut self.index, path) {
            Some(NodeRefMut::Group(g)) => g.attrs = attrs.clone(),
            Some(NodeRefMut::Dataset(d)) => d.attrs = attrs.clone(),
            None => return Err(Error::NodeNotFound(path.to_string())),
        }
        Ok(())
    }

    fn write_rows(&mut self, path: &str, start_row: u64, block: &RowBlock) -> Result<()> {
        let open = self
            .open
            .as_mut()
            .filter(|o| o.path == path)
            .ok_or_else(|| {
                Error::invalid(format!("{path}: rows must be written while the dataset is current"))
            })?;
        if block.dtype() != open.info.dtype {
            return Err(Error::DtypeMismatch {
                expected: open.info.dtype,
                actual: block.dtype(),
            });
        }
        if block.row_elems() != open.info.row_elems() {
            return Err(Error::invalid(format!(
                "{path}: block rows have {} elements, dataset rows have {}",
                block.row_elems(),
                open.info.row_elems()
            )));
        }
        if start_row != open.total_rows() {
            return Err(Error::invalid(format!(
                "{path}: rows must be appended in order (expected row {}, got {start_row})",
                open.total_rows()
            )));
        }
        let end = start_row + block.rows() as u64;
        if end > open.info.rows() {
            return Err(Error::RowOutOfBounds {
                path: path.to_string(),
                row: end - 1,
                rows: open.info.rows(),
            });
        }
        open.pending.extend_from_slice(block.as_bytes());
        open.pending_rows += block.rows() as u64;
        while open.pending_rows >= open.block_rows {
            let take = open.block_rows;
            Self::flush_block(&mut self.stream, open, take)?;
        }
        Ok(())
    }
}
