//! On-disk layout of the SAF container.
//!
//! A SAF file is a header, a run of data blocks, and a JSON index describing
//! the node tree, written last:
//!
//! ```text
//! [magic 8B][version u32]
//! [block bytes ...]                 (per-dataset, append order)
//! [index JSON]
//! [index offset u64][index len u64] (footer, last 16 bytes)
//! ```
//!
//! Blocks are self-describing through their [`BlockRef`] entries: stored and
//! raw lengths, compression and shuffle flags, optional CRC32. The index is
//! the only place the tree structure lives; a file missing its footer (an
//! interrupted write) is structurally invalid.

use serde::{Deserialize, Serialize};

use crate::core::{path_segments, Attrs, DatasetInfo};

/// Magic bytes at offset 0.
pub const MAGIC: &[u8; 8] = b"SIMARCH\0";

/// Current container version.
pub const VERSION: u32 = 1;

/// Header size: magic + version.
pub const HEADER_SIZE: usize = 12;

/// Footer size: index offset + index length.
pub const FOOTER_SIZE: usize = 16;

/// Rows per block for contiguous (unchunked) datasets.
pub const DEFAULT_BLOCK_ROWS: u64 = 4096;

/// One stored block of rows.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockRef {
    /// First dataset row held by this block.
    pub row_start: u64,
    /// Number of rows in this block.
    pub rows: u64,
    /// Byte offset of the stored bytes in the file.
    pub offset: u64,
    /// Stored (possibly compressed) length in bytes.
    pub stored_len: u64,
    /// Decoded length in bytes.
    pub raw_len: u64,
    /// Stored bytes are zlib-compressed.
    pub compressed: bool,
    /// Raw bytes were byte-shuffled before compression.
    pub shuffled: bool,
    /// CRC32 of the stored bytes, present when checksums are enabled.
    pub crc: Option<u32>,
}

/// Index entry for a dataset node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatasetIndex {
    pub info: DatasetInfo,
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default)]
    pub blocks: Vec<BlockRef>,
}

/// Index entry for a group node. Children keep creation order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GroupIndex {
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default)]
    pub children: Vec<(String, NodeIndex)>,
}

/// A node in the index tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum NodeIndex {
    Group(GroupIndex),
    Dataset(DatasetIndex),
}

impl GroupIndex {
    pub fn child(&self, name: &str) -> Option<&NodeIndex> {
        self.children.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut NodeIndex> {
        self.children
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }
}

/// Borrowed view of an index node, group or dataset.
#[derive(Clone, Copy)]
pub enum NodeRef<'a> {
    Group(&'a GroupIndex),
    Dataset(&'a DatasetIndex),
}

/// Mutable view of an index node.
pub enum NodeRefMut<'a> {
    Group(&'a mut GroupIndex),
    Dataset(&'a mut DatasetIndex),
}

/// Walk `path` down from `root`. `""` resolves to the root group.
pub fn resolve<'a>(root: &'a GroupIndex, path: &str) -> Option<NodeRef<'a>> {
    let mut cur = NodeRef::Group(root);
    for seg in path_segments(path) {
        let group = match cur {
            NodeRef::Group(g) => g,
            NodeRef::Dataset(_) => return None,
        };
        cur = match group.child(seg)? {
            NodeIndex::Group(g) => NodeRef::Group(g),
            NodeIndex::Dataset(d) => NodeRef::Dataset(d),
        };
    }
    Some(cur)
}

/// Mutable variant of [`resolve`].
pub fn resolve_mut<'a>(root: &'a mut GroupIndex, path: &str) -> Option<NodeRefMut<'a>> {
    let mut cur = NodeRefMut::Group(root);
    for seg in path_segments(path) {
        let group = match cur {
            NodeRefMut::Group(g) => g,
            NodeRefMut::Dataset(_) => return None,
        };
        cur = match group.child_mut(seg)? {
            NodeIndex::Group(g) => NodeRefMut::Group(g),
            NodeIndex::Dataset(d) => NodeRefMut::Dataset(d),
        };
    }
    Some(cur)
}
