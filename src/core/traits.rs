//! Abstract archive access.
//!
//! The copy engine never touches a concrete container; it reads through
//! [`ArchiveSource`] and writes through [`ArchiveSink`]. The file backend
//! ([`crate::saf`]) and the in-memory backend ([`super::memory::MemArchive`])
//! both implement these.

use super::layout::DatasetInfo;
use super::metadata::Attrs;
use super::rows::RowBlock;
use crate::util::Result;

/// What kind of node sits at a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Group,
    Dataset,
    /// A node the engine does not understand; warned about and skipped.
    Unsupported,
}

/// Read-only view of a source archive.
///
/// Paths are `/`-separated; `""` addresses the root group. `children`
/// returns entries in the backend's natural order — callers must not assume
/// any parent-before-child guarantee beyond what they impose themselves.
pub trait ArchiveSource {
    /// Does a node exist at `path`?
    fn contains(&self, path: &str) -> bool;

    /// Named children of the group at `path`.
    fn children(&self, path: &str) -> Result<Vec<(String, NodeKind)>>;

    /// Attributes of the node at `path`.
    fn attributes(&self, path: &str) -> Result<Attrs>;

    /// Storage description of the dataset at `path`.
    fn dataset_info(&self, path: &str) -> Result<DatasetInfo>;

    /// Read the given rows, in the given order, as one block.
    fn read_rows(&self, path: &str, rows: &[u64]) -> Result<RowBlock>;
}

/// Create-only view of a target archive.
///
/// No node is ever mutated after creation; attributes are written once,
/// directly after the node is created, and rows arrive in increasing
/// position order.
pub trait ArchiveSink {
    /// Does a node already exist at `path`?
    fn has_node(&self, path: &str) -> bool;

    /// Create the group at `path`, creating missing parents as empty groups.
    /// Creating an existing group is a no-op.
    fn create_group(&mut self, path: &str) -> Result<()>;

    /// Create an empty dataset with the given layout.
    fn create_dataset(&mut self, path: &str, info: &DatasetInfo) -> Result<()>;

    /// Attach attributes to an existing node.
    fn write_attributes(&mut self, path: &str, attrs: &Attrs) -> Result<()>;

    /// Write a block of rows starting at row `start_row`.
    fn write_rows(&mut self, path: &str, start_row: u64, block: &RowBlock) -> Result<()>;
}
