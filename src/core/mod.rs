//! Archive model: attributes, layout, row blocks, abstract access traits,
//! block compression helpers and the in-memory backend.

pub mod compression;
pub mod layout;
pub mod memory;
pub mod metadata;
pub mod rows;
pub mod traits;

pub use layout::{Codec, Compression, DatasetInfo};
pub use memory::MemArchive;
pub use metadata::{attrs, AttrValue, Attrs};
pub use rows::RowBlock;
pub use traits::{ArchiveSink, ArchiveSource, NodeKind};

/// Iterate the non-empty segments of a slash-separated path.
pub fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Join a parent path and a child name. The root path is `""`.
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Parent of a path, or `None` for root-level nodes and the root itself.
pub fn parent_path(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(parent, _)| parent)
}

/// Is `path` strictly inside the subtree rooted at `prefix`?
pub fn path_is_under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('/'))
}
