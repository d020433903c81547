//! In-memory archive.
//!
//! A tree of nodes living on the heap, implementing both archive traits.
//! Used as the fixture backend in engine tests; unlike the file backend it
//! can also hold nodes of an unsupported kind.

use crate::util::{Error, Result};

use super::layout::DatasetInfo;
use super::metadata::Attrs;
use super::rows::RowBlock;
use super::traits::{ArchiveSink, ArchiveSource, NodeKind};
use super::path_segments;

#[derive(Debug)]
enum MemNode {
    Group { attrs: Attrs, children: Vec<(String, MemNode)> },
    Dataset { attrs: Attrs, info: DatasetInfo, data: Vec<u8> },
    /// Node of a kind the engine does not handle (test fixture only).
    Opaque { attrs: Attrs },
}

impl MemNode {
    fn empty_group() -> Self {
        MemNode::Group { attrs: Attrs::new(), children: Vec::new() }
    }

    fn kind(&self) -> NodeKind {
        match self {
            MemNode::Group { .. } => NodeKind::Group,
            MemNode::Dataset { .. } => NodeKind::Dataset,
            MemNode::Opaque { .. } => NodeKind::Unsupported,
        }
    }

    fn attrs(&self) -> &Attrs {
        match self {
            MemNode::Group { attrs, .. }
            | MemNode::Dataset { attrs, .. }
            | MemNode::Opaque { attrs } => attrs,
        }
    }

    fn attrs_mut(&mut self) -> &mut Attrs {
        match self {
            MemNode::Group { attrs, .. }
            | MemNode::Dataset { attrs, .. }
            | MemNode::Opaque { attrs } => attrs,
        }
    }

    fn child(&self, name: &str) -> Option<&MemNode> {
        match self {
            MemNode::Group { children, .. } => {
                children.iter().find(|(n, _)| n == name).map(|(_, c)| c)
            }
            _ => None,
        }
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut MemNode> {
        match self {
            MemNode::Group { children, .. } => {
                children.iter_mut().find(|(n, _)| n == name).map(|(_, c)| c)
            }
            _ => None,
        }
    }
}

/// Heap-resident archive implementing both [`ArchiveSource`] and
/// [`ArchiveSink`].
#[derive(Debug)]
pub struct MemArchive {
    root: MemNode,
}

impl MemArchive {
    pub fn new() -> Self {
        Self { root: MemNode::empty_group() }
    }

    fn find(&self, path: &str) -> Option<&MemNode> {
        let mut node = &self.root;
        for seg in path_segments(path) {
            node = node.child(seg)?;
        }
        Some(node)
    }

    fn find_mut(&mut self, path: &str) -> Option<&mut MemNode> {
        let mut node = &mut self.root;
        for seg in path_segments(path) {
            node = node.child_mut(seg)?;
        }
        Some(node)
    }

    /// Walk to the group at `path`, creating missing segments as empty
    /// groups. Fails if a non-group node is in the way.
    fn ensure_group_mut(&mut self, path: &str) -> Result<&mut MemNode> {
        let mut node = &mut self.root;
        for seg in path_segments(path) {
            let exists = node.child(seg).is_some();
            if !exists {
                match node {
                    MemNode::Group { children, .. } => {
                        children.push((seg.to_string(), MemNode::empty_group()));
                    }
                    _ => return Err(Error::invalid(format!("{seg} parent is not a group"))),
                }
            }
            node = match node.child_mut(seg) {
                Some(c) => c,
                None => return Err(Error::NodeNotFound(seg.to_string())),
            };
            if !matches!(node, MemNode::Group { .. }) {
                return Err(Error::invalid(format!("{path}: {seg} is not a group")));
            }
        }
        Ok(node)
    }

    fn split_parent(path: &str) -> (&str, &str) {
        path.rsplit_once('/').unwrap_or(("", path))
    }

    /// Test convenience: create a group (with parents) and set its attributes.
    pub fn add_group(&mut self, path: &str, attrs: Attrs) -> Result<()> {
        self.create_group(path)?;
        self.write_attributes(path, &attrs)
    }

    /// Test convenience: create a dataset (with parents), set attributes and
    /// fill all rows from `block`.
    pub fn add_dataset(
        &mut self,
        path: &str,
        info: DatasetInfo,
        attrs: Attrs,
        block: &RowBlock,
    ) -> Result<()> {
        self.create_dataset(path, &info)?;
        self.write_attributes(path, &attrs)?;
        if block.rows() > 0 {
            self.write_rows(path, 0, block)?;
        }
        Ok(())
    }

    /// Test convenience: insert a node of an unsupported kind.
    pub fn add_opaque(&mut self, path: &str, attrs: Attrs) -> Result<()> {
        let (parent, name) = Self::split_parent(path);
        let group = self.ensure_group_mut(parent)?;
        if group.child(name).is_some() {
            return Err(Error::NodeExists(path.to_string()));
        }
        match group {
            MemNode::Group { children, .. } => {
                children.push((name.to_string(), MemNode::Opaque { attrs }));
                Ok(())
            }
            _ => Err(Error::invalid(format!("{parent} is not a group"))),
        }
    }
}

impl Default for MemArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveSource for MemArchive {
    fn contains(&self, path: &str) -> bool {
        self.find(path).is_some()
    }

    fn children(&self, path: &str) -> Result<Vec<(String, NodeKind)>> {
        match self.find(path) {
            Some(MemNode::Group { children, .. }) => Ok(children
                .iter()
                .map(|(name, node)| (name.clone(), node.kind()))
                .collect()),
            Some(_) => Err(Error::invalid(format!("{path} is not a group"))),
            None => Err(Error::NodeNotFound(path.to_string())),
        }
    }

    fn attributes(&self, path: &str) -> Result<Attrs> {
        self.find(path)
            .map(|n| n.attrs().clone())
            .ok_or_else(|| Error::NodeNotFound(path.to_string()))
    }

    fn dataset_info(&self, path: &str) -> Result<DatasetInfo> {
        match self.find(path) {
            Some(MemNode::Dataset { info, .. }) => Ok(info.clone()),
            Some(_) => Err(Error::NotADataset(path.to_string())),
            None => Err(Error::NodeNotFound(path.to_string())),
        }
    }

    fn read_rows(&self, path: &str, rows: &[u64]) -> Result<RowBlock> {
        let (info, data) = match self.find(path) {
            Some(MemNode::Dataset { info, data, .. }) => (info, data),
            Some(_) => return Err(Error::NotADataset(path.to_string())),
            None => return Err(Error::NodeNotFound(path.to_string())),
        };
        let rb = info.row_bytes();
        let total = info.rows();
        let mut out = Vec::with_capacity(rows.len() * rb);
        for &row in rows {
            if row >= total {
                return Err(Error::RowOutOfBounds {
                    path: path.to_string(),
                    row,
                    rows: total,
                });
            }
            let at = row as usize * rb;
            out.extend_from_slice(&data[at..at + rb]);
        }
        Ok(RowBlock::from_raw(info.dtype, info.row_elems(), out))
    }
}

impl ArchiveSink for MemArchive {
    fn has_node(&self, path: &str) -> bool {
        self.find(path).is_some()
    }

    fn create_group(&mut self, path: &str) -> Result<()> {
        self.ensure_group_mut(path).map(|_| ())
    }

    fn create_dataset(&mut self, path: &str, info: &DatasetInfo) -> Result<()> {
        let (parent, name) = Self::split_parent(path);
        if name.is_empty() {
            return Err(Error::invalid("dataset path is empty"));
        }
        let group = self.ensure_group_mut(parent)?;
        if group.child(name).is_some() {
            return Err(Error::NodeExists(path.to_string()));
        }
        let bytes = info.shape.iter().product::<u64>() as usize * info.dtype.num_bytes();
        match group {
            MemNode::Group { children, .. } => {
                children.push((
                    name.to_string(),
                    MemNode::Dataset {
                        attrs: Attrs::new(),
                        info: info.clone(),
                        data: vec![0u8; bytes],
                    },
                ));
                Ok(())
            }
            _ => Err(Error::invalid(format!("{parent} is not a group"))),
        }
    }

    fn write_attributes(&mut self, path: &str, attrs: &Attrs) -> Result<()> {
        match self.find_mut(path) {
            Some(node) => {
                *node.attrs_mut() = attrs.clone();
                Ok(())
            }
            None => Err(Error::NodeNotFound(path.to_string())),
        }
    }

    fn write_rows(&mut self, path: &str, start_row: u64, block: &RowBlock) -> Result<()> {
        let (info, data) = match self.find_mut(path) {
            Some(MemNode::Dataset { info, data, .. }) => (&*info, data),
            Some(_) => return Err(Error::NotADataset(path.to_string())),
            None => return Err(Error::NodeNotFound(path.to_string())),
        };
        if block.dtype() != info.dtype {
            return Err(Error::DtypeMismatch { expected: info.dtype, actual: block.dtype() });
        }
        if block.row_elems() != info.row_elems() {
            return Err(Error::invalid(format!(
                "{path}: block rows have {} elements, dataset rows have {}",
                block.row_elems(),
                info.row_elems()
            )));
        }
        let end = start_row + block.rows() as u64;
        if end > info.rows() {
            return Err(Error::RowOutOfBounds { path: path.to_string(), row: end - 1, rows: info.rows() });
        }
        let rb = info.row_bytes();
        let at = start_row as usize * rb;
        data[at..at + block.as_bytes().len()].copy_from_slice(block.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::attrs;
    use crate::util::Dtype;

    #[test]
    fn test_group_tree() {
        let mut a = MemArchive::new();
        a.add_group("data/input/ball", attrs([("id", 1i64)])).unwrap();
        assert!(a.contains("data"));
        assert!(a.contains("data/input"));
        assert_eq!(a.attributes("data/input/ball").unwrap()["id"].as_int(), Some(1));
        // idempotent
        a.create_group("data/input").unwrap();
        assert_eq!(a.children("data").unwrap().len(), 1);
    }

    #[test]
    fn test_dataset_roundtrip() {
        let mut a = MemArchive::new();
        let info = DatasetInfo::new(Dtype::Float64, vec![3, 2]);
        let block = RowBlock::from_f64(2, &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        a.add_dataset("data/dynamic", info, Attrs::new(), &block).unwrap();

        let got = a.read_rows("data/dynamic", &[2, 0]).unwrap();
        assert_eq!(got.get(0, 1), 5.0);
        assert_eq!(got.get(1, 0), 0.0);
    }

    #[test]
    fn test_write_rows_bounds() {
        let mut a = MemArchive::new();
        let info = DatasetInfo::new(Dtype::Float64, vec![2, 1]);
        a.create_dataset("d", &info).unwrap();
        let block = RowBlock::from_f64(1, &[1.0, 2.0]);
        assert!(matches!(
            a.write_rows("d", 1, &block),
            Err(Error::RowOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_duplicate_dataset_rejected() {
        let mut a = MemArchive::new();
        let info = DatasetInfo::new(Dtype::Int32, vec![1]);
        a.create_dataset("x", &info).unwrap();
        assert!(matches!(a.create_dataset("x", &info), Err(Error::NodeExists(_))));
    }
}
