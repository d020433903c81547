//! Exclusion of named domain objects.
//!
//! Objects are defined once as children of `data/input`, each carrying an
//! integer `id` attribute. Excluding an object removes its definition node
//! and every time-series row that references its id.

use std::collections::HashSet;

use tracing::warn;

use crate::core::{join_path, parent_path, path_is_under, ArchiveSource, DatasetInfo};
use crate::util::Result;

use super::scan_rows;

/// Group holding the object definitions.
pub const INPUT_GROUP: &str = "data/input";

/// Resolved set of excluded object ids.
#[derive(Debug, Default)]
pub struct Exclusion {
    ids: HashSet<i64>,
}

impl Exclusion {
    /// Scan the direct children of `data/input` once and collect the ids of
    /// objects whose name is in `excluded_names`.
    ///
    /// A child without an `id` attribute cannot be referenced by rows and is
    /// only warned about; an archive without `data/input` excludes nothing.
    pub fn resolve<S: ArchiveSource>(src: &S, excluded_names: &[String]) -> Result<Self> {
        let mut ids = HashSet::new();
        if excluded_names.is_empty() || !src.contains(INPUT_GROUP) {
            return Ok(Self { ids });
        }
        for (name, _) in src.children(INPUT_GROUP)? {
            if !excluded_names.iter().any(|n| *n == name) {
                continue;
            }
            let path = join_path(INPUT_GROUP, &name);
            match src.attributes(&path)?.get("id").and_then(|v| v.as_int()) {
                Some(id) => {
                    ids.insert(id);
                }
                None => warn!("object {path} has no id attribute and cannot be excluded"),
            }
        }
        Ok(Self { ids })
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains_id(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    /// Is the node at `path` owned by an excluded object?
    ///
    /// Only meaningful under `data/input`; the owning id is the node's own
    /// `id` attribute or, walking upward, the nearest ancestor's, stopping at
    /// `data/input` itself. Nodes with no resolvable owner are kept.
    pub fn is_excluded_path<S: ArchiveSource>(&self, src: &S, path: &str) -> Result<bool> {
        if self.ids.is_empty() || !path_is_under(path, INPUT_GROUP) {
            return Ok(false);
        }
        let mut cur = path;
        loop {
            if let Some(id) = src.attributes(cur)?.get("id").and_then(|v| v.as_int()) {
                return Ok(self.ids.contains(&id));
            }
            match parent_path(cur) {
                Some(parent) if path_is_under(parent, INPUT_GROUP) || parent == INPUT_GROUP => {
                    if parent == INPUT_GROUP {
                        return Ok(false);
                    }
                    cur = parent;
                }
                _ => return Ok(false),
            }
        }
    }

    /// Row indices of `path` whose id column references an excluded object,
    /// in increasing order.
    pub fn excluded_row_indices<S: ArchiveSource>(
        &self,
        src: &S,
        path: &str,
        info: &DatasetInfo,
        id_col: usize,
    ) -> Result<Vec<u64>> {
        let mut dropped = Vec::new();
        if self.ids.is_empty() || info.row_elems() <= id_col {
            return Ok(dropped);
        }
        scan_rows(src, path, info, |row, block, i| {
            if self.ids.contains(&block.get_int(i, id_col)) {
                dropped.push(row);
            }
        })?;
        Ok(dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{attrs, Attrs, DatasetInfo, MemArchive, RowBlock};
    use crate::util::Dtype;

    fn fixture() -> MemArchive {
        let mut a = MemArchive::new();
        a.add_group("data/input/ball", attrs([("id", 1i64)])).unwrap();
        a.add_group("data/input/plane", attrs([("id", 2i64)])).unwrap();
        a.add_group("data/input/ball/shape", Attrs::new()).unwrap();
        let info = DatasetInfo::new(Dtype::Float64, vec![4, 3]);
        let rows = RowBlock::from_f64(
            3,
            &[0.0, 1.0, 9.0, 0.0, 2.0, 9.0, 1.0, 1.0, 9.0, 1.0, 2.0, 9.0],
        );
        a.add_dataset("data/cf", info, Attrs::new(), &rows).unwrap();
        a
    }

    #[test]
    fn test_resolves_ids_by_name() {
        let a = fixture();
        let ex = Exclusion::resolve(&a, &["ball".to_string()]).unwrap();
        assert!(ex.contains_id(1));
        assert!(!ex.contains_id(2));
    }

    #[test]
    fn test_unknown_names_exclude_nothing() {
        let a = fixture();
        let ex = Exclusion::resolve(&a, &["wheel".to_string()]).unwrap();
        assert!(ex.is_empty());
    }

    #[test]
    fn test_excluded_path_walks_to_owning_ancestor() {
        let a = fixture();
        let ex = Exclusion::resolve(&a, &["ball".to_string()]).unwrap();
        assert!(ex.is_excluded_path(&a, "data/input/ball").unwrap());
        assert!(ex.is_excluded_path(&a, "data/input/ball/shape").unwrap());
        assert!(!ex.is_excluded_path(&a, "data/input/plane").unwrap());
        // outside the input subtree nothing is excluded
        assert!(!ex.is_excluded_path(&a, "data/cf").unwrap());
    }

    #[test]
    fn test_excluded_rows_by_id_column() {
        let a = fixture();
        let ex = Exclusion::resolve(&a, &["plane".to_string()]).unwrap();
        let info = a.dataset_info("data/cf").unwrap();
        let dropped = ex.excluded_row_indices(&a, "data/cf", &info, 1).unwrap();
        assert_eq!(dropped, [1, 3]);
    }
}
