//! Traversal and copy engine.
//!
//! One explicit pre-order, depth-first walk over the source archive, parents
//! strictly before children, so target groups always exist before their
//! contents. Container callback order is never relied on.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::core::{join_path, path_is_under, ArchiveSink, ArchiveSource, DatasetInfo, NodeKind};
use crate::util::Result;

use super::exclude::{Exclusion, INPUT_GROUP};
use super::plan::plan_dataset;
use super::time::TimeWindow;
use super::{scan_rows, FilterOptions, COPY_BLOCK_ROWS};

/// Datasets whose rows correlate with simulation time.
const TIME_SERIES: [&str; 4] = ["data/dynamic", "data/cf", "data/velocities", "data/static"];
/// Dataset whose time column defines the canonical accepted-time set.
const DYNAMIC_DATASET: &str = "data/dynamic";
/// Time-invariant member of the time series, exempt from time filtering.
const STATIC_DATASET: &str = "data/static";
const TIME_COLUMN: usize = 0;
const ID_COLUMN: usize = 1;

/// Counters reported after a run.
#[derive(Debug, Default, Clone)]
pub struct CopyStats {
    pub groups: u64,
    pub datasets: u64,
    pub rows_copied: u64,
    pub rows_dropped: u64,
    pub nodes_excluded: u64,
    pub nodes_skipped: u64,
}

/// Accepted time values paired with their `data/dynamic` row indices.
///
/// Membership is exact value equality, as bit patterns; times only ever
/// compare against copies of themselves.
struct AcceptedTimes {
    indices: Vec<u64>,
    values: HashSet<u64>,
}

impl AcceptedTimes {
    fn contains(&self, t: f64) -> bool {
        self.values.contains(&t.to_bits())
    }
}

enum TimeState {
    /// Time filtering requested, set not yet computed.
    Pending,
    /// No time filtering for this run.
    Inactive,
    Ready(AcceptedTimes),
}

/// Lazily resolved per-run caches, threaded through every visit step.
struct TraversalContext {
    times: TimeState,
    excluded: Option<Exclusion>,
}

/// The filtering copy pass. One instance performs exactly one run.
pub struct CopyEngine<'a, S, T> {
    src: &'a S,
    dst: &'a mut T,
    opts: &'a FilterOptions,
    ctx: TraversalContext,
    stats: CopyStats,
}

impl<'a, S: ArchiveSource, T: ArchiveSink> CopyEngine<'a, S, T> {
    pub fn new(src: &'a S, dst: &'a mut T, opts: &'a FilterOptions) -> Self {
        let window = TimeWindow::new(opts.start, opts.end, opts.interval);
        let times = if window.is_active() {
            TimeState::Pending
        } else {
            TimeState::Inactive
        };
        Self {
            src,
            dst,
            opts,
            ctx: TraversalContext { times, excluded: None },
            stats: CopyStats::default(),
        }
    }

    /// Run the copy. Consumes the engine; the source is visited exactly once.
    pub fn run(mut self) -> Result<CopyStats> {
        let root_attrs = self.src.attributes("")?;
        self.dst.write_attributes("", &root_attrs)?;
        self.visit_children("")?;
        Ok(self.stats)
    }

    fn visit_children(&mut self, path: &str) -> Result<()> {
        for (name, kind) in self.src.children(path)? {
            let child = join_path(path, &name);
            self.visit(&child, kind)?;
        }
        Ok(())
    }

    fn visit(&mut self, path: &str, kind: NodeKind) -> Result<()> {
        if self.is_excluded_path(path)? {
            debug!("excluding {path}");
            self.stats.nodes_excluded += 1;
            return Ok(());
        }
        match kind {
            NodeKind::Group => {
                self.ensure_group(path)?;
                self.visit_children(path)
            }
            NodeKind::Dataset => self.copy_dataset(path),
            NodeKind::Unsupported => {
                warn!("unsupported node kind at {path}, skipping");
                self.stats.nodes_skipped += 1;
                Ok(())
            }
        }
    }

    /// Create a target group once, propagating its attributes directly after
    /// creation. Revisits are no-ops.
    fn ensure_group(&mut self, path: &str) -> Result<()> {
        if self.dst.has_node(path) {
            return Ok(());
        }
        self.dst.create_group(path)?;
        let attrs = self.src.attributes(path)?;
        self.dst.write_attributes(path, &attrs)?;
        self.stats.groups += 1;
        Ok(())
    }

    fn is_excluded_path(&mut self, path: &str) -> Result<bool> {
        if self.opts.exclude.is_empty() || !path_is_under(path, INPUT_GROUP) {
            return Ok(false);
        }
        let src = self.src;
        let ex = self.exclusion()?;
        ex.is_excluded_path(src, path)
    }

    /// The excluded-id set, resolved on first need.
    fn exclusion(&mut self) -> Result<&Exclusion> {
        if self.ctx.excluded.is_none() {
            self.ctx.excluded = Some(Exclusion::resolve(self.src, &self.opts.exclude)?);
        }
        Ok(self.ctx.excluded.get_or_insert_with(Exclusion::default))
    }

    /// The accepted-time set, computed on first need from `data/dynamic`.
    fn ensure_times(&mut self) -> Result<()> {
        if !matches!(self.ctx.times, TimeState::Pending) {
            return Ok(());
        }
        self.ctx.times = self.resolve_times()?;
        Ok(())
    }

    fn resolve_times(&self) -> Result<TimeState> {
        if !self.src.contains(DYNAMIC_DATASET) {
            warn!("archive has no {DYNAMIC_DATASET} dataset, time filtering disabled");
            return Ok(TimeState::Inactive);
        }
        let info = self.src.dataset_info(DYNAMIC_DATASET)?;
        if info.row_elems() <= TIME_COLUMN {
            warn!("{DYNAMIC_DATASET} rows have no time column, time filtering disabled");
            return Ok(TimeState::Inactive);
        }
        let mut window = TimeWindow::new(self.opts.start, self.opts.end, self.opts.interval);
        let mut indices = Vec::new();
        let mut values = HashSet::new();
        scan_rows(self.src, DYNAMIC_DATASET, &info, |row, block, i| {
            let t = block.get(i, TIME_COLUMN);
            if window.accept(t) {
                indices.push(row);
                values.insert(t.to_bits());
            }
        })?;
        debug!("accepted {} of {} time rows", indices.len(), info.rows());
        Ok(TimeState::Ready(AcceptedTimes { indices, values }))
    }

    /// Retained source rows for a dataset, or `None` for an identity copy.
    /// The result is strictly increasing; source row order is preserved.
    fn retained_rows(&mut self, path: &str, info: &DatasetInfo) -> Result<Option<Vec<u64>>> {
        if !TIME_SERIES.contains(&path) {
            return Ok(None);
        }
        let mut retained: Option<Vec<u64>> = None;

        // Time classification: exact index reuse for data/dynamic, membership
        // of the time column for the others. data/static is time-invariant.
        self.ensure_times()?;
        if let TimeState::Ready(times) = &self.ctx.times {
            if path == DYNAMIC_DATASET {
                retained = Some(times.indices.clone());
            } else if path != STATIC_DATASET && info.row_elems() > TIME_COLUMN {
                let mut keep = Vec::new();
                scan_rows(self.src, path, info, |row, block, i| {
                    if times.contains(block.get(i, TIME_COLUMN)) {
                        keep.push(row);
                    }
                })?;
                retained = Some(keep);
            }
        }

        // Remove rows referencing excluded objects.
        if !self.opts.exclude.is_empty() {
            self.exclusion()?;
            let src = self.src;
            if let Some(ex) = &self.ctx.excluded {
                if !ex.is_empty() && info.row_elems() > ID_COLUMN {
                    let dropped = ex.excluded_row_indices(src, path, info, ID_COLUMN)?;
                    if !dropped.is_empty() {
                        retained = Some(match retained {
                            Some(rows) => rows
                                .into_iter()
                                .filter(|r| dropped.binary_search(r).is_err())
                                .collect(),
                            None => (0..info.rows())
                                .filter(|r| dropped.binary_search(r).is_err())
                                .collect(),
                        });
                    }
                }
            }
        }
        Ok(retained)
    }

    fn copy_dataset(&mut self, path: &str) -> Result<()> {
        let info = self.src.dataset_info(path)?;
        let retained = self.retained_rows(path, &info)?;
        let plan = plan_dataset(&info, retained.as_ref().map(|r| r.len() as u64), self.opts);

        self.dst.create_dataset(path, &plan)?;
        let attrs = self.src.attributes(path)?;
        self.dst.write_attributes(path, &attrs)?;

        // zero-width rows carry no bytes; creating the dataset is the copy
        if info.row_bytes() > 0 {
            match &retained {
                None => self.copy_identity(path, &info, &plan)?,
                Some(rows) => self.copy_gather(path, &info, &plan, rows)?,
            }
        }
        if let Some(rows) = &retained {
            self.stats.rows_dropped += info.rows() - rows.len() as u64;
        }
        self.stats.datasets += 1;
        Ok(())
    }

    /// Bulk copy of every row, streamed in bounded blocks.
    fn copy_identity(&mut self, path: &str, info: &DatasetInfo, plan: &DatasetInfo) -> Result<()> {
        let rows = info.rows();
        let mut start = 0u64;
        while start < rows {
            let count = (rows - start).min(COPY_BLOCK_ROWS);
            let idx: Vec<u64> = (start..start + count).collect();
            self.copy_block(path, info, plan, &idx, start)?;
            start += count;
        }
        Ok(())
    }

    /// Gather-copy of the retained rows, in increasing source order.
    fn copy_gather(
        &mut self,
        path: &str,
        info: &DatasetInfo,
        plan: &DatasetInfo,
        rows: &[u64],
    ) -> Result<()> {
        let mut out_row = 0u64;
        for chunk in rows.chunks(COPY_BLOCK_ROWS as usize) {
            self.copy_block(path, info, plan, chunk, out_row)?;
            out_row += chunk.len() as u64;
        }
        Ok(())
    }

    fn copy_block(
        &mut self,
        path: &str,
        info: &DatasetInfo,
        plan: &DatasetInfo,
        src_rows: &[u64],
        out_row: u64,
    ) -> Result<()> {
        let block = self.src.read_rows(path, src_rows)?;
        let block = if plan.dtype != info.dtype {
            block.cast(plan.dtype)
        } else {
            block
        };
        self.dst.write_rows(path, out_row, &block)?;
        self.stats.rows_copied += src_rows.len() as u64;
        Ok(())
    }
}
