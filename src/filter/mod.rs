//! The filtering copy engine.
//!
//! A single pre-order pass over a source archive that reproduces its
//! hierarchy while cutting the timeline to a window, thinning it to a minimum
//! spacing, and dropping excluded domain objects together with every row that
//! references them.

mod copy;
mod exclude;
mod plan;
mod time;

pub use copy::{CopyEngine, CopyStats};
pub use exclude::Exclusion;
pub use plan::plan_dataset;
pub use time::TimeWindow;

use std::fs;
use std::path::Path;

use crate::core::{ArchiveSink, ArchiveSource, DatasetInfo, RowBlock};
use crate::saf;
use crate::util::{Error, Result};

/// Rows moved per read/write step; bounds memory regardless of dataset size.
pub(crate) const COPY_BLOCK_ROWS: u64 = 4096;

/// Filter settings for one run, assembled by the CLI.
#[derive(Debug, Default, Clone)]
pub struct FilterOptions {
    /// Keep times at or after this value.
    pub start: Option<f64>,
    /// Keep times at or before this value.
    pub end: Option<f64>,
    /// Minimum spacing between kept time steps.
    pub interval: Option<f64>,
    /// Recompress every chunked dataset in the copy.
    pub gzip: bool,
    /// Store all data in single-precision floats.
    pub single: bool,
    /// Exact names of domain objects to drop.
    pub exclude: Vec<String>,
}

/// Stream every row of a dataset in bounded blocks, calling `f` with the
/// dataset row index, the current block, and the in-block row.
pub(crate) fn scan_rows<S, F>(src: &S, path: &str, info: &DatasetInfo, mut f: F) -> Result<()>
where
    S: ArchiveSource,
    F: FnMut(u64, &RowBlock, usize),
{
    let rows = info.rows();
    let mut start = 0u64;
    while start < rows {
        let count = (rows - start).min(COPY_BLOCK_ROWS);
        let idx: Vec<u64> = (start..start + count).collect();
        let block = src.read_rows(path, &idx)?;
        for i in 0..count as usize {
            f(start + i as u64, &block, i);
        }
        start += count;
    }
    Ok(())
}

/// Copy `src` into `dst`, filtered per `opts`.
pub fn copy_filtered<S, T>(src: &S, dst: &mut T, opts: &FilterOptions) -> Result<CopyStats>
where
    S: ArchiveSource,
    T: ArchiveSink,
{
    CopyEngine::new(src, dst, opts).run()
}

/// File-to-file driver: open the source read-only, exclusive-create the
/// target, copy, finalize.
///
/// The target path is pre-flighted ([`Error::TargetExists`], zero side
/// effects), and a partial target is removed again if anything fails
/// mid-run — a failed run never leaves a file masquerading as complete.
pub fn run_filter(input: &Path, output: &Path, opts: &FilterOptions) -> Result<CopyStats> {
    if output.exists() {
        return Err(Error::TargetExists(output.to_path_buf()));
    }
    match copy_archive_file(input, output, opts) {
        Err(err) => {
            if !matches!(err, Error::TargetExists(_)) {
                let _ = fs::remove_file(output);
            }
            Err(err)
        }
        ok => ok,
    }
}

fn copy_archive_file(input: &Path, output: &Path, opts: &FilterOptions) -> Result<CopyStats> {
    let src = saf::Reader::open(input)?;
    let mut dst = saf::Writer::create(output)?;
    let stats = copy_filtered(&src, &mut dst, opts)?;
    dst.finish()?;
    Ok(stats)
}
