//! # simarch
//!
//! Selective, structure-preserving copies of hierarchical simulation output
//! archives: nested named groups of multi-dimensional numeric datasets with
//! attributes. A copy can cut the recording to a time window, thin the
//! timeline to a minimum spacing, and drop named domain objects together
//! with every time-series row that references them, while reproducing each
//! surviving dataset's shape, dtype, chunking and compression.
//!
//! ## Modules
//!
//! - [`util`] - Basic types (dtypes, errors)
//! - [`core`] - Archive model, abstract source/sink traits, block codecs
//! - [`saf`] - Single-file container backend
//! - [`filter`] - Time predicate, exclusion resolver, layout planner and the
//!   traversal/copy engine
//!
//! ## Example
//!
//! ```ignore
//! use simarch::filter::{run_filter, FilterOptions};
//!
//! let opts = FilterOptions {
//!     start: Some(2.0),
//!     end: Some(4.0),
//!     ..FilterOptions::default()
//! };
//! let stats = run_filter("run.sim".as_ref(), "run-cut.sim".as_ref(), &opts)?;
//! println!("copied {} datasets", stats.datasets);
//! ```

pub mod core;
pub mod filter;
pub mod saf;
pub mod util;

// Re-export commonly used types
pub use util::{Dtype, Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        ArchiveSink, ArchiveSource, AttrValue, Attrs, Compression, DatasetInfo, MemArchive,
        NodeKind, RowBlock,
    };
    pub use crate::filter::{copy_filtered, run_filter, CopyStats, FilterOptions};
    pub use crate::saf::{Reader, Writer};
    pub use crate::util::{Dtype, Error, Result};
}
