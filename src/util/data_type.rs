//! Element data types for dataset storage.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Dtype describes how one element of a dataset is stored.
///
/// Datasets are homogeneous: every element of a dataset shares one Dtype.
/// The set mirrors what simulation writers actually emit — double-precision
/// state tables, integer id tables, and byte payloads.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Dtype {
    Uint8,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float32,
    Float64,
}

impl Dtype {
    /// Size in bytes of one element.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Dtype::Uint8 => 1,
            Dtype::Int32 | Dtype::Uint32 | Dtype::Float32 => 4,
            Dtype::Int64 | Dtype::Uint64 | Dtype::Float64 => 8,
        }
    }

    /// Returns true for the floating point types.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Dtype::Float32 | Dtype::Float64)
    }

    /// Canonical short name.
    pub const fn name(self) -> &'static str {
        match self {
            Dtype::Uint8 => "uint8",
            Dtype::Int32 => "int32",
            Dtype::Uint32 => "uint32",
            Dtype::Int64 => "int64",
            Dtype::Uint64 => "uint64",
            Dtype::Float32 => "float32",
            Dtype::Float64 => "float64",
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
