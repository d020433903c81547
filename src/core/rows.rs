//! Row blocks: dtype-erased, row-major slabs of dataset rows.
//!
//! The copy engine moves data around in bounded blocks of whole rows; a
//! [`RowBlock`] is one such block. Cell accessors decode single elements so
//! the engine can classify rows (time column, id column) without knowing the
//! dataset's dtype statically.

use bytemuck::pod_read_unaligned;

use crate::util::Dtype;

/// A contiguous run of rows from a dataset, stored as raw element bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct RowBlock {
    dtype: Dtype,
    row_elems: usize,
    data: Vec<u8>,
}

impl RowBlock {
    /// Wrap raw element bytes. `data.len()` must be a whole number of rows.
    pub fn from_raw(dtype: Dtype, row_elems: usize, data: Vec<u8>) -> Self {
        debug_assert!(
            row_elems == 0 || data.len() % (row_elems * dtype.num_bytes()) == 0,
            "row block bytes must cover whole rows"
        );
        Self { dtype, row_elems, data }
    }

    /// Empty block ready to receive rows of the given geometry.
    pub fn empty(dtype: Dtype, row_elems: usize) -> Self {
        Self { dtype, row_elems, data: Vec::new() }
    }

    /// Block of `Float64` rows from a flat value slice.
    pub fn from_f64(row_elems: usize, values: &[f64]) -> Self {
        Self::from_raw(Dtype::Float64, row_elems, bytemuck::cast_slice(values).to_vec())
    }

    /// Block of `Float32` rows from a flat value slice.
    pub fn from_f32(row_elems: usize, values: &[f32]) -> Self {
        Self::from_raw(Dtype::Float32, row_elems, bytemuck::cast_slice(values).to_vec())
    }

    /// Block of `Int64` rows from a flat value slice.
    pub fn from_i64(row_elems: usize, values: &[i64]) -> Self {
        Self::from_raw(Dtype::Int64, row_elems, bytemuck::cast_slice(values).to_vec())
    }

    /// Block of `Int32` rows from a flat value slice.
    pub fn from_i32(row_elems: usize, values: &[i32]) -> Self {
        Self::from_raw(Dtype::Int32, row_elems, bytemuck::cast_slice(values).to_vec())
    }

    #[inline]
    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    #[inline]
    pub fn row_elems(&self) -> usize {
        self.row_elems
    }

    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.row_elems * self.dtype.num_bytes()
    }

    /// Number of complete rows in the block.
    pub fn rows(&self) -> usize {
        if self.row_bytes() == 0 {
            0
        } else {
            self.data.len() / self.row_bytes()
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    fn elem_f64(&self, idx: usize) -> f64 {
        let w = self.dtype.num_bytes();
        let at = idx * w;
        let bytes = &self.data[at..at + w];
        match self.dtype {
            Dtype::Uint8 => bytes[0] as f64,
            Dtype::Int32 => pod_read_unaligned::<i32>(bytes) as f64,
            Dtype::Uint32 => pod_read_unaligned::<u32>(bytes) as f64,
            Dtype::Int64 => pod_read_unaligned::<i64>(bytes) as f64,
            Dtype::Uint64 => pod_read_unaligned::<u64>(bytes) as f64,
            Dtype::Float32 => pod_read_unaligned::<f32>(bytes) as f64,
            Dtype::Float64 => pod_read_unaligned::<f64>(bytes),
        }
    }

    fn elem_i64(&self, idx: usize) -> i64 {
        let w = self.dtype.num_bytes();
        let at = idx * w;
        let bytes = &self.data[at..at + w];
        match self.dtype {
            Dtype::Uint8 => bytes[0] as i64,
            Dtype::Int32 => pod_read_unaligned::<i32>(bytes) as i64,
            Dtype::Uint32 => pod_read_unaligned::<u32>(bytes) as i64,
            Dtype::Int64 => pod_read_unaligned::<i64>(bytes),
            Dtype::Uint64 => pod_read_unaligned::<u64>(bytes) as i64,
            Dtype::Float32 => pod_read_unaligned::<f32>(bytes) as i64,
            Dtype::Float64 => pod_read_unaligned::<f64>(bytes) as i64,
        }
    }

    /// Cell value as a float. `row`/`col` must be in bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.elem_f64(row * self.row_elems + col)
    }

    /// Cell value as an integer (floats are truncated; id columns hold whole
    /// numbers even in float datasets).
    #[inline]
    pub fn get_int(&self, row: usize, col: usize) -> i64 {
        self.elem_i64(row * self.row_elems + col)
    }

    /// Convert the block to another dtype, element by element.
    ///
    /// Integer-to-integer conversions go through `i64`; anything involving a
    /// float goes through `f64`.
    pub fn cast(&self, dtype: Dtype) -> RowBlock {
        if dtype == self.dtype {
            return self.clone();
        }
        let total = self.rows() * self.row_elems;
        let mut data = Vec::with_capacity(total * dtype.num_bytes());
        let via_float = self.dtype.is_float() || dtype.is_float();
        for i in 0..total {
            if via_float {
                push_elem_f64(&mut data, dtype, self.elem_f64(i));
            } else {
                push_elem_i64(&mut data, dtype, self.elem_i64(i));
            }
        }
        RowBlock { dtype, row_elems: self.row_elems, data }
    }

    /// Gather the given in-block rows into a new block, in the given order.
    pub fn gather(&self, rows: &[usize]) -> RowBlock {
        let rb = self.row_bytes();
        let mut data = Vec::with_capacity(rows.len() * rb);
        for &r in rows {
            data.extend_from_slice(&self.data[r * rb..(r + 1) * rb]);
        }
        RowBlock { dtype: self.dtype, row_elems: self.row_elems, data }
    }
}

fn push_elem_f64(out: &mut Vec<u8>, dtype: Dtype, v: f64) {
    match dtype {
        Dtype::Uint8 => out.push(v as u8),
        Dtype::Int32 => out.extend_from_slice(&(v as i32).to_ne_bytes()),
        Dtype::Uint32 => out.extend_from_slice(&(v as u32).to_ne_bytes()),
        Dtype::Int64 => out.extend_from_slice(&(v as i64).to_ne_bytes()),
        Dtype::Uint64 => out.extend_from_slice(&(v as u64).to_ne_bytes()),
        Dtype::Float32 => out.extend_from_slice(&(v as f32).to_ne_bytes()),
        Dtype::Float64 => out.extend_from_slice(&v.to_ne_bytes()),
    }
}

fn push_elem_i64(out: &mut Vec<u8>, dtype: Dtype, v: i64) {
    match dtype {
        Dtype::Uint8 => out.push(v as u8),
        Dtype::Int32 => out.extend_from_slice(&(v as i32).to_ne_bytes()),
        Dtype::Uint32 => out.extend_from_slice(&(v as u32).to_ne_bytes()),
        Dtype::Int64 => out.extend_from_slice(&v.to_ne_bytes()),
        Dtype::Uint64 => out.extend_from_slice(&(v as u64).to_ne_bytes()),
        Dtype::Float32 => out.extend_from_slice(&(v as f32).to_ne_bytes()),
        Dtype::Float64 => out.extend_from_slice(&(v as f64).to_ne_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_access() {
        let b = RowBlock::from_f64(3, &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        assert_eq!(b.rows(), 2);
        assert_eq!(b.get(0, 2), 2.0);
        assert_eq!(b.get(1, 0), 10.0);
        assert_eq!(b.get_int(1, 1), 11);
    }

    #[test]
    fn test_cast_f64_to_f32() {
        let b = RowBlock::from_f64(2, &[1.5, -2.25, 1e300, 0.1]);
        let c = b.cast(Dtype::Float32);
        assert_eq!(c.dtype(), Dtype::Float32);
        assert_eq!(c.rows(), 2);
        assert_eq!(c.get(0, 0), 1.5);
        assert_eq!(c.get(0, 1), -2.25);
        // overflow saturates to infinity, fraction rounds
        assert!(c.get(1, 0).is_infinite());
        assert!((c.get(1, 1) - 0.1).abs() < 1e-7);
    }

    #[test]
    fn test_cast_int_to_int_keeps_large_values() {
        let big = (1i64 << 60) + 7;
        let b = RowBlock::from_i64(1, &[big, -3]);
        let c = b.cast(Dtype::Uint64);
        assert_eq!(c.get_int(0, 0), big);
    }

    #[test]
    fn test_gather_preserves_order() {
        let b = RowBlock::from_i32(2, &[0, 0, 1, 1, 2, 2, 3, 3]);
        let g = b.gather(&[1, 3]);
        assert_eq!(g.rows(), 2);
        assert_eq!(g.get_int(0, 0), 1);
        assert_eq!(g.get_int(1, 1), 3);
    }

    #[test]
    fn test_zero_width_rows() {
        let b = RowBlock::from_raw(Dtype::Float64, 0, Vec::new());
        assert_eq!(b.rows(), 0);
        assert_eq!(b.row_bytes(), 0);
    }
}
