use std::ops::{Index, IndexMut};

use itertools::{EitherOrBoth::*, Itertools};

/// Dense, row-major N-dimensional array of `f64`.
///
/// `data.len()` always equals the product of `shape` (an empty shape is a
/// scalar holding one element). Strides are derived from the shape on
/// construction and never mutated on their own.
#[derive(Debug, Clone)]
pub struct Tensor {
    pub(crate) data: Vec<f64>,
    pub(crate) shape: Vec<usize>,
    pub(crate) strides: Vec<usize>,
}

fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for d in (0..shape.len().saturating_sub(1)).rev() {
        strides[d] = strides[d + 1] * shape[d + 1];
    }
    strides
}

impl Tensor {
    /// Zero-filled tensor. `Tensor::new(&[])` is a one-element scalar.
    pub fn new(shape: &[usize]) -> Tensor {
        Tensor::filled(shape, 0.0)
    }

    pub fn filled(shape: &[usize], value: f64) -> Tensor {
        let size = shape.iter().product();
        Tensor {
            data: vec![value; size],
            shape: shape.to_vec(),
            strides: row_major_strides(shape),
        }
    }

    /// Builds a tensor from row-major `data`.
    ///
    /// # Panics
    /// Panics if `data.len()` differs from the product of `shape`.
    pub fn with_data(shape: &[usize], data: Vec<f64>) -> Tensor {
        let size: usize = shape.iter().product();
        assert_eq!(
            size,
            data.len(),
            "data of length {} does not fit shape {:?}",
            data.len(),
            shape
        );
        Tensor {
            data,
            shape: shape.to_vec(),
            strides: row_major_strides(shape),
        }
    }

    pub fn scalar(value: f64) -> Tensor {
        Tensor::with_data(&[], vec![value])
    }

    /// `[N, 1]` tensor.
    pub fn column_vector(values: &[f64]) -> Tensor {
        assert!(!values.is_empty(), "a vector can't have size 0");
        Tensor::with_data(&[values.len(), 1], values.to_vec())
    }

    /// `[1, N]` tensor.
    pub fn row_vector(values: &[f64]) -> Tensor {
        assert!(!values.is_empty(), "a vector can't have size 0");
        Tensor::with_data(&[1, values.len()], values.to_vec())
    }

    /// Builds a matrix from nested rows, all of the same length.
    pub fn from_rows(rows: &[&[f64]]) -> Tensor {
        let cols = rows.first().map_or(0, |r| r.len());
        assert!(
            rows.iter().all(|r| r.len() == cols),
            "all rows must have the same length"
        );
        Tensor::with_data(&[rows.len(), cols], rows.concat())
    }

    pub fn dims(&self) -> usize {
        self.shape.len()
    }

    /// Size of dimension `i`; dimensions past the rank have size 1.
    pub fn dim(&self, i: usize) -> usize {
        self.shape.get(i).copied().unwrap_or(1)
    }

    pub fn rows(&self) -> usize {
        self.dim(0)
    }

    pub fn cols(&self) -> usize {
        self.dim(1)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable view of the elements. The length is fixed, so the shape
    /// invariant holds.
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    pub fn is_column_vector(&self) -> bool {
        self.dims() <= 2 && self.cols() == 1
    }

    /// Flat offset of `indices`. Missing trailing indices are taken as 0,
    /// and indices past the rank must all be 0.
    fn offset(&self, indices: &[usize]) -> Result<usize, String> {
        let mut offset = 0;
        for (d, (&size, &stride)) in self.shape.iter().zip(self.strides.iter()).enumerate() {
            let index = indices.get(d).copied().unwrap_or(0);
            if index >= size {
                return Err(format!(
                    "index {:?} out of bounds: position {} is {} but dimension has size {} (shape {:?})",
                    indices, d, index, size, self.shape
                ));
            }
            offset += index * stride;
        }
        if let Some(extra) = indices.iter().skip(self.dims()).position(|&i| i != 0) {
            return Err(format!(
                "index {:?} out of bounds: position {} is non-zero past rank {}",
                indices,
                self.dims() + extra,
                self.dims()
            ));
        }
        Ok(offset)
    }

    /// Element at `indices`, or `None` when out of bounds.
    pub fn get(&self, indices: &[usize]) -> Option<f64> {
        self.offset(indices).ok().map(|i| self.data[i])
    }

    /// # Panics
    /// Panics if `indices` is out of bounds.
    pub fn at(&self, indices: &[usize]) -> f64 {
        self[indices]
    }

    /// # Panics
    /// Panics if `indices` is out of bounds.
    pub fn set(&mut self, value: f64, indices: &[usize]) {
        self[indices] = value;
    }

    /// True when both shapes match once the shorter one is padded with
    /// trailing dimensions of size 1.
    pub fn eq_dims(&self, other: &Tensor) -> bool {
        self.shape
            .iter()
            .zip_longest(other.shape.iter())
            .all(|pair| match pair {
                Both(l, r) => l == r,
                Left(d) | Right(d) => *d == 1,
            })
    }
}

impl Index<&[usize]> for Tensor {
    type Output = f64;

    fn index(&self, indices: &[usize]) -> &f64 {
        match self.offset(indices) {
            Ok(i) => &self.data[i],
            Err(e) => panic!("{e}"),
        }
    }
}

impl IndexMut<&[usize]> for Tensor {
    fn index_mut(&mut self, indices: &[usize]) -> &mut f64 {
        match self.offset(indices) {
            Ok(i) => &mut self.data[i],
            Err(e) => panic!("{e}"),
        }
    }
}

/// Shapes equal under trailing-1 padding and every element bitwise equal.
impl PartialEq for Tensor {
    fn eq(&self, other: &Tensor) -> bool {
        self.eq_dims(other)
            && self.data.len() == other.data.len()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strides_are_row_major() {
        let t = Tensor::new(&[2, 3, 4]);
        assert_eq!(t.strides(), &[12, 4, 1]);
        assert_eq!(t.len(), 24);

        let s = Tensor::new(&[]);
        assert_eq!(s.len(), 1);
        assert!(s.strides().is_empty());
    }

    #[test]
    fn test_get_3x3() {
        let matrix = Tensor::with_data(&[3, 3], (0..9).map(f64::from).collect());
        let mut prev = -1.0;
        for i in 0..3 {
            for j in 0..3 {
                let curr = matrix.at(&[i, j]);
                assert_eq!(prev + 1.0, curr);
                prev = curr;
            }
        }
        assert_eq!(matrix.at(&[1, 0]), 3.0);
        assert_eq!(matrix.at(&[2, 2]), 8.0);
    }

    #[test]
    fn test_get_2x2x2() {
        let t = Tensor::with_data(&[2, 2, 2], (0..8).map(f64::from).collect());
        assert_eq!(t.at(&[0, 0, 0]), 0.0);
        assert_eq!(t.at(&[0, 1, 0]), 2.0);
        assert_eq!(t.at(&[1, 1, 1]), 7.0);
    }

    #[test]
    fn test_missing_trailing_indices_are_zero() {
        let col = Tensor::column_vector(&[1.0, 2.0, 3.0]);
        assert_eq!(col.at(&[2]), 3.0);
        assert_eq!(col.at(&[2, 0]), 3.0);
        assert_eq!(col.at(&[2, 0, 0, 0]), 3.0);

        let matrix = Tensor::from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]);
        assert_eq!(matrix.at(&[1]), 3.0);

        let scalar = Tensor::scalar(5.0);
        assert_eq!(scalar.at(&[]), 5.0);
        assert_eq!(scalar.at(&[0]), 5.0);
    }

    #[test]
    fn test_out_of_bounds_is_rejected() {
        let t = Tensor::new(&[2, 2]);
        assert_eq!(t.get(&[2, 0]), None);
        assert_eq!(t.get(&[0, 2]), None);
        assert_eq!(t.get(&[0, 0, 1]), None);
        assert_eq!(Tensor::scalar(1.0).get(&[1]), None);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_at_panics_out_of_bounds() {
        Tensor::new(&[3]).at(&[3]);
    }

    #[test]
    fn test_set() {
        let mut t = Tensor::new(&[2, 3]);
        t.set(7.5, &[1, 2]);
        assert_eq!(t.data()[5], 7.5);
        t[&[0, 1][..]] = 1.5;
        assert_eq!(t.at(&[0, 1]), 1.5);
    }

    #[test]
    fn test_eq_pads_trailing_ones() {
        assert_eq!(Tensor::scalar(2.0), Tensor::with_data(&[1], vec![2.0]));
        assert_eq!(Tensor::scalar(2.0), Tensor::column_vector(&[2.0]));
        assert_eq!(
            Tensor::with_data(&[3], vec![1.0, 2.0, 3.0]),
            Tensor::column_vector(&[1.0, 2.0, 3.0])
        );
        assert_ne!(
            Tensor::row_vector(&[1.0, 2.0, 3.0]),
            Tensor::column_vector(&[1.0, 2.0, 3.0])
        );
        assert_ne!(Tensor::scalar(0.0), Tensor::scalar(-0.0));
    }

    #[test]
    #[should_panic(expected = "does not fit shape")]
    fn test_with_data_checks_length() {
        Tensor::with_data(&[2, 2], vec![1.0, 2.0, 3.0]);
    }
}
