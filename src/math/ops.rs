use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use super::tensor::Tensor;

impl Tensor {
    fn assert_same_dims(&self, other: &Tensor) {
        assert!(
            self.eq_dims(other),
            "Tensors do not have the same shape: {:?} vs {:?}",
            self.shape,
            other.shape
        );
    }

    fn zip_with(&self, other: &Tensor, f: impl Fn(f64, f64) -> f64) -> Tensor {
        self.assert_same_dims(other);
        let mut out = self.clone();
        for (x, &y) in out.data.iter_mut().zip(other.data.iter()) {
            *x = f(*x, y);
        }
        out
    }

    /// Dense matrix product of two tensors with at most 2 dimensions.
    ///
    /// # Panics
    /// Panics if either operand has more than 2 dimensions or if
    /// `self.cols() != rhs.rows()`.
    pub fn matmul(&self, rhs: &Tensor) -> Tensor {
        assert!(self.dims() <= 2, "left operand is not a matrix: {:?}", self.shape);
        assert!(rhs.dims() <= 2, "right operand is not a matrix: {:?}", rhs.shape);
        assert_eq!(
            self.cols(),
            rhs.rows(),
            "Matrix dimensions do not match: {:?} x {:?}",
            self.shape,
            rhs.shape
        );

        let (rows, inner, cols) = (self.rows(), self.cols(), rhs.cols());
        let mut out = Tensor::new(&[rows, cols]);
        for row in 0..rows {
            let lhs_row = &self.data[row * inner..(row + 1) * inner];
            let out_row = &mut out.data[row * cols..(row + 1) * cols];
            for (k, &a) in lhs_row.iter().enumerate() {
                let rhs_row = &rhs.data[k * cols..(k + 1) * cols];
                for (o, &b) in out_row.iter_mut().zip(rhs_row) {
                    *o += a * b;
                }
            }
        }
        out
    }

    /// Swaps rows and columns of a tensor with at most 2 dimensions.
    pub fn transpose(&self) -> Tensor {
        assert!(self.dims() <= 2, "Element is not a matrix: {:?}", self.shape);
        let (rows, cols) = (self.rows(), self.cols());
        let mut out = Tensor::new(&[cols, rows]);
        for r in 0..rows {
            for c in 0..cols {
                out.data[c * rows + r] = self.data[r * cols + c];
            }
        }
        out
    }

    pub fn elementwise_mul(&self, other: &Tensor) -> Tensor {
        self.zip_with(other, |a, b| a * b)
    }

    pub fn mul_elementwise_in_place(&mut self, other: &Tensor) -> &mut Tensor {
        self.assert_same_dims(other);
        for (x, y) in self.data.iter_mut().zip(other.data.iter()) {
            *x *= y;
        }
        self
    }

    pub fn add_in_place(&mut self, other: &Tensor) -> &mut Tensor {
        self.assert_same_dims(other);
        for (x, y) in self.data.iter_mut().zip(other.data.iter()) {
            *x += y;
        }
        self
    }

    pub fn sub_in_place(&mut self, other: &Tensor) -> &mut Tensor {
        self.assert_same_dims(other);
        for (x, y) in self.data.iter_mut().zip(other.data.iter()) {
            *x -= y;
        }
        self
    }

    pub fn scalar_mult(&self, factor: f64) -> Tensor {
        self.map(|x| x * factor)
    }

    pub fn scale_in_place(&mut self, factor: f64) -> &mut Tensor {
        self.apply(|x| x * factor)
    }

    pub fn add_to_elems(&self, value: f64) -> Tensor {
        self.map(|x| x + value)
    }

    /// Applies `f` to every element, returning a new tensor.
    pub fn map<F>(&self, f: F) -> Tensor
    where
        F: Fn(f64) -> f64,
    {
        let mut out = self.clone();
        out.apply(f);
        out
    }

    /// Applies `f` to every element in place.
    pub fn apply<F>(&mut self, f: F) -> &mut Tensor
    where
        F: Fn(f64) -> f64,
    {
        for x in self.data.iter_mut() {
            *x = f(*x);
        }
        self
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn any<F>(&self, f: F) -> bool
    where
        F: Fn(f64) -> bool,
    {
        self.data.iter().any(|&x| f(x))
    }

    pub fn contains(&self, value: f64) -> bool {
        self.any(|x| x == value)
    }

    /// True when no element is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        !self.any(|x| !x.is_finite())
    }

    /// Euclidean norm of a single-column tensor.
    pub fn col_vector_norm2(&self) -> f64 {
        assert!(self.is_column_vector(), "Not a column vector: {:?}", self.shape);
        self.data.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    pub fn col_vector_norm1(&self) -> f64 {
        assert!(self.is_column_vector(), "Not a column vector: {:?}", self.shape);
        self.data.iter().map(|x| x.abs()).sum()
    }

    /// Maximum absolute row sum.
    pub fn matrix_norm_inf(&self) -> f64 {
        assert!(self.dims() <= 2, "Element is not a matrix: {:?}", self.shape);
        let cols = self.cols();
        if cols == 0 {
            return 0.0;
        }
        self.data
            .chunks(cols)
            .map(|row| row.iter().map(|x| x.abs()).sum::<f64>())
            .fold(0.0, f64::max)
    }
}

impl Add<&Tensor> for &Tensor {
    type Output = Tensor;

    fn add(self, rhs: &Tensor) -> Tensor {
        self.zip_with(rhs, |a, b| a + b)
    }
}

impl Sub<&Tensor> for &Tensor {
    type Output = Tensor;

    fn sub(self, rhs: &Tensor) -> Tensor {
        self.zip_with(rhs, |a, b| a - b)
    }
}

/// Matrix product, see [`Tensor::matmul`].
impl Mul<&Tensor> for &Tensor {
    type Output = Tensor;

    fn mul(self, rhs: &Tensor) -> Tensor {
        self.matmul(rhs)
    }
}

impl Mul<f64> for &Tensor {
    type Output = Tensor;

    fn mul(self, rhs: f64) -> Tensor {
        self.scalar_mult(rhs)
    }
}

impl AddAssign<&Tensor> for Tensor {
    fn add_assign(&mut self, rhs: &Tensor) {
        self.add_in_place(rhs);
    }
}

impl SubAssign<&Tensor> for Tensor {
    fn sub_assign(&mut self, rhs: &Tensor) {
        self.sub_in_place(rhs);
    }
}
