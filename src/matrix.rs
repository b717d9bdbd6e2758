//! Small dense square matrix backing the triangular QR factor.

use crate::error::{FsiError, Result};

/// Zero-initialized, bounds-checked `M x M` matrix stored row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseMatrix {
    size: usize,
    data: Vec<f64>,
}

impl DenseMatrix {
    /// Creates a `size x size` matrix filled with zeros.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            data: vec![0.0; size * size],
        }
    }

    /// Number of rows (and columns).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns entry `(i, j)`.
    pub fn get(&self, i: usize, j: usize) -> Result<f64> {
        self.check_bounds(i, j)?;
        Ok(self.data[i * self.size + j])
    }

    /// Overwrites entry `(i, j)` with `value`.
    pub fn set(&mut self, value: f64, i: usize, j: usize) -> Result<()> {
        self.check_bounds(i, j)?;
        self.data[i * self.size + j] = value;
        Ok(())
    }

    fn check_bounds(&self, i: usize, j: usize) -> Result<()> {
        if i >= self.size || j >= self.size {
            return Err(FsiError::IndexOutOfBounds {
                row: i,
                col: j,
                size: self.size,
            });
        }
        Ok(())
    }
}
