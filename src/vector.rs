//! Field vector abstraction used by the coupling core.
//!
//! The acceleration engine never owns the layout of interface vectors. It only
//! combines vectors handed to it by the fluid and structure solvers, so every
//! algorithm in this crate is generic over [`InterfaceVector`]. A distributed
//! implementation performs its global reduction inside [`InterfaceVector::dot`];
//! every scalar the core derives (norms, projections, triangular factors) then
//! agrees across ranks.

use nalgebra::DVector;

/// Vector-space operations required from interface fields.
pub trait InterfaceVector: Clone {
    /// Global number of entries.
    fn len(&self) -> usize;

    /// Returns `true` if the vector has no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Globally reduced inner product.
    fn dot(&self, other: &Self) -> f64;

    /// Euclidean norm.
    fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// `self += alpha * other`
    fn add_scaled(&mut self, alpha: f64, other: &Self);

    /// `self *= alpha`
    fn scale_by(&mut self, alpha: f64);

    /// Sets every entry to zero while keeping the layout.
    fn fill_zero(&mut self);

    /// Returns `true` if no entry is NaN or infinite.
    fn all_finite(&self) -> bool;

    /// Zero vector with the same layout as `self`.
    fn zeros_like(&self) -> Self {
        let mut zero = self.clone();
        zero.fill_zero();
        zero
    }

    /// `self - other` as a new vector.
    fn difference(&self, other: &Self) -> Self {
        let mut diff = self.clone();
        diff.add_scaled(-1.0, other);
        diff
    }
}

impl InterfaceVector for DVector<f64> {
    fn len(&self) -> usize {
        self.nrows()
    }

    fn dot(&self, other: &Self) -> f64 {
        nalgebra::Matrix::dot(self, other)
    }

    fn norm(&self) -> f64 {
        nalgebra::Matrix::norm(self)
    }

    fn add_scaled(&mut self, alpha: f64, other: &Self) {
        self.axpy(alpha, other, 1.0);
    }

    fn scale_by(&mut self, alpha: f64) {
        self.scale_mut(alpha);
    }

    fn fill_zero(&mut self) {
        self.fill(0.0);
    }

    fn all_finite(&self) -> bool {
        self.iter().all(|value| value.is_finite())
    }
}
