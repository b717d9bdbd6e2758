//! Modified Gram-Schmidt QR factorization of interface vectors with deflation.

use log::debug;

use crate::error::Result;
use crate::matrix::DenseMatrix;
use crate::vector::InterfaceVector;

/// Relative norm drop below which a column is treated as linearly dependent.
pub const DEFAULT_DEFLATION_THRESHOLD: f64 = 1e-2;

/// Upper-triangular factor together with deflation diagnostics.
#[derive(Clone, Debug)]
pub struct QrFactors {
    /// Upper-triangular coefficient matrix `R`.
    pub r: DenseMatrix,
    /// Indices of columns that were dropped as (nearly) linearly dependent.
    pub deflated: Vec<usize>,
}

impl QrFactors {
    /// Number of columns that were kept in the orthonormal basis.
    pub fn rank(&self) -> usize {
        self.r.size() - self.deflated.len()
    }
}

/// Orthonormalizes `q` in place and returns the triangular factor.
///
/// Columns whose norm drops below `eps` times their initial norm during
/// orthogonalization are zeroed. Their diagonal entry in `R` is set to one
/// and the entries above it to zero, so that later back substitution never
/// divides by zero and the column indices of `q` stay aligned with the
/// increment sequences they were copied from.
pub fn compute_qr_decomposition<V: InterfaceVector>(q: &mut [V], eps: f64) -> Result<QrFactors> {
    let n = q.len();
    let mut r = DenseMatrix::new(n);
    let mut deflated = Vec::new();

    for i in 0..n {
        let norm_initial = q[i].norm();

        let (previous, rest) = q.split_at_mut(i);
        let column = &mut rest[0];
        for (j, basis) in previous.iter().enumerate() {
            let r_ji = basis.dot(column);
            r.set(r_ji, j, i)?;
            column.add_scaled(-r_ji, basis);
        }

        let r_ii = column.norm();
        if norm_initial == 0.0 || r_ii < eps * norm_initial {
            debug!(
                "deflating QR column {i}: norm {r_ii:.3e} after orthogonalization, {norm_initial:.3e} before"
            );
            column.fill_zero();
            for j in 0..i {
                r.set(0.0, j, i)?;
            }
            r.set(1.0, i, i)?;
            deflated.push(i);
        } else {
            r.set(r_ii, i, i)?;
            column.scale_by(1.0 / r_ii);
        }
    }

    Ok(QrFactors { r, deflated })
}
