//! Back substitution for the upper-triangular factor produced by the QR step.
//!
//! The matrix must be upper triangular with a non-zero diagonal, which
//! [`compute_qr_decomposition`](crate::qr::compute_qr_decomposition) guarantees
//! by writing a unit diagonal for deflated columns.

use crate::error::{FsiError, Result};
use crate::matrix::DenseMatrix;
use crate::vector::InterfaceVector;

/// Solves `R x = rhs` for scalar unknowns.
pub fn backward_substitution(matrix: &DenseMatrix, rhs: &[f64]) -> Result<Vec<f64>> {
    let n = matrix.size();
    if rhs.len() != n {
        return Err(FsiError::dimension_mismatch(
            "back substitution rhs length",
            n,
            rhs.len(),
        ));
    }

    let mut dst = vec![0.0; n];
    for i in (0..n).rev() {
        let mut value = rhs[i];
        for j in (i + 1)..n {
            value -= matrix.get(i, j)? * dst[j];
        }
        dst[i] = value / matrix.get(i, i)?;
    }
    Ok(dst)
}

/// Solves `R X = rhs` where every unknown and right-hand side entry is a field vector.
pub fn backward_substitution_multiple_rhs<V: InterfaceVector>(
    matrix: &DenseMatrix,
    rhs: &[V],
) -> Result<Vec<V>> {
    let n = matrix.size();
    if rhs.len() != n {
        return Err(FsiError::dimension_mismatch(
            "back substitution rhs length",
            n,
            rhs.len(),
        ));
    }

    let mut dst: Vec<V> = Vec::with_capacity(n);
    for i in (0..n).rev() {
        let mut value = rhs[i].clone();
        // `dst` is filled back to front, so unknown `j` lives at `n - 1 - j`.
        for j in (i + 1)..n {
            value.add_scaled(-matrix.get(i, j)?, &dst[n - 1 - j]);
        }
        value.scale_by(1.0 / matrix.get(i, i)?);
        dst.push(value);
    }
    dst.reverse();
    Ok(dst)
}
