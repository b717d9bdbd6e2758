//! Residual-based convergence criteria for the partitioned iteration.

use crate::vector::InterfaceVector;

/// Absolute and relative norms of an interface residual.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResidualNorms {
    /// `||r||`
    pub absolute: f64,
    /// `||r|| / ||d||`
    pub relative: f64,
}

impl ResidualNorms {
    /// Builds the norm pair from an absolute residual norm and the reference norm `||d||`.
    ///
    /// A zero reference yields a relative norm of zero for a zero residual and
    /// infinity otherwise.
    pub fn new(absolute: f64, reference: f64) -> Self {
        let relative = if reference > 0.0 {
            absolute / reference
        } else if absolute == 0.0 {
            0.0
        } else {
            f64::INFINITY
        };
        Self { absolute, relative }
    }
}

/// Outcome of a convergence check.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConvergenceStatus {
    /// Norms the decision was based on.
    pub norms: ResidualNorms,
    /// Whether both criteria hold.
    pub converged: bool,
}

/// Evaluates residual norms against absolute and relative tolerances.
#[derive(Clone, Copy, Debug)]
pub struct ConvergenceMonitor {
    abs_tol: f64,
    rel_tol: f64,
}

impl ConvergenceMonitor {
    /// Creates a monitor from already validated tolerances.
    pub fn new(abs_tol: f64, rel_tol: f64) -> Self {
        Self { abs_tol, rel_tol }
    }

    /// Checks the residual of the current iterate `displacement`.
    pub fn check<V: InterfaceVector>(&self, residual: &V, displacement: &V) -> ConvergenceStatus {
        self.check_norms(residual.norm(), displacement.norm())
    }

    /// Checks globally reduced norms directly.
    ///
    /// Both comparisons are strict: a residual exactly at a tolerance is not converged.
    pub fn check_norms(&self, residual_norm: f64, reference_norm: f64) -> ConvergenceStatus {
        let norms = ResidualNorms::new(residual_norm, reference_norm);
        let converged = norms.absolute < self.abs_tol && norms.relative < self.rel_tol;
        ConvergenceStatus { norms, converged }
    }

    /// Absolute tolerance.
    pub fn abs_tol(&self) -> f64 {
        self.abs_tol
    }

    /// Relative tolerance.
    pub fn rel_tol(&self) -> f64 {
        self.rel_tol
    }
}
