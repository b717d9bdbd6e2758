//! Contracts of the field solvers driven by the coupling loop.
//!
//! Each call may hide an arbitrarily large parallel computation; the driver
//! only sees interface vectors going in and out.

use crate::error::Result;

/// Fluid sub-problem with a Dirichlet (displacement) interface condition.
pub trait FluidSolver<V> {
    /// Deforms the fluid domain consistently with `displacement`, solves the flow
    /// at `time` and returns the interface traction.
    fn solve(&mut self, displacement: &V, time: f64) -> Result<V>;

    /// Commits the converged state of the time step.
    fn finish_time_step(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Structure sub-problem with a Neumann (traction) interface condition.
pub trait StructureSolver<V> {
    /// Extrapolated interface displacement used as the first iterate of a time step.
    fn predict_displacement(&mut self, time: f64) -> Result<V>;

    /// Solves the structure under `traction` at `time` and returns the interface displacement.
    fn solve(&mut self, traction: &V, time: f64) -> Result<V>;

    /// Commits the converged interface `displacement` of the time step.
    fn finish_time_step(&mut self, _displacement: &V) -> Result<()> {
        Ok(())
    }
}
