//! Partitioned fluid-structure interaction coupling.
//!
//! This crate couples an independently discretized fluid solver and structure
//! solver into a time-accurate FSI simulation. Each time step the two solvers
//! are executed alternately in a Dirichlet–Neumann fashion and the interface
//! displacement is driven to consistency by an accelerated fixed-point
//! iteration. It offers tools to
//!
//! - drive the per-time-step coupling loop (`driver` module),
//! - accelerate it with IQN-ILS or Aitken relaxation (`acceleration` module),
//! - orthogonalize and solve the small least-squares problems involved
//!   (`qr`, `substitution` and `matrix` modules),
//! - reuse secant information across time steps (`history` module), and
//! - move an ALE fluid mesh and transfer fields between non-matching
//!   interfaces (`mesh_motion`, `ale` and `interface` modules).
//!
//! The field solvers themselves are external: the driver only talks to them
//! through [`FluidSolver`] and [`StructureSolver`], and all vector arithmetic
//! goes through [`InterfaceVector`], which is implemented for
//! `nalgebra::DVector<f64>`.
//!
//! # Quick start
//!
//! ```no_run
//! use fsirs::{AccelerationMethod, CouplingConfig, CouplingDriver, TimeStepping};
//! use fsirs::{FluidSolver, StructureSolver};
//! use nalgebra::DVector;
//!
//! struct Fluid;
//! impl FluidSolver<DVector<f64>> for Fluid {
//!     fn solve(&mut self, d: &DVector<f64>, _time: f64) -> fsirs::error::Result<DVector<f64>> {
//!         Ok(d.map(|x| 1.0 - 0.8 * x))
//!     }
//! }
//!
//! struct Structure;
//! impl StructureSolver<DVector<f64>> for Structure {
//!     fn predict_displacement(&mut self, _time: f64) -> fsirs::error::Result<DVector<f64>> {
//!         Ok(DVector::zeros(1))
//!     }
//!     fn solve(&mut self, traction: &DVector<f64>, _time: f64) -> fsirs::error::Result<DVector<f64>> {
//!         Ok(traction.clone())
//!     }
//! }
//!
//! let config = CouplingConfig::default()
//!     .with_method(AccelerationMethod::IqnIls)
//!     .with_reused_time_steps(2);
//! let mut driver = CouplingDriver::new(config, Fluid, Structure).expect("valid configuration");
//! let stepping = TimeStepping::new(0.0, 1.0, 0.1).expect("valid interval");
//! let summaries = driver.run(&stepping).expect("converged");
//! println!("{}", driver.performance_summary());
//! # let _ = summaries;
//! ```

pub mod acceleration;
pub mod ale;
pub mod convergence;
pub mod driver;
pub mod error;
pub mod history;
pub mod interface;
pub mod matrix;
pub mod mesh_motion;
pub mod options;
pub mod qr;
pub mod solvers;
pub mod statistics;
pub mod substitution;
pub mod vector;

pub use convergence::{ConvergenceMonitor, ConvergenceStatus, ResidualNorms};
pub use driver::{CouplingDriver, CouplingState};
pub use error::{FsiError, Result};
pub use history::{inv_jacobian_times_residual, HistoryEntry, HistoryStore};
pub use options::{AccelerationMethod, CouplingConfig, TimeStepping};
pub use solvers::{FluidSolver, StructureSolver};
pub use statistics::{IterationStats, PerformanceSummary, StageTimings, TimeStepSummary};
pub use vector::InterfaceVector;
