//! Partitioned Dirichlet–Neumann coupling loop.
//!
//! Every time step the driver predicts an interface displacement, then
//! alternates fluid and structure solves until the interface residual meets
//! both tolerances. Between iterations the configured [`Accelerator`] computes
//! the next displacement. Secant information of completed steps is kept in a
//! [`HistoryStore`] owned by the driver.

use std::time::Instant;

use log::{debug, info};

use crate::acceleration::{AccelerationStep, Accelerator};
use crate::convergence::ConvergenceMonitor;
use crate::error::{FsiError, Result};
use crate::history::HistoryStore;
use crate::options::{CouplingConfig, TimeStepping};
use crate::solvers::{FluidSolver, StructureSolver};
use crate::statistics::{IterationStats, PerformanceSummary, StageTimings, TimeStepSummary};
use crate::vector::InterfaceVector;

/// Stage of the per-time-step state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CouplingState {
    Predict,
    SolveFluid,
    SolveStructure,
    EvaluateResidual,
    Accelerate,
    Converged,
    Failed,
}

/// Drives a fluid and a structure solver to a consistent interface state.
#[derive(Debug)]
pub struct CouplingDriver<V, F, S> {
    config: CouplingConfig,
    monitor: ConvergenceMonitor,
    fluid: F,
    structure: S,
    history: HistoryStore<V>,
    stats: IterationStats,
    timings: StageTimings,
    state: CouplingState,
}

impl<V, F, S> CouplingDriver<V, F, S>
where
    V: InterfaceVector,
    F: FluidSolver<V>,
    S: StructureSolver<V>,
{
    /// Validates `config` and creates a driver with empty history.
    pub fn new(config: CouplingConfig, fluid: F, structure: S) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            monitor: ConvergenceMonitor::new(config.abs_tol, config.rel_tol),
            history: HistoryStore::new(config.reused_time_steps),
            config,
            fluid,
            structure,
            stats: IterationStats::default(),
            timings: StageTimings::default(),
            state: CouplingState::Predict,
        })
    }

    /// Solves one time step at physical time `time`.
    ///
    /// Performs at most `partitioned_iter_max + 1` coupled evaluations; the
    /// last one is only checked for convergence. Failing that check is fatal.
    pub fn solve_time_step(&mut self, time: f64) -> Result<TimeStepSummary> {
        let time_step = self.stats.time_steps();
        let max_iterations = self.config.partitioned_iter_max;
        let mut accelerator = Accelerator::new(&self.config);

        self.state = CouplingState::Predict;
        let mut d = self.structure.predict_displacement(time)?;
        ensure_finite(&d, "structure predictor", time, 0)?;

        let mut iteration: u32 = 0;
        loop {
            self.state = CouplingState::SolveFluid;
            let start = Instant::now();
            let traction = self.fluid.solve(&d, time);
            self.timings.fluid += start.elapsed();
            let traction = self.guard(traction, "fluid solver", time, iteration)?;

            self.state = CouplingState::SolveStructure;
            let start = Instant::now();
            let d_tilde = self.structure.solve(&traction, time);
            self.timings.structure += start.elapsed();
            let d_tilde = self.guard(d_tilde, "structure solver", time, iteration)?;

            self.state = CouplingState::EvaluateResidual;
            let residual = d_tilde.difference(&d);
            let residual = self.guard(Ok(residual), "interface residual", time, iteration)?;
            self.stats.record_iteration();

            let status = self.monitor.check(&residual, &d);
            debug!(
                "time step {time_step}, iteration {iteration}: |r| = {:.6e}, |r|/|d| = {:.6e}",
                status.norms.absolute, status.norms.relative
            );

            if status.converged {
                if let Err(err) = self.commit_time_step(accelerator, &d_tilde) {
                    self.state = CouplingState::Failed;
                    return Err(err);
                }
                self.state = CouplingState::Converged;
                self.stats.record_time_step();

                let summary = TimeStepSummary {
                    time_step,
                    time,
                    iterations: iteration + 1,
                    absolute_residual: status.norms.absolute,
                    relative_residual: status.norms.relative,
                };
                info!(
                    "time step {} (t = {:.6e}) converged in {} partitioned iterations",
                    summary.time_step, summary.time, summary.iterations
                );
                return Ok(summary);
            }

            if iteration == max_iterations {
                self.state = CouplingState::Failed;
                return Err(FsiError::ConvergenceFailure {
                    time_step,
                    time,
                    iterations: iteration + 1,
                    absolute: status.norms.absolute,
                    relative: status.norms.relative,
                });
            }

            self.state = CouplingState::Accelerate;
            let start = Instant::now();
            let step = accelerator.accelerate(&mut d, &d_tilde, &residual, &self.history);
            self.timings.acceleration += start.elapsed();
            match step? {
                AccelerationStep::Relaxed { omega } => {
                    debug!("relaxed update with omega = {omega:.6e}")
                }
                AccelerationStep::QuasiNewton {
                    columns,
                    deflated,
                    reused_layers,
                } => debug!(
                    "quasi-Newton update: {columns} columns ({deflated} deflated), {reused_layers} reused time steps"
                ),
            }

            iteration += 1;
        }
    }

    /// Advances through every time step of `stepping`.
    pub fn run(&mut self, stepping: &TimeStepping) -> Result<Vec<TimeStepSummary>> {
        stepping.validate()?;
        let count = stepping.time_step_count()?;
        let mut summaries = Vec::new();
        for step in 1..=count {
            let time = (stepping.start_time + f64::from(step) * stepping.time_step_size)
                .min(stepping.end_time);
            summaries.push(self.solve_time_step(time)?);
        }
        info!("{}", self.performance_summary());
        Ok(summaries)
    }

    fn commit_time_step(&mut self, accelerator: Accelerator<V>, d_tilde: &V) -> Result<()> {
        accelerator.finish(&mut self.history)?;
        self.fluid.finish_time_step()?;
        self.structure.finish_time_step(d_tilde)
    }

    fn guard(
        &mut self,
        value: Result<V>,
        stage: &'static str,
        time: f64,
        iteration: u32,
    ) -> Result<V> {
        let value = value.map_err(|err| {
            self.state = CouplingState::Failed;
            err
        })?;
        if let Err(err) = ensure_finite(&value, stage, time, iteration) {
            self.state = CouplingState::Failed;
            return Err(err);
        }
        Ok(value)
    }

    /// Validated coupling configuration.
    pub fn config(&self) -> &CouplingConfig {
        &self.config
    }

    /// Current state of the state machine.
    pub fn state(&self) -> CouplingState {
        self.state
    }

    /// Secant history retained from past time steps.
    pub fn history(&self) -> &HistoryStore<V> {
        &self.history
    }

    /// Iteration counters accumulated so far.
    pub fn stats(&self) -> IterationStats {
        self.stats
    }

    /// Wall-clock time spent per stage.
    pub fn timings(&self) -> StageTimings {
        self.timings
    }

    /// Counters and timings bundled for reporting.
    pub fn performance_summary(&self) -> PerformanceSummary {
        PerformanceSummary {
            stats: self.stats,
            timings: self.timings,
        }
    }

    /// Access to the fluid solver.
    pub fn fluid(&self) -> &F {
        &self.fluid
    }

    /// Access to the structure solver.
    pub fn structure(&self) -> &S {
        &self.structure
    }

    /// Releases both solvers.
    pub fn into_solvers(self) -> (F, S) {
        (self.fluid, self.structure)
    }
}

fn ensure_finite<V: InterfaceVector>(
    value: &V,
    stage: &'static str,
    time: f64,
    iteration: u32,
) -> Result<()> {
    if value.all_finite() {
        Ok(())
    } else {
        Err(FsiError::fatal_solver(stage, time, iteration))
    }
}
