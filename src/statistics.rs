//! Iteration counters, per-step diagnostics and wall-clock timings.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Counts time steps and partitioned iterations accumulated over a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IterationStats {
    time_steps: u32,
    total_iterations: u64,
}

impl IterationStats {
    /// Number of completed time steps.
    pub fn time_steps(&self) -> u32 {
        self.time_steps
    }

    /// Coupled evaluations accumulated over all time steps.
    pub fn total_iterations(&self) -> u64 {
        self.total_iterations
    }

    /// Mean number of coupled evaluations per completed time step.
    pub fn average_iterations(&self) -> f64 {
        if self.time_steps == 0 {
            0.0
        } else {
            self.total_iterations as f64 / f64::from(self.time_steps)
        }
    }

    pub(crate) fn record_iteration(&mut self) {
        self.total_iterations += 1;
    }

    pub(crate) fn record_time_step(&mut self) {
        self.time_steps += 1;
    }
}

/// Diagnostics of one converged time step.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimeStepSummary {
    /// Zero-based index of the time step.
    pub time_step: u32,
    /// Physical time the step was solved for.
    pub time: f64,
    /// Coupled evaluations needed to converge.
    pub iterations: u32,
    /// Final absolute residual norm.
    pub absolute_residual: f64,
    /// Final relative residual norm.
    pub relative_residual: f64,
}

/// Accumulated wall-clock time per stage of the coupling loop.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageTimings {
    pub fluid: Duration,
    pub structure: Duration,
    pub acceleration: Duration,
}

impl StageTimings {
    /// Sum over all stages.
    pub fn total(&self) -> Duration {
        self.fluid + self.structure + self.acceleration
    }
}

/// Report printed at the end of a run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerformanceSummary {
    pub stats: IterationStats,
    pub timings: StageTimings,
}

impl fmt::Display for PerformanceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Properties of partitioned iteration scheme:")?;
        writeln!(f, "  Time steps:               {}", self.stats.time_steps())?;
        writeln!(
            f,
            "  Partitioned iterations:   {}",
            self.stats.total_iterations()
        )?;
        writeln!(
            f,
            "  Iterations per time step: {:.2}",
            self.stats.average_iterations()
        )?;
        writeln!(f, "Wall times:")?;
        let total = self.timings.total().as_secs_f64();
        for (label, duration) in [
            ("Fluid", self.timings.fluid),
            ("Structure", self.timings.structure),
            ("Acceleration", self.timings.acceleration),
        ] {
            let seconds = duration.as_secs_f64();
            let share = if total > 0.0 { 100.0 * seconds / total } else { 0.0 };
            writeln!(f, "  {label:<13} {seconds:>10.3e} s  {share:>5.1} %")?;
        }
        write!(f, "  {:<13} {:>10.3e} s", "Total", total)
    }
}
