//! Configuration of the partitioned coupling scheme and of the time loop.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FsiError, Result};

/// Upper bound accepted for `reused_time_steps`.
pub const MAX_REUSED_TIME_STEPS: usize = 1_000;

/// Acceleration applied to the fixed-point iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccelerationMethod {
    /// Dynamic relaxation with Aitken's delta-squared recurrence.
    #[serde(rename = "Aitken")]
    Aitken,
    /// Interface quasi-Newton with least-squares Jacobian approximation.
    #[serde(rename = "IQN-ILS")]
    IqnIls,
}

impl AccelerationMethod {
    /// Name used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccelerationMethod::Aitken => "Aitken",
            AccelerationMethod::IqnIls => "IQN-ILS",
        }
    }
}

impl fmt::Display for AccelerationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccelerationMethod {
    type Err = FsiError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "Aitken" => Ok(AccelerationMethod::Aitken),
            "IQN-ILS" => Ok(AccelerationMethod::IqnIls),
            other => Err(FsiError::configuration(
                "method",
                format!("unknown acceleration method `{other}`, expected `Aitken` or `IQN-ILS`"),
            )),
        }
    }
}

/// Parameters of the partitioned fixed-point iteration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CouplingConfig {
    /// Acceleration method.
    pub method: AccelerationMethod,
    /// Absolute tolerance on the interface residual norm.
    pub abs_tol: f64,
    /// Tolerance on the residual norm relative to the displacement norm.
    pub rel_tol: f64,
    /// Initial relaxation factor, also used for the first relaxed IQN-ILS step.
    pub omega_init: f64,
    /// Number of past time steps whose secant information is reused.
    pub reused_time_steps: usize,
    /// Maximum number of accelerated updates per time step.
    pub partitioned_iter_max: u32,
    /// Distance below which interface points of both sides are considered identical.
    pub geometric_tolerance: f64,
}

impl Default for CouplingConfig {
    fn default() -> Self {
        Self {
            method: AccelerationMethod::Aitken,
            abs_tol: 1e-12,
            rel_tol: 1e-3,
            omega_init: 0.1,
            reused_time_steps: 0,
            partitioned_iter_max: 100,
            geometric_tolerance: 1e-10,
        }
    }
}

impl CouplingConfig {
    /// Override the acceleration method.
    pub fn with_method(mut self, method: AccelerationMethod) -> Self {
        self.method = method;
        self
    }

    /// Override both residual tolerances.
    pub fn with_tolerances(mut self, abs_tol: f64, rel_tol: f64) -> Self {
        self.abs_tol = abs_tol;
        self.rel_tol = rel_tol;
        self
    }

    /// Override the initial relaxation factor.
    pub fn with_omega_init(mut self, omega_init: f64) -> Self {
        self.omega_init = omega_init;
        self
    }

    /// Set how many past time steps contribute secant information.
    pub fn with_reused_time_steps(mut self, reused_time_steps: usize) -> Self {
        self.reused_time_steps = reused_time_steps;
        self
    }

    /// Set the iteration budget per time step.
    pub fn with_partitioned_iter_max(mut self, partitioned_iter_max: u32) -> Self {
        self.partitioned_iter_max = partitioned_iter_max;
        self
    }

    /// Set the interface point matching tolerance.
    pub fn with_geometric_tolerance(mut self, geometric_tolerance: f64) -> Self {
        self.geometric_tolerance = geometric_tolerance;
        self
    }

    /// Checks every parameter; called before any time stepping.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("abs_tol", self.abs_tol)?;
        ensure_positive("rel_tol", self.rel_tol)?;
        ensure_positive("geometric_tolerance", self.geometric_tolerance)?;
        if !(self.omega_init > 0.0 && self.omega_init <= 1.0) {
            return Err(FsiError::configuration(
                "omega_init",
                format!("must lie in (0, 1], found {}", self.omega_init),
            ));
        }
        if self.reused_time_steps > MAX_REUSED_TIME_STEPS {
            return Err(FsiError::configuration(
                "reused_time_steps",
                format!(
                    "must not exceed {MAX_REUSED_TIME_STEPS}, found {}",
                    self.reused_time_steps
                ),
            ));
        }
        if self.partitioned_iter_max == 0 {
            return Err(FsiError::configuration(
                "partitioned_iter_max",
                "must be positive",
            ));
        }
        Ok(())
    }

    /// Parses and validates a JSON document; missing fields take their defaults.
    pub fn from_json_str(source: &str) -> Result<Self> {
        let raw: RawCouplingConfig = serde_json::from_str(source)?;
        let config = Self {
            method: raw.method.parse()?,
            abs_tol: raw.abs_tol,
            rel_tol: raw.rel_tol,
            omega_init: raw.omega_init,
            reused_time_steps: raw.reused_time_steps,
            partitioned_iter_max: raw.partitioned_iter_max,
            geometric_tolerance: raw.geometric_tolerance,
        };
        config.validate()?;
        Ok(config)
    }
}

// Mirrors `CouplingConfig` with the method kept as text so that unknown names
// surface as configuration errors rather than parse errors.
#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawCouplingConfig {
    method: String,
    abs_tol: f64,
    rel_tol: f64,
    omega_init: f64,
    reused_time_steps: usize,
    partitioned_iter_max: u32,
    geometric_tolerance: f64,
}

impl Default for RawCouplingConfig {
    fn default() -> Self {
        let config = CouplingConfig::default();
        Self {
            method: config.method.as_str().to_string(),
            abs_tol: config.abs_tol,
            rel_tol: config.rel_tol,
            omega_init: config.omega_init,
            reused_time_steps: config.reused_time_steps,
            partitioned_iter_max: config.partitioned_iter_max,
            geometric_tolerance: config.geometric_tolerance,
        }
    }
}

fn ensure_positive(parameter: &'static str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(FsiError::configuration(
            parameter,
            format!("must be positive and finite, found {value}"),
        ))
    }
}

/// Time interval and step size of the coupled simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeStepping {
    /// Physical start time.
    pub start_time: f64,
    /// Physical end time.
    pub end_time: f64,
    /// Constant step size shared by fluid and structure.
    pub time_step_size: f64,
}

impl TimeStepping {
    /// Creates and validates a time interval.
    pub fn new(start_time: f64, end_time: f64, time_step_size: f64) -> Result<Self> {
        let stepping = Self {
            start_time,
            end_time,
            time_step_size,
        };
        stepping.validate()?;
        Ok(stepping)
    }

    /// Checks that the interval is finite and non-empty and the step size positive.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("time_step_size", self.time_step_size)?;
        for (parameter, value) in [("start_time", self.start_time), ("end_time", self.end_time)] {
            if !value.is_finite() {
                return Err(FsiError::configuration(
                    parameter,
                    format!("must be finite, found {value}"),
                ));
            }
        }
        if !(self.end_time > self.start_time) {
            return Err(FsiError::configuration(
                "end_time",
                format!(
                    "must exceed start_time {}, found {}",
                    self.start_time, self.end_time
                ),
            ));
        }
        Ok(())
    }

    /// Number of steps needed to reach `end_time`; a final partial step counts as a step.
    ///
    /// Fails if the count does not fit the `u32` time step index.
    pub fn time_step_count(&self) -> Result<u32> {
        let steps = (self.end_time - self.start_time) / self.time_step_size;
        // Absorb round-off so that e.g. 1.0 / 0.1 does not produce an extra step.
        let steps = (steps - 1e-10).ceil().max(1.0);
        if !(steps <= f64::from(u32::MAX)) {
            return Err(FsiError::configuration(
                "time_step_size",
                format!("interval needs {steps:e} time steps, at most {} are supported", u32::MAX),
            ));
        }
        Ok(steps as u32)
    }
}
