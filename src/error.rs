use thiserror::Error;

/// Unified error type for `fsirs` operations.
#[derive(Debug, Error)]
pub enum FsiError {
    /// Raised at startup when a coupling parameter is invalid.
    #[error("invalid configuration for `{parameter}`: {reason}")]
    Configuration {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// Human-readable description of the violated constraint.
        reason: String,
    },

    /// Raised when the configuration source cannot be parsed.
    #[error("failed to parse coupling configuration: {0}")]
    ConfigParse(String),

    /// Raised when an interface point has no counterpart within the geometric tolerance.
    #[error(
        "interface point {point:?} has no counterpart within tolerance {tolerance}; nearest distance {distance}"
    )]
    GeometricMatch {
        /// Coordinates of the unmatched point.
        point: Vec<f64>,
        /// Distance to the nearest candidate on the other interface.
        distance: f64,
        /// Tolerance that was applied.
        tolerance: f64,
    },

    /// Raised when the partitioned iteration exhausts its iteration budget.
    #[error(
        "partitioned iteration did not converge in time step {time_step} (t = {time}) after {iterations} iterations; residual norms abs {absolute}, rel {relative}"
    )]
    ConvergenceFailure {
        /// Index of the failing time step (zero-based).
        time_step: u32,
        /// Physical time of the failing step.
        time: f64,
        /// Number of coupled evaluations performed.
        iterations: u32,
        /// Final absolute residual norm.
        absolute: f64,
        /// Final relative residual norm.
        relative: f64,
    },

    /// Raised when a sub-solver or the residual contains NaN or infinite values.
    #[error("non-finite value produced by {stage} at t = {time}, iteration {iteration}")]
    FatalSolver {
        /// Stage of the coupling loop that produced the value.
        stage: &'static str,
        /// Physical time of the step.
        time: f64,
        /// Partitioned iteration index.
        iteration: u32,
    },

    /// Raised when a dense matrix is addressed outside its bounds.
    #[error("index ({row}, {col}) exceeds matrix dimensions {size}x{size}")]
    IndexOutOfBounds { row: usize, col: usize, size: usize },

    /// Raised when provided vectors or matrices have incompatible dimensions.
    #[error("dimension mismatch in {context}: expected {expected} but found {found}")]
    DimensionMismatch {
        /// Human-readable context describing the operation.
        context: &'static str,
        /// The required dimension.
        expected: usize,
        /// The dimension that was actually supplied.
        found: usize,
    },

    /// Raised when a linear operator cannot be factorized.
    #[error("matrix in {context} is singular")]
    SingularMatrix { context: &'static str },
}

impl FsiError {
    /// Helper to format a [`DimensionMismatch`](FsiError::DimensionMismatch) error.
    pub fn dimension_mismatch(context: &'static str, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            found,
        }
    }

    /// Helper to raise a [`Configuration`](FsiError::Configuration) error.
    pub fn configuration(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            parameter,
            reason: reason.into(),
        }
    }

    /// Helper to raise when a factorization fails due to singularity.
    pub fn singular(context: &'static str) -> Self {
        Self::SingularMatrix { context }
    }

    /// Helper for non-finite sub-solver output.
    pub fn fatal_solver(stage: &'static str, time: f64, iteration: u32) -> Self {
        Self::FatalSolver {
            stage,
            time,
            iteration,
        }
    }
}

impl From<serde_json::Error> for FsiError {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigParse(err.to_string())
    }
}

/// Type alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, FsiError>;
