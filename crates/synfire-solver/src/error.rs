//! Error types for the ODE solver

use thiserror::Error;

/// Result type for solver operations
pub type Result<T> = core::result::Result<T, SolverError>;

/// Errors that can occur during adaptive-step integration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Invalid step-control parameter
    #[error("Invalid solver parameter {parameter}: {value} (expected {constraint})")]
    BadControl {
        /// Parameter name
        parameter: &'static str,
        /// Invalid value
        value: f64,
        /// Constraint description
        constraint: &'static str,
    },

    /// State vector length does not match the solver dimension
    #[error("State dimension mismatch: expected {expected}, got {actual}")]
    Dimension {
        /// Dimension the solver was built for
        expected: usize,
        /// Length of the supplied state vector
        actual: usize,
    },

    /// Requested integration interval is reversed
    #[error("Invalid integration interval [{t_start}, {t_end}]")]
    BadInterval {
        /// Interval start
        t_start: f64,
        /// Interval end
        t_end: f64,
    },

    /// Error control could not be satisfied within the retry budget.
    ///
    /// Fatal for the calling entity: the state vector is left at the last
    /// accepted sub-step and must not be trusted for further advancement.
    #[error("Numerical divergence at t={t} (step size {step})")]
    Divergence {
        /// Internal time of the failed trial step
        t: f64,
        /// Step size of the failed trial step
        step: f64,
    },
}

impl SolverError {
    /// Create a bad control parameter error
    pub fn bad_control(parameter: &'static str, value: f64, constraint: &'static str) -> Self {
        Self::BadControl {
            parameter,
            value,
            constraint,
        }
    }

    /// Create a divergence error
    pub fn divergence(t: f64, step: f64) -> Self {
        Self::Divergence { t, step }
    }
}
