//! Error types for the neuron model

use thiserror::Error;

use synfire_event::ProtocolError;
use synfire_solver::SolverError;

/// Result type for model operations
pub type Result<T> = core::result::Result<T, ModelError>;

/// Errors that can occur while configuring or advancing a neuron
#[derive(Error, Debug)]
pub enum ModelError {
    /// Event protocol error
    #[error("Protocol error: {source}")]
    Protocol {
        #[from]
        /// Source protocol error
        source: ProtocolError,
    },

    /// Numerical solver error; divergence is fatal for this entity
    #[error("Solver error: {source}")]
    Solver {
        #[from]
        /// Source solver error
        source: SolverError,
    },

    /// Invalid parameter value
    #[error("Invalid parameter {parameter}: {value} (expected {constraint})")]
    BadParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Named key does not exist in the dictionary surface
    #[error("Unknown key '{key}'")]
    UnknownKey {
        /// Rejected key
        key: String,
    },

    /// Invalid state variable value
    #[error("Invalid state value for {variable}: {value} (expected {constraint})")]
    BadState {
        /// State variable name
        variable: String,
        /// Invalid value
        value: f64,
        /// Constraint description
        constraint: String,
    },

    /// State left the physically plausible range during integration
    #[error("Numerical instability: membrane potential {v} mV")]
    NumericalInstability {
        /// Offending membrane potential
        v: f64,
    },
}

impl ModelError {
    /// Create an invalid parameter error
    pub fn bad_parameter(
        parameter: impl Into<String>,
        value: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self::BadParameter {
            parameter: parameter.into(),
            value: value.into(),
            constraint: constraint.into(),
        }
    }

    /// Create an unknown key error
    pub fn unknown_key(key: impl Into<String>) -> Self {
        Self::UnknownKey { key: key.into() }
    }

    /// Create an invalid state value error
    pub fn bad_state(variable: impl Into<String>, value: f64, constraint: impl Into<String>) -> Self {
        Self::BadState {
            variable: variable.into(),
            value,
            constraint: constraint.into(),
        }
    }

    /// Create a numerical instability error
    pub fn instability(v: f64) -> Self {
        Self::NumericalInstability { v }
    }
}
