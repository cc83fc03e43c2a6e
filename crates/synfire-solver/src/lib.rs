//! Adaptive-step ODE integration for the neural simulation core
//!
//! Entities integrate a stiff membrane-state system across each simulation
//! tick. This crate provides the numerical collaborator they call: an
//! embedded Runge-Kutta-Fehlberg 4(5) stepper with per-component error
//! control, a step-size hint carried across calls, and a bounded retry
//! budget. If error control cannot be satisfied within that budget, the
//! failure is reported as [`SolverError::Divergence`]: fatal for the
//! affected entity, never retried indefinitely.
//!
//! The derivative function is a pure callback with explicit context: the
//! caller captures whatever read-only snapshot it needs in the closure, and
//! the stepper may evaluate it at intermediate, rejected trial points.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod rkf45;

pub use error::{Result, SolverError};
pub use rkf45::{Rkf45, StepControl};

/// Solver crate version for compatibility checking
pub const SOLVER_VERSION: u32 = 1;
