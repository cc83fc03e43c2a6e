//! Conductance-based thalamocortical neuron for the tick-synchronous core
//!
//! Implements the Hill-Tononi (2005) model neuron on top of the
//! `synfire-event` protocol and the `synfire-solver` adaptive integrator:
//!
//! - integrate-and-fire with an adaptive threshold that jumps on spiking and
//!   relaxes back to its equilibrium; no hard reset, the post-spike window is
//!   governed by a repolarizing potassium current instead;
//! - AMPA, NMDA, GABA_A and GABA_B conductance channels with beta-function
//!   (difference of exponentials) kinetics, the NMDA channel gated by a
//!   sigmoid of the instantaneous voltage;
//! - intrinsic pacemaker, low-threshold calcium, persistent sodium and
//!   depolarization-activated potassium currents.
//!
//! Each [`HtNeuron::update`] call advances exactly one tick; the stiff
//! 14-component state vector is integrated with as many adaptive sub-steps
//! as the solver's error control demands, so from the outside every entity
//! still behaves as if updated in lock-step.

#![deny(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod error;
pub mod intrinsic;
pub mod logger;
pub mod neuron;
pub mod params;
pub mod receptor;
pub mod state;

// Re-export essential types
pub use error::{ModelError, Result};
pub use logger::{recordable_names, DataLogger};
pub use neuron::{membrane_dynamics, DynamicsContext, HtNeuron, NeuronConfig};
pub use params::{NeuronParams, SynapseParams};
pub use receptor::Receptor;
pub use state::{NeuronState, STATE_DIM};

/// Model crate version for compatibility checking
pub const MODEL_VERSION: u32 = 1;
