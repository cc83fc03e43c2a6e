//! Model parameters and the named-dictionary configuration surface
//!
//! The parameter record is immutable during a tick. The configuration
//! collaborator reads and writes it through canonical string keys; a batch of
//! updates is staged on a copy, validated as a whole and only then committed,
//! so a rejected batch leaves the previous valid configuration untouched.

use std::collections::BTreeMap;

use crate::error::{ModelError, Result};
use crate::receptor::Receptor;

/// Kinetic and driving-force constants of one receptor channel
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SynapseParams {
    /// Peak conductance of an isolated unit-weight impulse
    pub g_peak: f64,
    /// Rise time constant in ms (tau_1)
    pub tau_rise: f64,
    /// Decay time constant in ms (tau_2, > tau_rise)
    pub tau_decay: f64,
    /// Reversal potential in mV
    pub e_rev: f64,
}

impl SynapseParams {
    /// Create channel parameters
    pub const fn new(g_peak: f64, tau_rise: f64, tau_decay: f64, e_rev: f64) -> Self {
        Self {
            g_peak,
            tau_rise,
            tau_decay,
            e_rev,
        }
    }

    /// Validate, naming the channel in any error
    pub fn validate(&self, channel: &str) -> Result<()> {
        if !(self.g_peak >= 0.0) {
            return Err(ModelError::bad_parameter(
                format!("{}_g_peak", channel),
                self.g_peak.to_string(),
                ">= 0.0",
            ));
        }
        if !(self.tau_rise > 0.0) {
            return Err(ModelError::bad_parameter(
                format!("{}_Tau_1", channel),
                self.tau_rise.to_string(),
                "> 0.0",
            ));
        }
        if !(self.tau_decay > 0.0) {
            return Err(ModelError::bad_parameter(
                format!("{}_Tau_2", channel),
                self.tau_decay.to_string(),
                "> 0.0",
            ));
        }
        if !(self.tau_rise < self.tau_decay) {
            return Err(ModelError::bad_parameter(
                format!("{}_Tau_1", channel),
                format!("{} (with Tau_2={})", self.tau_rise, self.tau_decay),
                "< Tau_2",
            ));
        }
        Ok(())
    }

    /// Time to peak of the conductance waveform after an impulse
    pub fn t_peak(&self) -> f64 {
        self.tau_rise * self.tau_decay / (self.tau_decay - self.tau_rise)
            * (self.tau_decay / self.tau_rise).ln()
    }

    /// Increment applied to the kinetic rise variable per unit impulse
    /// weight, normalized so an isolated impulse of weight w peaks at
    /// exactly `w * g_peak`
    pub fn cond_step(&self) -> f64 {
        let t_peak = self.t_peak();
        let denom = (-t_peak / self.tau_decay).exp() - (-t_peak / self.tau_rise).exp();
        self.g_peak * (1.0 / self.tau_rise - 1.0 / self.tau_decay) / denom
    }
}

/// Full parameter record of the neuron model.
///
/// Defaults follow Hill & Tononi (2005), J Neurophysiol 93:1671-1698, with
/// the NMDA voltage dependence approximated by a sigmoid of the instantaneous
/// potential. Conductances are relative to the leak scale, potentials in mV,
/// time constants in ms.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NeuronParams {
    /// Sodium leak reversal potential
    pub e_na: f64,
    /// Potassium leak reversal potential
    pub e_k: f64,
    /// Sodium leak conductance
    pub g_na_leak: f64,
    /// Potassium leak conductance
    pub g_k_leak: f64,
    /// Membrane time constant applying to all currents but the
    /// repolarizing K current
    pub tau_m: f64,

    /// Equilibrium value of the adaptive threshold
    pub theta_eq: f64,
    /// Threshold time constant
    pub tau_theta: f64,

    /// Membrane time constant of the repolarizing K current
    pub tau_spike: f64,
    /// Duration of the repolarizing K current (the refractory window)
    pub t_spike: f64,

    /// AMPA channel
    pub ampa: SynapseParams,
    /// NMDA channel
    pub nmda: SynapseParams,
    /// Inflection voltage of the NMDA sigmoid; channel inactive for V << Vact
    pub nmda_v_act: f64,
    /// Scale of the NMDA sigmoid
    pub nmda_s_act: f64,
    /// GABA_A channel
    pub gaba_a: SynapseParams,
    /// GABA_B channel
    pub gaba_b: SynapseParams,

    /// Persistent sodium current peak conductance
    pub nap_g_peak: f64,
    /// Persistent sodium current reversal potential
    pub nap_e_rev: f64,
    /// Depolarization-activated potassium current peak conductance
    pub kna_g_peak: f64,
    /// Depolarization-activated potassium current reversal potential
    pub kna_e_rev: f64,
    /// Low-threshold calcium current peak conductance
    pub t_g_peak: f64,
    /// Low-threshold calcium current reversal potential
    pub t_e_rev: f64,
    /// Pacemaker current peak conductance
    pub h_g_peak: f64,
    /// Pacemaker current reversal potential
    pub h_e_rev: f64,

    /// Absolute and relative error tolerance handed to the ODE solver
    pub error_tol: f64,
}

impl Default for NeuronParams {
    fn default() -> Self {
        Self {
            e_na: 30.0,
            e_k: -90.0,
            g_na_leak: 0.2,
            g_k_leak: 1.0,
            tau_m: 16.0,
            theta_eq: -51.0,
            tau_theta: 2.0,
            tau_spike: 1.75,
            t_spike: 2.0,
            ampa: SynapseParams::new(0.1, 0.5, 2.4, 0.0),
            nmda: SynapseParams::new(0.075, 4.0, 40.0, 0.0),
            nmda_v_act: -58.0,
            nmda_s_act: 2.5,
            gaba_a: SynapseParams::new(0.33, 0.3, 7.0, -70.0),
            gaba_b: SynapseParams::new(0.0132, 60.0, 200.0, -90.0),
            nap_g_peak: 1.0,
            nap_e_rev: 30.0,
            kna_g_peak: 1.0,
            kna_e_rev: -90.0,
            t_g_peak: 1.0,
            t_e_rev: 0.0,
            h_g_peak: 1.0,
            h_e_rev: -40.0,
            error_tol: 1e-6,
        }
    }
}

/// One entry of the named-key surface
struct ParamEntry {
    key: &'static str,
    get: fn(&NeuronParams) -> f64,
    set: fn(&mut NeuronParams, f64),
}

macro_rules! param_entry {
    ($key:literal, $($field:tt).+) => {
        ParamEntry {
            key: $key,
            get: |p| p.$($field).+,
            set: |p, v| p.$($field).+ = v,
        }
    };
}

/// Canonical keys, in the order they are reported
const PARAM_ENTRIES: &[ParamEntry] = &[
    param_entry!("E_Na", e_na),
    param_entry!("E_K", e_k),
    param_entry!("g_NaL", g_na_leak),
    param_entry!("g_KL", g_k_leak),
    param_entry!("Tau_m", tau_m),
    param_entry!("Theta_eq", theta_eq),
    param_entry!("Tau_theta", tau_theta),
    param_entry!("Tau_spike", tau_spike),
    param_entry!("t_spike", t_spike),
    param_entry!("AMPA_g_peak", ampa.g_peak),
    param_entry!("AMPA_Tau_1", ampa.tau_rise),
    param_entry!("AMPA_Tau_2", ampa.tau_decay),
    param_entry!("AMPA_E_rev", ampa.e_rev),
    param_entry!("NMDA_g_peak", nmda.g_peak),
    param_entry!("NMDA_Tau_1", nmda.tau_rise),
    param_entry!("NMDA_Tau_2", nmda.tau_decay),
    param_entry!("NMDA_E_rev", nmda.e_rev),
    param_entry!("NMDA_Vact", nmda_v_act),
    param_entry!("NMDA_Sact", nmda_s_act),
    param_entry!("GABA_A_g_peak", gaba_a.g_peak),
    param_entry!("GABA_A_Tau_1", gaba_a.tau_rise),
    param_entry!("GABA_A_Tau_2", gaba_a.tau_decay),
    param_entry!("GABA_A_E_rev", gaba_a.e_rev),
    param_entry!("GABA_B_g_peak", gaba_b.g_peak),
    param_entry!("GABA_B_Tau_1", gaba_b.tau_rise),
    param_entry!("GABA_B_Tau_2", gaba_b.tau_decay),
    param_entry!("GABA_B_E_rev", gaba_b.e_rev),
    param_entry!("NaP_g_peak", nap_g_peak),
    param_entry!("NaP_E_rev", nap_e_rev),
    param_entry!("KNa_g_peak", kna_g_peak),
    param_entry!("KNa_E_rev", kna_e_rev),
    param_entry!("T_g_peak", t_g_peak),
    param_entry!("T_E_rev", t_e_rev),
    param_entry!("h_g_peak", h_g_peak),
    param_entry!("h_E_rev", h_e_rev),
    param_entry!("error_tol", error_tol),
];

impl NeuronParams {
    /// Per-channel parameters
    pub fn synapse(&self, receptor: Receptor) -> &SynapseParams {
        match receptor {
            Receptor::Ampa => &self.ampa,
            Receptor::Nmda => &self.nmda,
            Receptor::GabaA => &self.gaba_a,
            Receptor::GabaB => &self.gaba_b,
        }
    }

    /// Validate the whole record
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("Tau_m", self.tau_m),
            ("Tau_theta", self.tau_theta),
            ("Tau_spike", self.tau_spike),
            ("t_spike", self.t_spike),
            ("NMDA_Sact", self.nmda_s_act),
            ("error_tol", self.error_tol),
        ] {
            if !(value > 0.0) {
                return Err(ModelError::bad_parameter(name, value.to_string(), "> 0.0"));
            }
        }
        for (name, value) in [
            ("g_NaL", self.g_na_leak),
            ("g_KL", self.g_k_leak),
            ("NaP_g_peak", self.nap_g_peak),
            ("KNa_g_peak", self.kna_g_peak),
            ("T_g_peak", self.t_g_peak),
            ("h_g_peak", self.h_g_peak),
        ] {
            if !(value >= 0.0) {
                return Err(ModelError::bad_parameter(name, value.to_string(), ">= 0.0"));
            }
        }
        if !(self.g_na_leak + self.g_k_leak > 0.0) {
            return Err(ModelError::bad_parameter(
                "g_KL",
                format!("{} (with g_NaL={})", self.g_k_leak, self.g_na_leak),
                "g_KL + g_NaL > 0.0",
            ));
        }
        self.ampa.validate("AMPA")?;
        self.nmda.validate("NMDA")?;
        self.gaba_a.validate("GABA_A")?;
        self.gaba_b.validate("GABA_B")?;
        Ok(())
    }

    /// Snapshot of all parameters under their canonical keys
    pub fn get(&self) -> BTreeMap<&'static str, f64> {
        PARAM_ENTRIES
            .iter()
            .map(|entry| (entry.key, (entry.get)(self)))
            .collect()
    }

    /// Read a single parameter by key
    pub fn get_one(&self, key: &str) -> Result<f64> {
        PARAM_ENTRIES
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| (entry.get)(self))
            .ok_or_else(|| ModelError::unknown_key(key))
    }

    /// Apply a batch of named updates, all-or-nothing.
    ///
    /// Unknown keys and values that fail whole-record validation reject the
    /// batch; `self` is untouched on rejection.
    pub fn apply<'a, I>(&mut self, updates: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut staged = self.clone();
        for (key, value) in updates {
            let entry = PARAM_ENTRIES
                .iter()
                .find(|entry| entry.key == key)
                .ok_or_else(|| ModelError::unknown_key(key))?;
            (entry.set)(&mut staged, value);
        }
        staged.validate()?;
        *self = staged;
        Ok(())
    }
}
