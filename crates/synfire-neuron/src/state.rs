//! The 14-component integration state vector
//!
//! Layout: membrane potential, adaptive threshold, a (rise, conductance)
//! pair per receptor channel, then the four auxiliary variables of the
//! intrinsic currents. The refractory countdown and the spike-current flag
//! live alongside the vector but are not integrated; they change only
//! between ticks.

use std::collections::BTreeMap;

use crate::error::{ModelError, Result};
use crate::intrinsic;
use crate::params::NeuronParams;
use crate::receptor::Receptor;

/// Length of the integrated state vector
pub const STATE_DIM: usize = 14;

/// Index of the membrane potential
pub const V_M: usize = 0;
/// Index of the adaptive threshold
pub const THETA: usize = 1;
/// Index of the KNa accumulator variable
pub const D_IKNA: usize = 10;
/// Index of the low-threshold Ca activation variable
pub const M_IT: usize = 11;
/// Index of the low-threshold Ca inactivation variable
pub const H_IT: usize = 12;
/// Index of the pacemaker activation variable
pub const M_IH: usize = 13;

/// Index of a channel's kinetic rise variable
pub const fn dg_index(receptor: Receptor) -> usize {
    2 + 2 * receptor.index()
}

/// Index of a channel's conductance variable
pub const fn g_index(receptor: Receptor) -> usize {
    3 + 2 * receptor.index()
}

/// Named-key surface of the state vector, in vector order
const STATE_KEYS: [&str; STATE_DIM] = [
    "V_m",
    "Theta",
    "dg_AMPA",
    "g_AMPA",
    "dg_NMDA",
    "g_NMDA",
    "dg_GABA_A",
    "g_GABA_A",
    "dg_GABA_B",
    "g_GABA_B",
    "D_IKNa",
    "m_IT",
    "h_IT",
    "m_Ih",
];

/// Full integration state of one neuron instance
#[derive(Debug, Clone, PartialEq)]
pub struct NeuronState {
    /// Integrated state vector, handed to the solver as a plain slice
    pub(crate) y: [f64; STATE_DIM],
    /// Remaining ticks of the repolarizing K current
    pub(crate) refractory_ticks_left: u32,
    /// Whether the repolarizing K current is forced active
    pub(crate) spike_current_active: bool,

    // Instantaneous intrinsic currents, refreshed after each tick.
    // Recording-only: the dynamics never read them.
    pub(crate) i_nap: f64,
    pub(crate) i_kna: f64,
    pub(crate) i_t: f64,
    pub(crate) i_h: f64,
}

impl NeuronState {
    /// Initialize at the leak equilibrium with gating variables at their
    /// steady states, so an unstimulated neuron without intrinsic
    /// conductances stays exactly at rest
    pub fn new(params: &NeuronParams) -> Self {
        let v = (params.g_na_leak * params.e_na + params.g_k_leak * params.e_k)
            / (params.g_na_leak + params.g_k_leak);
        let mut y = [0.0; STATE_DIM];
        y[V_M] = v;
        y[THETA] = params.theta_eq;
        y[D_IKNA] = intrinsic::KNA_D_EQ;
        y[M_IT] = intrinsic::t_m_inf(v);
        y[H_IT] = intrinsic::t_h_inf(v);
        y[M_IH] = intrinsic::h_m_inf(v);

        let mut state = Self {
            y,
            refractory_ticks_left: 0,
            spike_current_active: false,
            i_nap: 0.0,
            i_kna: 0.0,
            i_t: 0.0,
            i_h: 0.0,
        };
        state.refresh_currents(params);
        state
    }

    /// Membrane potential in mV
    pub fn voltage(&self) -> f64 {
        self.y[V_M]
    }

    /// Adaptive threshold in mV
    pub fn threshold(&self) -> f64 {
        self.y[THETA]
    }

    /// Conductance of a receptor channel
    pub fn conductance(&self, receptor: Receptor) -> f64 {
        self.y[g_index(receptor)]
    }

    /// Kinetic rise variable of a receptor channel
    pub fn rise(&self, receptor: Receptor) -> f64 {
        self.y[dg_index(receptor)]
    }

    /// KNa accumulator value
    pub fn d_ikna(&self) -> f64 {
        self.y[D_IKNA]
    }

    /// Whether the post-spike repolarizing window is active
    pub fn is_refractory(&self) -> bool {
        self.spike_current_active
    }

    /// Remaining refractory ticks
    pub fn refractory_ticks_left(&self) -> u32 {
        self.refractory_ticks_left
    }

    /// Last recorded persistent sodium current
    pub fn i_nap(&self) -> f64 {
        self.i_nap
    }

    /// Last recorded depolarization-activated K current
    pub fn i_kna(&self) -> f64 {
        self.i_kna
    }

    /// Last recorded low-threshold Ca current
    pub fn i_t(&self) -> f64 {
        self.i_t
    }

    /// Last recorded pacemaker current
    pub fn i_h(&self) -> f64 {
        self.i_h
    }

    /// Recompute the recorded intrinsic currents from the current vector
    pub(crate) fn refresh_currents(&mut self, params: &NeuronParams) {
        let v = self.y[V_M];
        self.i_nap = intrinsic::i_nap(v, params.nap_g_peak, params.nap_e_rev);
        self.i_kna = intrinsic::i_kna(v, self.y[D_IKNA], params.kna_g_peak, params.kna_e_rev);
        self.i_t = intrinsic::i_t(
            v,
            self.y[M_IT],
            self.y[H_IT],
            params.t_g_peak,
            params.t_e_rev,
        );
        self.i_h = intrinsic::i_h(v, self.y[M_IH], params.h_g_peak, params.h_e_rev);
    }

    /// Snapshot of the state vector under its canonical keys
    pub fn get(&self) -> BTreeMap<&'static str, f64> {
        STATE_KEYS
            .iter()
            .zip(self.y.iter())
            .map(|(&key, &value)| (key, value))
            .collect()
    }

    /// Apply a batch of named updates, all-or-nothing.
    ///
    /// Unknown keys and out-of-domain values (negative conductances,
    /// non-positive accumulator, gating variables outside [0, 1]) reject the
    /// batch without touching the state.
    pub fn apply<'a, I>(&mut self, updates: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut staged = self.y;
        for (key, value) in updates {
            let index = STATE_KEYS
                .iter()
                .position(|&name| name == key)
                .ok_or_else(|| ModelError::unknown_key(key))?;
            staged[index] = value;
        }
        Self::validate_vector(&staged)?;
        self.y = staged;
        Ok(())
    }

    fn validate_vector(y: &[f64; STATE_DIM]) -> Result<()> {
        for index in [V_M, THETA] {
            if !y[index].is_finite() {
                return Err(ModelError::bad_state(STATE_KEYS[index], y[index], "finite"));
            }
        }
        for receptor in Receptor::ALL {
            for index in [dg_index(receptor), g_index(receptor)] {
                if !(y[index] >= 0.0) {
                    return Err(ModelError::bad_state(STATE_KEYS[index], y[index], ">= 0.0"));
                }
            }
        }
        if !(y[D_IKNA] > 0.0) {
            return Err(ModelError::bad_state(STATE_KEYS[D_IKNA], y[D_IKNA], "> 0.0"));
        }
        for index in [M_IT, H_IT, M_IH] {
            if !(0.0..=1.0).contains(&y[index]) {
                return Err(ModelError::bad_state(STATE_KEYS[index], y[index], "in [0, 1]"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equilibrium_initialization() {
        let params = NeuronParams::default();
        let state = NeuronState::new(&params);
        // (0.2 * 30 + 1.0 * -90) / 1.2
        assert!((state.voltage() - (-70.0)).abs() < 1e-12);
        assert_eq!(state.threshold(), params.theta_eq);
        for receptor in Receptor::ALL {
            assert_eq!(state.conductance(receptor), 0.0);
            assert_eq!(state.rise(receptor), 0.0);
        }
        assert_eq!(state.d_ikna(), intrinsic::KNA_D_EQ);
        assert!(!state.is_refractory());
    }

    #[test]
    fn test_gating_starts_at_steady_state() {
        let params = NeuronParams::default();
        let state = NeuronState::new(&params);
        let v = state.voltage();
        assert_eq!(state.y[M_IT], intrinsic::t_m_inf(v));
        assert_eq!(state.y[H_IT], intrinsic::t_h_inf(v));
        assert_eq!(state.y[M_IH], intrinsic::h_m_inf(v));
    }

    #[test]
    fn test_named_round_trip() {
        let params = NeuronParams::default();
        let mut state = NeuronState::new(&params);
        state.apply([("V_m", -55.0), ("g_AMPA", 0.25)]).unwrap();
        assert_eq!(state.voltage(), -55.0);
        assert_eq!(state.conductance(Receptor::Ampa), 0.25);

        let dict = state.get();
        assert_eq!(dict.len(), STATE_DIM);
        assert_eq!(dict["V_m"], -55.0);
        assert_eq!(dict["g_AMPA"], 0.25);
    }

    #[test]
    fn test_apply_rejects_unknown_key() {
        let params = NeuronParams::default();
        let mut state = NeuronState::new(&params);
        let before = state.clone();
        let result = state.apply([("V_m", -55.0), ("g_XYZ", 0.1)]);
        assert!(matches!(result, Err(ModelError::UnknownKey { .. })));
        assert_eq!(state, before);
    }

    #[test]
    fn test_apply_rejects_negative_conductance() {
        let params = NeuronParams::default();
        let mut state = NeuronState::new(&params);
        let before = state.clone();
        let result = state.apply([("g_NMDA", -0.1)]);
        assert!(matches!(result, Err(ModelError::BadState { .. })));
        assert_eq!(state, before);
    }
}
