//! Intrinsic membrane currents
//!
//! Pure functions of the instantaneous state vector, re-evaluated at every
//! right-hand-side call the integrator makes. Nothing here may be cached
//! across sub-steps: the solver probes intermediate, possibly rejected trial
//! points. Steady-state and time-constant voltage relations follow
//! Hill & Tononi (2005) with the persistent sodium activation of
//! Compte et al. (2003), J Neurophysiol 89:2707.
//!
//! Sign convention throughout: currents are written `I = -g (V - E)` so that
//! `dV/dt` is proportional to their plain sum.

/// Equilibrium value of the KNa accumulator variable
pub const KNA_D_EQ: f64 = 0.001;

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Persistent sodium activation steady state, m_inf(V)
pub fn nap_m_inf(v: f64) -> f64 {
    sigmoid((v + 55.7) / 7.7)
}

/// Persistent sodium current, computed algebraically from V (no auxiliary
/// state)
pub fn i_nap(v: f64, g_peak: f64, e_rev: f64) -> f64 {
    let m = nap_m_inf(v);
    -g_peak * m * m * m * (v - e_rev)
}

/// Activation of the depolarization-activated K current as a function of the
/// sodium-like accumulator D
pub fn kna_m_inf(d: f64) -> f64 {
    if d <= 0.0 {
        return 0.0;
    }
    1.0 / (1.0 + (0.25 / d).powf(3.5))
}

/// Depolarization-activated potassium current
pub fn i_kna(v: f64, d: f64, g_peak: f64, e_rev: f64) -> f64 {
    -g_peak * kna_m_inf(d) * (v - e_rev)
}

/// Accumulator dynamics for the KNa current: depolarization-gated influx
/// against first-order relaxation to the equilibrium concentration
pub fn kna_d_dot(v: f64, d: f64) -> f64 {
    let influx = sigmoid((v + 10.0) / 5.0);
    0.025 * influx - (d - KNA_D_EQ) / 1250.0
}

/// Low-threshold Ca activation steady state
pub fn t_m_inf(v: f64) -> f64 {
    sigmoid((v + 59.0) / 6.2)
}

/// Low-threshold Ca inactivation steady state
pub fn t_h_inf(v: f64) -> f64 {
    sigmoid(-(v + 83.0) / 4.0)
}

/// Low-threshold Ca activation time constant (fast)
pub fn t_tau_m(v: f64) -> f64 {
    0.13 + 0.22 / ((-(v + 132.0) / 16.7).exp() + ((v + 16.8) / 18.2).exp())
}

/// Low-threshold Ca inactivation time constant (slow)
pub fn t_tau_h(v: f64) -> f64 {
    8.2 + (56.6 + 0.27 * ((v + 115.2) / 5.0).exp()) / (1.0 + ((v + 86.0) / 3.2).exp())
}

/// Low-threshold calcium current
pub fn i_t(v: f64, m: f64, h: f64, g_peak: f64, e_rev: f64) -> f64 {
    -g_peak * m * m * h * (v - e_rev)
}

/// Pacemaker activation steady state; opens with hyperpolarization
pub fn h_m_inf(v: f64) -> f64 {
    sigmoid(-(v + 75.0) / 5.5)
}

/// Pacemaker activation time constant
pub fn h_tau_m(v: f64) -> f64 {
    1.0 / ((-14.59 - 0.086 * v).exp() + (-1.87 + 0.0701 * v).exp())
}

/// Pacemaker current
pub fn i_h(v: f64, m: f64, g_peak: f64, e_rev: f64) -> f64 {
    -g_peak * m * (v - e_rev)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOLTAGE_RANGE: core::ops::RangeInclusive<i32> = -120..=40;

    #[test]
    fn test_steady_states_bounded() {
        for v in VOLTAGE_RANGE {
            let v = v as f64;
            for m in [nap_m_inf(v), t_m_inf(v), t_h_inf(v), h_m_inf(v)] {
                assert!((0.0..=1.0).contains(&m), "steady state out of [0,1] at V={}", v);
            }
        }
    }

    #[test]
    fn test_time_constants_positive() {
        for v in VOLTAGE_RANGE {
            let v = v as f64;
            assert!(t_tau_m(v) > 0.0);
            assert!(t_tau_h(v) > 0.0);
            assert!(h_tau_m(v) > 0.0);
        }
    }

    #[test]
    fn test_activation_directions() {
        // NaP and T open with depolarization, h with hyperpolarization
        assert!(nap_m_inf(-40.0) > nap_m_inf(-80.0));
        assert!(t_m_inf(-40.0) > t_m_inf(-80.0));
        assert!(h_m_inf(-100.0) > h_m_inf(-60.0));
        // T inactivates with depolarization
        assert!(t_h_inf(-100.0) > t_h_inf(-60.0));
    }

    #[test]
    fn test_nap_vanishes_when_hyperpolarized() {
        assert!(i_nap(-90.0, 1.0, 30.0).abs() < 1e-3);
    }

    #[test]
    fn test_kna_accumulator_rest() {
        // near rest the accumulator barely moves from its equilibrium
        assert!(kna_d_dot(-70.0, KNA_D_EQ).abs() < 1e-5);
        // sustained depolarization drives net influx
        assert!(kna_d_dot(0.0, KNA_D_EQ) > 1e-2);
    }

    #[test]
    fn test_kna_activation_saturates() {
        assert_eq!(kna_m_inf(0.0), 0.0);
        assert!(kna_m_inf(0.001) < 1e-8);
        assert!(kna_m_inf(10.0) > 0.999);
    }

    #[test]
    fn test_current_signs() {
        // depolarized above reversal: outward (negative) contribution
        assert!(i_kna(0.0, 1.0, 1.0, -90.0) < 0.0);
        // pacemaker is inward (positive) below its reversal
        assert!(i_h(-80.0, 0.5, 1.0, -40.0) > 0.0);
    }
}
