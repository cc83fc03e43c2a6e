//! Embedded Runge-Kutta-Fehlberg 4(5) stepper with adaptive step control
//!
//! The caller hands over a state vector, an interval and a pure derivative
//! function; the stepper subdivides the interval into as many accepted and
//! rejected trial steps as the error tolerance demands and returns a step
//! size hint to seed the next call. Carrying the hint across calls keeps the
//! step-size heuristic warm between simulation ticks.

use crate::error::{Result, SolverError};

// Fehlberg tableau, nodes and stage coefficients
const B21: f64 = 1.0 / 4.0;
const B31: f64 = 3.0 / 32.0;
const B32: f64 = 9.0 / 32.0;
const B41: f64 = 1932.0 / 2197.0;
const B42: f64 = -7200.0 / 2197.0;
const B43: f64 = 7296.0 / 2197.0;
const B51: f64 = 439.0 / 216.0;
const B52: f64 = -8.0;
const B53: f64 = 3680.0 / 513.0;
const B54: f64 = -845.0 / 4104.0;
const B61: f64 = -8.0 / 27.0;
const B62: f64 = 2.0;
const B63: f64 = -3544.0 / 2565.0;
const B64: f64 = 1859.0 / 4104.0;
const B65: f64 = -11.0 / 40.0;

// 5th-order solution weights
const C1: f64 = 16.0 / 135.0;
const C3: f64 = 6656.0 / 12825.0;
const C4: f64 = 28561.0 / 56430.0;
const C5: f64 = -9.0 / 50.0;
const C6: f64 = 2.0 / 55.0;

// Difference between the 5th- and 4th-order solutions
const E1: f64 = 1.0 / 360.0;
const E3: f64 = -128.0 / 4275.0;
const E4: f64 = -2197.0 / 75240.0;
const E5: f64 = 1.0 / 50.0;
const E6: f64 = 2.0 / 55.0;

/// Error-control settings for the adaptive stepper
#[derive(Debug, Clone, PartialEq)]
pub struct StepControl {
    /// Absolute error tolerance per component
    pub eps_abs: f64,
    /// Relative error tolerance per component
    pub eps_rel: f64,
    /// Smallest admissible step size; shrinking below it is divergence
    pub h_min: f64,
    /// Trial-step retry budget per accepted step
    pub max_retries: u32,
}

impl Default for StepControl {
    fn default() -> Self {
        Self {
            eps_abs: 1e-6,
            eps_rel: 1e-6,
            h_min: 1e-10,
            max_retries: 12,
        }
    }
}

impl StepControl {
    /// Create step control with the given tolerances and validation
    pub fn new(eps_abs: f64, eps_rel: f64) -> Result<Self> {
        let control = Self {
            eps_abs,
            eps_rel,
            ..Default::default()
        };
        control.validate()?;
        Ok(control)
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if !(self.eps_abs > 0.0) {
            return Err(SolverError::bad_control("eps_abs", self.eps_abs, "> 0.0"));
        }
        if !(self.eps_rel >= 0.0) {
            return Err(SolverError::bad_control("eps_rel", self.eps_rel, ">= 0.0"));
        }
        if !(self.h_min > 0.0) {
            return Err(SolverError::bad_control("h_min", self.h_min, "> 0.0"));
        }
        if self.max_retries == 0 {
            return Err(SolverError::bad_control("max_retries", 0.0, ">= 1"));
        }
        Ok(())
    }
}

/// Adaptive-step RKF45 integrator for a fixed-dimension system.
///
/// Holds its stage scratch buffers so a per-tick `advance` allocates nothing.
#[derive(Debug, Clone)]
pub struct Rkf45 {
    control: StepControl,
    k1: Vec<f64>,
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    k5: Vec<f64>,
    k6: Vec<f64>,
    y_tmp: Vec<f64>,
    y_next: Vec<f64>,
    y_err: Vec<f64>,
}

impl Rkf45 {
    /// Create a stepper for systems of the given dimension
    pub fn new(dim: usize, control: StepControl) -> Result<Self> {
        control.validate()?;
        Ok(Self {
            control,
            k1: vec![0.0; dim],
            k2: vec![0.0; dim],
            k3: vec![0.0; dim],
            k4: vec![0.0; dim],
            k5: vec![0.0; dim],
            k6: vec![0.0; dim],
            y_tmp: vec![0.0; dim],
            y_next: vec![0.0; dim],
            y_err: vec![0.0; dim],
        })
    }

    /// System dimension this stepper was built for
    pub fn dim(&self) -> usize {
        self.k1.len()
    }

    /// Error-control settings
    pub fn control(&self) -> &StepControl {
        &self.control
    }

    /// Advance `y` from `t_start` to `t_end`, taking as many internal trial
    /// steps as error control requires.
    ///
    /// `h_hint` seeds the first trial step; the returned value is the hint
    /// for the next call. `rhs(t, y, dydt)` must be a pure function of its
    /// arguments: it is re-evaluated at intermediate, possibly rejected
    /// trial points and must not cache anything across calls.
    pub fn advance<F>(
        &mut self,
        y: &mut [f64],
        t_start: f64,
        t_end: f64,
        h_hint: f64,
        mut rhs: F,
    ) -> Result<f64>
    where
        F: FnMut(f64, &[f64], &mut [f64]),
    {
        if y.len() != self.dim() {
            return Err(SolverError::Dimension {
                expected: self.dim(),
                actual: y.len(),
            });
        }
        if !(t_end >= t_start) {
            return Err(SolverError::BadInterval { t_start, t_end });
        }

        let span = t_end - t_start;
        if span == 0.0 {
            return Ok(h_hint);
        }

        let mut t = t_start;
        let mut h = if h_hint > 0.0 && h_hint.is_finite() {
            h_hint.min(span)
        } else {
            span
        };
        let mut hint = h;

        while t < t_end {
            // within roundoff of the interval end; a smaller step cannot move t
            if t_end - t <= f64::EPSILON * t_end.abs().max(1.0) {
                break;
            }
            // a trial step may not overshoot the interval end, but the
            // unclipped candidate is what seeds the next tick
            let mut h_step = h.min(t_end - t);
            let mut retries = 0u32;

            loop {
                let ratio = self.try_step(y, t, h_step, &mut rhs);

                if ratio <= 1.0 {
                    y.copy_from_slice(&self.y_next);
                    t += h_step;

                    let grow = if ratio > 0.0 {
                        (0.9 * ratio.powf(-0.2)).min(5.0)
                    } else {
                        5.0
                    };
                    h = (h_step * grow).max(self.control.h_min);
                    hint = h;
                    break;
                }

                retries += 1;
                if retries > self.control.max_retries {
                    log::warn!(
                        "error control not satisfied after {} retries at t={}",
                        retries - 1,
                        t
                    );
                    return Err(SolverError::divergence(t, h_step));
                }

                let shrink = (0.9 * ratio.powf(-0.25)).max(0.1);
                h_step *= shrink;
                if h_step < self.control.h_min {
                    log::warn!("step size collapsed below h_min at t={}", t);
                    return Err(SolverError::divergence(t, h_step));
                }
            }
        }

        Ok(hint)
    }

    /// Take one trial step of size `h` from `(t, y)`, filling `y_next` and
    /// `y_err`; returns the worst component-wise error ratio (<= 1 accepts).
    fn try_step<F>(&mut self, y: &[f64], t: f64, h: f64, rhs: &mut F) -> f64
    where
        F: FnMut(f64, &[f64], &mut [f64]),
    {
        let dim = y.len();

        rhs(t, y, &mut self.k1);

        for i in 0..dim {
            self.y_tmp[i] = y[i] + h * B21 * self.k1[i];
        }
        rhs(t + h / 4.0, &self.y_tmp, &mut self.k2);

        for i in 0..dim {
            self.y_tmp[i] = y[i] + h * (B31 * self.k1[i] + B32 * self.k2[i]);
        }
        rhs(t + 3.0 * h / 8.0, &self.y_tmp, &mut self.k3);

        for i in 0..dim {
            self.y_tmp[i] =
                y[i] + h * (B41 * self.k1[i] + B42 * self.k2[i] + B43 * self.k3[i]);
        }
        rhs(t + 12.0 * h / 13.0, &self.y_tmp, &mut self.k4);

        for i in 0..dim {
            self.y_tmp[i] = y[i]
                + h * (B51 * self.k1[i]
                    + B52 * self.k2[i]
                    + B53 * self.k3[i]
                    + B54 * self.k4[i]);
        }
        rhs(t + h, &self.y_tmp, &mut self.k5);

        for i in 0..dim {
            self.y_tmp[i] = y[i]
                + h * (B61 * self.k1[i]
                    + B62 * self.k2[i]
                    + B63 * self.k3[i]
                    + B64 * self.k4[i]
                    + B65 * self.k5[i]);
        }
        rhs(t + h / 2.0, &self.y_tmp, &mut self.k6);

        let mut ratio: f64 = 0.0;
        for i in 0..dim {
            self.y_next[i] = y[i]
                + h * (C1 * self.k1[i]
                    + C3 * self.k3[i]
                    + C4 * self.k4[i]
                    + C5 * self.k5[i]
                    + C6 * self.k6[i]);
            self.y_err[i] = h
                * (E1 * self.k1[i]
                    + E3 * self.k3[i]
                    + E4 * self.k4[i]
                    + E5 * self.k5[i]
                    + E6 * self.k6[i]);

            if !self.y_next[i].is_finite() {
                return f64::INFINITY;
            }

            let scale =
                self.control.eps_abs + self.control.eps_rel * y[i].abs().max(self.y_next[i].abs());
            let component = (self.y_err[i] / scale).abs();
            // NaN never compares greater, so a NaN error falls through to the
            // retry path via the caller's `ratio <= 1.0` check
            if component > ratio {
                ratio = component;
            }
        }
        ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_validation() {
        assert!(StepControl::new(1e-6, 1e-6).is_ok());
        assert!(StepControl::new(0.0, 1e-6).is_err());
        assert!(StepControl::new(1e-6, -1.0).is_err());
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut solver = Rkf45::new(2, StepControl::default()).unwrap();
        let mut y = [1.0];
        let result = solver.advance(&mut y, 0.0, 1.0, 0.1, |_, _, f| f[0] = 0.0);
        assert!(matches!(result, Err(SolverError::Dimension { .. })));
    }

    #[test]
    fn test_exponential_decay() {
        let mut solver = Rkf45::new(1, StepControl::default()).unwrap();
        let mut y = [1.0];
        solver
            .advance(&mut y, 0.0, 1.0, 0.1, |_, y, f| f[0] = -y[0])
            .unwrap();
        assert!((y[0] - (-1.0f64).exp()).abs() < 1e-5);
    }

    #[test]
    fn test_harmonic_oscillator_energy() {
        let mut solver = Rkf45::new(2, StepControl::default()).unwrap();
        let mut y = [1.0, 0.0];
        let mut hint = 0.01;
        for _ in 0..20 {
            hint = solver
                .advance(&mut y, 0.0, 0.1, hint, |_, y, f| {
                    f[0] = y[1];
                    f[1] = -y[0];
                })
                .unwrap();
        }
        let energy = y[0] * y[0] + y[1] * y[1];
        assert!((energy - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_hint_continuity() {
        let mut solver = Rkf45::new(1, StepControl::default()).unwrap();
        let mut y = [1.0];
        let hint1 = solver
            .advance(&mut y, 0.0, 0.1, 0.1, |_, y, f| f[0] = -y[0])
            .unwrap();
        let hint2 = solver
            .advance(&mut y, 0.0, 0.1, hint1, |_, y, f| f[0] = -y[0])
            .unwrap();
        assert!(hint1 > 0.0);
        assert!(hint2 > 0.0);
    }

    #[test]
    fn test_zero_interval_is_noop() {
        let mut solver = Rkf45::new(1, StepControl::default()).unwrap();
        let mut y = [2.0];
        let hint = solver
            .advance(&mut y, 1.0, 1.0, 0.05, |_, y, f| f[0] = -y[0])
            .unwrap();
        assert_eq!(y[0], 2.0);
        assert_eq!(hint, 0.05);
    }

    #[test]
    fn test_finite_time_blowup_diverges() {
        // dy/dt = y^2 from y(0)=1 escapes to infinity at t=1
        let mut solver = Rkf45::new(1, StepControl::default()).unwrap();
        let mut y = [1.0];
        let result = solver.advance(&mut y, 0.0, 2.0, 0.1, |_, y, f| f[0] = y[0] * y[0]);
        assert!(matches!(result, Err(SolverError::Divergence { .. })));
    }

    #[test]
    fn test_two_time_scale_system() {
        // fast component relaxes quickly, slow one barely moves
        let mut solver = Rkf45::new(2, StepControl::default()).unwrap();
        let mut y = [1.0, 1.0];
        solver
            .advance(&mut y, 0.0, 0.5, 0.1, |_, y, f| {
                f[0] = -100.0 * y[0];
                f[1] = -0.01 * y[1];
            })
            .unwrap();
        assert!(y[0].abs() < 1e-5);
        assert!((y[1] - (-0.005f64).exp()).abs() < 1e-6);
    }
}
