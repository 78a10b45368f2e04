//! Ionic membrane models.
//!
//! A model maps the membrane state plus the stimulus schedule to the time
//! derivatives of every channel. Integrators and grid steppers only see the
//! [`DerivativeModel`] trait, so another ionic model can be dropped in
//! without touching them.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::params::{ModelParameters, Stimulus};

/// Membrane state of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct State {
    /// Normalised transmembrane voltage.
    pub voltage: f64,
    /// Fast recovery gate `v`.
    pub fast_gate: f64,
    /// Slow recovery gate `w`.
    pub slow_gate: f64,
}

impl State {
    pub const DIM: usize = 3;

    pub fn new(voltage: f64, fast_gate: f64, slow_gate: f64) -> State {
        State {
            voltage,
            fast_gate,
            slow_gate,
        }
    }

    /// One explicit Euler step: `self + h * d`.
    #[inline]
    pub fn advance(&self, d: &Derivatives, h: f64) -> State {
        State {
            voltage: self.voltage + h * d.voltage,
            fast_gate: self.fast_gate + h * d.fast_gate,
            slow_gate: self.slow_gate + h * d.slow_gate,
        }
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.voltage, self.fast_gate, self.slow_gate]
    }

    /// Reads `y[0..3]`; callers guarantee the length.
    pub(crate) fn from_slice(y: &[f64]) -> State {
        State::new(y[0], y[1], y[2])
    }

    pub fn is_finite(&self) -> bool {
        self.voltage.is_finite() && self.fast_gate.is_finite() && self.slow_gate.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Derivatives {
    pub voltage: f64,
    pub fast_gate: f64,
    pub slow_gate: f64,
}

/// Pluggable right-hand side of the membrane ODE.
pub trait DerivativeModel {
    type Params;

    /// Evaluate the derivatives at time `t`.
    ///
    /// `stimulus` is advanced to `t` on every call, excluded or not, so the
    /// timer stays in step with the simulation clock. `excluded` only
    /// suppresses the stimulus current for this cell.
    fn evaluate(
        &self,
        state: &State,
        params: &Self::Params,
        stimulus: &mut Stimulus,
        t: f64,
        excluded: bool,
    ) -> Derivatives;

    /// Reject parameter sets the model cannot evaluate.
    fn validate(&self, _params: &Self::Params) -> Result<()> {
        Ok(())
    }

    /// Voltage that marks an activation, if the model defines one.
    fn excitation_threshold(&self, _params: &Self::Params) -> Option<f64> {
        None
    }
}

/// Three-current minimal ventricular model (fast inward, slow outward,
/// slow inward) with two threshold gates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreeCurrentModel;

impl ThreeCurrentModel {
    /// Derivatives without the stimulus current.
    pub fn membrane(&self, state: &State, p: &ModelParameters) -> Derivatives {
        let v_m = state.voltage;
        let v = state.fast_gate;
        let w = state.slow_gate;

        let slow_inward = w * (1.0 + (p.k * (v_m - p.v_si_c)).tanh()) / (2.0 * p.tau_si);

        if v_m >= p.v_c {
            Derivatives {
                voltage: v * (v_m - p.v_c) * (1.0 - v_m) / p.tau_d - 1.0 / p.tau_r + slow_inward,
                fast_gate: -v / p.tau_v_plus,
                slow_gate: -w / p.tau_w_plus,
            }
        } else {
            let tau_v_minus = if v_m >= p.v_v {
                p.tau_v2_minus
            } else {
                p.tau_v1_minus
            };
            Derivatives {
                voltage: -v_m / p.tau_0 + slow_inward,
                fast_gate: (1.0 - v) / tau_v_minus,
                slow_gate: (1.0 - w) / p.tau_w_minus,
            }
        }
    }
}

impl DerivativeModel for ThreeCurrentModel {
    type Params = ModelParameters;

    fn evaluate(
        &self,
        state: &State,
        params: &ModelParameters,
        stimulus: &mut Stimulus,
        t: f64,
        excluded: bool,
    ) -> Derivatives {
        let mut d = self.membrane(state, params);
        if stimulus.drive(t) && !excluded {
            d.voltage += params.j_exc;
        }
        d
    }

    fn validate(&self, params: &ModelParameters) -> Result<()> {
        params.validate()
    }

    fn excitation_threshold(&self, params: &ModelParameters) -> Option<f64> {
        Some(params.v_c)
    }
}
