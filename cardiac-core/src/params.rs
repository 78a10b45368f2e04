//! Membrane model parameters and the periodic stimulus schedule.
//!
//! The 14 parameters follow the three-current minimal model ordering:
//! `[tv+, tv1-, tv2-, tw+, tw-, td, t0, tr, tsi, k, Vsic, Vc, Vv, J_exc]`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, config_err};

pub const NUM_PARAMS: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// Fast gate closing time constant (param 0).
    pub tau_v_plus: f64,
    /// Fast gate opening time constant below `v_v` (param 1).
    pub tau_v1_minus: f64,
    /// Fast gate opening time constant above `v_v` (param 2).
    pub tau_v2_minus: f64,
    /// Slow gate closing time constant (param 3).
    pub tau_w_plus: f64,
    /// Slow gate opening time constant (param 4).
    pub tau_w_minus: f64,
    /// Fast inward current time constant (param 5).
    pub tau_d: f64,
    /// Outward current time constant below threshold (param 6).
    pub tau_0: f64,
    /// Outward current time constant above threshold (param 7).
    pub tau_r: f64,
    /// Slow inward current time constant (param 8).
    pub tau_si: f64,
    /// Slow inward activation steepness (param 9).
    pub k: f64,
    /// Slow inward activation midpoint (param 10).
    pub v_si_c: f64,
    /// Excitation threshold, gate `p` (param 11).
    pub v_c: f64,
    /// Fast gate switching threshold, gate `q` (param 12).
    pub v_v: f64,
    /// Stimulus current amplitude (param 13).
    pub j_exc: f64,
}

impl ModelParameters {
    pub fn from_array(p: [f64; NUM_PARAMS]) -> ModelParameters {
        ModelParameters {
            tau_v_plus: p[0],
            tau_v1_minus: p[1],
            tau_v2_minus: p[2],
            tau_w_plus: p[3],
            tau_w_minus: p[4],
            tau_d: p[5],
            tau_0: p[6],
            tau_r: p[7],
            tau_si: p[8],
            k: p[9],
            v_si_c: p[10],
            v_c: p[11],
            v_v: p[12],
            j_exc: p[13],
        }
    }

    pub fn from_slice(p: &[f64]) -> Result<ModelParameters> {
        let arr: [f64; NUM_PARAMS] = match p.try_into() {
            Ok(a) => a,
            Err(_) => {
                return config_err(format!(
                    "expected {NUM_PARAMS} model parameters, got {}",
                    p.len()
                ));
            }
        };
        Ok(Self::from_array(arr))
    }

    pub fn to_array(&self) -> [f64; NUM_PARAMS] {
        [
            self.tau_v_plus,
            self.tau_v1_minus,
            self.tau_v2_minus,
            self.tau_w_plus,
            self.tau_w_minus,
            self.tau_d,
            self.tau_0,
            self.tau_r,
            self.tau_si,
            self.k,
            self.v_si_c,
            self.v_c,
            self.v_v,
            self.j_exc,
        ]
    }

    /// Every parameter must be finite and every time constant non-zero.
    pub fn validate(&self) -> Result<()> {
        let arr = self.to_array();
        if let Some(i) = arr.iter().position(|x| !x.is_finite()) {
            return config_err(format!("model parameter {i} is not finite"));
        }
        if let Some(i) = arr[..9].iter().position(|&x| x == 0.0) {
            return config_err(format!(
                "model parameter {i} is a time constant and must be non-zero"
            ));
        }
        Ok(())
    }
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self::from_array([
            3.33, 15.6, 5.0, 350.0, 80.0, 0.407, 9.0, 34.0, 26.5, 15.0, 0.45, 0.15, 0.04, 1.0,
        ])
    }
}

/// Periodic stimulus: `duration` of current every `period` time units.
///
/// `last_reset` is per-run simulation state. Each independent trajectory or
/// grid run owns its own `Stimulus`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stimulus {
    duration: f64,
    period: f64,
    last_reset: f64,
}

impl Stimulus {
    pub fn new(duration: f64, period: f64) -> Result<Stimulus> {
        Self::starting_at(duration, period, 0.0)
    }

    pub fn starting_at(duration: f64, period: f64, start: f64) -> Result<Stimulus> {
        if !(duration.is_finite() && duration >= 0.0) {
            return config_err(format!("stimulus duration must be >= 0, got {duration}"));
        }
        if !(period.is_finite() && period > 0.0) {
            return config_err(format!("stimulus period must be > 0, got {period}"));
        }
        if !start.is_finite() {
            return config_err("stimulus start time must be finite");
        }
        Ok(Stimulus {
            duration,
            period,
            last_reset: start,
        })
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn last_reset(&self) -> f64 {
        self.last_reset
    }

    /// Restart the timer, e.g. before reusing a schedule for a fresh run.
    pub fn reset_at(&mut self, t: f64) {
        self.last_reset = t;
    }

    /// Advance the timer to `t` and report whether the stimulus is on.
    ///
    /// The timer only moves forward: once `period` has elapsed since the
    /// last reset, the reset point jumps to `t`.
    pub fn drive(&mut self, t: f64) -> bool {
        if t - self.last_reset >= self.period {
            self.last_reset = t;
        }
        t - self.last_reset <= self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_roundtrip_keeps_ordering() {
        let p = ModelParameters::default();
        assert_eq!(p.to_array()[11], p.v_c);
        assert_eq!(p.to_array()[13], p.j_exc);
        assert_eq!(ModelParameters::from_array(p.to_array()), p);
    }

    #[test]
    fn zero_time_constant_is_rejected() {
        let mut p = ModelParameters::default();
        p.tau_d = 0.0;
        assert!(p.validate().is_err());
        assert!(ModelParameters::default().validate().is_ok());
    }

    #[test]
    fn wrong_parameter_count_is_rejected() {
        assert!(ModelParameters::from_slice(&[1.0; 13]).is_err());
        assert!(ModelParameters::from_slice(&[1.0; 14]).is_ok());
    }

    #[test]
    fn stimulus_window_and_reset() {
        let mut s = Stimulus::new(1.0, 10.0).unwrap();
        assert!(s.drive(0.0));
        assert!(s.drive(1.0));
        assert!(!s.drive(1.5));
        assert!(!s.drive(9.9));
        // reset fires at the period boundary and the window reopens
        assert!(s.drive(10.0));
        assert_eq!(s.last_reset(), 10.0);
        assert!(!s.drive(11.5));
    }

    #[test]
    fn invalid_period_is_rejected() {
        assert!(Stimulus::new(1.0, 0.0).is_err());
        assert!(Stimulus::new(-1.0, 10.0).is_err());
    }
}
