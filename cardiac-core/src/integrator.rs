//! Explicit Euler time integration for a single cell.
//!
//! Fixed-step forward Euler. Identical inputs give bit-identical
//! trajectories.

use crate::error::{CardiacError, Result, config_err};
use crate::linalg::Matrix;
use crate::model::{DerivativeModel, State};
use crate::params::Stimulus;

/// Base tolerance on the gap between the accumulated clock and `t0 + h * i`.
///
/// Summing `h` once per step loses up to one rounding per addition, so long
/// runs are checked against `steps * EPSILON * |t|` when that is larger.
pub const TIME_DRIFT_TOLERANCE: f64 = 1e-5;

/// A recorded run: row 0 holds time, rows `1..=dim` hold the state history.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    data: Matrix,
}

impl Trajectory {
    pub fn from_matrix(data: Matrix) -> Result<Trajectory> {
        if data.rows() < 2 {
            return config_err("a trajectory needs a time row and at least one state row");
        }
        Ok(Trajectory { data })
    }

    /// Number of recorded samples.
    pub fn len(&self) -> usize {
        self.data.cols()
    }

    pub fn is_empty(&self) -> bool {
        self.data.cols() == 0
    }

    /// State dimension (rows minus the time row).
    pub fn dim(&self) -> usize {
        self.data.rows() - 1
    }

    pub fn time(&self) -> &[f64] {
        self.data.row(0)
    }

    pub fn channel(&self, i: usize) -> &[f64] {
        self.data.row(i + 1)
    }

    pub fn voltage(&self) -> &[f64] {
        self.channel(0)
    }

    /// Membrane state at sample `col`. `None` unless the trajectory holds
    /// exactly the three membrane channels and `col` is in range.
    pub fn state_at(&self, col: usize) -> Option<State> {
        if self.dim() != State::DIM || col >= self.len() {
            return None;
        }
        Some(State::new(
            self.data.get(1, col),
            self.data.get(2, col),
            self.data.get(3, col),
        ))
    }

    pub fn last_state(&self) -> Option<State> {
        self.state_at(self.len().checked_sub(1)?)
    }

    pub fn last_time(&self) -> f64 {
        self.data.get(0, self.len() - 1)
    }

    pub fn as_matrix(&self) -> &Matrix {
        &self.data
    }

    pub fn into_matrix(self) -> Matrix {
        self.data
    }
}

fn validate_stepping(h: f64, steps: usize, t0: f64) -> Result<()> {
    if !(h.is_finite() && h > 0.0) {
        return config_err(format!("step size must be > 0, got {h}"));
    }
    if steps == 0 {
        return config_err("number of steps must be > 0");
    }
    if !t0.is_finite() {
        return config_err("initial time must be finite");
    }
    Ok(())
}

/// Forward Euler over an arbitrary state vector.
///
/// `f(t, y, dydt)` fills `dydt`. Column `i` of the result holds
/// `(t_i, y_i)` and `y_{i+1} = y_i + h * f(t_i, y_i)` for every recorded pair.
pub fn integrate_euler<F>(mut f: F, h: f64, steps: usize, t0: f64, y0: &[f64]) -> Result<Trajectory>
where
    F: FnMut(f64, &[f64], &mut [f64]),
{
    validate_stepping(h, steps, t0)?;
    if y0.is_empty() {
        return config_err("initial state vector is empty");
    }

    let dim = y0.len();
    let mut out = Matrix::new(dim + 1, steps)?;
    let mut y = y0.to_vec();
    let mut dydt = vec![0.0; dim];
    let mut t = t0;

    for i in 0..steps {
        out.set(0, i, t);
        for (k, &yk) in y.iter().enumerate() {
            out.set(k + 1, i, yk);
        }
        if i + 1 == steps {
            break;
        }

        f(t, &y, &mut dydt);
        for (yk, dk) in y.iter_mut().zip(&dydt) {
            *yk += h * dk;
        }
        t += h;

        if y.iter().any(|v| !v.is_finite()) {
            return Err(CardiacError::NumericDivergence {
                time: t,
                detail: format!("non-finite state after step {}", i + 1),
            });
        }
    }

    check_elapsed(t0, h, steps, t)?;
    Trajectory::from_matrix(out)
}

fn check_elapsed(t0: f64, h: f64, steps: usize, t_last: f64) -> Result<()> {
    let expected = t0 + h * (steps - 1) as f64;
    let tolerance = TIME_DRIFT_TOLERANCE.max(steps as f64 * f64::EPSILON * expected.abs());
    if (t_last - expected).abs() > tolerance {
        return Err(CardiacError::ConsistencyViolation(format!(
            "elapsed time drifted: reached {t_last}, expected {expected}"
        )));
    }
    Ok(())
}

/// Single-cell run of `model` for `steps` samples starting from `y0` at `t0`.
///
/// `stimulus` carries the run's timer and is left at its final position.
pub fn run_single_cell<M: DerivativeModel>(
    model: &M,
    params: &M::Params,
    stimulus: &mut Stimulus,
    steps: usize,
    h: f64,
    t0: f64,
    y0: State,
) -> Result<Trajectory> {
    model.validate(params)?;
    let traj = integrate_euler(
        |t, y, dydt| {
            let d = model.evaluate(&State::from_slice(y), params, stimulus, t, false);
            dydt[0] = d.voltage;
            dydt[1] = d.fast_gate;
            dydt[2] = d.slow_gate;
        },
        h,
        steps,
        t0,
        &y0.to_array(),
    )?;

    if traj.len() != steps {
        return Err(CardiacError::ConsistencyViolation(format!(
            "trajectory has {} columns, expected {steps}",
            traj.len()
        )));
    }
    Ok(traj)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_decay() {
        // dy/dt = -y, y(0) = 1: Euler gives (1 - h)^n
        let h = 0.01;
        let traj = integrate_euler(|_, y, d| d[0] = -y[0], h, 101, 0.0, &[1.0]).unwrap();
        let last = traj.channel(0)[100];
        assert!((last - (1.0f64 - h).powi(100)).abs() < 1e-12);
        assert!((last - (-1.0f64).exp()).abs() < 0.01);
        assert!((traj.last_time() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn long_runs_tolerate_accumulated_rounding() {
        // 4e6 steps of 0.05: summed clock lands ~1.07e-5 short of h * (n - 1)
        assert!(check_elapsed(0.0, 0.05, 4_000_000, 199999.9499893369).is_ok());
        assert!(check_elapsed(0.0, 0.05, 4_000_000, 199999.9).is_err());
        let err = check_elapsed(0.0, 0.05, 101, 5.0 + 2e-5).unwrap_err();
        assert!(matches!(err, CardiacError::ConsistencyViolation(_)));
    }

    #[test]
    fn state_accessors_need_three_channels() {
        let traj = integrate_euler(|_, y, d| d[0] = -y[0], 0.1, 5, 0.0, &[1.0]).unwrap();
        assert_eq!(traj.state_at(0), None);
        assert_eq!(traj.last_state(), None);

        let traj = integrate_euler(|_, _, d| d.fill(1.0), 0.1, 5, 0.0, &[0.0, 0.5, 0.5]).unwrap();
        assert_eq!(traj.state_at(5), None);
        let last = traj.last_state().unwrap();
        assert!((last.voltage - 0.4).abs() < 1e-12);
    }

    #[test]
    fn rejects_bad_stepping() {
        assert!(integrate_euler(|_, _, _| {}, 0.0, 10, 0.0, &[1.0]).is_err());
        assert!(integrate_euler(|_, _, _| {}, 0.1, 0, 0.0, &[1.0]).is_err());
        assert!(integrate_euler(|_, _, _| {}, 0.1, 10, 0.0, &[]).is_err());
    }

    #[test]
    fn divergence_is_reported() {
        let err = integrate_euler(|_, y, d| d[0] = y[0] * 1e300, 1.0, 10, 0.0, &[1e10])
            .unwrap_err();
        assert!(matches!(err, CardiacError::NumericDivergence { .. }));
    }
}
