//! 1D reaction-diffusion cable.

use tracing::debug;

use crate::error::{CardiacError, Result, config_err};
use crate::grid::{DiffusionConfig, STABILITY_LIMIT_1D};
use crate::integrator::Trajectory;
use crate::linalg::Matrix;
use crate::model::{DerivativeModel, State};
use crate::params::Stimulus;

#[derive(Debug, Clone)]
pub struct Cable {
    voltage: Vec<f64>,
    fast_gate: Vec<f64>,
    slow_gate: Vec<f64>,
    snapshot: Vec<f64>,
    excited_cells: usize,
    cfg: DiffusionConfig,
    time: f64,
}

impl Cable {
    /// `excited_cells` leftmost cells receive the stimulus current.
    pub fn new(
        cells: usize,
        excited_cells: usize,
        initial: State,
        cfg: DiffusionConfig,
    ) -> Result<Cable> {
        if cells < 3 {
            return config_err(format!("cable needs at least 3 cells, got {cells}"));
        }
        if excited_cells > cells {
            return config_err(format!(
                "excited region ({excited_cells}) is longer than the cable ({cells})"
            ));
        }
        if !initial.is_finite() {
            return config_err("initial state must be finite");
        }
        cfg.validate(STABILITY_LIMIT_1D)?;

        Ok(Cable {
            voltage: vec![initial.voltage; cells],
            fast_gate: vec![initial.fast_gate; cells],
            slow_gate: vec![initial.slow_gate; cells],
            snapshot: vec![0.0; cells],
            excited_cells,
            time: cfg.initial_time,
            cfg,
        })
    }

    // ---- Accessors ----

    pub fn len(&self) -> usize {
        self.voltage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voltage.is_empty()
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn config(&self) -> &DiffusionConfig {
        &self.cfg
    }

    pub fn excited_cells(&self) -> usize {
        self.excited_cells
    }

    pub fn voltage(&self) -> &[f64] {
        &self.voltage
    }

    pub fn fast_gate(&self) -> &[f64] {
        &self.fast_gate
    }

    pub fn slow_gate(&self) -> &[f64] {
        &self.slow_gate
    }

    pub fn state(&self, i: usize) -> State {
        State::new(self.voltage[i], self.fast_gate[i], self.slow_gate[i])
    }

    /// Cell positions along the cable.
    pub fn positions(&self) -> Vec<f64> {
        (0..self.len()).map(|i| i as f64 * self.cfg.cell_size).collect()
    }

    // ---- Initial conditions ----

    pub fn set_cell(&mut self, i: usize, state: State) {
        if i >= self.len() {
            return;
        }
        self.voltage[i] = state.voltage;
        self.fast_gate[i] = state.fast_gate;
        self.slow_gate[i] = state.slow_gate;
    }

    pub fn finalize_ic(&mut self) {
        self.apply_no_flux_bc();
    }

    pub fn clear(&mut self, state: State) {
        self.voltage.fill(state.voltage);
        self.fast_gate.fill(state.fast_gate);
        self.slow_gate.fill(state.slow_gate);
        self.time = self.cfg.initial_time;
    }

    // ---- Time stepping ----

    /// Advance `frames` explicit steps in place.
    pub fn step<M: DerivativeModel>(
        &mut self,
        model: &M,
        params: &M::Params,
        stimulus: &mut Stimulus,
        frames: usize,
    ) -> Result<()> {
        if frames == 0 {
            return config_err("frame count must be > 0");
        }
        model.validate(params)?;
        for _ in 0..frames {
            self.frame(model, params, stimulus)?;
        }
        debug!(frames, time = self.time, "cable advanced");
        Ok(())
    }

    /// Advance `frames` steps, sampling time and probe voltages before each.
    ///
    /// Row 0 of the result is time, row `k + 1` the voltage of `probes[k]`.
    pub fn record<M: DerivativeModel>(
        &mut self,
        model: &M,
        params: &M::Params,
        stimulus: &mut Stimulus,
        frames: usize,
        probes: &[usize],
    ) -> Result<Trajectory> {
        if frames == 0 {
            return config_err("frame count must be > 0");
        }
        if probes.is_empty() {
            return config_err("at least one probe cell is required");
        }
        if let Some(&p) = probes.iter().find(|&&p| p >= self.len()) {
            return config_err(format!("probe cell {p} is outside the cable"));
        }
        model.validate(params)?;

        let mut out = Matrix::new(probes.len() + 1, frames)?;
        for f in 0..frames {
            out.set(0, f, self.time);
            for (k, &p) in probes.iter().enumerate() {
                out.set(k + 1, f, self.voltage[p]);
            }
            self.frame(model, params, stimulus)?;
        }
        debug!(frames, probes = probes.len(), time = self.time, "cable recorded");
        Trajectory::from_matrix(out)
    }

    // ---- Internal numeric routines ----

    fn frame<M: DerivativeModel>(
        &mut self,
        model: &M,
        params: &M::Params,
        stimulus: &mut Stimulus,
    ) -> Result<()> {
        let n = self.len();
        let h = self.cfg.step_size;
        let c = self.cfg.diffusion / (self.cfg.cell_size * self.cfg.cell_size);

        self.snapshot.copy_from_slice(&self.voltage);

        for i in 1..(n - 1) {
            let u = self.snapshot[i];
            let state = State::new(u, self.fast_gate[i], self.slow_gate[i]);
            let excluded = i >= self.excited_cells;

            let mut d = model.evaluate(&state, params, stimulus, self.time, excluded);
            let lap = self.snapshot[i + 1] - 2.0 * u + self.snapshot[i - 1];
            d.voltage += c * lap;

            let next = state.advance(&d, h);
            if !next.is_finite() {
                return Err(CardiacError::NumericDivergence {
                    time: self.time,
                    detail: format!("cable cell {i} became non-finite"),
                });
            }
            self.voltage[i] = next.voltage;
            self.fast_gate[i] = next.fast_gate;
            self.slow_gate[i] = next.slow_gate;
        }

        self.apply_no_flux_bc();
        self.time += h;
        Ok(())
    }

    fn apply_no_flux_bc(&mut self) {
        let n = self.len();
        for ch in [&mut self.voltage, &mut self.fast_gate, &mut self.slow_gate] {
            ch[0] = ch[1];
            ch[n - 1] = ch[n - 2];
        }
    }
}
