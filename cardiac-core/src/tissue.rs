//! 2D reaction-diffusion tissue on a row-major grid.
//!
//! Cell `(x, y)` lives at `y * nx + x`. Voltage is coupled through an
//! isotropic 9-point Laplacian read from a snapshot taken at the start of
//! each frame, so the stencil never sees values written during the same
//! frame. The gates have no spatial coupling and advance at every cell,
//! boundary included; boundary voltages are copied from the nearest interior
//! cell after the frame (no-flux).

use tracing::debug;

use crate::error::{CardiacError, Result, config_err};
use crate::grid::{DiffusionConfig, STABILITY_LIMIT_2D};
use crate::integrator::Trajectory;
use crate::linalg::Matrix;
use crate::model::{DerivativeModel, State};
use crate::params::Stimulus;

#[derive(Debug, Clone)]
pub struct Tissue {
    nx: usize,
    ny: usize,
    voltage: Matrix,
    fast_gate: Matrix,
    slow_gate: Matrix,
    snapshot: Vec<f64>,
    excited_x: usize,
    excited_y: usize,
    cfg: DiffusionConfig,
    time: f64,
}

/// `(4 (N+S+E+W) + (NE+NW+SE+SW) - 20 c) / 6`, without the `1/dx^2` factor.
#[inline]
fn nine_point(f: &[f64], i: usize, nx: usize) -> f64 {
    let orth = f[i - nx] + f[i + nx] + f[i - 1] + f[i + 1];
    let diag = f[i - nx - 1] + f[i - nx + 1] + f[i + nx - 1] + f[i + nx + 1];
    (4.0 * orth + diag - 20.0 * f[i]) / 6.0
}

impl Tissue {
    /// The rectangle `[0, excited_x) x [0, excited_y)` receives the stimulus.
    pub fn new(
        nx: usize,
        ny: usize,
        excited_x: usize,
        excited_y: usize,
        initial: State,
        cfg: DiffusionConfig,
    ) -> Result<Tissue> {
        if nx < 3 || ny < 3 {
            return config_err(format!("tissue needs at least 3x3 cells, got {nx}x{ny}"));
        }
        if excited_x > nx || excited_y > ny {
            return config_err(format!(
                "excited region {excited_x}x{excited_y} does not fit in {nx}x{ny}"
            ));
        }
        if !initial.is_finite() {
            return config_err("initial state must be finite");
        }
        cfg.validate(STABILITY_LIMIT_2D)?;

        Ok(Tissue {
            nx,
            ny,
            voltage: Matrix::filled(ny, nx, initial.voltage)?,
            fast_gate: Matrix::filled(ny, nx, initial.fast_gate)?,
            slow_gate: Matrix::filled(ny, nx, initial.slow_gate)?,
            snapshot: vec![0.0; nx * ny],
            excited_x,
            excited_y,
            time: cfg.initial_time,
            cfg,
        })
    }

    // ---- Accessors ----
    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn config(&self) -> &DiffusionConfig {
        &self.cfg
    }

    pub fn excited_region(&self) -> (usize, usize) {
        (self.excited_x, self.excited_y)
    }

    pub fn voltage(&self) -> &Matrix {
        &self.voltage
    }

    pub fn fast_gate(&self) -> &Matrix {
        &self.fast_gate
    }

    pub fn slow_gate(&self) -> &Matrix {
        &self.slow_gate
    }

    pub fn state(&self, x: usize, y: usize) -> State {
        State::new(
            self.voltage.get(y, x),
            self.fast_gate.get(y, x),
            self.slow_gate.get(y, x),
        )
    }

    // ---- Initial conditions ----
    pub fn set_cell(&mut self, x: usize, y: usize, state: State) {
        if x >= self.nx || y >= self.ny {
            return;
        }
        self.voltage.set(y, x, state.voltage);
        self.fast_gate.set(y, x, state.fast_gate);
        self.slow_gate.set(y, x, state.slow_gate);
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

    // ---- Core: explicit frames ----

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
        debug!(frames, time = self.time, "tissue advanced");
        Ok(())
    }

    /// Like [`Tissue::step`], sampling the voltage at `(x, y)` probes
    /// before every frame.
    pub fn record<M: DerivativeModel>(
        &mut self,
        model: &M,
        params: &M::Params,
        stimulus: &mut Stimulus,
        frames: usize,
        probes: &[(usize, usize)],
    ) -> Result<Trajectory> {
        if frames == 0 {
            return config_err("frame count must be > 0");
        }
        if probes.is_empty() {
            return config_err("at least one probe cell is required");
        }
        if let Some(&(x, y)) = probes.iter().find(|&&(x, y)| x >= self.nx || y >= self.ny) {
            return config_err(format!("probe cell ({x}, {y}) is outside the tissue"));
        }
        model.validate(params)?;

        let mut out = Matrix::new(probes.len() + 1, frames)?;
        for f in 0..frames {
            out.set(0, f, self.time);
            for (k, &(x, y)) in probes.iter().enumerate() {
                out.set(k + 1, f, self.voltage.get(y, x));
            }
            self.frame(model, params, stimulus)?;
        }
        debug!(frames, probes = probes.len(), time = self.time, "tissue recorded");
        Trajectory::from_matrix(out)
    }

    // ---- Internal numeric routines ----
    fn frame<M: DerivativeModel>(
        &mut self,
        model: &M,
        params: &M::Params,
        stimulus: &mut Stimulus,
    ) -> Result<()> {
        let (nx, ny) = (self.nx, self.ny);
        let h = self.cfg.step_size;
        let c = self.cfg.diffusion / (self.cfg.cell_size * self.cfg.cell_size);

        self.snapshot.copy_from_slice(self.voltage.as_slice());

        let v_live = self.voltage.as_mut_slice();
        let fg = self.fast_gate.as_mut_slice();
        let sg = self.slow_gate.as_mut_slice();

        for y in 0..ny {
            let row = y * nx;
            for x in 0..nx {
                let i = row + x;
                let state = State::new(self.snapshot[i], fg[i], sg[i]);
                let excluded = !(x < self.excited_x && y < self.excited_y);
                let interior = x > 0 && y > 0 && x < nx - 1 && y < ny - 1;

                let mut d = model.evaluate(&state, params, stimulus, self.time, excluded);
                if interior {
                    d.voltage += c * nine_point(&self.snapshot, i, nx);
                }

                let next = state.advance(&d, h);
                if !next.is_finite() {
                    return Err(CardiacError::NumericDivergence {
                        time: self.time,
                        detail: format!("tissue cell ({x}, {y}) became non-finite"),
                    });
                }
                fg[i] = next.fast_gate;
                sg[i] = next.slow_gate;
                if interior {
                    v_live[i] = next.voltage;
                }
            }
        }

        self.apply_no_flux_bc();
        self.time += h;
        Ok(())
    }

    /// Copy voltage into every edge and corner cell from its nearest
    /// interior neighbour (corners take the diagonal one).
    fn apply_no_flux_bc(&mut self) {
        let (nx, ny) = (self.nx, self.ny);
        let interior = |x: usize, y: usize| (x.clamp(1, nx - 2), y.clamp(1, ny - 2));

        for x in 0..nx {
            for y in [0, ny - 1] {
                let (ix, iy) = interior(x, y);
                let v = self.voltage.get(iy, ix);
                self.voltage.set(y, x, v);
            }
        }
        for y in 1..(ny - 1) {
            for x in [0, nx - 1] {
                let (ix, iy) = interior(x, y);
                let v = self.voltage.get(iy, ix);
                self.voltage.set(y, x, v);
            }
        }
    }
}
