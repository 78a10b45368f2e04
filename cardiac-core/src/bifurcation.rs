//! Restitution / bifurcation sweeps over the pacing period.
//!
//! Every sweep point starts from the configured initial state and stimulus
//! phase, paces for `skip_pulses + num_pulses` periods and keeps only the
//! pulses after the first `skip_pulses`. No state is carried from one point
//! to the next, so a point's samples do not depend on which other periods
//! were swept or in what order.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cable::Cable;
use crate::error::{Result, config_err};
use crate::grid::DiffusionConfig;
use crate::integrator::run_single_cell;
use crate::model::{DerivativeModel, State};
use crate::params::Stimulus;
use crate::restitution::{RestitutionSample, extract_restitution};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub period_min: f64,
    pub period_max: f64,
    pub num_points: usize,
    /// Pulses paced before samples are accepted.
    pub skip_pulses: usize,
    /// Pulses recorded after the skipped prefix.
    pub num_pulses: usize,
    pub stimulus_duration: f64,
    pub step_size: f64,
    pub initial_time: f64,
    pub initial_state: State,
    /// Crossing threshold; the model's excitation threshold when unset.
    pub threshold: Option<f64>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            period_min: 120.0,
            period_max: 350.0,
            num_points: 100,
            skip_pulses: 20,
            num_pulses: 5,
            stimulus_duration: 1.0,
            step_size: 0.05,
            initial_time: 0.0,
            initial_state: State::new(0.0, 0.9, 0.9),
            threshold: None,
        }
    }
}

impl SweepConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.period_min.is_finite() && self.period_min > 0.0) {
            return config_err(format!("period_min must be > 0, got {}", self.period_min));
        }
        if !(self.period_max.is_finite() && self.period_max >= self.period_min) {
            return config_err(format!(
                "period range [{}, {}] is empty",
                self.period_min, self.period_max
            ));
        }
        if self.num_points == 0 {
            return config_err("sweep needs at least one point");
        }
        if self.num_pulses == 0 {
            return config_err("num_pulses must be > 0");
        }
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return config_err(format!("step size must be > 0, got {}", self.step_size));
        }
        if !self.initial_state.is_finite() || !self.initial_time.is_finite() {
            return config_err("initial state and time must be finite");
        }
        if let Some(th) = self.threshold {
            if !th.is_finite() {
                return config_err("threshold must be finite");
            }
        }
        // duration checks are shared with the schedule itself
        Stimulus::new(self.stimulus_duration, self.period_min)?;
        Ok(())
    }

    /// Sweep periods from `period_max` down to `period_min`.
    pub fn periods(&self) -> Vec<f64> {
        if self.num_points == 1 {
            return vec![self.period_max];
        }
        let step = (self.period_max - self.period_min) / (self.num_points - 1) as f64;
        (0..self.num_points)
            .map(|i| self.period_max - i as f64 * step)
            .collect()
    }

    pub fn total_pulses(&self) -> usize {
        self.skip_pulses + self.num_pulses
    }

    /// Samples needed to cover every paced pulse at `period`.
    pub fn steps_for(&self, period: f64) -> usize {
        (self.total_pulses() as f64 * period / self.step_size).ceil() as usize + 1
    }

    fn threshold_for<M: DerivativeModel>(&self, model: &M, params: &M::Params) -> Result<f64> {
        match self.threshold.or_else(|| model.excitation_threshold(params)) {
            Some(th) => Ok(th),
            None => config_err("no crossing threshold configured and the model has none"),
        }
    }
}

/// Geometry of the cable used by the spatial sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CableSweepConfig {
    pub cells: usize,
    pub excited_cells: usize,
    /// Cell whose voltage trace feeds the extractor.
    pub probe: usize,
    pub diffusion: f64,
    pub cell_size: f64,
}

impl Default for CableSweepConfig {
    fn default() -> Self {
        CableSweepConfig {
            cells: 100,
            excited_cells: 10,
            probe: 50,
            diffusion: 1.0,
            cell_size: 1.0,
        }
    }
}

impl CableSweepConfig {
    fn diffusion_config(&self, sweep: &SweepConfig) -> DiffusionConfig {
        DiffusionConfig {
            diffusion: self.diffusion,
            cell_size: self.cell_size,
            step_size: sweep.step_size,
            initial_time: sweep.initial_time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Abscissa {
    DiastolicInterval,
    Period,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub period: f64,
    pub reason: String,
}

/// Samples accumulated over a sweep as parallel vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BifurcationDiagram {
    pub kind: Abscissa,
    /// Pacing period that produced each sample.
    pub periods: Vec<f64>,
    /// DI or period, per `kind`.
    pub abscissa: Vec<f64>,
    pub apd: Vec<f64>,
    pub failures: Vec<SweepFailure>,
}

impl BifurcationDiagram {
    pub fn new(kind: Abscissa) -> BifurcationDiagram {
        BifurcationDiagram {
            kind,
            periods: Vec::new(),
            abscissa: Vec::new(),
            apd: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.apd.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apd.is_empty()
    }

    pub fn push(&mut self, period: f64, sample: RestitutionSample) {
        self.periods.push(period);
        self.abscissa.push(sample.abscissa);
        self.apd.push(sample.apd);
    }

    /// Samples produced at `period`.
    pub fn samples_at(&self, period: f64) -> Vec<RestitutionSample> {
        self.periods
            .iter()
            .zip(self.abscissa.iter().zip(&self.apd))
            .filter(|(p, _)| **p == period)
            .map(|(_, (&abscissa, &apd))| RestitutionSample { abscissa, apd })
            .collect()
    }
}

// ---- Single-cell pipeline ----

/// One sweep point on a single cell: `(DI, APD)` samples at `period`.
pub fn run_sweep_point<M: DerivativeModel>(
    model: &M,
    params: &M::Params,
    cfg: &SweepConfig,
    period: f64,
) -> Result<Vec<RestitutionSample>> {
    let threshold = cfg.threshold_for(model, params)?;
    let mut stimulus = Stimulus::starting_at(cfg.stimulus_duration, period, cfg.initial_time)?;
    let traj = run_single_cell(
        model,
        params,
        &mut stimulus,
        cfg.steps_for(period),
        cfg.step_size,
        cfg.initial_time,
        cfg.initial_state,
    )?;
    let crossings =
        extract_restitution(traj.time(), traj.voltage(), cfg.total_pulses(), threshold)?;
    Ok(crossings.di_apd_pairs(cfg.skip_pulses))
}

/// Single-cell sweep producing `(DI, APD)` samples.
pub fn run_bifurcation_sweep<M: DerivativeModel>(
    model: &M,
    params: &M::Params,
    cfg: &SweepConfig,
) -> Result<BifurcationDiagram> {
    cfg.validate()?;
    model.validate(params)?;
    cfg.threshold_for(model, params)?;

    sweep(cfg, Abscissa::DiastolicInterval, |period| {
        run_sweep_point(model, params, cfg, period)
    })
}

// ---- Cable pipeline ----

/// One sweep point on a cable: `(period, APD)` samples at the probe cell.
pub fn run_cable_sweep_point<M: DerivativeModel>(
    model: &M,
    params: &M::Params,
    cfg: &SweepConfig,
    cable_cfg: &CableSweepConfig,
    period: f64,
) -> Result<Vec<RestitutionSample>> {
    let threshold = cfg.threshold_for(model, params)?;
    let mut stimulus = Stimulus::starting_at(cfg.stimulus_duration, period, cfg.initial_time)?;
    let mut cable = Cable::new(
        cable_cfg.cells,
        cable_cfg.excited_cells,
        cfg.initial_state,
        cable_cfg.diffusion_config(cfg),
    )?;
    let trace = cable.record(
        model,
        params,
        &mut stimulus,
        cfg.steps_for(period),
        &[cable_cfg.probe],
    )?;
    let crossings =
        extract_restitution(trace.time(), trace.voltage(), cfg.total_pulses(), threshold)?;
    Ok(crossings.period_apd_pairs(cfg.skip_pulses, period))
}

/// Cable sweep producing `(period, APD)` samples.
pub fn run_cable_bifurcation_sweep<M: DerivativeModel>(
    model: &M,
    params: &M::Params,
    cfg: &SweepConfig,
    cable_cfg: &CableSweepConfig,
) -> Result<BifurcationDiagram> {
    cfg.validate()?;
    model.validate(params)?;
    cfg.threshold_for(model, params)?;
    if cable_cfg.probe >= cable_cfg.cells {
        return config_err(format!(
            "probe cell {} is outside a cable of {} cells",
            cable_cfg.probe, cable_cfg.cells
        ));
    }
    // shape and stability checks happen here, before the first point
    Cable::new(
        cable_cfg.cells,
        cable_cfg.excited_cells,
        cfg.initial_state,
        cable_cfg.diffusion_config(cfg),
    )?;

    sweep(cfg, Abscissa::Period, |period| {
        run_cable_sweep_point(model, params, cfg, cable_cfg, period)
    })
}

fn sweep<F>(cfg: &SweepConfig, kind: Abscissa, mut point: F) -> Result<BifurcationDiagram>
where
    F: FnMut(f64) -> Result<Vec<RestitutionSample>>,
{
    let mut diagram = BifurcationDiagram::new(kind);

    for (idx, period) in cfg.periods().into_iter().enumerate() {
        match point(period) {
            Ok(samples) => {
                debug!(idx, period, samples = samples.len(), "sweep point done");
                for s in samples {
                    diagram.push(period, s);
                }
            }
            Err(e) => {
                warn!(idx, period, error = %e, "sweep point failed");
                diagram.failures.push(SweepFailure {
                    period,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        points = cfg.num_points,
        samples = diagram.len(),
        failures = diagram.failures.len(),
        "bifurcation sweep finished"
    );
    Ok(diagram)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periods_descend_and_cover_the_range() {
        let cfg = SweepConfig {
            period_min: 100.0,
            period_max: 300.0,
            num_points: 5,
            ..Default::default()
        };
        assert_eq!(cfg.periods(), vec![300.0, 250.0, 200.0, 150.0, 100.0]);
    }

    #[test]
    fn single_point_uses_period_max() {
        let cfg = SweepConfig {
            num_points: 1,
            ..Default::default()
        };
        assert_eq!(cfg.periods(), vec![cfg.period_max]);
    }

    #[test]
    fn steps_cover_all_pulses() {
        let cfg = SweepConfig {
            skip_pulses: 2,
            num_pulses: 3,
            step_size: 0.5,
            ..Default::default()
        };
        assert_eq!(cfg.steps_for(100.0), 1001);
    }

    #[test]
    fn empty_range_is_rejected() {
        let cfg = SweepConfig {
            period_min: 300.0,
            period_max: 200.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
        assert!(SweepConfig::default().validate().is_ok());
    }

    #[test]
    fn failures_do_not_stop_the_sweep() {
        let cfg = SweepConfig {
            num_points: 3,
            ..Default::default()
        };
        let d = sweep(&cfg, Abscissa::Period, |period| {
            if period == cfg.period_max {
                Err(crate::error::CardiacError::NumericDivergence {
                    time: 0.0,
                    detail: "test".into(),
                })
            } else {
                Ok(vec![RestitutionSample {
                    abscissa: period,
                    apd: 1.0,
                }])
            }
        })
        .unwrap();
        assert_eq!(d.failures.len(), 1);
        assert_eq!(d.failures[0].period, cfg.period_max);
        assert_eq!(d.len(), 2);
    }
}
