//! Run configuration, loadable from JSON.
//!
//! Any field missing from the file takes its default.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::bifurcation::{CableSweepConfig, SweepConfig};
use crate::error::{Result, config_err};
use crate::grid::DiffusionConfig;
use crate::model::State;
use crate::params::{ModelParameters, Stimulus};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusConfig {
    /// Current-on time per pulse.
    pub duration: f64,
    /// Pacing period.
    pub period: f64,
}

impl Default for StimulusConfig {
    fn default() -> Self {
        StimulusConfig {
            duration: 1.0,
            period: 300.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    pub step_size: f64,
    pub num_steps: usize,
    pub initial_time: f64,
    pub initial_state: State,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        IntegrationConfig {
            step_size: 0.05,
            num_steps: 30000,
            initial_time: 0.0,
            initial_state: State::new(0.0, 0.9, 0.9),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TissueConfig {
    pub cable_cells: usize,
    pub nx: usize,
    pub ny: usize,
    pub excited_x: usize,
    pub excited_y: usize,
    pub diffusion: f64,
    pub cell_size: f64,
}

impl Default for TissueConfig {
    fn default() -> Self {
        TissueConfig {
            cable_cells: 100,
            nx: 100,
            ny: 100,
            excited_x: 10,
            excited_y: 10,
            diffusion: 1.0,
            cell_size: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub params: ModelParameters,
    pub stimulus: StimulusConfig,
    pub integration: IntegrationConfig,
    pub tissue: TissueConfig,
    pub sweep: SweepConfig,
    pub cable_sweep: CableSweepConfig,
}

impl SimulationConfig {
    pub fn from_json_str(s: &str) -> Result<SimulationConfig> {
        let cfg: SimulationConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<SimulationConfig> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        self.stimulus()?;

        let integ = &self.integration;
        if !(integ.step_size.is_finite() && integ.step_size > 0.0) {
            return config_err(format!("step size must be > 0, got {}", integ.step_size));
        }
        if integ.num_steps == 0 {
            return config_err("num_steps must be > 0");
        }
        if !integ.initial_state.is_finite() || !integ.initial_time.is_finite() {
            return config_err("initial state and time must be finite");
        }

        let t = &self.tissue;
        if t.excited_x > t.nx || t.excited_y > t.ny {
            return config_err(format!(
                "excited region {}x{} does not fit in {}x{}",
                t.excited_x, t.excited_y, t.nx, t.ny
            ));
        }
        if t.excited_x > t.cable_cells {
            return config_err(format!(
                "excited region ({}) is longer than the cable ({})",
                t.excited_x, t.cable_cells
            ));
        }

        self.sweep.validate()
    }

    /// A fresh stimulus timer starting at the configured initial time.
    pub fn stimulus(&self) -> Result<Stimulus> {
        Stimulus::starting_at(
            self.stimulus.duration,
            self.stimulus.period,
            self.integration.initial_time,
        )
    }

    pub fn diffusion_config(&self) -> DiffusionConfig {
        DiffusionConfig {
            diffusion: self.tissue.diffusion,
            cell_size: self.tissue.cell_size,
            step_size: self.integration.step_size,
            initial_time: self.integration.initial_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg = SimulationConfig::from_json_str(
            r#"{ "stimulus": { "period": 250.0 }, "tissue": { "nx": 40 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.stimulus.period, 250.0);
        assert_eq!(cfg.stimulus.duration, 1.0);
        assert_eq!(cfg.tissue.nx, 40);
        assert_eq!(cfg.tissue.ny, 100);
        assert_eq!(cfg.params, ModelParameters::default());
    }

    #[test]
    fn invalid_json_values_are_rejected() {
        assert!(SimulationConfig::from_json_str(r#"{ "integration": { "step_size": 0.0 } }"#).is_err());
        assert!(SimulationConfig::from_json_str(r#"{ "stimulus": { "period": -1.0 } }"#).is_err());
        assert!(SimulationConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn json_roundtrip() {
        let cfg = SimulationConfig::default();
        let back = SimulationConfig::from_json_str(&cfg.to_json_pretty().unwrap()).unwrap();
        assert_eq!(back.tissue, cfg.tissue);
        assert_eq!(back.sweep.num_points, cfg.sweep.num_points);
        assert_eq!(back.sweep.threshold, None);
        assert!((back.params.tau_d - cfg.params.tau_d).abs() < 1e-12);
    }
}
