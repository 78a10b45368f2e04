//! Settings shared by the 1D cable and the 2D tissue steppers.

use serde::{Deserialize, Serialize};

use crate::error::{Result, config_err};

/// Largest stable `D * h / dx^2` for the 3-point stencil.
pub const STABILITY_LIMIT_1D: f64 = 0.5;
/// Largest stable `D * h / dx^2` for the isotropic 9-point stencil.
pub const STABILITY_LIMIT_2D: f64 = 0.375;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiffusionConfig {
    pub diffusion: f64,
    pub cell_size: f64,
    pub step_size: f64,
    pub initial_time: f64,
}

impl Default for DiffusionConfig {
    fn default() -> Self {
        DiffusionConfig {
            diffusion: 1.0,
            cell_size: 1.0,
            step_size: 0.05,
            initial_time: 0.0,
        }
    }
}

impl DiffusionConfig {
    /// `D * h / dx^2`
    pub fn diffusion_number(&self) -> f64 {
        self.diffusion * self.step_size / (self.cell_size * self.cell_size)
    }

    pub fn validate(&self, stability_limit: f64) -> Result<()> {
        if !(self.diffusion.is_finite() && self.diffusion >= 0.0) {
            return config_err(format!("diffusion must be >= 0, got {}", self.diffusion));
        }
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return config_err(format!("cell size must be > 0, got {}", self.cell_size));
        }
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return config_err(format!("step size must be > 0, got {}", self.step_size));
        }
        if !self.initial_time.is_finite() {
            return config_err("initial time must be finite");
        }
        let r = self.diffusion_number();
        if r > stability_limit {
            return config_err(format!(
                "diffusion number D*h/dx^2 = {r:.4} exceeds the explicit limit {stability_limit}"
            ));
        }
        Ok(())
    }
}
