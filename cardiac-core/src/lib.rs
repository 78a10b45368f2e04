//! Excitable cardiac tissue: a three-variable membrane model integrated with
//! explicit Euler on a single cell, a 1D cable or a 2D sheet, plus
//! restitution extraction and pacing-period sweeps.

pub mod bifurcation;
pub mod cable;
pub mod config;
pub mod error;
pub mod grid;
pub mod integrator;
pub mod linalg;
pub mod model;
pub mod params;
pub mod restitution;
pub mod tissue;

pub use bifurcation::{
    Abscissa, BifurcationDiagram, CableSweepConfig, SweepConfig, SweepFailure,
    run_bifurcation_sweep, run_cable_bifurcation_sweep, run_cable_sweep_point, run_sweep_point,
};
pub use cable::Cable;
pub use config::SimulationConfig;
pub use error::{CardiacError, Result};
pub use grid::DiffusionConfig;
pub use integrator::{Trajectory, integrate_euler, run_single_cell};
pub use linalg::Matrix;
pub use model::{DerivativeModel, Derivatives, State, ThreeCurrentModel};
pub use params::{ModelParameters, Stimulus};
pub use restitution::{CrossingSequence, RestitutionSample, extract_restitution};
pub use tissue::Tissue;
