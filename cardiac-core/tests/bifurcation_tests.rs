//! Pacing-period sweeps on a single cell and on a cable.

use cardiac_core::{
    Abscissa, CableSweepConfig, CardiacError, ModelParameters, SweepConfig, ThreeCurrentModel,
    run_bifurcation_sweep, run_cable_bifurcation_sweep, run_cable_sweep_point, run_sweep_point,
};

fn short_sweep(num_points: usize) -> SweepConfig {
    SweepConfig {
        period_min: 250.0,
        period_max: 350.0,
        num_points,
        skip_pulses: 2,
        num_pulses: 3,
        ..Default::default()
    }
}

#[test]
fn one_point_sweep_matches_the_direct_pipeline() {
    let p = ModelParameters::default();
    let cfg = short_sweep(1);

    let diagram = run_bifurcation_sweep(&ThreeCurrentModel, &p, &cfg).unwrap();
    let direct = run_sweep_point(&ThreeCurrentModel, &p, &cfg, cfg.period_max).unwrap();

    assert_eq!(diagram.kind, Abscissa::DiastolicInterval);
    assert!(!direct.is_empty());
    assert_eq!(diagram.len(), direct.len());
    for (i, s) in direct.iter().enumerate() {
        assert_eq!(diagram.abscissa[i], s.abscissa);
        assert_eq!(diagram.apd[i], s.apd);
        assert_eq!(diagram.periods[i], cfg.period_max);
    }
}

#[test]
fn sweep_points_do_not_carry_state() {
    let p = ModelParameters::default();
    let cfg = short_sweep(3);

    let diagram = run_bifurcation_sweep(&ThreeCurrentModel, &p, &cfg).unwrap();
    // middle point of 350, 300, 250 computed on its own
    let alone = run_sweep_point(&ThreeCurrentModel, &p, &cfg, 300.0).unwrap();
    assert_eq!(diagram.samples_at(300.0), alone);
}

#[test]
fn samples_are_physical_at_slow_pacing() {
    let p = ModelParameters::default();
    let cfg = short_sweep(3);
    let diagram = run_bifurcation_sweep(&ThreeCurrentModel, &p, &cfg).unwrap();

    assert!(diagram.failures.is_empty());
    assert!(!diagram.is_empty());
    assert!(diagram.len() <= cfg.num_points * cfg.num_pulses);
    for i in 0..diagram.len() {
        let (di, apd, period) = (diagram.abscissa[i], diagram.apd[i], diagram.periods[i]);
        assert!(apd > 0.0 && apd < period, "apd {apd} at period {period}");
        assert!(di > 0.0, "di {di} at period {period}");
    }
}

#[test]
fn sweeps_are_reproducible() {
    let p = ModelParameters::default();
    let cfg = short_sweep(2);
    let a = run_bifurcation_sweep(&ThreeCurrentModel, &p, &cfg).unwrap();
    let b = run_bifurcation_sweep(&ThreeCurrentModel, &p, &cfg).unwrap();
    assert_eq!(a, b);
}

#[test]
fn invalid_sweeps_fail_before_running() {
    let p = ModelParameters::default();
    let cfg = SweepConfig {
        num_points: 0,
        ..short_sweep(1)
    };
    assert!(matches!(
        run_bifurcation_sweep(&ThreeCurrentModel, &p, &cfg),
        Err(CardiacError::Configuration(_))
    ));

    let cable = CableSweepConfig {
        cells: 20,
        probe: 20,
        ..Default::default()
    };
    assert!(matches!(
        run_cable_bifurcation_sweep(&ThreeCurrentModel, &p, &short_sweep(1), &cable),
        Err(CardiacError::Configuration(_))
    ));
}

#[test]
fn cable_sweep_reports_period_against_apd() {
    let p = ModelParameters::default();
    let cfg = SweepConfig {
        skip_pulses: 1,
        num_pulses: 2,
        num_points: 2,
        period_min: 300.0,
        period_max: 350.0,
        ..Default::default()
    };
    let cable = CableSweepConfig {
        cells: 30,
        excited_cells: 5,
        probe: 20,
        ..Default::default()
    };

    let diagram = run_cable_bifurcation_sweep(&ThreeCurrentModel, &p, &cfg, &cable).unwrap();
    assert_eq!(diagram.kind, Abscissa::Period);
    assert!(!diagram.is_empty());
    assert_eq!(diagram.abscissa, diagram.periods);
    assert!(diagram.apd.iter().zip(&diagram.periods).all(|(a, t)| *a > 0.0 && a < t));

    let direct = run_cable_sweep_point(&ThreeCurrentModel, &p, &cfg, &cable, 350.0).unwrap();
    assert_eq!(diagram.samples_at(350.0), direct);
}
