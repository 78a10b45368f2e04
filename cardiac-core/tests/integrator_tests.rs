//! Single-cell Euler runs.

use cardiac_core::{
    CardiacError, DerivativeModel, ModelParameters, State, Stimulus, ThreeCurrentModel,
    run_single_cell,
};

fn scenario() -> (ModelParameters, Stimulus, State) {
    let p = ModelParameters::from_array([
        3.33, 15.6, 5.0, 350.0, 80.0, 0.407, 9.0, 34.0, 26.5, 15.0, 0.45, 0.15, 0.04, 1.0,
    ]);
    let s = Stimulus::new(1.0, 300.0).unwrap();
    (p, s, State::new(0.0, 0.9, 0.9))
}

#[test]
fn paced_cell_fires_within_first_period() {
    let (p, mut stim, y0) = scenario();
    let traj = run_single_cell(&ThreeCurrentModel, &p, &mut stim, 30000, 0.05, 0.0, y0).unwrap();

    assert_eq!(traj.len(), 30000);
    assert_eq!(traj.dim(), 3);
    let fired = traj
        .time()
        .iter()
        .zip(traj.voltage())
        .any(|(&t, &v)| t <= 300.0 && v > 0.9);
    assert!(fired, "no upstroke above 0.9 in the first 300 time units");
}

#[test]
fn every_column_obeys_the_euler_update() {
    let (p, mut stim, y0) = scenario();
    let h = 0.05;
    let traj = run_single_cell(&ThreeCurrentModel, &p, &mut stim, 4000, h, 0.0, y0).unwrap();

    let mut replay = Stimulus::new(1.0, 300.0).unwrap();
    for i in 0..traj.len() - 1 {
        let t = traj.time()[i];
        let s = traj.state_at(i).unwrap();
        let d = ThreeCurrentModel.evaluate(&s, &p, &mut replay, t, false);
        assert_eq!(traj.state_at(i + 1).unwrap(), s.advance(&d, h), "column {i}");
        assert_eq!(traj.time()[i + 1], t + h);
    }
}

#[test]
fn identical_inputs_are_bit_identical() {
    let (p, stim, y0) = scenario();
    let mut a = stim;
    let mut b = stim;
    let ta = run_single_cell(&ThreeCurrentModel, &p, &mut a, 8000, 0.05, 0.0, y0).unwrap();
    let tb = run_single_cell(&ThreeCurrentModel, &p, &mut b, 8000, 0.05, 0.0, y0).unwrap();
    assert_eq!(ta, tb);
    assert_eq!(a, b);
}

#[test]
fn timer_state_changes_the_run() {
    let (p, _, y0) = scenario();
    let mut fresh = Stimulus::new(1.0, 300.0).unwrap();
    // a timer mid-period: no pulse at t = 0
    let mut shifted = Stimulus::starting_at(1.0, 300.0, -150.0).unwrap();
    let a = run_single_cell(&ThreeCurrentModel, &p, &mut fresh, 200, 0.05, 0.0, y0).unwrap();
    let b = run_single_cell(&ThreeCurrentModel, &p, &mut shifted, 200, 0.05, 0.0, y0).unwrap();
    assert!(a.voltage().iter().any(|&v| v > 0.5));
    assert!(b.voltage().iter().all(|&v| v < 0.1));
}

#[test]
fn configuration_errors_fail_fast() {
    let (p, mut stim, y0) = scenario();
    let m = ThreeCurrentModel;
    assert!(matches!(
        run_single_cell(&m, &p, &mut stim, 0, 0.05, 0.0, y0),
        Err(CardiacError::Configuration(_))
    ));
    assert!(matches!(
        run_single_cell(&m, &p, &mut stim, 10, -0.05, 0.0, y0),
        Err(CardiacError::Configuration(_))
    ));

    let mut bad = p;
    bad.tau_r = 0.0;
    assert!(matches!(
        run_single_cell(&m, &bad, &mut stim, 10, 0.05, 0.0, y0),
        Err(CardiacError::Configuration(_))
    ));
}

#[test]
fn last_state_matches_final_column() {
    let (p, mut stim, y0) = scenario();
    let traj = run_single_cell(&ThreeCurrentModel, &p, &mut stim, 100, 0.05, 2.0, y0).unwrap();
    assert_eq!(traj.state_at(0), Some(y0));
    assert_eq!(traj.time()[0], 2.0);
    assert_eq!(traj.last_state(), traj.state_at(99));
    assert!((traj.last_time() - (2.0 + 99.0 * 0.05)).abs() < 1e-9);
}
