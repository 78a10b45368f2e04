//! 1D cable and 2D tissue steppers with the full membrane model.

use cardiac_core::{
    Cable, DiffusionConfig, ModelParameters, State, Stimulus, ThreeCurrentModel, Tissue,
    extract_restitution,
};

fn rest() -> State {
    State::new(0.0, 0.9, 0.9)
}

fn stim() -> Stimulus {
    Stimulus::new(1.0, 300.0).unwrap()
}

#[test]
fn cable_edges_mirror_interior_after_every_frame() {
    let p = ModelParameters::default();
    let mut stim = stim();
    let mut cable = Cable::new(40, 10, rest(), DiffusionConfig::default()).unwrap();
    let n = cable.len();

    for _ in 0..600 {
        cable.step(&ThreeCurrentModel, &p, &mut stim, 1).unwrap();
        let v = cable.voltage();
        assert!((v[0] - v[1]).abs() < 1e-15);
        assert!((v[n - 1] - v[n - 2]).abs() < 1e-15);
        assert_eq!(cable.fast_gate()[0], cable.fast_gate()[1]);
        assert_eq!(cable.slow_gate()[n - 1], cable.slow_gate()[n - 2]);
    }
    assert!((cable.time() - 30.0).abs() < 1e-9);
}

#[test]
fn wavefront_travels_down_the_cable() {
    let p = ModelParameters::default();
    // a single pulse: the next one is far beyond the recorded window
    let mut stim = Stimulus::new(1.0, 5000.0).unwrap();
    let mut cable = Cable::new(250, 10, rest(), DiffusionConfig::default()).unwrap();

    let probes: Vec<usize> = (12..250).step_by(5).collect();
    let frames = (600.0 / cable.config().step_size) as usize;
    let trace = cable
        .record(&ThreeCurrentModel, &p, &mut stim, frames, &probes)
        .unwrap();

    let mut last = f64::NEG_INFINITY;
    for (k, &cell) in probes.iter().enumerate() {
        let crossings = extract_restitution(trace.time(), trace.channel(k), 1, p.v_c).unwrap();
        assert!(!crossings.is_empty(), "cell {cell} never activated");
        let t = crossings.times()[0];
        assert!(t > last, "cell {cell} activated at {t}, before its left neighbour ({last})");
        last = t;
    }
}

#[test]
fn unstimulated_cable_stays_at_rest() {
    let p = ModelParameters::default();
    let mut stim = stim();
    let mut cable = Cable::new(30, 0, rest(), DiffusionConfig::default()).unwrap();
    cable.step(&ThreeCurrentModel, &p, &mut stim, 2000).unwrap();
    assert!(cable.voltage().iter().all(|&v| v.abs() < 0.05));
}

#[test]
fn tissue_edges_mirror_interior_after_every_frame() {
    let p = ModelParameters::default();
    let mut stim = stim();
    let mut tissue = Tissue::new(20, 15, 5, 5, rest(), DiffusionConfig::default()).unwrap();
    let (nx, ny) = (tissue.nx(), tissue.ny());

    for _ in 0..400 {
        tissue.step(&ThreeCurrentModel, &p, &mut stim, 1).unwrap();
        let v = tissue.voltage();
        for x in 0..nx {
            let ix = x.clamp(1, nx - 2);
            assert!((v.get(0, x) - v.get(1, ix)).abs() < 1e-15);
            assert!((v.get(ny - 1, x) - v.get(ny - 2, ix)).abs() < 1e-15);
        }
        for y in 0..ny {
            let iy = y.clamp(1, ny - 2);
            assert!((v.get(y, 0) - v.get(iy, 1)).abs() < 1e-15);
            assert!((v.get(y, nx - 1) - v.get(iy, nx - 2)).abs() < 1e-15);
        }
    }
}

#[test]
fn square_tissue_stays_symmetric_about_the_diagonal() {
    let p = ModelParameters::default();
    let mut stim = stim();
    let mut tissue = Tissue::new(24, 24, 6, 6, rest(), DiffusionConfig::default()).unwrap();
    tissue.step(&ThreeCurrentModel, &p, &mut stim, 400).unwrap();

    let v = tissue.voltage();
    for y in 0..24 {
        for x in 0..24 {
            assert!((v.get(y, x) - v.get(x, y)).abs() < 1e-9, "asymmetry at ({x}, {y})");
        }
    }
}

#[test]
fn tissue_wave_spreads_from_the_stimulated_corner() {
    let p = ModelParameters::default();
    let mut stim = stim();
    let mut tissue = Tissue::new(40, 40, 6, 6, rest(), DiffusionConfig::default()).unwrap();

    let probes: Vec<(usize, usize)> = (8..38).step_by(6).map(|i| (i, i)).collect();
    let trace = tissue
        .record(&ThreeCurrentModel, &p, &mut stim, 3000, &probes)
        .unwrap();

    let mut last = f64::NEG_INFINITY;
    for k in 0..probes.len() {
        let c = extract_restitution(trace.time(), trace.channel(k), 1, p.v_c).unwrap();
        assert!(!c.is_empty(), "probe {:?} never activated", probes[k]);
        assert!(c.times()[0] > last);
        last = c.times()[0];
    }
}

#[test]
fn identical_grids_evolve_identically() {
    let p = ModelParameters::default();
    let mut a = Tissue::new(12, 10, 3, 3, rest(), DiffusionConfig::default()).unwrap();
    let mut b = a.clone();
    let mut sa = stim();
    let mut sb = stim();
    a.step(&ThreeCurrentModel, &p, &mut sa, 300).unwrap();
    b.step(&ThreeCurrentModel, &p, &mut sb, 300).unwrap();
    assert_eq!(a.voltage(), b.voltage());
    assert_eq!(a.slow_gate(), b.slow_gate());
}
