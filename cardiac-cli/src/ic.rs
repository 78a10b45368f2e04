use cardiac_core::State;
use clap::ValueEnum;
use rand::Rng;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum IcType {
    Rest,
    GateNoise,
    CrossField,
}

impl IcType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IcType::Rest => "rest",
            IcType::GateNoise => "gate_noise",
            IcType::CrossField => "cross_field",
        }
    }
}

pub fn sample_ic_type<R: Rng>(rng: &mut R) -> IcType {
    match rng.gen_range(0..3) {
        0 => IcType::Rest,
        1 => IcType::GateNoise,
        _ => IcType::CrossField,
    }
}

/// Initial tissue state, row-major `nx * ny`. Boundary cells are left for
/// the stepper to overwrite.
pub fn generate_ic<R: Rng>(rng: &mut R, nx: usize, ny: usize, ic: IcType, rest: State) -> Vec<State> {
    let mut f = vec![rest; nx * ny];

    match ic {
        IcType::Rest => {}

        IcType::GateNoise => {
            // smoothed gate recovery in [0.5, 1] of the resting value
            let mut fast: Vec<f64> = (0..nx * ny).map(|_| rng.gen_range(0.5..1.0)).collect();
            let mut slow: Vec<f64> = (0..nx * ny).map(|_| rng.gen_range(0.5..1.0)).collect();
            fast = box_blur(&fast, nx, ny, 2);
            slow = box_blur(&slow, nx, ny, 2);
            for (i, s) in f.iter_mut().enumerate() {
                s.fast_gate = rest.fast_gate * fast[i];
                s.slow_gate = rest.slow_gate * slow[i];
            }
        }

        IcType::CrossField => {
            // S1 band along the left edge, refractory block over the lower rows
            let band = rng.gen_range(3..=6).min(nx.saturating_sub(2)).max(1);
            let split = ((rng.gen_range(0.4..0.6) * ny as f64) as usize).clamp(1, ny - 1);
            let slow_block = rng.gen_range(0.3..0.6);

            for y in 0..ny {
                for x in 0..nx {
                    let s = &mut f[y * nx + x];
                    if x < band {
                        s.voltage = 1.0;
                        s.fast_gate = 0.0;
                    }
                    if y >= split {
                        s.fast_gate = 0.0;
                        s.slow_gate = slow_block;
                    }
                }
            }
        }
    }

    f
}

fn box_blur(src: &[f64], nx: usize, ny: usize, passes: usize) -> Vec<f64> {
    let mut cur = src.to_vec();
    let mut tmp = vec![0.0; nx * ny];

    for _ in 0..passes {
        for y in 0..ny {
            for x in 0..nx {
                let mut sum = 0.0;
                let mut cnt = 0.0;
                for yy in y.saturating_sub(1)..=(y + 1).min(ny - 1) {
                    for xx in x.saturating_sub(1)..=(x + 1).min(nx - 1) {
                        sum += cur[yy * nx + xx];
                        cnt += 1.0;
                    }
                }
                tmp[y * nx + x] = sum / cnt;
            }
        }
        std::mem::swap(&mut cur, &mut tmp);
    }
    cur
}
