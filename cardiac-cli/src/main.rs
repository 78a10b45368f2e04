//! Command-line driver for the cardiac simulator.
//!
//! Every command writes into `--out`: raw little-endian `f32` frames
//! (`*.bin`) plus one JSON object per line describing them (`*.jsonl`).

mod ic;

use anyhow::{Context, Result, bail};
use cardiac_core::{
    Abscissa, BifurcationDiagram, Cable, SimulationConfig, ThreeCurrentModel, Tissue,
    extract_restitution, run_bifurcation_sweep, run_cable_bifurcation_sweep, run_single_cell,
};
use clap::{Parser, Subcommand};
use ic::{IcType, generate_ic, sample_ic_type};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON configuration file; missing fields take defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(long, global = true, default_value = "out")]
    out: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pace one isolated cell and record its full state
    SingleCell {
        /// Pacing period
        #[arg(long)]
        period: Option<f64>,

        /// Number of samples
        #[arg(long)]
        steps: Option<usize>,

        /// Time step
        #[arg(long)]
        step_size: Option<f64>,
    },

    /// Sweep the pacing period and collect restitution samples
    Bifurcation {
        #[arg(long)]
        period_min: Option<f64>,

        #[arg(long)]
        period_max: Option<f64>,

        #[arg(long)]
        num_points: Option<usize>,

        /// Pulses paced before samples are kept
        #[arg(long)]
        skip: Option<usize>,

        /// Pulses recorded per point
        #[arg(long)]
        pulses: Option<usize>,

        /// Measure APD at a probe cell of a cable instead of a single cell
        #[arg(long)]
        cable: bool,
    },

    /// Propagate paced waves along a 1D cable
    Cable {
        #[arg(long)]
        cells: Option<usize>,

        /// Frames to simulate
        #[arg(long, default_value_t = 20000)]
        frames: usize,

        /// Write a voltage snapshot every N frames
        #[arg(long, default_value_t = 100)]
        every: usize,
    },

    /// Simulate a 2D tissue sheet
    Tissue {
        #[arg(long)]
        nx: Option<usize>,

        #[arg(long)]
        ny: Option<usize>,

        /// Frames to simulate
        #[arg(long, default_value_t = 20000)]
        frames: usize,

        /// Write a voltage snapshot every N frames
        #[arg(long, default_value_t = 200)]
        every: usize,

        /// Initial condition (sampled from the seed when omitted)
        #[arg(long, value_enum)]
        ic: Option<IcType>,

        /// RNG seed for the initial condition
        #[arg(long, default_value_t = 123)]
        seed: u64,
    },

    /// Print the effective configuration as JSON
    ShowConfig,
}

#[derive(Serialize)]
struct FrameRow {
    frame_idx: usize,
    snapshot_idx: usize,
    time: f64,
    nx: usize,
    ny: usize,
}

#[derive(Serialize)]
struct SampleRow<'a> {
    kind: &'a str,
    period: f64,
    abscissa: f64,
    apd: f64,
}

#[derive(Serialize)]
struct TissueRunRow {
    seed: u64,
    ic_type: String,
    nx: usize,
    ny: usize,
    excited_x: usize,
    excited_y: usize,
    diffusion: f64,
    cell_size: f64,
    step_size: f64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cfg = match &args.config {
        Some(path) => SimulationConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SimulationConfig::default(),
    };

    match args.command {
        Command::SingleCell {
            period,
            steps,
            step_size,
        } => {
            let mut cfg = cfg;
            if let Some(p) = period {
                cfg.stimulus.period = p;
            }
            if let Some(n) = steps {
                cfg.integration.num_steps = n;
            }
            if let Some(h) = step_size {
                cfg.integration.step_size = h;
            }
            cfg.validate()?;
            single_cell(&cfg, &args.out)
        }
        Command::Bifurcation {
            period_min,
            period_max,
            num_points,
            skip,
            pulses,
            cable,
        } => {
            let mut cfg = cfg;
            let sw = &mut cfg.sweep;
            sw.period_min = period_min.unwrap_or(sw.period_min);
            sw.period_max = period_max.unwrap_or(sw.period_max);
            sw.num_points = num_points.unwrap_or(sw.num_points);
            sw.skip_pulses = skip.unwrap_or(sw.skip_pulses);
            sw.num_pulses = pulses.unwrap_or(sw.num_pulses);
            cfg.validate()?;
            bifurcation(&cfg, cable, &args.out)
        }
        Command::Cable {
            cells,
            frames,
            every,
        } => {
            let mut cfg = cfg;
            if let Some(n) = cells {
                cfg.tissue.cable_cells = n;
            }
            cfg.validate()?;
            cable(&cfg, frames, every, &args.out)
        }
        Command::Tissue {
            nx,
            ny,
            frames,
            every,
            ic,
            seed,
        } => {
            let mut cfg = cfg;
            cfg.tissue.nx = nx.unwrap_or(cfg.tissue.nx);
            cfg.tissue.ny = ny.unwrap_or(cfg.tissue.ny);
            cfg.validate()?;
            tissue(&cfg, frames, every, ic, seed, &args.out)
        }
        Command::ShowConfig => {
            println!("{}", cfg.to_json_pretty()?);
            Ok(())
        }
    }
}

// ---- Commands ----

fn single_cell(cfg: &SimulationConfig, out: &Path) -> Result<()> {
    let model = ThreeCurrentModel;
    let integ = &cfg.integration;
    let mut stimulus = cfg.stimulus()?;

    let traj = run_single_cell(
        &model,
        &cfg.params,
        &mut stimulus,
        integ.num_steps,
        integ.step_size,
        integ.initial_time,
        integ.initial_state,
    )?;

    fs::create_dir_all(out)?;

    // column-major: (t, V, v, w) per sample
    let mut traj_writer = BufWriter::new(File::create(out.join("trajectory.bin"))?);
    for col in 0..traj.len() {
        let s = traj
            .state_at(col)
            .context("single-cell trajectory is missing membrane channels")?;
        write_f32_vec(
            &mut traj_writer,
            &[traj.time()[col] as f32, s.voltage as f32, s.fast_gate as f32, s.slow_gate as f32],
        )?;
    }
    traj_writer.flush()?;

    let pulses = (traj.last_time() - integ.initial_time) / cfg.stimulus.period;
    let crossings = extract_restitution(
        traj.time(),
        traj.voltage(),
        pulses.ceil() as usize + 1,
        cfg.params.v_c,
    )?;

    let mut samples = jsonl_writer(&out.join("restitution.jsonl"))?;
    for s in crossings.di_apd_pairs(0) {
        write_row(
            &mut samples,
            &SampleRow {
                kind: "di",
                period: cfg.stimulus.period,
                abscissa: s.abscissa,
                apd: s.apd,
            },
        )?;
    }
    samples.flush()?;

    println!("Wrote single-cell run to: {}", out.display());
    println!(
        "Samples: {} (t_end={:.3}, action potentials={})",
        traj.len(),
        traj.last_time(),
        crossings.complete_pulses()
    );
    Ok(())
}

fn bifurcation(cfg: &SimulationConfig, use_cable: bool, out: &Path) -> Result<()> {
    let model = ThreeCurrentModel;
    let diagram = if use_cable {
        run_cable_bifurcation_sweep(&model, &cfg.params, &cfg.sweep, &cfg.cable_sweep)?
    } else {
        run_bifurcation_sweep(&model, &cfg.params, &cfg.sweep)?
    };

    fs::create_dir_all(out)?;
    write_diagram(&diagram, out)?;

    println!("Wrote bifurcation diagram to: {}", out.display());
    println!(
        "Samples: {} over {} periods ({} failed)",
        diagram.len(),
        cfg.sweep.num_points,
        diagram.failures.len()
    );
    Ok(())
}

fn cable(cfg: &SimulationConfig, frames: usize, every: usize, out: &Path) -> Result<()> {
    if every == 0 || frames == 0 {
        bail!("frames and every must be > 0");
    }
    let model = ThreeCurrentModel;
    let mut stimulus = cfg.stimulus()?;
    let mut cable = Cable::new(
        cfg.tissue.cable_cells,
        cfg.tissue.excited_x,
        cfg.integration.initial_state,
        cfg.diffusion_config(),
    )?;

    fs::create_dir_all(out)?;
    let mut frame_writer = BufWriter::new(File::create(out.join("voltage.bin"))?);
    let mut meta = jsonl_writer(&out.join("meta.jsonl"))?;

    let mut done = 0;
    let mut snapshot_idx = 0;
    while done < frames {
        let field: Vec<f32> = cable.voltage().iter().map(|&v| v as f32).collect();
        write_f32_vec(&mut frame_writer, &field)?;
        write_row(
            &mut meta,
            &FrameRow {
                frame_idx: done,
                snapshot_idx,
                time: cable.time(),
                nx: cable.len(),
                ny: 1,
            },
        )?;
        snapshot_idx += 1;

        let batch = every.min(frames - done);
        cable.step(&model, &cfg.params, &mut stimulus, batch)?;
        done += batch;
    }

    frame_writer.flush()?;
    meta.flush()?;

    println!("Wrote cable run to: {}", out.display());
    println!(
        "Snapshots: {} (cells={}, frames={})",
        snapshot_idx,
        cable.len(),
        frames
    );
    Ok(())
}

fn tissue(
    cfg: &SimulationConfig,
    frames: usize,
    every: usize,
    ic: Option<IcType>,
    seed: u64,
    out: &Path,
) -> Result<()> {
    if every == 0 || frames == 0 {
        bail!("frames and every must be > 0");
    }
    let model = ThreeCurrentModel;
    let t = &cfg.tissue;
    let mut stimulus = cfg.stimulus()?;
    let mut tissue = Tissue::new(
        t.nx,
        t.ny,
        t.excited_x,
        t.excited_y,
        cfg.integration.initial_state,
        cfg.diffusion_config(),
    )?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let ic_t = ic.unwrap_or_else(|| sample_ic_type(&mut rng));
    let field = generate_ic(&mut rng, t.nx, t.ny, ic_t, cfg.integration.initial_state);
    for y in 0..t.ny {
        for x in 0..t.nx {
            tissue.set_cell(x, y, field[y * t.nx + x]);
        }
    }
    tissue.finalize_ic();
    info!(ic = ic_t.as_str(), seed, nx = t.nx, ny = t.ny, "tissue initialised");

    fs::create_dir_all(out)?;
    let mut frame_writer = BufWriter::new(File::create(out.join("voltage.bin"))?);
    let mut meta = jsonl_writer(&out.join("meta.jsonl"))?;

    let run = TissueRunRow {
        seed,
        ic_type: ic_t.as_str().to_string(),
        nx: t.nx,
        ny: t.ny,
        excited_x: t.excited_x,
        excited_y: t.excited_y,
        diffusion: t.diffusion,
        cell_size: t.cell_size,
        step_size: cfg.integration.step_size,
    };
    fs::write(out.join("run.json"), serde_json::to_string_pretty(&run)?)?;

    let mut done = 0;
    let mut snapshot_idx = 0;
    while done < frames {
        let field: Vec<f32> = tissue.voltage().as_slice().iter().map(|&v| v as f32).collect();
        write_f32_vec(&mut frame_writer, &field)?;
        write_row(
            &mut meta,
            &FrameRow {
                frame_idx: done,
                snapshot_idx,
                time: tissue.time(),
                nx: t.nx,
                ny: t.ny,
            },
        )?;
        snapshot_idx += 1;

        let batch = every.min(frames - done);
        tissue.step(&model, &cfg.params, &mut stimulus, batch)?;
        done += batch;
    }

    frame_writer.flush()?;
    meta.flush()?;

    println!("Wrote tissue run to: {}", out.display());
    println!(
        "Snapshots: {} ({}x{}, ic={}, frames={})",
        snapshot_idx,
        t.nx,
        t.ny,
        ic_t.as_str(),
        frames
    );
    Ok(())
}

// ---- Output helpers ----

fn write_diagram(diagram: &BifurcationDiagram, out: &Path) -> Result<()> {
    let kind = match diagram.kind {
        Abscissa::DiastolicInterval => "di",
        Abscissa::Period => "period",
    };

    let mut samples = jsonl_writer(&out.join("samples.jsonl"))?;
    for i in 0..diagram.len() {
        write_row(
            &mut samples,
            &SampleRow {
                kind,
                period: diagram.periods[i],
                abscissa: diagram.abscissa[i],
                apd: diagram.apd[i],
            },
        )?;
    }
    samples.flush()?;

    let mut failures = jsonl_writer(&out.join("failures.jsonl"))?;
    for f in &diagram.failures {
        write_row(&mut failures, f)?;
    }
    failures.flush()?;
    Ok(())
}

fn jsonl_writer(path: &Path) -> Result<BufWriter<File>> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn write_row<W: Write, T: Serialize>(w: &mut W, row: &T) -> Result<()> {
    serde_json::to_writer(&mut *w, row)?;
    w.write_all(b"\n")?;
    Ok(())
}

fn write_f32_vec<W: Write>(w: &mut W, v: &[f32]) -> std::io::Result<()> {
    for &x in v {
        w.write_all(&x.to_le_bytes())?;
    }
    Ok(())
}
