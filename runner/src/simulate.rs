use std::{ fs, path::PathBuf };
use anyhow::Context;
use clap::Parser;
use log::{ info, warn };
use serde::Deserialize;
use tdse::{
    params::ParameterSet,
    sim::{ Simulation, SimulationConfig, Snapshot, Tick },
};

#[derive(Parser, Debug)]
#[command(version, about = "Run a 1D TDSE simulation from a JSON setup file", long_about = None)]
struct Args {
    /// Setup file: `{"config": ..., "potential_parameters": ..., "wavefunction_parameters": ...}`
    #[arg(short, long, conflicts_with = "resume")]
    config: Option<PathBuf>,

    /// Resume from a snapshot written by an earlier run.
    #[arg(short, long)]
    resume: Option<PathBuf>,

    /// Number of ticks to run.
    #[arg(short, long, default_value_t = 100)]
    ticks: usize,

    /// Imaginary-time steps to take before running.
    #[arg(long, default_value_t = 0)]
    relax: usize,

    /// Where to write the final snapshot.
    #[arg(short, long, default_value = "output/snapshot.json")]
    output: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
struct Setup {
    #[serde(default)]
    config: SimulationConfig,
    #[serde(default)]
    potential_parameters: ParameterSet,
    #[serde(default)]
    wavefunction_parameters: ParameterSet,
}

fn load(args: &Args) -> anyhow::Result<Simulation> {
    if let Some(path) = &args.resume {
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading snapshot {}", path.display()))?;
        let sim = Simulation::from_snapshot(Snapshot::from_json(&json)?)?;
        info!("resumed from {} at t = {}", path.display(), sim.state().time);
        return Ok(sim);
    }
    let mut setup: Setup
        = match &args.config {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("reading setup {}", path.display()))?;
                serde_json::from_str(&json)
                    .with_context(|| format!("parsing setup {}", path.display()))?
            },
            None => Setup::default(),
        };
    setup.config.sync_parameters(
        &mut setup.potential_parameters, &mut setup.wavefunction_parameters);
    setup.potential_parameters.iter()
        .chain(setup.wavefunction_parameters.iter())
        .for_each(|p| info!("parameter {} = {}", p.name(), p.value()));
    let sim = Simulation::new(
        setup.config,
        setup.potential_parameters,
        setup.wavefunction_parameters,
    )?;
    Ok(sim)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut sim = load(&args)?;

    if args.relax > 0 {
        let energy = sim.relax(args.relax);
        println!("relaxed {} steps: E = {:.6}", args.relax, energy);
    }

    for n in 0..args.ticks {
        let tick = sim.tick();
        let solver = sim.solver();
        let state = sim.state();
        info!(
            "tick {}: t = {:.4}, norm = {:.12}, <x> = {:.4}, E = {:.6}",
            n,
            state.time,
            solver.total_probability(state),
            solver.position_mean(state),
            solver.energy(state),
        );
        if let Tick::BoundaryReached { .. } = tick {
            warn!("stopping after {} ticks: wavefunction reached the grid edge", n + 1);
            break;
        }
    }

    let solver = sim.solver();
    let state = sim.state();
    println!("t = {:.4}", state.time);
    println!("norm = {:.12}", solver.total_probability(state));
    println!("<x> = {:.6}", solver.position_mean(state));
    println!("<p> = {:.6}", solver.momentum_mean(state));
    println!("E = {:.6}", solver.energy(state));

    if let Some(dir) = args.output.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(&args.output, sim.snapshot().to_json()?)
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!("wrote {}", args.output.display());
    Ok(())
}
