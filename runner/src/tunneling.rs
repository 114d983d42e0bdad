use std::{ fs, path::PathBuf };
use ndarray as nd;
use serde::Serialize;
use tdse::{
    params::ParameterSet,
    potential::PotentialConfig,
    sim::{ Simulation, SimulationConfig, Tick },
    solver::SolverParams,
    wavefunction::WavefunctionConfig,
};

const V0: f64 = 5.0;
const WIDTH: f64 = 2.0;
const X0: f64 = -10.0;
const SIGMA: f64 = 2.0;
const TICKS: usize = 400;

#[derive(Debug, Serialize)]
struct Output {
    k0: Vec<f64>,
    energy: Vec<f64>,
    transmission: Vec<f64>,
    reflection: Vec<f64>,
    plane_wave: Vec<f64>,
}

// transmission coefficient for a plane wave of energy `e` incident on a
// rectangular barrier of height `v0` and width `a` (ħ = m = 1)
fn plane_wave_transmission(e: f64, v0: f64, a: f64) -> f64 {
    if (e - v0).abs() < 1e-12 {
        return 1.0 / (1.0 + v0 * a * a / 2.0);
    }
    let q = (2.0 * (e - v0).abs()).sqrt() * a;
    let s = if e < v0 { q.sinh() } else { q.sin() };
    1.0 / (1.0 + v0 * v0 * s * s / (4.0 * e * (e - v0).abs()))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let k0: nd::Array1<f64> = nd::Array1::linspace(2.0, 4.5, 11);
    let mut out = Output {
        k0: k0.to_vec(),
        energy: Vec::new(),
        transmission: Vec::new(),
        reflection: Vec::new(),
        plane_wave: Vec::new(),
    };
    for &k in k0.iter() {
        let config = SimulationConfig {
            solver: SolverParams {
                grid_size: 2048,
                x_min: -60.0,
                x_max: 60.0,
                dt: 0.005,
                ..SolverParams::default()
            },
            potential: PotentialConfig::Barrier { v0: V0, x0: 0.0, width: WIDTH },
            wavefunction: WavefunctionConfig::Gaussian { x0: X0, sigma: SIGMA, k0: k },
            steps_per_tick: 10,
            ..SimulationConfig::default()
        };
        let mut sim
            = Simulation::new(config, ParameterSet::new(), ParameterSet::new())?;
        let energy = sim.solver().energy(sim.state());
        // stop once the packet has cleared the barrier
        let t_max = 2.0 * X0.abs() / k;
        for _ in 0..TICKS {
            if let Tick::BoundaryReached { .. } = sim.tick() { break; }
            if sim.state().time > t_max { break; }
        }
        let solver = sim.solver();
        let state = sim.state();
        let trans = solver.region_probability(state, WIDTH / 2.0, f64::INFINITY);
        let refl = solver.region_probability(state, f64::NEG_INFINITY, -WIDTH / 2.0);
        let pw = plane_wave_transmission(k * k / 2.0, V0, WIDTH);
        println!(
            "k0 = {:.3}: E = {:.4}, T = {:.5}, R = {:.5}, T(plane wave) = {:.5}",
            k, energy, trans, refl, pw,
        );
        out.energy.push(energy);
        out.transmission.push(trans);
        out.reflection.push(refl);
        out.plane_wave.push(pw);
    }

    let outdir = PathBuf::from("output");
    fs::create_dir_all(&outdir)?;
    fs::write(outdir.join("tunneling.json"), serde_json::to_string_pretty(&out)?)?;
    Ok(())
}
