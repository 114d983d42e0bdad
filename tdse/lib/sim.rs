//! Configuration records, a driver tying the pieces together, and
//! JSON-serializable snapshots.
//!
//! [`Simulation`] follows the usual order of operations: custom expressions
//! are validated, the solver is built, the potential is generated and
//! installed, and the initial state is sampled. [`Snapshot`] captures enough
//! to rebuild all of that and resume from the captured state exactly.

use log::{ debug, info };
use ndarray as nd;
use serde::{ Deserialize, Serialize };
use crate::{
    diagnostics::DEFAULT_BOUNDARY_THRESHOLD,
    error::{ DimensionError, SimError },
    params::ParameterSet,
    potential::{ self, PotentialConfig },
    solver::{ SolverParams, SpectralSolver },
    wavefunction::{ self, WavefunctionConfig, WavefunctionState },
};

pub type SimResult<T> = Result<T, SimError>;

fn default_steps_per_tick() -> usize { 10 }

fn default_boundary_threshold() -> f64 { DEFAULT_BOUNDARY_THRESHOLD }

/// Everything needed to set up a run, apart from parameter values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub solver: SolverParams,
    #[serde(default)]
    pub potential: PotentialConfig,
    #[serde(default)]
    pub wavefunction: WavefunctionConfig,
    /// Number of solver steps per call to [`Simulation::tick`].
    #[serde(default = "default_steps_per_tick")]
    pub steps_per_tick: usize,
    /// Edge density sum above which [`Simulation::tick`] stops early.
    #[serde(default = "default_boundary_threshold")]
    pub boundary_threshold: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            solver: SolverParams::default(),
            potential: PotentialConfig::default(),
            wavefunction: WavefunctionConfig::default(),
            steps_per_tick: default_steps_per_tick(),
            boundary_threshold: default_boundary_threshold(),
        }
    }
}

impl SimulationConfig {
    pub fn from_json(s: &str) -> SimResult<Self> { Ok(serde_json::from_str(s)?) }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Bring both parameter sets in line with the custom expressions in this
    /// configuration, adding suggested parameters for new names.
    ///
    /// Sets belonging to preset shapes are left alone.
    pub fn sync_parameters(
        &self,
        potential_params: &mut ParameterSet,
        wavefunction_params: &mut ParameterSet,
    ) {
        if let Some(expr) = self.potential.expression() {
            potential_params.sync([expr]);
        }
        if let Some((re, im)) = self.wavefunction.expressions() {
            wavefunction_params.sync([re, im]);
        }
    }
}

/// Outcome of a [`Simulation::tick`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tick {
    /// All requested steps were taken.
    Continue { steps: usize },
    /// Probability reached the grid edges; `steps` were taken before
    /// stopping. Further evolution would be corrupted by wrap-around.
    BoundaryReached { steps: usize },
}

impl Tick {
    pub fn steps(&self) -> usize {
        match self {
            Self::Continue { steps } | Self::BoundaryReached { steps } => *steps,
        }
    }
}

/// A configured solver together with its potential, state, and parameters.
#[derive(Clone, Debug)]
pub struct Simulation {
    config: SimulationConfig,
    potential_params: ParameterSet,
    wavefunction_params: ParameterSet,
    solver: SpectralSolver,
    state: WavefunctionState,
}

// reject bad preset numbers and custom expressions that cannot be evaluated
// before anything is built
fn validate_config(
    config: &SimulationConfig,
    potential_params: &ParameterSet,
    wavefunction_params: &ParameterSet,
) -> SimResult<()>
{
    config.potential.check()?;
    config.wavefunction.check()?;
    if let Some(expr) = config.potential.expression() {
        potential::validate(expr, potential_params)?;
    }
    if let Some((re, im)) = config.wavefunction.expressions() {
        wavefunction::validate(re, im, wavefunction_params)?;
    }
    Ok(())
}

// construct the solver and install the potential described by `config`
fn build_solver(config: &SimulationConfig, potential_params: &ParameterSet)
    -> SimResult<SpectralSolver>
{
    let mut solver = SpectralSolver::new(config.solver)?;
    let V = potential::generate(
        solver.grid().x(), &config.potential, solver.mass(), potential_params)?;
    solver.set_potential(&V)?;
    Ok(solver)
}

impl Simulation {
    /// Validate, build, and initialize.
    pub fn new(
        config: SimulationConfig,
        potential_params: ParameterSet,
        wavefunction_params: ParameterSet,
    ) -> SimResult<Self>
    {
        validate_config(&config, &potential_params, &wavefunction_params)?;
        let solver = build_solver(&config, &potential_params)?;
        let state = wavefunction::initialize(
            solver.grid(), &config.wavefunction, &wavefunction_params);
        info!(
            "simulation ready: N = {}, E = {:.6}",
            solver.len(), solver.energy(&state),
        );
        Ok(Self { config, potential_params, wavefunction_params, solver, state })
    }

    /// Take up to `steps_per_tick` steps, stopping early if probability
    /// reaches the grid edges.
    pub fn tick(&mut self) -> Tick {
        let threshold = self.config.boundary_threshold;
        for steps in 1..=self.config.steps_per_tick {
            self.solver.step(&mut self.state);
            if self.solver.check_boundaries(&self.state, threshold) {
                info!("boundary reached at t = {:.4}", self.state.time);
                return Tick::BoundaryReached { steps };
            }
        }
        Tick::Continue { steps: self.config.steps_per_tick }
    }

    /// Relax the current state toward the ground state of the installed
    /// potential by `steps` imaginary-time steps. Time is not advanced.
    pub fn relax(&mut self, steps: usize) -> f64 {
        self.solver.relax(&mut self.state, steps);
        let energy = self.solver.energy(&self.state);
        debug!("relaxed {} steps: E = {:.6}", steps, energy);
        energy
    }

    /// Discard the current state and sample the initial one again.
    pub fn reset(&mut self) {
        self.state = wavefunction::initialize(
            self.solver.grid(), &self.config.wavefunction, &self.wavefunction_params);
    }

    /// Regenerate and install the potential after a change to its parameters.
    ///
    /// The state is kept.
    pub fn update_potential_parameter(&mut self, name: &str, value: f64)
        -> SimResult<f64>
    {
        let value = self.potential_params.update(name, value)?;
        let V = potential::generate(
            self.solver.grid().x(),
            &self.config.potential,
            self.solver.mass(),
            &self.potential_params,
        )?;
        self.solver.set_potential(&V)?;
        Ok(value)
    }

    pub fn config(&self) -> &SimulationConfig { &self.config }

    pub fn solver(&self) -> &SpectralSolver { &self.solver }

    pub fn state(&self) -> &WavefunctionState { &self.state }

    pub fn potential(&self) -> &nd::Array1<f64> { self.solver.potential() }

    pub fn potential_params(&self) -> &ParameterSet { &self.potential_params }

    pub fn wavefunction_params(&self) -> &ParameterSet {
        &self.wavefunction_params
    }

    /// Capture the configuration, parameters, and current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            config: self.config.clone(),
            real: self.state.real.to_vec(),
            imag: self.state.imag.to_vec(),
            time: self.state.time,
            potential_parameters: self.potential_params.clone(),
            wavefunction_parameters: self.wavefunction_params.clone(),
        }
    }

    /// Rebuild a simulation from a snapshot, resuming from its stored state
    /// rather than re-sampling the initial one.
    pub fn from_snapshot(snapshot: Snapshot) -> SimResult<Self> {
        let Snapshot {
            config,
            real,
            imag,
            time,
            potential_parameters,
            wavefunction_parameters,
        } = snapshot;
        if real.len() != imag.len() {
            return Err(SimError::SnapshotShape(real.len(), imag.len()));
        }
        config.potential.check()?;
        let solver = build_solver(&config, &potential_parameters)?;
        let state = WavefunctionState::from_parts(
            nd::Array1::from_vec(real), nd::Array1::from_vec(imag), time)?;
        DimensionError::check(solver.len(), &state.real)?;
        debug!("restored snapshot at t = {}", time);
        Ok(Self {
            config,
            potential_params: potential_parameters,
            wavefunction_params: wavefunction_parameters,
            solver,
            state,
        })
    }
}

/// Serializable record of a simulation in progress.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub config: SimulationConfig,
    pub real: Vec<f64>,
    pub imag: Vec<f64>,
    pub time: f64,
    #[serde(default)]
    pub potential_parameters: ParameterSet,
    #[serde(default)]
    pub wavefunction_parameters: ParameterSet,
}

impl Snapshot {
    pub fn from_json(s: &str) -> SimResult<Self> { Ok(serde_json::from_str(s)?) }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use crate::{ error::{ EvalError, ValidationError }, params::ParameterSet };
    use super::*;

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            solver: SolverParams {
                grid_size: 256,
                x_min: -20.0,
                x_max: 20.0,
                dt: 0.01,
                ..SolverParams::default()
            },
            potential: PotentialConfig::Harmonic { omega: 0.5, x0: 0.0 },
            wavefunction: WavefunctionConfig::Gaussian { x0: -2.0, sigma: 1.0, k0: 1.0 },
            steps_per_tick: 5,
            ..SimulationConfig::default()
        }
    }

    fn new_sim(config: SimulationConfig) -> Simulation {
        Simulation::new(config, ParameterSet::new(), ParameterSet::new()).unwrap()
    }

    #[test]
    fn config_defaults_from_json() {
        let config = SimulationConfig::from_json("{}").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.solver.grid_size, 1024);
        let config = SimulationConfig::from_json(
            r#"{"solver": {"grid_size": 300}, "potential": {"type": "free"}}"#
        ).unwrap();
        assert_eq!(config.solver.grid_size, 300);
        assert_eq!(config.solver.dt, 0.005);
        let back = SimulationConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn construction_rounds_and_installs() {
        let config = SimulationConfig {
            solver: SolverParams { grid_size: 300, ..small_config().solver },
            ..small_config()
        };
        let sim = new_sim(config);
        assert_eq!(sim.solver().len(), 512);
        assert!(sim.solver().has_potential());
        assert_eq!(sim.state().len(), 512);
        assert_relative_eq!(sim.solver().total_probability(sim.state()), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn bad_custom_potential_rejected() {
        let config = SimulationConfig {
            potential: PotentialConfig::CustomFunction { expression: "1/x".into() },
            ..small_config()
        };
        let res = Simulation::new(config, ParameterSet::new(), ParameterSet::new());
        assert!(matches!(
            res,
            Err(SimError::Validation(ValidationError::Sample { x, .. })) if x == 0.0
        ));
        let config = SimulationConfig {
            potential: PotentialConfig::CustomFunction { expression: "V0 * x".into() },
            ..small_config()
        };
        let res = Simulation::new(config, ParameterSet::new(), ParameterSet::new());
        assert!(matches!(
            res,
            Err(SimError::Validation(ValidationError::Sample {
                source: EvalError::Unbound(_), ..
            }))
        ));
    }

    #[test]
    fn bad_preset_rejected() {
        let config = SimulationConfig {
            wavefunction: WavefunctionConfig::Gaussian { x0: 0.0, sigma: 0.0, k0: 0.0 },
            ..small_config()
        };
        let res = Simulation::new(config, ParameterSet::new(), ParameterSet::new());
        assert!(matches!(
            res,
            Err(SimError::Validation(ValidationError::NonPositive { name: "sigma", .. }))
        ));
        let config = SimulationConfig {
            wavefunction: WavefunctionConfig::BoundState { n: 0, length: 5.0 },
            ..small_config()
        };
        let res = Simulation::new(config, ParameterSet::new(), ParameterSet::new());
        assert!(matches!(
            res,
            Err(SimError::Validation(ValidationError::NonPositive { name: "n", .. }))
        ));
        let config = SimulationConfig {
            potential: PotentialConfig::Harmonic { omega: 1.0, x0: f64::NAN },
            ..small_config()
        };
        let res = Simulation::new(config, ParameterSet::new(), ParameterSet::new());
        assert!(matches!(
            res,
            Err(SimError::Validation(ValidationError::NonFinite { name: "x0", .. }))
        ));
    }

    #[test]
    fn ticks_and_reset() {
        let mut sim = new_sim(small_config());
        let initial = sim.state().clone();
        assert_eq!(sim.tick(), Tick::Continue { steps: 5 });
        assert_eq!(sim.tick().steps(), 5);
        assert_relative_eq!(sim.state().time, 0.1, epsilon = 1e-12);
        assert_ne!(sim.state(), &initial);
        sim.reset();
        assert_eq!(sim.state(), &initial);
    }

    #[test]
    fn relax_lowers_energy() {
        let mut sim = new_sim(small_config());
        let e0 = sim.solver().energy(sim.state());
        let e1 = sim.relax(2000);
        assert!(e1 < e0);
        // ground state of ω = 0.5 is ω/2
        assert_relative_eq!(e1, 0.25, epsilon = 1e-3);
        assert_eq!(sim.state().time, 0.0);
    }

    #[test]
    fn tick_stops_at_boundary() {
        // the right-hand watch region starts near x = 16
        let config = SimulationConfig {
            potential: PotentialConfig::Free,
            wavefunction: WavefunctionConfig::Gaussian { x0: 15.0, sigma: 1.0, k0: 5.0 },
            ..small_config()
        };
        let mut sim = new_sim(config);
        assert_eq!(sim.tick(), Tick::BoundaryReached { steps: 1 });
        assert_relative_eq!(sim.state().time, 0.01, epsilon = 1e-12);
    }

    #[test]
    fn parameters_drive_potential() {
        let config = SimulationConfig {
            potential: PotentialConfig::CustomFunction {
                expression: "V0 * exp(-x^2)".into(),
            },
            ..small_config()
        };
        let mut potential_params = ParameterSet::new();
        let mut wavefunction_params = ParameterSet::new();
        config.sync_parameters(&mut potential_params, &mut wavefunction_params);
        assert!(potential_params.contains("V0"));
        assert!(wavefunction_params.is_empty());
        let mut sim
            = Simulation::new(config, potential_params, wavefunction_params)
            .unwrap();
        let i0 = sim.solver().len() / 2;
        assert_relative_eq!(sim.solver().grid().x()[i0], 0.0);
        let v0 = sim.potential_params().get("V0").unwrap().value();
        assert_relative_eq!(sim.potential()[i0], v0);
        let stored = sim.update_potential_parameter("V0", 2.5).unwrap();
        assert_relative_eq!(sim.potential()[i0], stored);
        assert!(matches!(
            sim.update_potential_parameter("nope", 1.0),
            Err(SimError::Param(_)),
        ));
    }

    #[test]
    fn snapshot_resumes() {
        let mut sim = new_sim(small_config());
        sim.tick();
        let json = sim.snapshot().to_json().unwrap();
        let mut resumed
            = Simulation::from_snapshot(Snapshot::from_json(&json).unwrap())
            .unwrap();
        assert_eq!(resumed.config(), sim.config());
        assert_relative_eq!(resumed.state().time, sim.state().time, epsilon = 1e-15);
        sim.tick();
        resumed.tick();
        let (a, b) = (sim.state(), resumed.state());
        a.real.iter().zip(&b.real).chain(a.imag.iter().zip(&b.imag))
            .for_each(|(x, y)| assert_relative_eq!(*x, *y, epsilon = 1e-12));
    }

    #[test]
    fn snapshot_shape_checked() {
        let mut snapshot = new_sim(small_config()).snapshot();
        snapshot.imag.pop();
        assert!(matches!(
            Simulation::from_snapshot(snapshot.clone()),
            Err(SimError::SnapshotShape(256, 255)),
        ));
        snapshot.real.pop();
        assert!(matches!(
            Simulation::from_snapshot(snapshot),
            Err(SimError::Dimension(_)),
        ));
    }
}
