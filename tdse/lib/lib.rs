#![allow(non_snake_case)]

//! Provides a split-operator Fourier-spectral solver for the one-dimensional
//! time-dependent Schrödinger equation, along with the pieces needed to drive
//! it from user input:
//! - A small arithmetic expression language for custom potentials and
//!   wavefunctions
//! - Named, range-limited parameters referenced by those expressions
//! - Preset and custom potentials and initial wavefunctions
//! - Observables (norm, moments, energy) and a check for probability reaching
//!   the edges of the periodic grid
//! - A [`Simulation`][sim::Simulation] driver with JSON snapshots
//!
//! See [`docs`] for theoretical background.
//!
//! ```
//! use tdse::{
//!     params::ParameterSet,
//!     potential::PotentialConfig,
//!     sim::{ Simulation, SimulationConfig, Tick },
//!     wavefunction::WavefunctionConfig,
//! };
//!
//! let config = SimulationConfig {
//!     potential: PotentialConfig::Barrier { v0: 5.0, x0: 0.0, width: 2.0 },
//!     wavefunction: WavefunctionConfig::Gaussian { x0: -5.0, sigma: 1.0, k0: 3.0 },
//!     ..SimulationConfig::default()
//! };
//! let mut sim = Simulation::new(config, ParameterSet::new(), ParameterSet::new())
//!     .unwrap();
//! assert_eq!(sim.tick(), Tick::Continue { steps: 10 });
//! let norm = sim.solver().total_probability(sim.state());
//! assert!((norm - 1.0).abs() < 1e-9);
//! ```

pub mod error;
pub mod expr;
pub mod params;
pub mod grid;
pub mod interp;
pub mod potential;
pub mod wavefunction;
pub mod solver;
pub mod diagnostics;
pub mod sim;
pub mod utils;

pub mod docs;

pub type Arr1<S> = ndarray::ArrayBase<S, ndarray::Ix1>;
