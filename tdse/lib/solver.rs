//! Split-operator Fourier-spectral integration of the one-dimensional
//! time-dependent Schrödinger equation for a static potential.
//!
//! Each [`step`][SpectralSolver::step] applies the symmetric (Strang) splitting
//! ```text
//! exp(-i H dt / ħ) ≈ exp(-i V dt / 2ħ) exp(-i T dt / ħ) exp(-i V dt / 2ħ)
//! ```
//! with the potential factor applied in position space and the kinetic factor
//! in momentum space, moving between the two by FFT. The local error is
//! *O*(*dt*³) per step. See [`docs`][crate::docs#time-dependence] for more.

use std::{ fmt, sync::Arc };
use log::debug;
use ndarray as nd;
use num_complex::Complex64 as C64;
use num_traits::Zero;
use rustfft::{ Fft, FftPlanner };
use serde::{ Deserialize, Serialize };
use crate::{
    Arr1,
    error::{ DimensionError, SolverError },
    grid::Grid,
    wavefunction::WavefunctionState,
};

pub type SResult<T> = Result<T, SolverError>;

/// Grid and physical constants for a solver.
///
/// `grid_size` is rounded up to a power of two on construction.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverParams {
    pub grid_size: usize,
    pub x_min: f64,
    pub x_max: f64,
    pub hbar: f64,
    pub mass: f64,
    pub dt: f64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            grid_size: 1024,
            x_min: -20.0,
            x_max: 20.0,
            hbar: 1.0,
            mass: 1.0,
            dt: 0.005,
        }
    }
}

// build the per-sample phase factors exp(-i ħ k² dt / 2m)
fn kinetic_operator<S>(k: &Arr1<S>, hbar: f64, mass: f64, dt: f64)
    -> nd::Array1<C64>
where S: nd::Data<Elem = f64>
{
    k.mapv(|kk| C64::cis(-hbar * kk.powi(2) * dt / (2.0 * mass)))
}

// build the per-sample phase factors exp(-i V dt / 2ħ)
fn potential_half_operator<S>(V: &Arr1<S>, hbar: f64, dt: f64)
    -> nd::Array1<C64>
where S: nd::Data<Elem = f64>
{
    V.mapv(|Vk| C64::cis(-Vk * dt / (2.0 * hbar)))
}

/// Owns the grids, the precomputed evolution operators, planned FFTs, and
/// scratch space for stepping a [`WavefunctionState`].
///
/// Until [`set_potential`][Self::set_potential] is called the potential is
/// zero, so stepping gives free evolution; callers are expected to install a
/// potential first.
#[derive(Clone)]
pub struct SpectralSolver {
    params: SolverParams,
    grid: Grid,
    kinetic: nd::Array1<C64>,
    potential: nd::Array1<f64>,
    potential_half: nd::Array1<C64>,
    has_potential: bool,
    fft: Arc<dyn Fft<f64>>,
    ifft: Arc<dyn Fft<f64>>,
    work: Vec<C64>,
    scratch: Vec<C64>,
}

impl fmt::Debug for SpectralSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectralSolver")
            .field("params", &self.params)
            .field("grid_size", &self.grid.len())
            .field("has_potential", &self.has_potential)
            .finish_non_exhaustive()
    }
}

impl SpectralSolver {
    /// Set up the grid and kinetic operator.
    ///
    /// `params.grid_size` is rounded up to the next power of two; the stored
    /// [`params`][Self::params] reflect the size actually used.
    pub fn new(params: SolverParams) -> SResult<Self> {
        SolverError::check_positive("hbar", params.hbar)?;
        SolverError::check_positive("mass", params.mass)?;
        SolverError::check_positive("dt", params.dt)?;
        let grid = Grid::new(params.grid_size, params.x_min, params.x_max)?;
        let n = grid.len();
        let params = SolverParams { grid_size: n, ..params };
        let kinetic
            = kinetic_operator(grid.k(), params.hbar, params.mass, params.dt);
        let mut planner: FftPlanner<f64> = FftPlanner::new();
        let fft = planner.plan_fft_forward(n);
        let ifft = planner.plan_fft_inverse(n);
        let scratch_len
            = fft.get_inplace_scratch_len().max(ifft.get_inplace_scratch_len());
        debug!(
            "spectral solver: N = {}, x in [{}, {}), dx = {:.3e}, dt = {:.3e}",
            n, params.x_min, params.x_max, grid.dx(), params.dt,
        );
        Ok(Self {
            params,
            grid,
            kinetic,
            potential: nd::Array1::zeros(n),
            potential_half: nd::Array1::from_elem(n, C64::new(1.0, 0.0)),
            has_potential: false,
            fft,
            ifft,
            work: vec![C64::zero(); n],
            scratch: vec![C64::zero(); scratch_len],
        })
    }

    /// Install a potential and compute its half-step operator.
    pub fn set_potential<S>(&mut self, V: &Arr1<S>) -> Result<(), DimensionError>
    where S: nd::Data<Elem = f64>
    {
        DimensionError::check(self.grid.len(), V)?;
        self.potential = V.to_owned();
        self.potential_half
            = potential_half_operator(V, self.params.hbar, self.params.dt);
        self.has_potential = true;
        debug!(
            "installed potential: min = {:.3e}, max = {:.3e}",
            V.iter().copied().fold(f64::INFINITY, f64::min),
            V.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        );
        Ok(())
    }

    /// Advance `state` by one time step in place, returning it for chaining.
    ///
    /// The state is renormalized afterward to remove drift in the norm.
    pub fn step<'a>(&mut self, state: &'a mut WavefunctionState)
        -> &'a mut WavefunctionState
    {
        debug_assert_eq!(state.len(), self.grid.len());
        let iter
            = self.work.iter_mut()
            .zip(state.real.iter().zip(&state.imag))
            .zip(&self.potential_half);
        for ((wk, (re, im)), vk) in iter {
            *wk = C64::new(*re, *im) * *vk;
        }
        self.fft.process_with_scratch(&mut self.work, &mut self.scratch);
        self.work.iter_mut().zip(&self.kinetic)
            .for_each(|(wk, tk)| { *wk *= *tk; });
        self.ifft.process_with_scratch(&mut self.work, &mut self.scratch);
        let inv_n = (self.grid.len() as f64).recip();
        let iter
            = self.work.iter()
            .zip(state.real.iter_mut().zip(state.imag.iter_mut()))
            .zip(&self.potential_half);
        for ((wk, (re, im)), vk) in iter {
            let z = *wk * inv_n * *vk;
            *re = z.re;
            *im = z.im;
        }
        state.time += self.params.dt;
        state.normalize(self.grid.dx());
        state
    }

    /// Take `steps` steps in a row.
    pub fn evolve<'a>(&mut self, state: &'a mut WavefunctionState, steps: usize)
        -> &'a mut WavefunctionState
    {
        for _ in 0..steps {
            self.step(state);
        }
        state
    }

    /// Propagate `state` in imaginary time for `steps` steps of size `dt`,
    /// renormalizing after each.
    ///
    /// Excited components decay relative to the ground state of the installed
    /// potential, so a state with some ground-state overlap relaxes toward it.
    /// `state.time` is not advanced.
    pub fn relax<'a>(&mut self, state: &'a mut WavefunctionState, steps: usize)
        -> &'a mut WavefunctionState
    {
        let SolverParams { hbar, mass, dt, .. } = self.params;
        // shift by the potential minimum to keep the decay factors bounded
        let v_min
            = self.potential.iter().copied().fold(f64::INFINITY, f64::min);
        let half: nd::Array1<f64>
            = self.potential.mapv(|Vk| (-(Vk - v_min) * dt / (2.0 * hbar)).exp());
        let kin: nd::Array1<f64>
            = self.grid.k().mapv(|kk| (-hbar * kk.powi(2) * dt / (2.0 * mass)).exp());
        let inv_n = (self.grid.len() as f64).recip();
        for _ in 0..steps {
            let iter
                = self.work.iter_mut()
                .zip(state.real.iter().zip(&state.imag))
                .zip(&half);
            for ((wk, (re, im)), hk) in iter {
                *wk = C64::new(*re, *im) * hk;
            }
            self.fft.process_with_scratch(&mut self.work, &mut self.scratch);
            self.work.iter_mut().zip(&kin)
                .for_each(|(wk, tk)| { *wk *= *tk; });
            self.ifft.process_with_scratch(&mut self.work, &mut self.scratch);
            let iter
                = self.work.iter()
                .zip(state.real.iter_mut().zip(state.imag.iter_mut()))
                .zip(&half);
            for ((wk, (re, im)), hk) in iter {
                let z = *wk * (inv_n * hk);
                *re = z.re;
                *im = z.im;
            }
            state.normalize(self.grid.dx());
        }
        state
    }

    /// Parameters in use, with the grid size after rounding.
    pub fn params(&self) -> &SolverParams { &self.params }

    pub fn grid(&self) -> &Grid { &self.grid }

    /// Number of grid points.
    pub fn len(&self) -> usize { self.grid.len() }

    pub fn is_empty(&self) -> bool { self.grid.is_empty() }

    pub fn dt(&self) -> f64 { self.params.dt }

    pub fn hbar(&self) -> f64 { self.params.hbar }

    pub fn mass(&self) -> f64 { self.params.mass }

    /// `true` once [`set_potential`][Self::set_potential] has succeeded.
    pub fn has_potential(&self) -> bool { self.has_potential }

    /// The installed potential (zero until one is set).
    pub fn potential(&self) -> &nd::Array1<f64> { &self.potential }

    /// Momentum-space phase factors `exp(-i ħ k² dt / 2m)`.
    pub fn kinetic_operator(&self) -> &nd::Array1<C64> { &self.kinetic }

    /// Position-space phase factors `exp(-i V dt / 2ħ)`.
    pub fn potential_half_operator(&self) -> &nd::Array1<C64> {
        &self.potential_half
    }

    // forward FFT of a state into a freshly allocated buffer, for diagnostics
    // that must not disturb the stepping buffers
    pub(crate) fn forward(&self, state: &WavefunctionState) -> Vec<C64> {
        let mut buf: Vec<C64>
            = state.real.iter().zip(&state.imag)
            .map(|(re, im)| C64::new(*re, *im))
            .collect();
        self.fft.process(&mut buf);
        buf
    }
}
