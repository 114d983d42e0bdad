//! Observables and health checks computed from a [`WavefunctionState`] on a
//! solver's grid.
//!
//! Sums are rectangle-rule integrals over the periodic grid. Momentum-space
//! quantities use the solver's forward FFT with the `1/N` factor that makes
//! Parseval's relation `Σ|ψ̃|² dx / N = Σ|ψ|² dx` hold.

use ndarray as nd;
use crate::{ solver::SpectralSolver, wavefunction::WavefunctionState };

/// Default limit on the summed density `Σ|ψ|²` over the outer grid regions
/// before [`SpectralSolver::check_boundaries`] reports leakage.
pub const DEFAULT_BOUNDARY_THRESHOLD: f64 = 0.01;

/// Fraction of the grid, on each side, watched by
/// [`SpectralSolver::check_boundaries`].
pub const BOUNDARY_FRACTION: f64 = 0.1;

impl SpectralSolver {
    /// `|ψ|²` at each grid point.
    pub fn probability_density(&self, state: &WavefunctionState)
        -> nd::Array1<f64>
    {
        nd::Zip::from(&state.real).and(&state.imag)
            .map_collect(|re, im| re * re + im * im)
    }

    /// `Σ |ψ|² dx`; should be 1 after every step.
    pub fn total_probability(&self, state: &WavefunctionState) -> f64 {
        state.norm(self.grid().dx())
    }

    /// Probability of finding the particle strictly between `lo` and `hi`.
    ///
    /// Grid points lying exactly on either endpoint are excluded, so adjacent
    /// regions never count the same point twice.
    pub fn region_probability(
        &self,
        state: &WavefunctionState,
        lo: f64,
        hi: f64,
    ) -> f64
    {
        self.grid().x().iter()
            .zip(state.real.iter().zip(&state.imag))
            .filter(|(x, _)| lo < **x && **x < hi)
            .map(|(_, (re, im))| re * re + im * im)
            .sum::<f64>() * self.grid().dx()
    }

    /// `⟨x⟩`.
    pub fn position_mean(&self, state: &WavefunctionState) -> f64 {
        self.grid().x().iter()
            .zip(state.real.iter().zip(&state.imag))
            .map(|(x, (re, im))| x * (re * re + im * im))
            .sum::<f64>() * self.grid().dx()
    }

    /// `⟨x²⟩ - ⟨x⟩²`.
    pub fn position_variance(&self, state: &WavefunctionState) -> f64 {
        let mean = self.position_mean(state);
        self.grid().x().iter()
            .zip(state.real.iter().zip(&state.imag))
            .map(|(x, (re, im))| (x - mean).powi(2) * (re * re + im * im))
            .sum::<f64>() * self.grid().dx()
    }

    /// `⟨p⟩ = ħ ⟨k⟩`.
    pub fn momentum_mean(&self, state: &WavefunctionState) -> f64 {
        let n = self.len() as f64;
        let psi_k = self.forward(state);
        let k_mean: f64
            = psi_k.iter().zip(self.grid().k())
            .map(|(pk, kk)| pk.norm_sqr() * kk)
            .sum::<f64>() * self.grid().dx() / n;
        self.hbar() * k_mean
    }

    /// `⟨T⟩ = Σ |ψ̃|² ħ²k²/2m dx / N`.
    pub fn kinetic_energy(&self, state: &WavefunctionState) -> f64 {
        let n = self.len() as f64;
        let hbar = self.hbar();
        let mass = self.mass();
        let psi_k = self.forward(state);
        psi_k.iter().zip(self.grid().k())
            .map(|(pk, kk)| pk.norm_sqr() * (hbar * kk).powi(2) / (2.0 * mass))
            .sum::<f64>() * self.grid().dx() / n
    }

    /// `⟨V⟩ = Σ |ψ|² V dx` for the installed potential.
    pub fn potential_energy(&self, state: &WavefunctionState) -> f64 {
        self.potential().iter()
            .zip(state.real.iter().zip(&state.imag))
            .map(|(Vk, (re, im))| Vk * (re * re + im * im))
            .sum::<f64>() * self.grid().dx()
    }

    /// `⟨H⟩ = ⟨T⟩ + ⟨V⟩`.
    pub fn energy(&self, state: &WavefunctionState) -> f64 {
        self.kinetic_energy(state) + self.potential_energy(state)
    }

    /// Return `true` if the probability density `|ψ|²`, summed over the
    /// points in the outer [`BOUNDARY_FRACTION`] of the grid on both sides,
    /// exceeds `threshold`.
    ///
    /// The sum is over raw samples with no `dx` weight, so it is more
    /// sensitive than the edge probability whenever `dx < 1`.
    ///
    /// The periodic grid wraps anything that reaches an edge around to the
    /// other side, so a `true` result means the simulation should be paused
    /// rather than trusted further.
    pub fn check_boundaries(&self, state: &WavefunctionState, threshold: f64)
        -> bool
    {
        let n = self.len();
        let edge = ((n as f64 * BOUNDARY_FRACTION) as usize).max(1);
        let density = |i: usize| state.real[i].powi(2) + state.imag[i].powi(2);
        let edge_density: f64
            = (0..edge).chain(n - edge..n)
            .map(density)
            .sum();
        edge_density > threshold
    }
}
