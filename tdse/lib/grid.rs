//! Uniform, periodic position/momentum grids for the spectral solver.

use ndarray as nd;
use log::warn;
use crate::{
    error::SolverError,
    utils::{ fft_wavenumbers, next_pow2 },
};

/// Spatial grid together with its conjugate wavenumber grid.
///
/// Points are `x[i] = x_min + i dx` with `dx = (x_max - x_min) / N`, so
/// `x_max` itself is excluded: the domain is treated as periodic. The number
/// of points is always a power of two.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    x_min: f64,
    x_max: f64,
    dx: f64,
    dk: f64,
    x: nd::Array1<f64>,
    k: nd::Array1<f64>,
}

impl Grid {
    /// Construct a grid, rounding `size` up to the next power of two.
    pub fn new(size: usize, x_min: f64, x_max: f64) -> Result<Self, SolverError> {
        if size < 2 { return Err(SolverError::BadGridSize(size)); }
        SolverError::check_bounds(x_min, x_max)?;
        let n = next_pow2(size);
        if n != size {
            warn!("grid size {} is not a power of two; using {}", size, n);
        }
        let len = x_max - x_min;
        let dx = len / n as f64;
        let x: nd::Array1<f64>
            = (0..n).map(|i| x_min + i as f64 * dx).collect();
        let k = fft_wavenumbers(n, len);
        let dk = k[1];
        Ok(Self { x_min, x_max, dx, dk, x, k })
    }

    /// Number of grid points.
    pub fn len(&self) -> usize { self.x.len() }

    /// Always `false`; grids hold at least two points.
    pub fn is_empty(&self) -> bool { self.x.is_empty() }

    pub fn x_min(&self) -> f64 { self.x_min }

    pub fn x_max(&self) -> f64 { self.x_max }

    /// Spatial step.
    pub fn dx(&self) -> f64 { self.dx }

    /// Wavenumber step, `2π / (x_max - x_min)`.
    pub fn dk(&self) -> f64 { self.dk }

    /// Position samples.
    pub fn x(&self) -> &nd::Array1<f64> { &self.x }

    /// Wavenumber samples in FFT ordering.
    pub fn k(&self) -> &nd::Array1<f64> { &self.k }
}
