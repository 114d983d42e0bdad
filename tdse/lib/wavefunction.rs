//! Wavefunction state and its construction from preset shapes or expressions.

use std::f64::consts::PI;
use log::{ trace, warn };
use ndarray as nd;
use num_complex::Complex64 as C64;
use serde::{ Deserialize, Serialize };
use crate::{
    error::{ DimensionError, EvalError, ValidationError },
    expr::{ Bindings, Expr, Scope },
    grid::Grid,
    potential::SAMPLE_POINTS,
    utils::{ wf_norm, wf_renormalize },
};

/// A complex wavefunction sampled on a grid, with the time it refers to.
///
/// Held as separate real and imaginary arrays. [`SpectralSolver::step`]
/// mutates it in place and keeps `Σ (re² + im²) dx = 1`.
///
/// [`SpectralSolver::step`]: crate::solver::SpectralSolver::step
#[derive(Clone, Debug, PartialEq)]
pub struct WavefunctionState {
    pub real: nd::Array1<f64>,
    pub imag: nd::Array1<f64>,
    pub time: f64,
}

impl WavefunctionState {
    /// An all-zero state of `n` samples at `t = 0`.
    pub fn zeros(n: usize) -> Self {
        Self {
            real: nd::Array1::zeros(n),
            imag: nd::Array1::zeros(n),
            time: 0.0,
        }
    }

    /// Assemble a state from its parts, which must have equal lengths.
    pub fn from_parts(
        real: nd::Array1<f64>,
        imag: nd::Array1<f64>,
        time: f64,
    ) -> Result<Self, DimensionError>
    {
        DimensionError::check(real.len(), &imag)?;
        Ok(Self { real, imag, time })
    }

    /// Build a state from complex samples.
    pub fn from_complex<S>(psi: &nd::ArrayBase<S, nd::Ix1>, time: f64) -> Self
    where S: nd::Data<Elem = C64>
    {
        Self { real: psi.mapv(|z| z.re), imag: psi.mapv(|z| z.im), time }
    }

    /// Number of samples.
    pub fn len(&self) -> usize { self.real.len() }

    pub fn is_empty(&self) -> bool { self.real.is_empty() }

    /// Combine the real and imaginary parts into complex samples.
    pub fn to_complex(&self) -> nd::Array1<C64> {
        nd::Zip::from(&self.real).and(&self.imag)
            .map_collect(|re, im| C64::new(*re, *im))
    }

    /// `Σ (re² + im²) dx`.
    pub fn norm(&self, dx: f64) -> f64 { wf_norm(&self.real, &self.imag, dx) }

    /// Rescale to unit norm; a zero state is left as is. Returns the norm
    /// before rescaling.
    pub fn normalize(&mut self, dx: f64) -> f64 {
        wf_renormalize(&mut self.real, &mut self.imag, dx)
    }
}

fn default_imag() -> String { "0".to_string() }

/// Selects and parameterizes an initial wavefunction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WavefunctionConfig {
    /// `ψ = exp(-(x - x0)² / 4σ²) exp(i k0 x)`.
    Gaussian { x0: f64, sigma: f64, k0: f64 },
    /// `ψ = A exp(i k0 x)`.
    PlaneWave { amplitude: f64, k0: f64 },
    /// `ψ = √(2/L) sin(nπx/L)` on `0 < x < L`, zero elsewhere.
    BoundState { n: u32, length: f64 },
    /// Real and imaginary parts given as expressions in `x` (with `t = 0`)
    /// and the wavefunction parameters.
    CustomFunction {
        real: String,
        #[serde(default = "default_imag")]
        imag: String,
    },
}

impl Default for WavefunctionConfig {
    fn default() -> Self { Self::Gaussian { x0: -5.0, sigma: 1.0, k0: 3.0 } }
}

impl WavefunctionConfig {
    /// The `(real, imag)` expressions, if this is a custom function.
    pub fn expressions(&self) -> Option<(&str, &str)> {
        match self {
            Self::CustomFunction { real, imag } => Some((real, imag)),
            _ => None,
        }
    }

    /// Check the numbers of a preset shape: everything finite, and `sigma`,
    /// `n` and `length` strictly positive.
    ///
    /// [`initialize`] does not call this; a zero width would give a NaN
    /// sample at the center.
    pub fn check(&self) -> Result<(), ValidationError> {
        match self {
            Self::Gaussian { x0, sigma, k0 } => {
                ValidationError::check_finite("x0", *x0)?;
                ValidationError::check_positive("sigma", *sigma)?;
                ValidationError::check_finite("k0", *k0)
            },
            Self::PlaneWave { amplitude, k0 } => {
                ValidationError::check_finite("amplitude", *amplitude)?;
                ValidationError::check_finite("k0", *k0)
            },
            Self::BoundState { n, length } => {
                ValidationError::check_positive("n", *n as f64)?;
                ValidationError::check_positive("length", *length)
            },
            Self::CustomFunction { .. } => Ok(()),
        }
    }
}

// sample a pair of expressions over the grid; failing samples are zeroed
// rather than aborting the whole construction
fn sample_custom<B>(grid: &Grid, real: &str, imag: &str, params: &B)
    -> WavefunctionState
where B: Bindings + ?Sized
{
    let n = grid.len();
    let (re_expr, im_expr)
        = match (Expr::parse(real), Expr::parse(imag)) {
            (Ok(re), Ok(im)) => (re, im),
            (Err(err), _) | (_, Err(err)) => {
                warn!(
                    "custom wavefunction ({:?}, {:?}) does not parse: {}; \
                    using zeros",
                    real, imag, err,
                );
                return WavefunctionState::zeros(n);
            },
        };
    let scope = Scope::new(params).with_t(0.0);
    let mut failed: usize = 0;
    let mut first_err: Option<EvalError> = None;
    let mut state = WavefunctionState::zeros(n);
    let iter
        = grid.x().iter()
        .zip(state.real.iter_mut().zip(state.imag.iter_mut()));
    for (&xk, (rek, imk)) in iter {
        let at = scope.with_x(xk);
        match re_expr.eval(&at).and_then(|re| Ok((re, im_expr.eval(&at)?))) {
            Ok((re, im)) => { *rek = re; *imk = im; },
            Err(err) => {
                trace!("custom wavefunction failed at x = {}: {}", xk, err);
                failed += 1;
                first_err.get_or_insert(err);
            },
        }
    }
    if let Some(err) = first_err {
        warn!(
            "custom wavefunction failed at {} of {} points (first error: {}); \
            those points were set to zero",
            failed, n, err,
        );
    }
    state
}

/// Sample and normalize an initial wavefunction on `grid` at `t = 0`.
///
/// Custom expressions that fail at individual points are zeroed there and
/// logged; construction itself never fails. If every sample comes out zero,
/// the zero state is returned as is.
pub fn initialize<B>(grid: &Grid, config: &WavefunctionConfig, params: &B)
    -> WavefunctionState
where B: Bindings + ?Sized
{
    let x = grid.x();
    let mut state
        = match config {
            WavefunctionConfig::Gaussian { x0, sigma, k0 } => {
                let psi: nd::Array1<C64>
                    = x.mapv(|xk| {
                        let env = (-(xk - x0).powi(2) / (4.0 * sigma.powi(2))).exp();
                        env * C64::cis(k0 * xk)
                    });
                WavefunctionState::from_complex(&psi, 0.0)
            },
            WavefunctionConfig::PlaneWave { amplitude, k0 } => {
                let psi: nd::Array1<C64>
                    = x.mapv(|xk| *amplitude * C64::cis(k0 * xk));
                WavefunctionState::from_complex(&psi, 0.0)
            },
            WavefunctionConfig::BoundState { n, length } => {
                let amp = (2.0 / length).sqrt();
                let kn = *n as f64 * PI / length;
                let real: nd::Array1<f64>
                    = x.mapv(|xk| {
                        if 0.0 < xk && xk < *length {
                            amp * (kn * xk).sin()
                        } else {
                            0.0
                        }
                    });
                let imag = nd::Array1::zeros(x.len());
                WavefunctionState { real, imag, time: 0.0 }
            },
            WavefunctionConfig::CustomFunction { real, imag } => {
                sample_custom(grid, real, imag, params)
            },
        };
    if state.normalize(grid.dx()) == 0.0 {
        warn!("initial wavefunction is zero everywhere; left unnormalized");
    }
    state
}

/// Check that a pair of wavefunction expressions evaluates to finite numbers
/// at each of the [`SAMPLE_POINTS`] with `t = 0`, reporting the first failure.
///
/// This is advisory; [`initialize`] does not call it.
pub fn validate<B>(real: &str, imag: &str, params: &B)
    -> Result<(), ValidationError>
where B: Bindings + ?Sized
{
    let re_expr = Expr::parse(real).map_err(ValidationError::Parse)?;
    let im_expr = Expr::parse(imag).map_err(ValidationError::Parse)?;
    let scope = Scope::new(params).with_t(0.0);
    SAMPLE_POINTS.iter()
        .try_for_each(|&x| {
            let at = scope.with_x(x);
            re_expr.eval(&at)
                .and_then(|_| im_expr.eval(&at))
                .map(|_| ())
                .map_err(|source| ValidationError::Sample { x, source })
        })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use crate::params::ParameterSet;
    use super::*;

    fn grid() -> Grid { Grid::new(512, -20.0, 20.0).unwrap() }

    fn mean_x(grid: &Grid, state: &WavefunctionState) -> f64 {
        grid.x().iter().zip(&state.real).zip(&state.imag)
            .map(|((x, re), im)| x * (re * re + im * im))
            .sum::<f64>() * grid.dx()
    }

    #[test]
    fn gaussian_is_normalized_and_centered() {
        let grid = grid();
        let config = WavefunctionConfig::Gaussian { x0: -3.0, sigma: 1.5, k0: 2.0 };
        let state = initialize(&grid, &config, &ParameterSet::new());
        assert_eq!(state.time, 0.0);
        assert_relative_eq!(state.norm(grid.dx()), 1.0, epsilon = 1e-12);
        assert_relative_eq!(mean_x(&grid, &state), -3.0, epsilon = 1e-9);
        assert!(state.imag.iter().any(|v| v.abs() > 1e-3));
    }

    #[test]
    fn plane_wave_has_uniform_density() {
        let grid = grid();
        let config = WavefunctionConfig::PlaneWave { amplitude: 3.0, k0: 1.0 };
        let state = initialize(&grid, &config, &ParameterSet::new());
        let expected = 1.0 / (grid.x_max() - grid.x_min());
        state.real.iter().zip(&state.imag)
            .for_each(|(re, im)| {
                assert_relative_eq!(re * re + im * im, expected, epsilon = 1e-12);
            });
    }

    #[test]
    fn bound_state_support() {
        let grid = grid();
        let config = WavefunctionConfig::BoundState { n: 2, length: 10.0 };
        let state = initialize(&grid, &config, &ParameterSet::new());
        assert_relative_eq!(state.norm(grid.dx()), 1.0, epsilon = 1e-12);
        grid.x().iter().zip(&state.real)
            .filter(|(x, _)| **x <= 0.0 || **x >= 10.0)
            .for_each(|(_, re)| assert_eq!(*re, 0.0));
        assert!(state.imag.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn zero_state_stays_zero() {
        let grid = grid();
        let config = WavefunctionConfig::BoundState { n: 0, length: 10.0 };
        let state = initialize(&grid, &config, &ParameterSet::new());
        assert_eq!(state.norm(grid.dx()), 0.0);
    }

    #[test]
    fn preset_numbers_checked() {
        let ok = WavefunctionConfig::default();
        assert_eq!(ok.check(), Ok(()));
        let flat = WavefunctionConfig::Gaussian { x0: 0.0, sigma: 0.0, k0: 0.0 };
        assert_eq!(
            flat.check(),
            Err(ValidationError::NonPositive { name: "sigma", value: 0.0 }),
        );
        let state = initialize(&Grid::new(8, -4.0, 4.0).unwrap(), &flat, &ParameterSet::new());
        assert!(state.real[4].is_nan());
        let negative = WavefunctionConfig::Gaussian { x0: 0.0, sigma: -1.0, k0: 0.0 };
        assert!(matches!(
            negative.check(),
            Err(ValidationError::NonPositive { name: "sigma", .. }),
        ));
        let far = WavefunctionConfig::Gaussian { x0: f64::INFINITY, sigma: 1.0, k0: 0.0 };
        assert!(matches!(
            far.check(),
            Err(ValidationError::NonFinite { name: "x0", .. }),
        ));
        let unbound = WavefunctionConfig::BoundState { n: 0, length: 10.0 };
        assert_eq!(
            unbound.check(),
            Err(ValidationError::NonPositive { name: "n", value: 0.0 }),
        );
        let short = WavefunctionConfig::BoundState { n: 1, length: -2.0 };
        assert!(matches!(
            short.check(),
            Err(ValidationError::NonPositive { name: "length", .. }),
        ));
        let wave = WavefunctionConfig::PlaneWave { amplitude: f64::NAN, k0: 1.0 };
        assert!(matches!(
            wave.check(),
            Err(ValidationError::NonFinite { name: "amplitude", .. }),
        ));
    }

    #[test]
    fn custom_function_with_parameters() {
        let grid = grid();
        let mut params = ParameterSet::new();
        params.create("kk", 2.0, -10.0, 10.0, 0.1).unwrap();
        let config = WavefunctionConfig::CustomFunction {
            real: "exp(-x^2) * cos(kk * x)".into(),
            imag: "exp(-x^2) * sin(kk * x)".into(),
        };
        let state = initialize(&grid, &config, &params);
        assert_relative_eq!(state.norm(grid.dx()), 1.0, epsilon = 1e-12);
        // the phase of the unnormalized samples survives normalization
        let i = 260;
        let x = grid.x()[i];
        assert_relative_eq!(
            state.imag[i].atan2(state.real[i]),
            (2.0 * x).sin().atan2((2.0 * x).cos()),
            epsilon = 1e-9,
        );
    }

    #[test]
    fn custom_function_failures_zero_only_the_bad_points() {
        let grid = Grid::new(8, -4.0, 4.0).unwrap();
        let config = WavefunctionConfig::CustomFunction {
            real: "1 / x".into(),
            imag: "0".into(),
        };
        let state = initialize(&grid, &config, &ParameterSet::new());
        // x = 0 sits at index 4
        assert_eq!(state.real[4], 0.0);
        assert!(state.real.iter().enumerate().all(|(i, v)| i == 4 || *v != 0.0));
        assert_relative_eq!(state.norm(grid.dx()), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn custom_function_unbound_parameter_gives_zeros() {
        let grid = grid();
        let config = WavefunctionConfig::CustomFunction {
            real: "A * exp(-x^2)".into(),
            imag: "0".into(),
        };
        let state = initialize(&grid, &config, &ParameterSet::new());
        assert!(state.real.iter().chain(state.imag.iter()).all(|v| *v == 0.0));
    }

    #[test]
    fn custom_function_sees_t_zero() {
        let grid = Grid::new(4, 0.0, 4.0).unwrap();
        let config = WavefunctionConfig::CustomFunction {
            real: "1 + t".into(),
            imag: "t".into(),
        };
        let state = initialize(&grid, &config, &ParameterSet::new());
        assert!(state.imag.iter().all(|v| *v == 0.0));
        assert_relative_eq!(state.real[0], 0.5);
    }

    #[test]
    fn validation() {
        let none = ParameterSet::new();
        assert_eq!(validate("exp(-x^2)", "0", &none), Ok(()));
        assert_eq!(
            validate("exp(-x^2)", "k*x", &none),
            Err(ValidationError::Sample {
                x: 0.0,
                source: EvalError::Unbound("k".to_string()),
            }),
        );
        assert!(matches!(
            validate("(", "0", &none),
            Err(ValidationError::Parse(EvalError::UnexpectedEnd))
        ));
    }

    #[test]
    fn config_json() {
        let config: WavefunctionConfig
            = serde_json::from_str(r#"{"type": "custom-function", "real": "exp(-x^2)"}"#)
            .unwrap();
        assert_eq!(config.expressions(), Some(("exp(-x^2)", "0")));
        let config: WavefunctionConfig
            = serde_json::from_str(r#"{"type": "plane-wave", "amplitude": 1, "k0": 2}"#)
            .unwrap();
        assert_eq!(config, WavefunctionConfig::PlaneWave { amplitude: 1.0, k0: 2.0 });
    }

    #[test]
    fn parts_must_match() {
        let err = WavefunctionState::from_parts(nd::Array1::zeros(4), nd::Array1::zeros(3), 0.0);
        assert_eq!(err, Err(DimensionError { expected: 4, got: 3 }));
    }
}
