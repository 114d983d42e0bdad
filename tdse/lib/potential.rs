//! Sampled potentials, from preset shapes or user expressions.

use ndarray as nd;
use serde::{ Deserialize, Serialize };
use crate::{
    Arr1,
    error::{ PotentialError, ValidationError },
    expr::{ Bindings, Expr, Scope },
    interp::{ self, ControlPoint },
};

pub type PResult<T> = Result<T, PotentialError>;

/// Coordinates at which [`validate`] samples an expression.
pub const SAMPLE_POINTS: [f64; 5] = [0.0, 1.0, -1.0, 0.5, -0.5];

/// Selects and parameterizes a potential.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PotentialConfig {
    /// `V = 0`.
    Free,
    /// `V = v0` for `|x - x0| < width / 2`, otherwise 0.
    Barrier { v0: f64, x0: f64, width: f64 },
    /// `V = -v0` for `|x - x0| < width / 2`, otherwise 0.
    Well { v0: f64, x0: f64, width: f64 },
    /// `V = m ω² (x - x0)² / 2`.
    Harmonic { omega: f64, x0: f64 },
    /// `V` given by an expression in `x` and the potential parameters.
    CustomFunction { expression: String },
    /// `V` drawn as a sequence of control points, linearly interpolated.
    CustomDraw { points: Vec<ControlPoint> },
}

impl Default for PotentialConfig {
    fn default() -> Self { Self::Free }
}

impl PotentialConfig {
    /// The user expression, if this is a custom function.
    pub fn expression(&self) -> Option<&str> {
        match self {
            Self::CustomFunction { expression } => Some(expression),
            _ => None,
        }
    }

    /// Check that every number in a preset shape or drawn curve is finite.
    pub fn check(&self) -> Result<(), ValidationError> {
        match self {
            Self::Free | Self::CustomFunction { .. } => Ok(()),
            Self::Barrier { v0, x0, width } | Self::Well { v0, x0, width } => {
                ValidationError::check_finite("v0", *v0)?;
                ValidationError::check_finite("x0", *x0)?;
                ValidationError::check_finite("width", *width)
            },
            Self::Harmonic { omega, x0 } => {
                ValidationError::check_finite("omega", *omega)?;
                ValidationError::check_finite("x0", *x0)
            },
            Self::CustomDraw { points } => {
                points.iter()
                    .try_for_each(|p| {
                        ValidationError::check_finite("x", p.x)?;
                        ValidationError::check_finite("y", p.y)
                    })
            },
        }
    }
}

// value of a rectangular region of height `v0` centered on `x0`
fn rect(x: f64, v0: f64, x0: f64, width: f64) -> f64 {
    if (x - x0).abs() < width / 2.0 { v0 } else { 0.0 }
}

/// Evaluate a potential over the coordinates `x`.
///
/// Custom expressions are evaluated with the parameters plus `x` in scope.
/// Evaluation stops at the first grid point where the expression fails and
/// the failure is returned; no partial potential is produced.
pub fn generate<S, B>(
    x: &Arr1<S>,
    config: &PotentialConfig,
    mass: f64,
    params: &B,
) -> PResult<nd::Array1<f64>>
where
    S: nd::Data<Elem = f64>,
    B: Bindings + ?Sized,
{
    let V: nd::Array1<f64>
        = match config {
            PotentialConfig::Free => nd::Array1::zeros(x.len()),
            PotentialConfig::Barrier { v0, x0, width } => {
                x.mapv(|xk| rect(xk, *v0, *x0, *width))
            },
            PotentialConfig::Well { v0, x0, width } => {
                x.mapv(|xk| rect(xk, -*v0, *x0, *width))
            },
            PotentialConfig::Harmonic { omega, x0 } => {
                x.mapv(|xk| 0.5 * mass * omega.powi(2) * (xk - x0).powi(2))
            },
            PotentialConfig::CustomFunction { expression } => {
                let expr = Expr::parse(expression)?;
                let scope = Scope::new(params);
                x.iter()
                    .map(|&xk| {
                        expr.eval(&scope.with_x(xk))
                            .map_err(|source| {
                                PotentialError::Sample { x: xk, source }
                            })
                    })
                    .collect::<PResult<nd::Array1<f64>>>()?
            },
            PotentialConfig::CustomDraw { points } => {
                let mut points = points.clone();
                interp::sort_points(&mut points);
                interp::sample_linear(x, &points)
            },
        };
    Ok(V)
}

/// Check that a potential expression evaluates to a finite number at each of
/// the [`SAMPLE_POINTS`], reporting the first failure.
///
/// This is advisory; [`generate`] does not call it.
pub fn validate<B>(expression: &str, params: &B) -> Result<(), ValidationError>
where B: Bindings + ?Sized
{
    let expr = Expr::parse(expression).map_err(ValidationError::Parse)?;
    let scope = Scope::new(params);
    SAMPLE_POINTS.iter()
        .try_for_each(|&x| {
            expr.eval(&scope.with_x(x))
                .map(|_| ())
                .map_err(|source| ValidationError::Sample { x, source })
        })
}
