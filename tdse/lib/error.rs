//! Collection of all error types.
//!
//! All errors derive [`thiserror::Error`], making them composable when allowed
//! and compatible with application code using [`anyhow`][anyhow].
//!
//! [anyhow]: https://crates.io/crates/anyhow

use ndarray as nd;
use thiserror::Error;

/// Returned when an expression cannot be parsed or evaluated.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum EvalError {
    /// Returned for an expression containing nothing but whitespace.
    #[error("expression is empty")]
    Empty,

    /// Returned when a character outside the expression grammar is
    /// encountered.
    #[error("invalid character {ch:?} at position {pos}")]
    InvalidCharacter { ch: char, pos: usize },

    /// Returned when a token appears where the grammar does not allow it.
    #[error("unexpected {found} at position {pos}")]
    UnexpectedToken { found: String, pos: usize },

    /// Returned when the expression ends in the middle of a construct.
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// Returned when a name is called like a function but is not one.
    #[error("unknown function {0:?}")]
    UnknownFunction(String),

    /// Returned when a function name is used without an argument list.
    #[error("function {0:?} must be called with parentheses")]
    MissingCall(String),

    /// Returned when an identifier has no value in the evaluation bindings.
    #[error("unbound identifier {0:?}")]
    Unbound(String),

    /// Returned when an expression nests more deeply than the parser
    /// allows.
    #[error("expression is nested more than {0} levels deep")]
    TooDeep(usize),

    /// Returned when evaluation produces NaN or an infinity.
    #[error("expression evaluated to a non-finite value ({0})")]
    NonFinite(f64),
}

/// Returned when a potential array does not have one sample per grid point.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[error("expected an array with {expected} elements to match the grid; got {got}")]
pub struct DimensionError {
    pub expected: usize,
    pub got: usize,
}

impl DimensionError {
    pub(crate) fn check<S, A>(expected: usize, a: &nd::ArrayBase<S, nd::Ix1>)
        -> Result<(), Self>
    where S: nd::Data<Elem = A>
    {
        let got = a.len();
        (got == expected).then_some(()).ok_or(Self { expected, got })
    }
}

/// Returned from [`potential::generate`][crate::potential::generate].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PotentialError {
    /// The custom expression could not be parsed at all.
    #[error("invalid potential expression: {0}")]
    Expression(#[from] EvalError),

    /// The custom expression failed at a particular grid point.
    #[error("potential expression failed at x = {x}: {source}")]
    Sample {
        x: f64,
        #[source]
        source: EvalError,
    },
}

/// Advisory result of the `validate` helpers in
/// [`potential`][crate::potential] and [`wavefunction`][crate::wavefunction].
///
/// Never raised during normal evaluation; callers use it to refuse a
/// configuration before committing to it.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ValidationError {
    /// The expression does not parse.
    #[error("expression does not parse: {0}")]
    Parse(#[source] EvalError),

    /// The expression parses but fails at one of the sample coordinates.
    #[error("expression fails at x = {x}: {source}")]
    Sample {
        x: f64,
        #[source]
        source: EvalError,
    },

    /// A preset shape was given a NaN or infinite value.
    #[error("{name} must be finite; got {value}")]
    NonFinite { name: &'static str, value: f64 },

    /// A preset width, length, or mode number is not strictly positive.
    #[error("{name} must be greater than 0; got {value}")]
    NonPositive { name: &'static str, value: f64 },
}

impl ValidationError {
    pub(crate) fn check_finite(name: &'static str, value: f64)
        -> Result<(), Self>
    {
        value.is_finite().then_some(())
            .ok_or(Self::NonFinite { name, value })
    }

    pub(crate) fn check_positive(name: &'static str, value: f64)
        -> Result<(), Self>
    {
        Self::check_finite(name, value)?;
        (value > 0.0).then_some(())
            .ok_or(Self::NonPositive { name, value })
    }
}

/// Returned when creating, inserting, or addressing parameters.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParamError {
    /// Names must start with a letter and contain only ASCII letters and
    /// digits.
    #[error("parameter names must start with a letter and contain only letters and digits; got {0:?}")]
    InvalidName(String),

    /// Names must be at least two characters long.
    #[error("parameter names must be at least 2 characters long; got {0:?}")]
    TooShort(String),

    /// Names may not shadow variables, constants, or functions.
    #[error("{0:?} is a reserved identifier")]
    Reserved(String),

    #[error("a parameter named {0:?} already exists")]
    Duplicate(String),

    #[error("no parameter named {0:?}")]
    Unknown(String),
}

/// Returned when constructing a [`SpectralSolver`][crate::solver::SpectralSolver].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SolverError {
    /// Returned when fewer than two grid points are requested.
    #[error("grid size must be at least 2; got {0}")]
    BadGridSize(usize),

    /// Returned when the spatial bounds are empty, inverted, or non-finite.
    #[error("spatial bounds must satisfy x_min < x_max; got ({0}, {1})")]
    BadBounds(f64, f64),

    /// Returned when `hbar`, `mass`, or `dt` is not strictly positive.
    #[error("{name} must be greater than 0; got {value}")]
    NonPositive { name: &'static str, value: f64 },
}

impl SolverError {
    pub(crate) fn check_positive(name: &'static str, value: f64)
        -> Result<(), Self>
    {
        (value > 0.0 && value.is_finite()).then_some(())
            .ok_or(Self::NonPositive { name, value })
    }

    pub(crate) fn check_bounds(x_min: f64, x_max: f64) -> Result<(), Self> {
        (x_min.is_finite() && x_max.is_finite() && x_min < x_max)
            .then_some(())
            .ok_or(Self::BadBounds(x_min, x_max))
    }
}

/// Returned from the [`Simulation`][crate::sim::Simulation] driver and
/// [`Snapshot`][crate::sim::Snapshot] persistence.
#[derive(Debug, Error)]
pub enum SimError {
    /// [`SolverError`]
    #[error("solver error: {0}")]
    Solver(#[from] SolverError),

    /// [`PotentialError`]
    #[error("potential error: {0}")]
    Potential(#[from] PotentialError),

    /// [`ValidationError`]
    #[error("invalid custom function: {0}")]
    Validation(#[from] ValidationError),

    /// [`DimensionError`]
    #[error("array length error: {0}")]
    Dimension(#[from] DimensionError),

    /// [`ParamError`]
    #[error("parameter error: {0}")]
    Param(#[from] ParamError),

    /// Returned when a snapshot's real and imaginary arrays differ in length.
    #[error("snapshot arrays have incompatible lengths; got {0} and {1}")]
    SnapshotShape(usize, usize),

    /// [`serde_json::Error`]
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
