//! Named, bounded numerical parameters used to instantiate expressions.
//!
//! Every [`Parameter`] keeps its value inside `[min, max]`: values are clamped
//! on construction, on deserialization, and on every
//! [`update`][Parameter::update]. Fields are read through accessors so the
//! value cannot be set around the clamp. Range edits through
//! [`set_range`][Parameter::set_range] are taken as given; the next update
//! re-clamps.

use std::{
    collections::{ BTreeMap, BTreeSet },
    f64::consts::PI,
};
use serde::{ Deserialize, Serialize };
use crate::{
    error::ParamError,
    expr::{ is_reserved, Bindings },
};

pub type ParamResult<T> = Result<T, ParamError>;

/// Tolerance used by [`Parameter::bound`].
pub const BOUND_EPSILON: f64 = 1e-10;

pub const DEFAULT_VALUE: f64 = 1.0;
pub const DEFAULT_MIN: f64 = -10.0;
pub const DEFAULT_MAX: f64 = 10.0;
pub const DEFAULT_STEP: f64 = 0.1;

/// A single named value with a slider range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawParameter")]
pub struct Parameter {
    name: String,
    value: f64,
    min: f64,
    max: f64,
    step: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

// wire form of a `Parameter`, before clamping
#[derive(Deserialize)]
struct RawParameter {
    name: String,
    value: f64,
    min: f64,
    max: f64,
    step: f64,
    #[serde(default)]
    description: Option<String>,
}

impl From<RawParameter> for Parameter {
    fn from(raw: RawParameter) -> Self {
        let RawParameter { name, value, min, max, step, description } = raw;
        Self { value: clamp(value, min, max), name, min, max, step, description }
    }
}

/// Selects which part of a parameter's range to edit.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeField {
    Min,
    Max,
    Step,
}

/// Which end of its range a parameter sits at.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Bound {
    Min,
    Max,
}

/// Check that `name` may be used for a user-created parameter.
pub fn validate_name(name: &str) -> ParamResult<()> {
    let mut chars = name.chars();
    let well_formed
        = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric());
    if !well_formed { return Err(ParamError::InvalidName(name.to_string())); }
    if name.len() < 2 { return Err(ParamError::TooShort(name.to_string())); }
    if is_reserved(name) { return Err(ParamError::Reserved(name.to_string())); }
    Ok(())
}

// clamp without panicking on an inverted range (which `f64::clamp` would)
fn clamp(value: f64, min: f64, max: f64) -> f64 { value.max(min).min(max) }

impl Parameter {
    /// Create a new parameter, validating its name and clamping `value` into
    /// `[min, max]`.
    pub fn new(name: &str, value: f64, min: f64, max: f64, step: f64)
        -> ParamResult<Self>
    {
        validate_name(name)?;
        Ok(Self::unchecked(name, value, min, max, step))
    }

    /// Create a new parameter with value 1 on the range `[-10, 10]` in steps
    /// of 0.1.
    pub fn with_defaults(name: &str) -> ParamResult<Self> {
        Self::new(name, DEFAULT_VALUE, DEFAULT_MIN, DEFAULT_MAX, DEFAULT_STEP)
    }

    fn unchecked(name: &str, value: f64, min: f64, max: f64, step: f64)
        -> Self
    {
        Self {
            name: name.to_string(),
            value: clamp(value, min, max),
            min,
            max,
            step,
            description: None,
        }
    }

    pub fn name(&self) -> &str { &self.name }

    /// Current value, always within `[min, max]` unless the range was edited
    /// since the last update.
    pub fn value(&self) -> f64 { self.value }

    pub fn min(&self) -> f64 { self.min }

    pub fn max(&self) -> f64 { self.max }

    pub fn step(&self) -> f64 { self.step }

    pub fn description(&self) -> Option<&str> { self.description.as_deref() }

    /// Attach a description.
    pub fn described(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Set the value, clamped into the current range.
    pub fn update(&mut self, value: f64) -> &mut Self {
        self.value = clamp(value, self.min, self.max);
        self
    }

    /// Edit one end of the range or the step size.
    ///
    /// The current value is *not* re-clamped against the new range.
    pub fn set_range(&mut self, field: RangeField, value: f64) -> &mut Self {
        match field {
            RangeField::Min => { self.min = value; },
            RangeField::Max => { self.max = value; },
            RangeField::Step => { self.step = value; },
        }
        self
    }

    /// Report whether the value sits at either end of its range, within
    /// [`BOUND_EPSILON`].
    pub fn bound(&self) -> Option<Bound> {
        if (self.value - self.min).abs() < BOUND_EPSILON {
            Some(Bound::Min)
        } else if (self.value - self.max).abs() < BOUND_EPSILON {
            Some(Bound::Max)
        } else {
            None
        }
    }

    pub fn is_at_bound(&self) -> bool { self.bound().is_some() }
}

// (patterns, value, min, max, step, description)
type Role = (&'static [&'static str], f64, f64, f64, f64, &'static str);

const ROLES: [Role; 10] = [
    (&["A", "amp", "amplitude", "V0", "height", "depth"],
        1.0, 0.0, 10.0, 0.1, "amplitude"),
    (&["omega", "w", "angfreq"],
        1.0, 0.1, 10.0, 0.1, "angular frequency"),
    (&["f", "freq", "frequency", "nu"],
        1.0, 0.0, 10.0, 0.1, "frequency"),
    (&["phi", "phase", "theta", "delta"],
        0.0, -PI, PI, 0.01, "phase"),
    (&["sigma", "width", "s", "a"],
        1.0, 0.1, 5.0, 0.1, "width"),
    (&["x0", "center", "centre", "mu", "pos"],
        0.0, -10.0, 10.0, 0.1, "center position"),
    (&["c", "offset", "shift", "b"],
        0.0, -10.0, 10.0, 0.1, "offset"),
    (&["scale", "alpha", "beta", "lambda"],
        1.0, 0.1, 10.0, 0.1, "scale"),
    (&["m", "mass"],
        1.0, 0.1, 10.0, 0.1, "mass"),
    (&["hbar", "h"],
        1.0, 0.1, 10.0, 0.1, "reduced Planck constant"),
];

/// Suggest a parameter for `name`, guessing a sensible default value and range
/// from the physical role the name usually plays.
///
/// Matching is case-insensitive except for single-letter names. Unrecognized
/// names get value 1 on `[-10, 10]` with step 0.1. The name itself is not
/// validated, so single-letter names found in expressions can be suggested.
pub fn suggest(name: &str) -> Parameter {
    let matches = |pattern: &str| {
        if pattern.len() == 1 {
            pattern == name
        } else {
            pattern.eq_ignore_ascii_case(name)
        }
    };
    ROLES.iter()
        .find(|(patterns, ..)| patterns.iter().any(|p| matches(p)))
        .map(|(_, value, min, max, step, descr)| {
            Parameter::unchecked(name, *value, *min, *max, *step)
                .described(descr)
        })
        .unwrap_or_else(|| {
            Parameter::unchecked(
                name, DEFAULT_VALUE, DEFAULT_MIN, DEFAULT_MAX, DEFAULT_STEP)
        })
}

/// Find every name in `expression` that looks like a parameter.
///
/// A candidate is any identifier (a letter followed by letters or digits) that
/// is not reserved and is not immediately followed by `(`. Numeric literals,
/// including exponents like `1e-3`, are skipped. This is a lexical scan and
/// does not require the expression to be well-formed.
pub fn extract_names(expression: &str) -> BTreeSet<String> {
    let chars: Vec<char> = expression.chars().collect();
    let mut names: BTreeSet<String> = BTreeSet::new();
    let mut i: usize = 0;
    while let Some(&c) = chars.get(i) {
        if c.is_ascii_digit() || c == '.' {
            while chars.get(i)
                .is_some_and(|d| d.is_ascii_digit() || *d == '.')
            {
                i += 1;
            }
            let exp_digit = |j: usize| {
                chars.get(j).is_some_and(|d| d.is_ascii_digit())
            };
            if matches!(chars.get(i), Some('e' | 'E'))
                && (exp_digit(i + 1)
                    || (matches!(chars.get(i + 1), Some('+' | '-'))
                        && exp_digit(i + 2)))
            {
                i += 2;
                while exp_digit(i) { i += 1; }
            }
        } else if c.is_ascii_alphabetic() {
            let start = i;
            while chars.get(i).is_some_and(|d| d.is_ascii_alphanumeric()) {
                i += 1;
            }
            let name: String = chars[start..i].iter().collect();
            let is_call
                = chars[i..].iter()
                .find(|d| !d.is_whitespace())
                .is_some_and(|d| *d == '(');
            if !is_call && !is_reserved(&name) { names.insert(name); }
        } else {
            i += 1;
        }
    }
    names
}

/// A collection of uniquely named parameters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Parameter>", into = "BTreeMap<String, Parameter>")]
pub struct ParameterSet {
    params: BTreeMap<String, Parameter>,
}

impl From<BTreeMap<String, Parameter>> for ParameterSet {
    fn from(mut params: BTreeMap<String, Parameter>) -> Self {
        params.iter_mut()
            .for_each(|(name, p)| {
                p.name.clone_from(name);
                p.value = clamp(p.value, p.min, p.max);
            });
        Self { params }
    }
}

impl From<ParameterSet> for BTreeMap<String, Parameter> {
    fn from(set: ParameterSet) -> Self { set.params }
}

impl ParameterSet {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.params.len() }

    pub fn is_empty(&self) -> bool { self.params.is_empty() }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.get(name)
    }

    /// Iterate over all parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> + '_ {
        self.params.values()
    }

    /// Add a parameter, refusing duplicate names.
    pub fn insert(&mut self, param: Parameter) -> ParamResult<&mut Parameter> {
        if self.params.contains_key(&param.name) {
            return Err(ParamError::Duplicate(param.name));
        }
        let name = param.name.clone();
        Ok(self.params.entry(name).or_insert(param))
    }

    /// Validate `name`, then add a new parameter built from the given values.
    pub fn create(
        &mut self,
        name: &str,
        value: f64,
        min: f64,
        max: f64,
        step: f64,
    ) -> ParamResult<&mut Parameter>
    {
        if self.contains(name) {
            return Err(ParamError::Duplicate(name.to_string()));
        }
        self.insert(Parameter::new(name, value, min, max, step)?)
    }

    /// Set the value of a named parameter (clamped), returning the value
    /// actually stored.
    pub fn update(&mut self, name: &str, value: f64) -> ParamResult<f64> {
        self.params.get_mut(name)
            .map(|p| p.update(value).value)
            .ok_or_else(|| ParamError::Unknown(name.to_string()))
    }

    /// Edit the range of a named parameter.
    pub fn set_range(&mut self, name: &str, field: RangeField, value: f64)
        -> ParamResult<()>
    {
        self.params.get_mut(name)
            .map(|p| { p.set_range(field, value); })
            .ok_or_else(|| ParamError::Unknown(name.to_string()))
    }

    pub fn remove(&mut self, name: &str) -> Option<Parameter> {
        self.params.remove(name)
    }

    /// Copy out the current name → value mapping.
    pub fn bindings(&self) -> BTreeMap<String, f64> {
        self.params.iter()
            .map(|(name, p)| (name.clone(), p.value))
            .collect()
    }

    /// Bring the set in line with a group of expressions: every name they
    /// reference gets a [suggested][suggest] parameter if it has none, and
    /// parameters no longer referenced are dropped.
    ///
    /// Returns the names that were added.
    pub fn sync<'a, I>(&mut self, expressions: I) -> Vec<String>
    where I: IntoIterator<Item = &'a str>
    {
        let wanted: BTreeSet<String>
            = expressions.into_iter().flat_map(extract_names).collect();
        self.params.retain(|name, _| wanted.contains(name));
        let added: Vec<String>
            = wanted.into_iter()
            .filter(|name| !self.params.contains_key(name))
            .collect();
        added.iter()
            .for_each(|name| { self.params.insert(name.clone(), suggest(name)); });
        added
    }
}

impl Bindings for ParameterSet {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.params.get(name).map(|p| p.value)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use crate::expr::{ evaluate, Scope };
    use super::*;

    #[test]
    fn clamps_on_create_and_update() {
        let mut p = Parameter::new("amp", 20.0, -1.0, 5.0, 0.5).unwrap();
        assert_eq!(p.value, 5.0);
        assert_eq!(p.bound(), Some(Bound::Max));
        p.update(-3.0);
        assert_eq!(p.value, -1.0);
        assert_eq!(p.bound(), Some(Bound::Min));
        p.update(2.0);
        assert_eq!(p.value, 2.0);
        assert!(!p.is_at_bound());
    }

    #[test]
    fn range_edits_do_not_reclamp() {
        let mut p = Parameter::with_defaults("gamma").unwrap();
        p.update(8.0);
        p.set_range(RangeField::Max, 4.0).set_range(RangeField::Step, 0.5);
        assert_eq!(p.value, 8.0);
        assert_eq!(p.step, 0.5);
        p.update(p.value);
        assert_eq!(p.value, 4.0);
    }

    #[test]
    fn name_rules() {
        assert!(validate_name("k0").is_ok());
        assert!(validate_name("Omega2").is_ok());
        assert_eq!(validate_name("k"), Err(ParamError::TooShort("k".to_string())));
        assert_eq!(validate_name("0k"), Err(ParamError::InvalidName("0k".to_string())));
        assert_eq!(validate_name("a_b"), Err(ParamError::InvalidName("a_b".to_string())));
        assert_eq!(validate_name(""), Err(ParamError::InvalidName(String::new())));
        assert_eq!(validate_name("pi"), Err(ParamError::Reserved("pi".to_string())));
        assert_eq!(validate_name("sqrt"), Err(ParamError::Reserved("sqrt".to_string())));
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut set = ParameterSet::new();
        set.create("V0", 5.0, 0.0, 10.0, 0.5).unwrap();
        assert_eq!(
            set.create("V0", 1.0, 0.0, 10.0, 0.5).unwrap_err(),
            ParamError::Duplicate("V0".to_string()),
        );
        assert_eq!(
            set.update("nope", 1.0),
            Err(ParamError::Unknown("nope".to_string())),
        );
        assert_eq!(set.update("V0", 11.0), Ok(10.0));
    }

    #[test]
    fn extract_from_expression() {
        let names = extract_names("A*sin(k*x+phi)");
        let expected: BTreeSet<String>
            = ["A", "k", "phi"].into_iter().map(String::from).collect();
        assert_eq!(names, expected);
        let bindings = [("A", 2.0), ("k", 1.0), ("phi", 0.0)];
        let scope = Scope::new(&bindings).with_x(0.0);
        assert_relative_eq!(evaluate("A*sin(k*x+phi)", &scope).unwrap(), 0.0);
    }

    #[test]
    fn extract_skips_literals_calls_and_reserved() {
        let names = extract_names("1e-3 * exp (-x^2/w) + 2.5E4*k0 - pi*e*t + f(x)");
        let expected: BTreeSet<String>
            = ["k0", "w"].into_iter().map(String::from).collect();
        assert_eq!(names, expected);
        assert!(extract_names("if true else false").is_empty());
    }

    #[test]
    fn suggestions() {
        let phase = suggest("phi");
        assert_eq!((phase.value, phase.min, phase.max), (0.0, -PI, PI));
        let omega = suggest("Omega");
        assert_eq!((omega.value, omega.min, omega.max), (1.0, 0.1, 10.0));
        let width = suggest("sigma");
        assert_eq!(width.description.as_deref(), Some("width"));
        let other = suggest("zeta");
        assert_eq!(
            (other.value, other.min, other.max, other.step),
            (1.0, -10.0, 10.0, 0.1),
        );
        assert_eq!(other.description, None);
        // single-letter patterns are case-sensitive
        assert_eq!(suggest("A").description.as_deref(), Some("amplitude"));
        assert_eq!(suggest("W").description, None);
    }

    #[test]
    fn sync_adds_and_drops() {
        let mut set = ParameterSet::new();
        set.create("old", 3.0, 0.0, 5.0, 1.0).unwrap();
        set.create("omega", 2.0, 0.0, 5.0, 1.0).unwrap();
        let added = set.sync(["0.5*omega^2*(x-x0)^2", "A*cos(x)"]);
        assert_eq!(added, vec!["A".to_string(), "x0".to_string()]);
        assert!(!set.contains("old"));
        assert_eq!(set.get("omega").map(|p| p.value), Some(2.0));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn bindings_match_set() {
        let mut set = ParameterSet::new();
        set.create("amp", 2.0, 0.0, 5.0, 0.5).unwrap();
        set.create("w0", 0.5, 0.0, 5.0, 0.5).unwrap();
        let map = set.bindings();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("w0"), Some(&0.5));
        let from_map = evaluate("amp * x + w0", &Scope::new(&map).with_x(1.0));
        let from_set = evaluate("amp * x + w0", &Scope::new(&set).with_x(1.0));
        assert_eq!(from_map, Ok(2.5));
        assert_eq!(from_map, from_set);
    }

    #[test]
    fn lone_parameter_clamped_on_deserialize() {
        let json = r#"{"name": "amp", "value": -4.0, "min": 0.0, "max": 10.0, "step": 0.1}"#;
        let p: Parameter = serde_json::from_str(json).unwrap();
        assert_eq!(p.value(), 0.0);
        assert_eq!(p.bound(), Some(Bound::Min));
        assert_eq!(p.description(), None);
        let back: Parameter
            = serde_json::from_str(&serde_json::to_string(&p).unwrap()).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn serde_reclamps() {
        let json = r#"{"amp": {"name": "amp", "value": 50.0, "min": 0.0, "max": 10.0, "step": 0.1}}"#;
        let set: ParameterSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.get("amp").map(|p| p.value), Some(10.0));
        let back = serde_json::to_string(&set).unwrap();
        assert!(back.contains("\"value\":10.0"));
        assert!(!back.contains("description"));
    }
}
