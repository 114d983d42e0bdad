//! Piecewise-linear interpolation through user-drawn control points.
//!
//! Outside the span of the control points the interpolant holds the value of
//! the nearest endpoint; it is never extended along the first or last segment.
//!
//! ```
//! use ndarray as nd;
//! use tdse::interp::{ ControlPoint, sample_linear };
//!
//! let points = [ControlPoint::new(-1.0, 0.0), ControlPoint::new(1.0, 4.0)];
//! let x = nd::array![-3.0, -1.0, 0.0, 0.5, 1.0, 3.0];
//! let y = sample_linear(&x, &points);
//! assert_eq!(y.to_vec(), vec![0.0, 0.0, 2.0, 3.0, 4.0, 4.0]);
//! ```

use std::cmp::Ordering;
use ndarray as nd;
use serde::{ Deserialize, Serialize };

/// A single `(x, y)` control point.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub x: f64,
    pub y: f64,
}

impl ControlPoint {
    pub fn new(x: f64, y: f64) -> Self { Self { x, y } }
}

impl From<(f64, f64)> for ControlPoint {
    fn from(xy: (f64, f64)) -> Self { Self::new(xy.0, xy.1) }
}

/// Sort control points by their `x` coordinate, in place.
///
/// The sort is stable, so points sharing an `x` keep their drawing order.
pub fn sort_points(points: &mut [ControlPoint]) {
    points.sort_by(|l, r| l.x.partial_cmp(&r.x).unwrap_or(Ordering::Equal));
}

/// Evaluate the interpolant at `x`.
///
/// `points` must be sorted by `x`. Returns 0 when there are no points.
pub fn linear(points: &[ControlPoint], x: f64) -> f64 {
    let (first, last)
        = match (points.first(), points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => { return 0.0; },
        };
    if x <= first.x { return first.y; }
    if x >= last.x { return last.y; }
    // first point strictly to the right of `x`; 1 <= j < len here
    let j = points.partition_point(|p| p.x <= x);
    let (l, r) = (points[j - 1], points[j]);
    let span = r.x - l.x;
    if span <= 0.0 { return r.y; }
    l.y + (r.y - l.y) * (x - l.x) / span
}

/// Sample the interpolant over an array of coordinates.
///
/// `points` must be sorted by `x`.
pub fn sample_linear<S>(
    x: &nd::ArrayBase<S, nd::Ix1>,
    points: &[ControlPoint],
) -> nd::Array1<f64>
where S: nd::Data<Elem = f64>
{
    x.mapv(|xk| linear(points, xk))
}
