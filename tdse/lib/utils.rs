//! Miscellaneous tools.

use std::f64::consts::TAU;
use ndarray::{ self as nd, Ix1 };

/// Calculate the norm of a wavefunction stored as separate real and imaginary
/// parts, i.e. `Σ (re² + im²) dx`.
///
/// This is a plain rectangle-rule sum, which is exact for the periodic grids
/// used by the spectral solver.
pub fn wf_norm<S, T>(
    re: &nd::ArrayBase<S, Ix1>,
    im: &nd::ArrayBase<T, Ix1>,
    dx: f64,
) -> f64
where
    S: nd::Data<Elem = f64>,
    T: nd::Data<Elem = f64>,
{
    re.iter().zip(im)
        .map(|(rk, ik)| rk * rk + ik * ik)
        .sum::<f64>() * dx
}

/// Renormalize a wavefunction in place, returning its norm before rescaling.
///
/// A wavefunction with zero norm is left untouched.
pub fn wf_renormalize<S, T>(
    re: &mut nd::ArrayBase<S, Ix1>,
    im: &mut nd::ArrayBase<T, Ix1>,
    dx: f64,
) -> f64
where
    S: nd::DataMut<Elem = f64>,
    T: nd::DataMut<Elem = f64>,
{
    let norm = wf_norm(re, im, dx);
    if norm > 0.0 && norm.is_finite() {
        let scale = norm.sqrt().recip();
        re.map_inplace(|rk| { *rk *= scale; });
        im.map_inplace(|ik| { *ik *= scale; });
    }
    norm
}

/// Generate the array of angular wavenumbers accompanying an FFT of `n`
/// points over a periodic domain of length `len`, in FFT ordering.
///
/// The first `n / 2` entries are non-negative; the rest are the negative
/// frequencies, so that `k[n / 2] = -(n / 2) dk`.
pub fn fft_wavenumbers(n: usize, len: f64) -> nd::Array1<f64> {
    let dk = TAU / len;
    let half = n / 2;
    (0..n)
        .map(|i| {
            if i < half {
                i as f64 * dk
            } else {
                (i as f64 - n as f64) * dk
            }
        })
        .collect()
}

/// Return `n` rounded up to the nearest power of two.
pub fn next_pow2(n: usize) -> usize { n.next_power_of_two() }
