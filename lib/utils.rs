//! Miscellaneous tools.

use ndarray as nd;
use num_complex::Complex64 as C64;
use rustfft as fft;

/// `M` evenly spaced points from `bounds.0` to `bounds.1` inclusive. A single
/// point is placed at `bounds.0`.
pub fn linspace(bounds: (f64, f64), m: usize) -> nd::Array1<f64> {
    let (a, b) = bounds;
    match m {
        0 => nd::Array1::zeros(0),
        1 => nd::array![a],
        _ => {
            let step = (b - a) / (m - 1) as f64;
            (0..m).map(|k| a + k as f64 * step).collect()
        },
    }
}

/// `2^e` as a float; underflows to zero or overflows to infinity outside the
/// representable range.
pub fn pow2(e: i32) -> f64 { 2.0_f64.powi(e) }

/// Perform the one-dimensional, complex-valued FFT in place.
pub fn fft_inplace(planner: &mut fft::FftPlanner<f64>, x: &mut [C64]) {
    let n: usize = x.len();
    let fft_plan = planner.plan_fft_forward(n);
    fft_plan.process(x);
}

/// Perform the one-dimensional, complex-valued inverse FFT in place.
pub fn ifft_inplace(planner: &mut fft::FftPlanner<f64>, x: &mut [C64]) {
    let n: usize = x.len();
    let ifft_plan = planner.plan_fft_inverse(n);
    ifft_plan.process(x);
    let n = n as f64;
    x.iter_mut().for_each(|xk| { *xk /= n; });
}

/// Copy into a zero-filled buffer of length `n`.
///
/// *Panics if `n` is less than the length of `x`*.
pub fn padded(x: &[C64], n: usize) -> Vec<C64> {
    let mut buf = vec![C64::new(0.0, 0.0); n];
    buf[..x.len()].copy_from_slice(x);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn linspace_edges() {
        assert_eq!(linspace((-2.0, 2.0), 1).to_vec(), vec![-2.0]);
        assert_eq!(linspace((-2.0, 2.0), 5).to_vec(), vec![-2.0, -1.0, 0.0, 1.0, 2.0]);
        assert_eq!(linspace((0.0, 1.0), 0).len(), 0);
    }

    #[test]
    fn pow2_range() {
        assert_eq!(pow2(10), 1024.0);
        assert_eq!(pow2(-1), 0.5);
        assert_eq!(pow2(-2000), 0.0);
        assert!(pow2(2000).is_infinite());
    }
}
