//! Polynomial (exponential-sum) form of the transfer matrix.
//!
//! For the single-level schemes every local matrix is a Laurent polynomial in
//! `w = exp(iξ·dt/m)` with ξ-independent coefficients, e.g. for 2SPLIT1A
//! ```text
//! L(w) = E_Q(dt) · diag(w^-1, w)
//! ```
//! and hence so is their product. Building the product once (a balanced
//! product tree with FFT-based coefficient convolution) turns each later
//! evaluation into a Horner pass over `O(D)` coefficients. As with the
//! sample-by-sample products, every node of the tree may be rescaled by a
//! power of two whose exponent is carried alongside the coefficients.

use num_complex::Complex64 as C64;
use rustfft as fft;
use crate::{
    error::{ ConfigError, ConfigResult, PResult, PropagationError },
    field::{ Coupling, SampledField },
    mat2::Mat2,
    scheme::{ Discretization, Splitting },
    transfer::{ Scaled, TransferRepr, RESCALE_EXP },
    utils::{ fft_inplace, ifft_inplace, padded, pow2 },
};

// products where either factor has at most this many coefficients are formed
// by direct convolution
const DIRECT_MAX: usize = 32;

/// A 2×2 matrix of Laurent polynomials sharing one lowest exponent and one
/// power-of-two scale: entry `(i, j)` is `2^exp2 · Σ_k c_ij[k] w^(offset + k)`.
#[derive(Clone, Debug, PartialEq)]
pub struct PolyMat2 {
    offset: i64,
    exp2: i32,
    coeffs: [Vec<C64>; 4],
}

impl PolyMat2 {
    /// A matrix of constant polynomials.
    pub fn constant(m: &Mat2) -> Self {
        Self { offset: 0, exp2: 0, coeffs: m.0.map(|x| vec![x]) }
    }

    /// `diag(w^-j, w^j)`.
    pub fn phase(j: u32) -> Self {
        let j = j as usize;
        let zero = C64::new(0.0, 0.0);
        let mut coeffs: [Vec<C64>; 4] = std::array::from_fn(|_| vec![zero; 2 * j + 1]);
        coeffs[0][0] = C64::new(1.0, 0.0);
        coeffs[3][2 * j] = C64::new(1.0, 0.0);
        Self { offset: -(j as i64), exp2: 0, coeffs }
    }

    /// Number of coefficients per entry.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize { self.coeffs[0].len() }

    pub fn get_offset(&self) -> i64 { self.offset }

    pub fn get_exp2(&self) -> i32 { self.exp2 }

    /// Largest coefficient modulus, not counting the power-of-two scale.
    pub fn max_norm(&self) -> f64 {
        self.coeffs.iter().flatten().map(|c| c.norm()).fold(0.0, f64::max)
    }

    /// Move a power of two from the coefficients into the scale once the
    /// largest coefficient leaves `[2^-RESCALE_EXP, 2^RESCALE_EXP]`.
    pub fn renormalize(&mut self) {
        let m = self.max_norm();
        let lim = pow2(RESCALE_EXP);
        if m.is_finite() && (m > lim || (m > 0.0 && m < lim.recip())) {
            let e = m.log2().round() as i32;
            let s = pow2(-e);
            self.coeffs.iter_mut().flatten().for_each(|c| { *c *= s; });
            self.exp2 += e;
        }
    }

    fn mul_direct(&self, rhs: &Self) -> [Vec<C64>; 4] {
        let n = self.len() + rhs.len() - 1;
        let mut out: [Vec<C64>; 4]
            = std::array::from_fn(|_| vec![C64::new(0.0, 0.0); n]);
        for i in 0..2 {
            for j in 0..2 {
                let o = &mut out[2 * i + j];
                for k in 0..2 {
                    let a = &self.coeffs[2 * i + k];
                    let b = &rhs.coeffs[2 * k + j];
                    for (p, ap) in a.iter().enumerate() {
                        for (s, bs) in b.iter().enumerate() {
                            o[p + s] += ap * bs;
                        }
                    }
                }
            }
        }
        out
    }

    fn mul_fft(&self, rhs: &Self) -> [Vec<C64>; 4] {
        let n = self.len() + rhs.len() - 1;
        let nfft = n.next_power_of_two();
        let mut planner = fft::FftPlanner::new();
        let mut transform = |c: &Vec<C64>| -> Vec<C64> {
            let mut buf = padded(c, nfft);
            fft_inplace(&mut planner, &mut buf);
            buf
        };
        let fa: Vec<Vec<C64>> = self.coeffs.iter().map(&mut transform).collect();
        let fb: Vec<Vec<C64>> = rhs.coeffs.iter().map(&mut transform).collect();
        let mut out: [Vec<C64>; 4]
            = std::array::from_fn(|ij| {
                let (i, j) = (ij / 2, ij % 2);
                (0..nfft)
                    .map(|k| {
                        fa[2 * i][k] * fb[j][k] + fa[2 * i + 1][k] * fb[2 + j][k]
                    })
                    .collect()
            });
        out.iter_mut().for_each(|o| {
            ifft_inplace(&mut planner, o);
            o.truncate(n);
        });
        out
    }

    /// Matrix product of polynomial matrices.
    pub fn mul(&self, rhs: &Self) -> Self {
        let coeffs
            = if self.len().min(rhs.len()) <= DIRECT_MAX {
                self.mul_direct(rhs)
            } else {
                self.mul_fft(rhs)
            };
        Self { offset: self.offset + rhs.offset, exp2: self.exp2 + rhs.exp2, coeffs }
    }

    /// Evaluate at `w`, with `w_offset = w^offset` supplied by the caller
    /// (so that it can be formed without repeated multiplication). The
    /// power-of-two scale is not applied.
    pub fn eval(&self, w: C64, w_offset: C64) -> Mat2 {
        let horner = |c: &Vec<C64>| -> C64 {
            c.iter().rev().fold(C64::new(0.0, 0.0), |acc, ck| acc * w + ck)
        };
        Mat2(self.coeffs.each_ref().map(horner)).scale(w_offset)
    }

    /// Local matrix of one sample from its potential factor, or `None` for
    /// splittings without a polynomial form.
    fn local(split: Splitting, pot: &Mat2) -> Option<Self> {
        let p = Self::constant(pot);
        let f = Self::phase(1);
        match split {
            Splitting::LieA => Some(p.mul(&f)),
            Splitting::LieB => Some(f.mul(&p)),
            Splitting::StrangA => Some(f.mul(&p).mul(&f)),
            Splitting::StrangB => Some(p.mul(&f).mul(&p)),
            Splitting::Symmetric => None,
        }
    }
}

fn product_tree(locals: &[PolyMat2], normalize: bool) -> PolyMat2 {
    match locals.len() {
        0 => PolyMat2::constant(&Mat2::identity()),
        1 => locals[0].clone(),
        n => {
            let (lo, hi) = locals.split_at(n / 2);
            let (lo, hi)
                = rayon::join(
                    || product_tree(lo, normalize),
                    || product_tree(hi, normalize),
                );
            // later samples multiply from the left
            let mut prod = hi.mul(&lo);
            if normalize { prod.renormalize(); }
            prod
        },
    }
}

/// Transfer matrix of a whole field as a polynomial in `w = exp(iξ·dt/m)`.
#[derive(Clone, Debug)]
pub struct TransferPoly {
    poly: PolyMat2,
    m: u32,
    dt: f64,
    domain: (f64, f64),
    coupling: Coupling,
}

impl TransferPoly {
    /// Build the polynomial form, rescaling every product node by powers of
    /// two if `normalize` is set.
    ///
    /// Fails if `scheme` does not [admit][Discretization::admits_polynomial]
    /// one.
    pub fn new(
        field: &SampledField,
        coupling: Coupling,
        scheme: Discretization,
        normalize: bool,
    ) -> ConfigResult<Self> {
        let m = scheme.poly_denominator()
            .ok_or(ConfigError::NotPolynomial(scheme))?;
        let dt = field.get_dt();
        let split = scheme.splitting();
        let locals: Vec<PolyMat2>
            = field.get_q().iter()
            .map(|&q| {
                let pot = scheme.potential_factors(q, coupling.r(q), dt);
                PolyMat2::local(split, &pot[0])
                    .ok_or(ConfigError::NotPolynomial(scheme))
            })
            .collect::<ConfigResult<_>>()?;
        let poly = product_tree(&locals, normalize);
        Ok(Self { poly, m, dt, domain: field.domain(), coupling })
    }

    /// Highest minus lowest exponent.
    pub fn degree(&self) -> usize { self.poly.len() - 1 }

    pub fn get_poly(&self) -> &PolyMat2 { &self.poly }

    pub fn eval(&self, xi: C64) -> PResult<Scaled<Mat2>> {
        let arg = C64::i() * xi * self.dt / self.m as f64;
        let w = arg.exp();
        let w_offset = (arg * self.poly.get_offset() as f64).exp();
        let value = self.poly.eval(w, w_offset);
        if value.is_finite() {
            Ok(Scaled { value, exp2: self.poly.exp2 })
        } else {
            Err(PropagationError::Overflow(xi))
        }
    }
}

impl TransferRepr for TransferPoly {
    fn transfer(&self, xi: C64) -> PResult<Scaled<Mat2>> { self.eval(xi) }

    fn domain(&self) -> (f64, f64) { self.domain }

    fn coupling(&self) -> Coupling { self.coupling }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::transfer::TransferKernel;

    fn field(n: usize) -> SampledField {
        SampledField::from_fn((-3.0, 3.0), n, |t| {
            C64::new(1.7 / t.cosh(), 0.0) * C64::new(0.0, 0.5 * t).exp()
        })
        .unwrap()
    }

    #[test]
    fn polynomial_matches_kernel() {
        let f = field(150);
        for scheme in Discretization::ALL.into_iter().filter(|d| d.admits_polynomial()) {
            let poly = TransferPoly::new(&f, Coupling::Focusing, scheme, false).unwrap();
            let kernel = TransferKernel::new(&f, Coupling::Focusing, scheme, false);
            for xi in [C64::new(-2.0, 0.0), C64::new(0.35, 0.0), C64::new(1.1, 0.25)] {
                let p = poly.eval(xi).unwrap().value;
                let k = kernel.eval(xi).unwrap().value;
                assert_abs_diff_eq!((p - k).max_norm(), 0.0, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn degrees() {
        let f = field(40);
        let lie = TransferPoly::new(&f, Coupling::Kdv, Discretization::TwoSplit1A, true).unwrap();
        assert_eq!(lie.degree(), 80);
        assert_eq!(lie.get_poly().get_offset(), -40);
        let strang = TransferPoly::new(&f, Coupling::Kdv, Discretization::TwoSplit2A, true).unwrap();
        assert_eq!(strang.degree(), 160);
        assert_eq!(
            TransferPoly::new(&f, Coupling::Kdv, Discretization::TwoSplit4B, true).unwrap_err(),
            ConfigError::NotPolynomial(Discretization::TwoSplit4B),
        );
    }

    #[test]
    fn fft_product_matches_direct() {
        let f = field(48);
        let split = Splitting::LieB;
        let locals: Vec<PolyMat2>
            = f.get_q().iter()
            .map(|&q| {
                let pot = Discretization::TwoSplit1B
                    .potential_factors(q, Coupling::Focusing.r(q), f.get_dt());
                PolyMat2::local(split, &pot[0]).unwrap()
            })
            .collect();
        let a = product_tree(&locals[..24], false);
        let b = product_tree(&locals[24..], false);
        assert!(a.len() > DIRECT_MAX && b.len() > DIRECT_MAX);
        let fast = b.mul_fft(&a);
        let slow = b.mul_direct(&a);
        for (cf, cs) in fast.iter().zip(&slow) {
            assert_eq!(cf.len(), cs.len());
            for (x, y) in cf.iter().zip(cs) {
                assert_abs_diff_eq!((x - y).norm(), 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn rescaled_tree_survives_exponential_growth() {
        // |T| ~ exp(q·L) = exp(800) is beyond f64
        let f = SampledField::from_fn((-20.0, 20.0), 2000, |_| C64::new(20.0, 0.0))
            .unwrap();
        let scheme = Discretization::TwoSplit2B;
        let poly = TransferPoly::new(&f, Coupling::Defocusing, scheme, true).unwrap();
        let kernel = TransferKernel::new(&f, Coupling::Defocusing, scheme, true);
        assert!(poly.get_poly().get_exp2() > 1024);
        for xi in [C64::new(-2.0, 0.0), C64::new(0.5, 0.0)] {
            let p = poly.eval(xi).unwrap();
            let k = kernel.eval(xi).unwrap();
            assert!(p.unscaled(xi).is_err());
            let ratio = |t: &Mat2| t.get(1, 0) / t.get(0, 0);
            assert_abs_diff_eq!(
                (ratio(&p.value) - ratio(&k.value)).norm(), 0.0, epsilon = 1e-8);
        }
        let raw = TransferPoly::new(&f, Coupling::Defocusing, scheme, false).unwrap();
        assert!(matches!(
            raw.eval(C64::new(-2.0, 0.0)),
            Err(PropagationError::Overflow(_)),
        ));
    }

    #[test]
    fn phase_evaluates_to_free_factor() {
        let w = C64::new(0.0, 0.4).exp();
        let p = PolyMat2::phase(2);
        let m = p.eval(w, w.powi(-2));
        assert_abs_diff_eq!((m.get(0, 0) - w.powi(-2)).norm(), 0.0, epsilon = 1e-14);
        assert_abs_diff_eq!((m.get(1, 1) - w.powi(2)).norm(), 0.0, epsilon = 1e-14);
        assert_abs_diff_eq!(m.get(0, 1).norm(), 0.0, epsilon = 1e-15);
    }
}
