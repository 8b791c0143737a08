//! Small, stack-allocated 2×2 complex linear algebra.
//!
//! Transfer matrices are products of thousands of 2×2 factors, so these are
//! kept as plain `Copy` arrays rather than [`ndarray`] arrays. [`Jet`] pairs a
//! value with its derivative with respect to the spectral parameter so that
//! products can be differentiated by the product rule as they are formed.

use std::ops::{ Add, Mul, Sub };
use num_complex::Complex64 as C64;
use num_traits::{ One, Zero };

/// A 2×2 complex matrix stored row-major as `[m11, m12, m21, m22]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Mat2(pub [C64; 4]);

/// A complex 2-vector.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Vec2(pub [C64; 2]);

impl Mat2 {
    pub fn new(m11: C64, m12: C64, m21: C64, m22: C64) -> Self {
        Self([m11, m12, m21, m22])
    }

    pub fn identity() -> Self {
        Self::new(C64::one(), C64::zero(), C64::zero(), C64::one())
    }

    pub fn zeros() -> Self { Self([C64::zero(); 4]) }

    pub fn diag(d1: C64, d2: C64) -> Self {
        Self::new(d1, C64::zero(), C64::zero(), d2)
    }

    /// Element access by (zero-based) row and column.
    ///
    /// *Panics if either index is greater than 1*.
    pub fn get(&self, i: usize, j: usize) -> C64 {
        assert!(i < 2 && j < 2, "Mat2::get: index out of bounds");
        self.0[2 * i + j]
    }

    pub fn det(&self) -> C64 {
        let [a, b, c, d] = self.0;
        a * d - b * c
    }

    /// The adjugate, `[[d, -b], [-c, a]]`. For a unimodular matrix this is the
    /// inverse.
    pub fn adjugate(&self) -> Self {
        let [a, b, c, d] = self.0;
        Self::new(d, -b, -c, a)
    }

    pub fn col(&self, j: usize) -> Vec2 {
        Vec2([self.0[j], self.0[2 + j]])
    }

    pub fn scale(&self, s: C64) -> Self { Self(self.0.map(|x| x * s)) }

    pub fn scale_real(&self, s: f64) -> Self { Self(self.0.map(|x| x * s)) }

    /// Largest modulus over all entries.
    pub fn max_norm(&self) -> f64 {
        self.0.iter().map(|x| x.norm()).fold(0.0, f64::max)
    }

    pub fn is_finite(&self) -> bool { self.0.iter().all(|x| x.is_finite()) }

    pub fn dot(&self, v: Vec2) -> Vec2 {
        let [a, b, c, d] = self.0;
        Vec2([a * v.0[0] + b * v.0[1], c * v.0[0] + d * v.0[1]])
    }
}

impl Mul for Mat2 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let [a, b, c, d] = self.0;
        let [e, f, g, h] = rhs.0;
        Self([
            a * e + b * g,
            a * f + b * h,
            c * e + d * g,
            c * f + d * h,
        ])
    }
}

impl Add for Mat2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let [a, b, c, d] = self.0;
        let [e, f, g, h] = rhs.0;
        Self([a + e, b + f, c + g, d + h])
    }
}

impl Sub for Mat2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        let [a, b, c, d] = self.0;
        let [e, f, g, h] = rhs.0;
        Self([a - e, b - f, c - g, d - h])
    }
}

impl Vec2 {
    pub fn scale(&self, s: C64) -> Self { Self(self.0.map(|x| x * s)) }

    pub fn norm_sqr(&self) -> f64 { self.0[0].norm_sqr() + self.0[1].norm_sqr() }

    /// Hermitian inner product `⟨self, other⟩ = self · conj(other)`.
    pub fn inner(&self, other: &Self) -> C64 {
        self.0[0] * other.0[0].conj() + self.0[1] * other.0[1].conj()
    }

    /// `det[self other]` for the two vectors taken as matrix columns.
    pub fn wronskian(&self, other: &Self) -> C64 {
        self.0[0] * other.0[1] - self.0[1] * other.0[0]
    }

    pub fn is_finite(&self) -> bool { self.0.iter().all(|x| x.is_finite()) }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self([self.0[0] + rhs.0[0], self.0[1] + rhs.0[1]])
    }
}

/// A value paired with its derivative with respect to the spectral parameter
/// ξ.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Jet<T> {
    pub val: T,
    pub der: T,
}

impl Mul for Jet<Mat2> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self {
            val: self.val * rhs.val,
            der: self.der * rhs.val + self.val * rhs.der,
        }
    }
}

impl Add for Jet<Mat2> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self { val: self.val + rhs.val, der: self.der + rhs.der }
    }
}

impl Jet<Mat2> {
    /// Apply to a vector jet, `(M v)' = M' v + M v'`.
    pub fn dot(&self, v: Jet<Vec2>) -> Jet<Vec2> {
        Jet {
            val: self.val.dot(v.val),
            der: self.der.dot(v.val) + self.val.dot(v.der),
        }
    }
}

/// Elements that a transfer-matrix product can be accumulated over: plain
/// matrices, or matrices carrying their ξ-derivative.
pub trait Elem: Copy + Mul<Output = Self> + Add<Output = Self> + Send + Sync {
    fn identity() -> Self;

    /// A ξ-independent factor.
    fn constant(m: Mat2) -> Self;

    /// The free-evolution factor `diag(exp(-iξτ), exp(iξτ))`.
    fn phase(xi: C64, tau: f64) -> Self;

    fn weighted(self, w: f64) -> Self;

    /// Divide by the principal square root of the determinant.
    fn unimodular(self) -> Self;

    fn adjugate(self) -> Self;

    /// Multiply by an exact power of two (or any real factor).
    fn rescaled(self, s: f64) -> Self;

    fn value(&self) -> &Mat2;
}

impl Elem for Mat2 {
    fn identity() -> Self { Mat2::identity() }

    fn constant(m: Mat2) -> Self { m }

    fn phase(xi: C64, tau: f64) -> Self {
        let e = (C64::i() * xi * tau).exp();
        Mat2::diag(e.inv(), e)
    }

    fn weighted(self, w: f64) -> Self { self.scale_real(w) }

    fn unimodular(self) -> Self { self.scale(self.det().sqrt().inv()) }

    fn adjugate(self) -> Self { Mat2::adjugate(&self) }

    fn rescaled(self, s: f64) -> Self { self.scale_real(s) }

    fn value(&self) -> &Mat2 { self }
}

impl Elem for Jet<Mat2> {
    fn identity() -> Self { Self { val: Mat2::identity(), der: Mat2::zeros() } }

    fn constant(m: Mat2) -> Self { Self { val: m, der: Mat2::zeros() } }

    fn phase(xi: C64, tau: f64) -> Self {
        let e = (C64::i() * xi * tau).exp();
        let ei = e.inv();
        let it = C64::i() * tau;
        Self {
            val: Mat2::diag(ei, e),
            der: Mat2::diag(-it * ei, it * e),
        }
    }

    fn weighted(self, w: f64) -> Self {
        Self { val: self.val.scale_real(w), der: self.der.scale_real(w) }
    }

    fn unimodular(self) -> Self {
        let [a, b, c, d] = self.val.0;
        let [da, db, dc, dd] = self.der.0;
        let s = self.val.det().sqrt();
        let ds = (da * d + a * dd - db * c - b * dc) / (2.0 * s);
        let si = s.inv();
        Self {
            val: self.val.scale(si),
            der: self.der.scale(si) - self.val.scale(ds * si * si),
        }
    }

    fn adjugate(self) -> Self {
        Self { val: self.val.adjugate(), der: self.der.adjugate() }
    }

    fn rescaled(self, s: f64) -> Self {
        Self { val: self.val.scale_real(s), der: self.der.scale_real(s) }
    }

    fn value(&self) -> &Mat2 { &self.val }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn c(re: f64, im: f64) -> C64 { C64::new(re, im) }

    fn sample() -> Mat2 {
        Mat2::new(c(1.0, 2.0), c(-0.5, 0.25), c(3.0, -1.0), c(0.75, 0.5))
    }

    #[test]
    fn adjugate_inverts_up_to_determinant() {
        let m = sample();
        let p = m * m.adjugate();
        let det = m.det();
        assert_abs_diff_eq!((p.get(0, 0) - det).norm(), 0.0, epsilon = 1e-14);
        assert_abs_diff_eq!((p.get(1, 1) - det).norm(), 0.0, epsilon = 1e-14);
        assert_abs_diff_eq!(p.get(0, 1).norm(), 0.0, epsilon = 1e-14);
        assert_abs_diff_eq!(p.get(1, 0).norm(), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn unimodular_has_unit_determinant() {
        let m = sample().unimodular();
        assert_abs_diff_eq!((m.det() - 1.0).norm(), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn jet_phase_derivative_matches_finite_difference() {
        let xi = c(0.7, 0.3);
        let tau = 0.125;
        let h = 1e-6;
        let jet = <Jet<Mat2> as Elem>::phase(xi, tau);
        let fwd = <Mat2 as Elem>::phase(xi + h, tau);
        let bwd = <Mat2 as Elem>::phase(xi - h, tau);
        let fd = (fwd - bwd).scale_real(0.5 / h);
        assert_abs_diff_eq!((jet.der - fd).max_norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn jet_unimodular_derivative_matches_finite_difference() {
        // a ξ-dependent matrix with non-unit determinant
        let f = |xi: C64| -> Jet<Mat2> {
            let p = <Jet<Mat2> as Elem>::phase(xi, 0.3);
            let k = <Jet<Mat2> as Elem>::constant(sample());
            (p * k + k * p).weighted(0.5)
        };
        let xi = c(1.1, 0.2);
        let h = 1e-6;
        let jet = f(xi).unimodular();
        let fd = (f(xi + h).unimodular().val - f(xi - h).unimodular().val)
            .scale_real(0.5 / h);
        assert_abs_diff_eq!((jet.der - fd).max_norm(), 0.0, epsilon = 1e-8);
    }

    #[test]
    fn vector_helpers() {
        let u = Vec2([c(1.0, 0.0), c(0.0, 1.0)]);
        let v = Vec2([c(0.0, 1.0), c(2.0, 0.0)]);
        assert_abs_diff_eq!((u.wronskian(&v) - c(3.0, 0.0)).norm(), 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!((u.inner(&v) - c(0.0, 1.0)).norm(), 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(v.norm_sqr(), 5.0, epsilon = 1e-15);
    }
}
