//! Propagation of the spectral problem across a sampled field.
//!
//! The transfer matrix `T(ξ)` maps the solution at the left edge of the
//! scattering domain to the solution at the right edge; it is the ordered
//! product `L_{D-1}(ξ) ··· L_1(ξ) L_0(ξ)` of the local matrices defined by a
//! [`Discretization`]. Three representations are provided:
//! - [`propagate`]/[`DirectTransfer`]: walk the samples once for a single ξ,
//! - [`TransferKernel`]: precompute the ξ-independent factors of every sample
//!   and reuse them for many ξ (also provides ξ-derivatives and the partial
//!   products needed for two-sided evaluation),
//! - [`TransferPoly`][crate::poly::TransferPoly]: expand `T` as a Laurent
//!   polynomial in `exp(iξ·dt/m)` (single-level schemes only).
//!
//! Long products are kept representable by rescaling with powers of two and
//! carrying the exponent alongside the matrix in a [`Scaled`].

use std::ops::Range;
use num_complex::Complex64 as C64;
use num_traits::One;
use tracing::debug;
use crate::{
    error::{ NftResult, PResult, PropagationError },
    field::{ Coupling, SampledField },
    mat2::{ Elem, Jet, Mat2 },
    poly::TransferPoly,
    scheme::{ Discretization, Level },
    utils::pow2,
};

// running products are rescaled once their largest entry leaves
// [2^-RESCALE_EXP, 2^RESCALE_EXP]
pub(crate) const RESCALE_EXP: i32 = 64;

// smallest number of ξ points for which the polynomial form is built
pub(crate) const POLY_MIN_POINTS: usize = 64;

/// A value carrying a power-of-two scale: the represented quantity is
/// `value · 2^exp2`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Scaled<T> {
    pub value: T,
    pub exp2: i32,
}

impl<E: Elem> Scaled<E> {
    fn identity() -> Self { Self { value: E::identity(), exp2: 0 } }

    fn renormalize(&mut self) {
        let m = self.value.value().max_norm();
        let lim = pow2(RESCALE_EXP);
        if m > lim || (m > 0.0 && m < lim.recip()) {
            let e = m.log2().round() as i32;
            self.value = self.value.rescaled(pow2(-e));
            self.exp2 += e;
        }
    }
}

impl Scaled<Mat2> {
    /// Fold the exponent back into the matrix.
    ///
    /// Fails if the unscaled matrix is not representable.
    pub fn unscaled(&self, xi: C64) -> PResult<Mat2> {
        let m = self.value.scale_real(pow2(self.exp2));
        let lost = self.value.max_norm() > 0.0 && m.max_norm() == 0.0;
        if !m.is_finite() || lost {
            Err(PropagationError::Exponent { xi, exp2: self.exp2 })
        } else {
            Ok(m)
        }
    }
}

/// Multiply out local matrices in the order given by `indices`.
///
/// Going forward, each factor is applied on the left; going backward, the
/// adjugate of each factor is applied on the left, which for unimodular
/// factors propagates from the right edge towards the left.
fn accumulate<E, I, F>(
    indices: I,
    backward: bool,
    normalize: bool,
    xi: C64,
    mut local: F,
) -> PResult<Scaled<E>>
where
    E: Elem,
    I: Iterator<Item = usize>,
    F: FnMut(usize) -> E,
{
    let mut acc: Scaled<E> = Scaled::identity();
    for k in indices {
        let l = local(k);
        let l = if backward { l.adjugate() } else { l };
        acc.value = l * acc.value;
        if normalize { acc.renormalize(); }
    }
    if acc.value.value().is_finite() {
        Ok(acc)
    } else {
        Err(PropagationError::Overflow(xi))
    }
}

/// Compute the full transfer matrix at a single spectral parameter, forming
/// each local matrix on the fly.
pub fn propagate(
    field: &SampledField,
    coupling: Coupling,
    scheme: Discretization,
    xi: C64,
    normalize: bool,
) -> PResult<Scaled<Mat2>> {
    let h = field.get_dt();
    let levels = scheme.levels();
    let free: Vec<Mat2> = scheme.free_factors(&levels, xi, h);
    let q = field.get_q();
    accumulate(0..field.len(), false, normalize, xi, |k| {
        let pot = scheme.potential_factors(q[k], coupling.r(q[k]), h);
        scheme.assemble(&levels, &pot, &free)
    })
}

/// The unscaled transfer matrix at a single spectral parameter.
///
/// Fails if the matrix is not representable in floating point.
pub fn transfer_matrix(
    field: &SampledField,
    coupling: Coupling,
    scheme: Discretization,
    xi: C64,
) -> NftResult<Mat2> {
    Ok(propagate(field, coupling, scheme, xi, true)?.unscaled(xi)?)
}

/// Phases converting a transfer matrix into scattering coefficients:
/// `(exp(iξL), exp(-iξ(T1' + T2')))` for the domain `(T1', T2')`, `L = T2' - T1'`.
pub fn boundary_phases(xi: C64, domain: (f64, f64)) -> (C64, C64) {
    let (t1, t2) = domain;
    let i = C64::i();
    ((i * xi * (t2 - t1)).exp(), (-i * xi * (t1 + t2)).exp())
}

// relative size below which an entry of a transfer matrix is taken as zero
pub(crate) const NEGLIGIBLE: f64 = 4.0 * f64::EPSILON;

/// The entries of a transfer matrix `t` that become the scattering
/// coefficients, as `(a_num, b_num, den)` with
/// ```text
/// a = a_num / den · exp(iξL)
/// b = b_num / den · exp(-iξ(T1' + T2'))
/// ```
///
/// For the NSE these are `(T11, T21, 1)`. The free KdV problem
/// `[[-iξ, 0], [-1, iξ]]` is not diagonal, so there `t` is first expressed in
/// the basis of its eigenvectors, `S⁻¹ t S` with `S = [[2iξ, 0], [1, 1]]`,
/// whose entries share the factor `1/(2iξ)`. When `T12` is negligible the
/// factor cancels and `den = 1`; otherwise `a` and `b` have a pole at
/// `ξ = 0` while their ratio stays finite.
pub fn scattering_entries(coupling: Coupling, xi: C64, t: &Mat2) -> (C64, C64, C64) {
    let [t11, t12, t21, t22] = t.0;
    match coupling {
        Coupling::Focusing | Coupling::Defocusing => (t11, t21, C64::one()),
        Coupling::Kdv => {
            let two_i_xi = 2.0 * C64::i() * xi;
            let diag = t22 - t11 + two_i_xi * t21;
            if t12.norm() <= NEGLIGIBLE * t.max_norm() {
                (t11, diag, C64::one())
            } else {
                (two_i_xi * t11 + t12, two_i_xi * diag - t12, two_i_xi)
            }
        },
    }
}

/// Anything that can produce the full transfer matrix at a real or complex
/// spectral parameter.
pub trait TransferRepr: Sync {
    fn transfer(&self, xi: C64) -> PResult<Scaled<Mat2>>;

    /// The scattering domain `(T1 - dt/2, T2 + dt/2)`.
    fn domain(&self) -> (f64, f64);

    /// The spectral problem being propagated.
    fn coupling(&self) -> Coupling;
}

/// Single-point propagation over a borrowed field.
#[derive(Copy, Clone, Debug)]
pub struct DirectTransfer<'a> {
    pub field: &'a SampledField,
    pub coupling: Coupling,
    pub scheme: Discretization,
    pub normalize: bool,
}

impl<'a> TransferRepr for DirectTransfer<'a> {
    fn transfer(&self, xi: C64) -> PResult<Scaled<Mat2>> {
        propagate(self.field, self.coupling, self.scheme, xi, self.normalize)
    }

    fn domain(&self) -> (f64, f64) { self.field.domain() }

    fn coupling(&self) -> Coupling { self.coupling }
}

/// Reusable, ξ-parametrized propagator.
///
/// All ξ-independent potential exponentials are computed once at
/// construction; each evaluation then costs only the matrix products.
#[derive(Clone, Debug)]
pub struct TransferKernel {
    scheme: Discretization,
    coupling: Coupling,
    levels: Vec<Level>,
    // potential factors, `levels.len()` per sample
    pot: Vec<Mat2>,
    dt: f64,
    domain: (f64, f64),
    normalize: bool,
}

impl TransferKernel {
    pub fn new(
        field: &SampledField,
        coupling: Coupling,
        scheme: Discretization,
        normalize: bool,
    ) -> Self {
        let dt = field.get_dt();
        let levels = scheme.levels();
        let pot: Vec<Mat2>
            = field.get_q().iter()
            .flat_map(|&q| scheme.potential_factors(q, coupling.r(q), dt))
            .collect();
        Self { scheme, coupling, levels, pot, dt, domain: field.domain(), normalize }
    }

    /// Number of samples.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize { self.pot.len() / self.levels.len() }

    pub fn get_scheme(&self) -> Discretization { self.scheme }

    pub fn get_dt(&self) -> f64 { self.dt }

    pub fn get_domain(&self) -> (f64, f64) { self.domain }

    fn free<E: Elem>(&self, xi: C64) -> Vec<E> {
        self.scheme.free_factors(&self.levels, xi, self.dt)
    }

    fn local<E: Elem>(&self, k: usize, free: &[E]) -> E {
        let n = self.levels.len();
        self.scheme.assemble(&self.levels, &self.pot[n * k..n * (k + 1)], free)
    }

    /// Ordered product `L_{end-1} ··· L_{start}` over a range of samples.
    ///
    /// *Panics if the range exceeds the number of samples*.
    pub fn product_forward<E: Elem>(&self, range: Range<usize>, xi: C64)
        -> PResult<Scaled<E>>
    {
        assert!(range.end <= self.len(), "TransferKernel: range out of bounds");
        let free: Vec<E> = self.free(xi);
        accumulate(range, false, self.normalize, xi, |k| self.local(k, &free))
    }

    /// Ordered product `adj(L_{start}) ··· adj(L_{end-1})` over a range of
    /// samples, i.e. the inverse of the forward product.
    ///
    /// *Panics if the range exceeds the number of samples*.
    pub fn product_backward<E: Elem>(&self, range: Range<usize>, xi: C64)
        -> PResult<Scaled<E>>
    {
        assert!(range.end <= self.len(), "TransferKernel: range out of bounds");
        let free: Vec<E> = self.free(xi);
        accumulate(range.rev(), true, self.normalize, xi, |k| self.local(k, &free))
    }

    /// Full transfer matrix.
    pub fn eval(&self, xi: C64) -> PResult<Scaled<Mat2>> {
        self.product_forward(0..self.len(), xi)
    }

    /// Full transfer matrix and its ξ-derivative.
    pub fn eval_jet(&self, xi: C64) -> PResult<Scaled<Jet<Mat2>>> {
        self.product_forward(0..self.len(), xi)
    }
}

impl TransferRepr for TransferKernel {
    fn transfer(&self, xi: C64) -> PResult<Scaled<Mat2>> { self.eval(xi) }

    fn domain(&self) -> (f64, f64) { self.domain }

    fn coupling(&self) -> Coupling { self.coupling }
}

/// How a transfer matrix is represented for a batch of evaluations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TransferStrategy {
    /// Walk the samples for every point.
    Direct,
    /// Precompute ξ-independent factors once.
    Kernel,
    /// Expand into a Laurent polynomial once.
    Polynomial,
}

impl TransferStrategy {
    /// Pick a representation for `n` evaluation points.
    pub fn for_points(n: usize, scheme: Discretization) -> Self {
        if n <= 1 {
            Self::Direct
        } else if scheme.admits_polynomial() && n >= POLY_MIN_POINTS {
            Self::Polynomial
        } else {
            Self::Kernel
        }
    }
}

/// A built transfer representation.
#[derive(Clone, Debug)]
pub enum Transfer<'a> {
    Direct(DirectTransfer<'a>),
    Kernel(TransferKernel),
    Polynomial(TransferPoly),
}

impl<'a> Transfer<'a> {
    pub fn new(
        strategy: TransferStrategy,
        field: &'a SampledField,
        coupling: Coupling,
        scheme: Discretization,
        normalize: bool,
    ) -> Self {
        debug!(?strategy, %scheme, samples = field.len(), "building transfer representation");
        match strategy {
            TransferStrategy::Direct
                => Self::Direct(
                    DirectTransfer { field, coupling, scheme, normalize }),
            TransferStrategy::Kernel
                => Self::Kernel(
                    TransferKernel::new(field, coupling, scheme, normalize)),
            TransferStrategy::Polynomial
                => match TransferPoly::new(field, coupling, scheme, normalize) {
                    Ok(poly) => Self::Polynomial(poly),
                    Err(err) => {
                        debug!(%err, "falling back to kernel");
                        Self::Kernel(
                            TransferKernel::new(field, coupling, scheme, normalize))
                    },
                },
        }
    }

    pub fn strategy(&self) -> TransferStrategy {
        match self {
            Self::Direct(_) => TransferStrategy::Direct,
            Self::Kernel(_) => TransferStrategy::Kernel,
            Self::Polynomial(_) => TransferStrategy::Polynomial,
        }
    }
}

impl<'a> TransferRepr for Transfer<'a> {
    fn transfer(&self, xi: C64) -> PResult<Scaled<Mat2>> {
        match self {
            Self::Direct(d) => d.transfer(xi),
            Self::Kernel(k) => k.transfer(xi),
            Self::Polynomial(p) => p.transfer(xi),
        }
    }

    fn domain(&self) -> (f64, f64) {
        match self {
            Self::Direct(d) => d.domain(),
            Self::Kernel(k) => k.domain(),
            Self::Polynomial(p) => p.domain(),
        }
    }

    fn coupling(&self) -> Coupling {
        match self {
            Self::Direct(d) => d.coupling(),
            Self::Kernel(k) => k.coupling(),
            Self::Polynomial(p) => p.coupling(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use num_traits::Zero;

    fn sech_field(amp: f64, n: usize) -> SampledField {
        SampledField::from_fn((-4.0, 4.0), n, |t| C64::new(amp / t.cosh(), 0.3 * t))
            .unwrap()
    }

    #[test]
    fn kernel_matches_direct() {
        let field = sech_field(1.5, 64);
        for scheme in Discretization::ALL {
            let kernel = TransferKernel::new(&field, Coupling::Focusing, scheme, true);
            for xi in [C64::new(-1.3, 0.0), C64::new(0.7, 0.2)] {
                let direct = propagate(&field, Coupling::Focusing, scheme, xi, true)
                    .unwrap();
                let reused = kernel.eval(xi).unwrap();
                assert_eq!(direct.exp2, reused.exp2);
                assert_abs_diff_eq!(
                    (direct.value - reused.value).max_norm(), 0.0, epsilon = 1e-13);
            }
        }
    }

    #[test]
    fn unit_determinant_for_every_scheme() {
        let field = sech_field(2.0, 100);
        for scheme in Discretization::ALL {
            for coupling in [Coupling::Focusing, Coupling::Defocusing, Coupling::Kdv] {
                let t = propagate(&field, coupling, scheme, C64::new(0.9, 0.0), true)
                    .unwrap()
                    .unscaled(C64::new(0.9, 0.0))
                    .unwrap();
                assert_abs_diff_eq!((t.det() - 1.0).norm(), 0.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn zero_field_is_free_evolution() {
        let field = SampledField::from_fn((-1.0, 1.0), 33, |_| C64::new(0.0, 0.0))
            .unwrap();
        let xi = C64::new(1.4, 0.0);
        let (eiL, _) = boundary_phases(xi, field.domain());
        for scheme in Discretization::ALL {
            let t = transfer_matrix(&field, Coupling::Focusing, scheme, xi).unwrap();
            assert_abs_diff_eq!((t.get(0, 0) * eiL - 1.0).norm(), 0.0, epsilon = 1e-11);
            assert_abs_diff_eq!(t.get(1, 0).norm(), 0.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn kdv_free_problem_is_diagonalized() {
        let field = SampledField::from_fn((-1.0, 1.0), 32, |_| C64::new(0.0, 0.0))
            .unwrap();
        let scheme = Discretization::TwoSplit8B;
        for xi in [-2.5, -0.3, 0.0, 1.7].map(|x| C64::new(x, 0.0)) {
            let t = transfer_matrix(&field, Coupling::Kdv, scheme, xi).unwrap();
            // the NSE reading of the same matrix is not transparent
            if xi.re != 0.0 { assert!(t.get(1, 0).norm() > 1e-3); }
            let (eiL, _) = boundary_phases(xi, field.domain());
            let (a, b, den) = scattering_entries(Coupling::Kdv, xi, &t);
            assert_eq!(den, C64::one());
            assert_abs_diff_eq!((a * eiL - 1.0).norm(), 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(b.norm(), 0.0, epsilon = 1e-11);
        }
    }

    #[test]
    fn kdv_entries_have_a_pole_at_zero() {
        let field = SampledField::from_fn((0.0, 2.0), 50, |_| C64::new(1.5, 0.0))
            .unwrap();
        let xi = C64::zero();
        let t = transfer_matrix(&field, Coupling::Kdv, Discretization::TwoSplit4B, xi)
            .unwrap();
        let (a, b, den) = scattering_entries(Coupling::Kdv, xi, &t);
        assert_eq!(den, C64::zero());
        assert!(a.norm() > 1e-3);
        assert_abs_diff_eq!((b / a + 1.0).norm(), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn backward_product_inverts_forward() {
        let field = sech_field(1.0, 50);
        let kernel
            = TransferKernel::new(
                &field, Coupling::Focusing, Discretization::TwoSplit4B, true);
        let xi = C64::new(0.4, 0.3);
        let fwd: Scaled<Mat2> = kernel.product_forward(10..40, xi).unwrap();
        let bwd: Scaled<Mat2> = kernel.product_backward(10..40, xi).unwrap();
        let p = (fwd.value * bwd.value).scale_real(pow2(fwd.exp2 + bwd.exp2));
        assert_abs_diff_eq!((p - Mat2::identity()).max_norm(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn jet_derivative_matches_finite_difference() {
        let field = sech_field(1.2, 40);
        let kernel
            = TransferKernel::new(
                &field, Coupling::Focusing, Discretization::TwoSplit6B, false);
        let xi = C64::new(0.5, 0.4);
        let dx = 1e-6;
        let jet = kernel.eval_jet(xi).unwrap();
        let fwd = kernel.eval(xi + dx).unwrap().value;
        let bwd = kernel.eval(xi - dx).unwrap().value;
        let fd = (fwd - bwd).scale_real(0.5 / dx);
        assert_eq!(jet.exp2, 0);
        assert_abs_diff_eq!((jet.value.der - fd).max_norm(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn normalization_prevents_overflow() {
        let field = SampledField::from_fn((0.0, 1.0), 200, |_| C64::new(0.0, 0.0))
            .unwrap();
        let xi = C64::new(0.0, 1000.0);
        let scheme = Discretization::TwoSplit2B;
        let scaled = propagate(&field, Coupling::Focusing, scheme, xi, true).unwrap();
        assert!(scaled.value.is_finite());
        assert!(scaled.exp2 > 1024);
        assert!(matches!(
            scaled.unscaled(xi),
            Err(PropagationError::Exponent { .. }),
        ));
        assert_eq!(
            propagate(&field, Coupling::Focusing, scheme, xi, false),
            Err(PropagationError::Overflow(xi)),
        );
    }

    #[test]
    fn strategy_selection() {
        use TransferStrategy::*;
        assert_eq!(TransferStrategy::for_points(1, Discretization::TwoSplit2A), Direct);
        assert_eq!(TransferStrategy::for_points(8, Discretization::TwoSplit2A), Kernel);
        assert_eq!(TransferStrategy::for_points(64, Discretization::TwoSplit2A), Polynomial);
        assert_eq!(TransferStrategy::for_points(1000, Discretization::TwoSplit8B), Kernel);
    }
}
