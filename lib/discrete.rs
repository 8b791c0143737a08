//! Discrete spectrum of the focusing NSE: bound states `ξ_k` (zeros of `a(ξ)`
//! in the upper half plane) with their norming constants `b(ξ_k)` and
//! residues `b(ξ_k)/a'(ξ_k)`.
//!
//! Each root passes through the states of a [`RootState`]:
//! ```text
//! Unsearched(region) --scan--> Candidate(ξ) --newton--> Refined(ξ) --filter--> Accepted(ξ)
//!                                   |                                   |
//!                                   +--------> Rejected(reason) <-------+
//! ```
//!
//! Both `a` and `b` are evaluated two-sidedly. The left Jost solution
//! `φ ~ [exp(-iξt), 0]` is propagated forward from the left edge and the
//! right Jost solution `ψ ~ [0, exp(iξt)]` backward from the right edge, both
//! to a sample near the "center of mass" of `|q|`. There
//! ```text
//! a(ξ) = det[φ ψ],    b(ξ_k) = ⟨φ, ψ⟩ / |ψ|^2,
//! ```
//! which keeps the growing and decaying modes from mixing over the whole
//! domain when `Im ξ` is large.

use std::f64::consts::{ FRAC_PI_2, FRAC_PI_4, LN_2, TAU };
use ndarray as nd;
use num_complex::Complex64 as C64;
use rayon::prelude::*;
use tracing::{ debug, info, warn };
use crate::{
    error::{ ConfigResult, PResult, Status },
    field::{ default_subsample, Coupling, SampledField },
    mat2::{ Elem, Jet, Mat2, Vec2 },
    options::{
        BoundStateFiltering,
        BoundStateLocalization,
        DiscSpecType,
        NsevOptions,
    },
    scheme::Discretization,
    transfer::{ Scaled, TransferKernel },
    utils::pow2,
};

/// Scheme used on the subsampled problem.
pub const COARSE_SCHEME: Discretization = Discretization::TwoSplit2B;

// Newton tolerance on the subsampled problem
const COARSE_TOLERANCE: f64 = 1e-6;

// height of the scan box relative to max|q|
const HEIGHT_FACTOR: f64 = 1.05;

// lower edge of the scan box relative to its height
const IM_FLOOR: f64 = 1e-3;

// extends the scan box to the left so that bisection lines never fall on
// Re ξ = 0, where symmetric fields have their roots
const SCAN_SKEW: f64 = 0.013_7;

// boxes of winding number 1 become candidates below this fraction of the
// scan box height
const MIN_BOX_FRACTION: f64 = 0.05;

const MAX_BOX_DEPTH: usize = 40;
const MAX_EDGE_DEPTH: usize = 12;

// roots closer than this (relative to max(1, |ξ|)) are duplicates
const DUPLICATE_TOLERANCE: f64 = 1e-6;

/// `exp(z)` as a mantissa and a power of two.
fn scaled_exp(z: C64) -> (C64, i32) {
    let e = (z.re / LN_2).round() as i32;
    ((z - e as f64 * LN_2).exp(), e)
}

/// Jost solutions at the split sample, each with its power-of-two scale.
#[derive(Copy, Clone, Debug)]
struct JostPair<V> {
    phi: V,
    psi: V,
    exp_phi: i32,
    exp_psi: i32,
}

/// Norming constant and residue of a bound state.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundStateCoefficients {
    pub norming_constant: C64,
    pub residue: C64,
}

/// Two-sided evaluator of `a(ξ)`, `a'(ξ)` and `b(ξ)` anywhere in the complex
/// plane.
#[derive(Clone, Debug)]
pub struct BoundStateEvaluator {
    kernel: TransferKernel,
    split: usize,
}

impl BoundStateEvaluator {
    pub fn new(
        field: &SampledField,
        coupling: Coupling,
        scheme: Discretization,
        normalize: bool,
    ) -> Self {
        let kernel = TransferKernel::new(field, coupling, scheme, normalize);
        Self { kernel, split: field.split_index() }
    }

    fn products<E: Elem>(&self, xi: C64) -> PResult<(Scaled<E>, Scaled<E>)> {
        let left = self.kernel.product_forward(0..self.split, xi)?;
        let right = self.kernel.product_backward(self.split..self.kernel.len(), xi)?;
        Ok((left, right))
    }

    fn jost(&self, xi: C64) -> PResult<JostPair<Vec2>> {
        let (t1, t2) = self.kernel.get_domain();
        let zero = C64::new(0.0, 0.0);
        let (e1, k1) = scaled_exp(-C64::i() * xi * t1);
        let (e2, k2) = scaled_exp(C64::i() * xi * t2);
        let (left, right) = self.products::<Mat2>(xi)?;
        Ok(JostPair {
            phi: left.value.dot(Vec2([e1, zero])),
            psi: right.value.dot(Vec2([zero, e2])),
            exp_phi: left.exp2 + k1,
            exp_psi: right.exp2 + k2,
        })
    }

    fn jost_jet(&self, xi: C64) -> PResult<JostPair<Jet<Vec2>>> {
        let (t1, t2) = self.kernel.get_domain();
        let zero = C64::new(0.0, 0.0);
        let i = C64::i();
        let (e1, k1) = scaled_exp(-i * xi * t1);
        let (e2, k2) = scaled_exp(i * xi * t2);
        let phi0 = Jet { val: Vec2([e1, zero]), der: Vec2([-i * t1 * e1, zero]) };
        let psi0 = Jet { val: Vec2([zero, e2]), der: Vec2([zero, i * t2 * e2]) };
        let (left, right) = self.products::<Jet<Mat2>>(xi)?;
        Ok(JostPair {
            phi: left.value.dot(phi0),
            psi: right.value.dot(psi0),
            exp_phi: left.exp2 + k1,
            exp_psi: right.exp2 + k2,
        })
    }

    /// `a(ξ)` up to an unknown positive factor, or `None` if it is zero or
    /// cannot be evaluated. Sufficient for phase tracking.
    pub fn a_scaled(&self, xi: C64) -> Option<C64> {
        let j = self.jost(xi).ok()?;
        let w = j.phi.wronskian(&j.psi);
        (w.is_finite() && w.norm() > 0.0).then_some(w)
    }

    /// `a(ξ)`, if representable.
    pub fn a(&self, xi: C64) -> Option<C64> {
        let j = self.jost(xi).ok()?;
        let a = j.phi.wronskian(&j.psi) * pow2(j.exp_phi + j.exp_psi);
        a.is_finite().then_some(a)
    }

    /// The Newton step `a(ξ)/a'(ξ)`.
    pub fn newton_step(&self, xi: C64) -> Option<C64> {
        let j = self.jost_jet(xi).ok()?;
        let w = j.phi.val.wronskian(&j.psi.val);
        let dw = j.phi.der.wronskian(&j.psi.val) + j.phi.val.wronskian(&j.psi.der);
        let step = w / dw;
        step.is_finite().then_some(step)
    }

    /// Norming constant and residue at a bound state `xi`.
    pub fn coefficients(&self, xi: C64) -> Option<BoundStateCoefficients> {
        let j = self.jost_jet(xi).ok()?;
        let dw = j.phi.der.wronskian(&j.psi.val) + j.phi.val.wronskian(&j.psi.der);
        let ratio = j.phi.val.inner(&j.psi.val) / j.psi.val.norm_sqr();
        let norming_constant = ratio * pow2(j.exp_phi - j.exp_psi);
        let residue = ratio / dw * pow2(-2 * j.exp_psi);
        (norming_constant.is_finite() && residue.is_finite())
            .then_some(BoundStateCoefficients { norming_constant, residue })
    }
}

/// A rectangle `re.0 ≤ Re ξ ≤ re.1`, `im.0 ≤ Im ξ ≤ im.1`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Region {
    pub re: (f64, f64),
    pub im: (f64, f64),
}

impl Region {
    pub fn width(&self) -> f64 { self.re.1 - self.re.0 }

    pub fn height(&self) -> f64 { self.im.1 - self.im.0 }

    pub fn center(&self) -> C64 {
        C64::new((self.re.0 + self.re.1) / 2.0, (self.im.0 + self.im.1) / 2.0)
    }

    /// Corners in counterclockwise order, starting bottom left.
    pub fn corners(&self) -> [C64; 4] {
        [
            C64::new(self.re.0, self.im.0),
            C64::new(self.re.1, self.im.0),
            C64::new(self.re.1, self.im.1),
            C64::new(self.re.0, self.im.1),
        ]
    }

    /// Split in half across the longer side.
    pub fn halves(&self) -> (Self, Self) {
        if self.width() >= self.height() {
            let m = (self.re.0 + self.re.1) / 2.0;
            (Self { re: (self.re.0, m), ..*self }, Self { re: (m, self.re.1), ..*self })
        } else {
            let m = (self.im.0 + self.im.1) / 2.0;
            (Self { im: (self.im.0, m), ..*self }, Self { im: (m, self.im.1), ..*self })
        }
    }
}

/// The box searched for bound states of a (possibly subsampled) field:
/// `|Re ξ| ≤ π/(2dt)`, `0 < Im ξ ≤ height`.
pub fn scan_region(field: &SampledField, height: f64) -> Region {
    let re_max = FRAC_PI_2 / field.get_dt();
    Region {
        re: (-re_max * (1.0 + SCAN_SKEW), re_max),
        im: (IM_FLOOR * height, height),
    }
}

/// Counts zeros of `a(ξ)` inside rectangles by the argument principle.
pub struct ArgumentScanner<'a> {
    eval: &'a BoundStateEvaluator,
    spacing: f64,
}

impl<'a> ArgumentScanner<'a> {
    /// Edges are sampled every `π/(4·span)`, the distance over which the
    /// phase of `a(ξ) ~ exp(iξ·span)` turns by π/4.
    pub fn new(eval: &'a BoundStateEvaluator, span: f64) -> Self {
        Self { eval, spacing: FRAC_PI_4 / span }
    }

    fn segment(&self, z0: C64, z1: C64, f0: C64, f1: C64, depth: usize)
        -> Option<f64>
    {
        let d = (f1 / f0).arg();
        if d.abs() <= FRAC_PI_4 || depth >= MAX_EDGE_DEPTH { return Some(d); }
        let zm = (z0 + z1) * 0.5;
        let fm = self.eval.a_scaled(zm)?;
        Some(
            self.segment(z0, zm, f0, fm, depth + 1)?
            + self.segment(zm, z1, fm, f1, depth + 1)?
        )
    }

    fn edge(&self, z0: C64, z1: C64) -> Option<f64> {
        let n = ((z1 - z0).norm() / self.spacing).ceil().max(1.0) as usize;
        let mut zp = z0;
        let mut fp = self.eval.a_scaled(z0)?;
        let mut total = 0.0;
        for k in 1..=n {
            let z = z0 + (z1 - z0) * (k as f64 / n as f64);
            let f = self.eval.a_scaled(z)?;
            total += self.segment(zp, z, fp, f, 0)?;
            zp = z;
            fp = f;
        }
        Some(total)
    }

    /// Winding number of `a(ξ)` around the boundary of `region`, or `None`
    /// if `a` vanishes or overflows on it.
    pub fn winding(&self, region: Region) -> Option<i64> {
        let c = region.corners();
        let total: f64
            = (0..4)
            .map(|k| self.edge(c[k], c[(k + 1) % 4]))
            .sum::<Option<f64>>()?;
        Some((total / TAU).round() as i64)
    }

    fn bisect(
        &self,
        region: Region,
        n: i64,
        depth: usize,
        min_size: f64,
        out: &mut Vec<RootState>,
    ) {
        if n <= 0 { return; }
        let size = region.width().max(region.height());
        if (n == 1 && size <= min_size) || depth >= MAX_BOX_DEPTH {
            out.push(RootState::Candidate(region.center()));
            return;
        }
        let (lo, hi) = region.halves();
        match (self.winding(lo), self.winding(hi)) {
            (Some(nlo), Some(nhi)) => {
                self.bisect(lo, nlo, depth + 1, min_size, out);
                self.bisect(hi, nhi, depth + 1, min_size, out);
            },
            _ => {
                debug!(?region, "winding undefined on a sub-box; using its center");
                out.push(RootState::Candidate(region.center()));
            },
        }
    }

    /// Locate candidates in `region`; also returns the number of zeros
    /// enclosed by its boundary, or `None` if that number is undefined
    /// because `a` vanishes or overflows on the boundary.
    pub fn scan(&self, region: Region) -> (Vec<RootState>, Option<usize>) {
        let expected
            = match self.winding(region) {
                Some(n) => n.max(0) as usize,
                None => {
                    warn!(?region, "a(ξ) vanishes or overflows on the scan boundary");
                    return (Vec::new(), None);
                },
            };
        let mut out = Vec::new();
        let min_size = MIN_BOX_FRACTION * region.height();
        self.bisect(region, expected as i64, 0, min_size, &mut out);
        (out, Some(expected))
    }
}

/// Why a root was rejected.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Rejection {
    NoConvergence,
    OutsideHalfPlane,
    OutsideBounds,
    Duplicate,
    /// Accepted, but beyond the maximum number of bound states.
    Truncated,
}

/// Life cycle of a single root.
#[derive(Clone, Debug, PartialEq)]
pub enum RootState {
    /// A region that has not been searched yet.
    Unsearched(Region),
    /// An approximate location.
    Candidate(C64),
    /// A converged Newton iterate.
    Refined { root: C64, iterations: usize },
    Accepted(C64),
    Rejected { at: C64, reason: Rejection },
}

impl RootState {
    /// `Unsearched → Candidate*`, along with the number of roots the region
    /// should contain (see [`ArgumentScanner::scan`]). Other states are
    /// returned unchanged with a count of zero.
    pub fn localize(self, scanner: &ArgumentScanner) -> (Vec<Self>, Option<usize>) {
        match self {
            Self::Unsearched(region) => scanner.scan(region),
            other => (vec![other], Some(0)),
        }
    }

    /// `Candidate → Refined | Rejected`. If `coarse` is given, Newton's method
    /// is first run on it (best effort) to move the starting point closer.
    pub fn refine(
        self,
        coarse: Option<&BoundStateEvaluator>,
        fine: &BoundStateEvaluator,
        niter: usize,
        tol: f64,
    ) -> Self {
        match self {
            Self::Candidate(z0) => {
                let start
                    = coarse
                    .and_then(|c| newton(c, z0, niter, COARSE_TOLERANCE))
                    .map(|(z, _)| z)
                    .unwrap_or(z0);
                match newton(fine, start, niter, tol) {
                    Some((root, iterations)) => Self::Refined { root, iterations },
                    None => {
                        debug!(%start, "newton iteration did not converge");
                        Self::Rejected { at: start, reason: Rejection::NoConvergence }
                    },
                }
            },
            other => other,
        }
    }

    /// `Refined → Accepted | Rejected` against the roots accepted so far.
    pub fn classify(self, accepted: &[C64], filter: &Filter) -> Self {
        match self {
            Self::Refined { root, .. } => match filter.check(root, accepted) {
                Ok(()) => Self::Accepted(root),
                Err(reason) => {
                    debug!(%root, ?reason, "rejected root");
                    Self::Rejected { at: root, reason }
                },
            },
            other => other,
        }
    }

    /// The current location, if this state has one.
    pub fn location(&self) -> Option<C64> {
        match self {
            Self::Unsearched(_) => None,
            Self::Candidate(z) | Self::Accepted(z) => Some(*z),
            Self::Refined { root, .. } => Some(*root),
            Self::Rejected { at, .. } => Some(*at),
        }
    }

    pub fn is_accepted(&self) -> bool { matches!(self, Self::Accepted(_)) }
}

/// Newton's method on `a(ξ)`; returns the root and the number of iterations
/// taken, or `None` if `niter` iterations do not reach the tolerance.
pub fn newton(eval: &BoundStateEvaluator, start: C64, niter: usize, tol: f64)
    -> Option<(C64, usize)>
{
    let mut xi = start;
    for k in 0..niter {
        let step = eval.newton_step(xi)?;
        xi -= step;
        if !xi.is_finite() { return None; }
        if step.norm() <= tol * xi.norm().max(1.0) { return Some((xi, k + 1)); }
    }
    None
}

/// Acceptance criteria for refined roots.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Filter {
    pub kind: BoundStateFiltering,
    /// Largest accepted `|Re ξ|`.
    pub re_max: f64,
    /// Largest accepted `Im ξ`.
    pub im_max: f64,
}

impl Filter {
    pub fn new(kind: BoundStateFiltering, field: &SampledField) -> Self {
        Self {
            kind,
            re_max: FRAC_PI_2 / field.get_dt(),
            im_max: HEIGHT_FACTOR * field.max_abs(),
        }
    }

    pub fn check(&self, root: C64, accepted: &[C64]) -> Result<(), Rejection> {
        use BoundStateFiltering::*;
        if matches!(self.kind, Basic | Full) && root.im <= 0.0 {
            return Err(Rejection::OutsideHalfPlane);
        }
        if self.kind == Full && (root.re.abs() > self.re_max || root.im > self.im_max) {
            return Err(Rejection::OutsideBounds);
        }
        let tol = DUPLICATE_TOLERANCE * root.norm().max(1.0);
        if accepted.iter().any(|z| (z - root).norm() <= tol) {
            return Err(Rejection::Duplicate);
        }
        Ok(())
    }
}

/// Bound states and their coefficients.
#[derive(Clone, Debug, PartialEq)]
pub struct DiscreteSpectrum {
    /// Sorted by imaginary part (descending), then real part (ascending).
    pub bound_states: nd::Array1<C64>,
    pub norming_constants: Option<nd::Array1<C64>>,
    pub residues: Option<nd::Array1<C64>>,
    /// Refined roots before filtering, in candidate order.
    pub unfiltered: Option<nd::Array1<C64>>,
    /// Number of roots localization said to expect; `None` if the count was
    /// undefined.
    pub expected: Option<usize>,
    /// Final states of all rejected roots.
    pub rejected: Vec<RootState>,
    pub status: Status,
}

impl DiscreteSpectrum {
    fn empty(kind: DiscSpecType) -> Self {
        let none = || nd::Array1::<C64>::zeros(0);
        Self {
            bound_states: none(),
            norming_constants: kind.wants_norming_constants().then(none),
            residues: kind.wants_residues().then(none),
            unfiltered: kind.wants_unfiltered().then(none),
            expected: Some(0),
            rejected: Vec::new(),
            status: Status::Success,
        }
    }

    /// Number of bound states.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize { self.bound_states.len() }
}

/// Total order placing larger imaginary parts first.
pub fn bound_state_order(a: &C64, b: &C64) -> std::cmp::Ordering {
    b.im.total_cmp(&a.im).then(a.re.total_cmp(&b.re))
}

/// Search for bound states according to (resolved) options.
///
/// Returns `None` if the discrete spectrum is skipped.
pub fn solve(field: &SampledField, opts: &NsevOptions)
    -> ConfigResult<Option<DiscreteSpectrum>>
{
    let kind = opts.discspec_type;
    if kind.is_skip() { return Ok(None); }
    let coupling = opts.kappa.coupling();
    let filter = Filter::new(opts.bound_state_filtering, field);
    if !coupling.has_bound_states() || filter.im_max == 0.0 {
        debug!(?coupling, "no bound states possible; search skipped");
        return Ok(Some(DiscreteSpectrum::empty(kind)));
    }
    let fine
        = BoundStateEvaluator::new(
            field, coupling, opts.discretization, opts.normalization);

    let (candidates, expected, coarse)
        = match &opts.bound_state_localization {
            BoundStateLocalization::Newton { guesses } => {
                let candidates: Vec<RootState>
                    = guesses.iter().map(|&g| RootState::Candidate(g)).collect();
                (candidates, Some(guesses.len()), None)
            },
            BoundStateLocalization::SubsampleAndRefine => {
                let dsub = opts.dsub.unwrap_or_else(|| default_subsample(field.len()));
                let sub = field.subsampled(dsub)?;
                let coarse
                    = BoundStateEvaluator::new(
                        &sub, coupling, COARSE_SCHEME, opts.normalization);
                let scanner = ArgumentScanner::new(&coarse, sub.span());
                let (candidates, expected)
                    = RootState::Unsearched(scan_region(&sub, filter.im_max))
                    .localize(&scanner);
                (candidates, expected, Some(coarse))
            },
            BoundStateLocalization::FullScan => {
                let scanner = ArgumentScanner::new(&fine, field.span());
                let (candidates, expected)
                    = RootState::Unsearched(scan_region(field, filter.im_max))
                    .localize(&scanner);
                (candidates, expected, None)
            },
        };
    info!(candidates = candidates.len(), ?expected, "localized bound states");

    let refined: Vec<RootState>
        = candidates.into_par_iter()
        .map(|c| c.refine(coarse.as_ref(), &fine, opts.niter, opts.tolerance))
        .collect();
    let unfiltered: Vec<C64>
        = refined.iter()
        .filter(|s| matches!(s, RootState::Refined { .. }))
        .filter_map(RootState::location)
        .collect();

    let mut accepted: Vec<C64> = Vec::new();
    let mut rejected: Vec<RootState> = Vec::new();
    for state in refined {
        match state.classify(&accepted, &filter) {
            RootState::Accepted(z) => { accepted.push(z); },
            other => { rejected.push(other); },
        }
    }
    accepted.sort_by(bound_state_order);
    let found = accepted.len();
    let k_max = opts.max_bound_states.unwrap_or(field.len());
    if found > k_max {
        warn!(found, max = k_max, "more bound states than allowed; truncating");
        rejected.extend(
            accepted.drain(k_max..)
            .map(|at| RootState::Rejected { at, reason: Rejection::Truncated })
        );
    }

    let coefficients: Vec<Option<BoundStateCoefficients>>
        = accepted.par_iter().map(|&z| fine.coefficients(z)).collect();
    let nan = C64::new(f64::NAN, f64::NAN);
    let overflowed = coefficients.iter().any(Option::is_none);
    let pick = |f: fn(&BoundStateCoefficients) -> C64| -> nd::Array1<C64> {
        coefficients.iter().map(|c| c.as_ref().map(f).unwrap_or(nan)).collect()
    };

    let status
        = match expected {
            None => Status::RootFindingDivergence,
            Some(n) if found < n => {
                warn!(found, expected = n, "fewer bound states than expected");
                Status::RootFindingDivergence
            },
            _ if overflowed && (kind.wants_norming_constants() || kind.wants_residues())
                => Status::NumericalOverflow,
            _ => Status::Success,
        };
    Ok(Some(DiscreteSpectrum {
        norming_constants: kind.wants_norming_constants().then(|| pick(|c| c.norming_constant)),
        residues: kind.wants_residues().then(|| pick(|c| c.residue)),
        unfiltered: kind.wants_unfiltered().then(|| unfiltered.into_iter().collect()),
        bound_states: accepted.into_iter().collect(),
        expected,
        rejected,
        status,
    }))
}
