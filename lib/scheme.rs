//! Catalog of the 18 exponential splitting schemes used to discretize the
//! spectral problem, and the local (single-sample) transfer matrices they
//! define.
//!
//! Every scheme splits the exponential of the generator
//! ```text
//! h·[[-iξ, q], [r, iξ]] = h·[[-iξ, 0], [0, iξ]] + h·[[0, q], [r, 0]]
//!                       =       h·A(ξ)          +        h·Q
//! ```
//! into a ξ-dependent free factor `E_A(τ) = exp(τA)` and a ξ-independent
//! potential factor `E_Q(τ) = exp(τQ)`. Higher orders are reached by
//! Richardson extrapolation over several substep counts. See [`docs`][crate::docs]
//! for the full construction.

use std::{ fmt, str::FromStr };
use num_complex::Complex64 as C64;
use crate::{
    error::{ ConfigError, ConfigResult },
    mat2::{ Elem, Mat2 },
};

/// A splitting scheme, identified by a name such as `2SPLIT4B` and an integer
/// code in `0..=17`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Discretization {
    TwoSplit1A,
    TwoSplit1B,
    TwoSplit2A,
    TwoSplit2B,
    TwoSplit2S,
    TwoSplit3A,
    TwoSplit3B,
    TwoSplit3S,
    TwoSplit4A,
    TwoSplit4B,
    TwoSplit5A,
    TwoSplit5B,
    TwoSplit6A,
    TwoSplit6B,
    TwoSplit7A,
    TwoSplit7B,
    TwoSplit8A,
    #[default]
    TwoSplit8B,
}

/// Ordering of the free and potential factors within one base step.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Splitting {
    /// `E_Q(τ)·E_A(τ)`: free evolution applied first.
    LieA,
    /// `E_A(τ)·E_Q(τ)`: potential applied first.
    LieB,
    /// `E_A(τ/2)·E_Q(τ)·E_A(τ/2)`.
    StrangA,
    /// `E_Q(τ/2)·E_A(τ)·E_Q(τ/2)`.
    StrangB,
    /// Mean of both Lie orderings.
    Symmetric,
}

/// Richardson extrapolation applied across substep counts `1..=levels`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Extrapolation {
    /// A single level; no extrapolation.
    Single,
    /// Eliminates error terms in powers of `1/n`.
    Linear,
    /// Eliminates error terms in even powers of `1/n` (symmetric bases).
    Quadratic,
}

/// One extrapolation level: the base step is applied `substeps` times with
/// step `h / substeps`, and the result enters the local matrix with `weight`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Level {
    pub substeps: usize,
    pub weight: f64,
}

impl Discretization {
    /// All schemes in code order.
    pub const ALL: [Self; 18] = [
        Self::TwoSplit1A, Self::TwoSplit1B,
        Self::TwoSplit2A, Self::TwoSplit2B, Self::TwoSplit2S,
        Self::TwoSplit3A, Self::TwoSplit3B, Self::TwoSplit3S,
        Self::TwoSplit4A, Self::TwoSplit4B,
        Self::TwoSplit5A, Self::TwoSplit5B,
        Self::TwoSplit6A, Self::TwoSplit6B,
        Self::TwoSplit7A, Self::TwoSplit7B,
        Self::TwoSplit8A, Self::TwoSplit8B,
    ];

    /// Look up a scheme by its integer code.
    pub fn from_code(code: i32) -> ConfigResult<Self> {
        usize::try_from(code).ok()
            .and_then(|k| Self::ALL.get(k).copied())
            .ok_or(ConfigError::UnknownDiscretization(code))
    }

    pub fn code(self) -> i32 { self as i32 }

    pub fn name(self) -> &'static str {
        match self {
            Self::TwoSplit1A => "2SPLIT1A",
            Self::TwoSplit1B => "2SPLIT1B",
            Self::TwoSplit2A => "2SPLIT2A",
            Self::TwoSplit2B => "2SPLIT2B",
            Self::TwoSplit2S => "2SPLIT2S",
            Self::TwoSplit3A => "2SPLIT3A",
            Self::TwoSplit3B => "2SPLIT3B",
            Self::TwoSplit3S => "2SPLIT3S",
            Self::TwoSplit4A => "2SPLIT4A",
            Self::TwoSplit4B => "2SPLIT4B",
            Self::TwoSplit5A => "2SPLIT5A",
            Self::TwoSplit5B => "2SPLIT5B",
            Self::TwoSplit6A => "2SPLIT6A",
            Self::TwoSplit6B => "2SPLIT6B",
            Self::TwoSplit7A => "2SPLIT7A",
            Self::TwoSplit7B => "2SPLIT7B",
            Self::TwoSplit8A => "2SPLIT8A",
            Self::TwoSplit8B => "2SPLIT8B",
        }
    }

    fn layout(self) -> (Splitting, usize, Extrapolation) {
        use Extrapolation::*;
        use Splitting::*;
        match self {
            Self::TwoSplit1A => (LieA, 1, Single),
            Self::TwoSplit1B => (LieB, 1, Single),
            Self::TwoSplit2A => (StrangA, 1, Single),
            Self::TwoSplit2B => (StrangB, 1, Single),
            Self::TwoSplit2S => (Symmetric, 1, Single),
            Self::TwoSplit3A => (LieA, 3, Linear),
            Self::TwoSplit3B => (LieB, 3, Linear),
            Self::TwoSplit3S => (Symmetric, 2, Quadratic),
            Self::TwoSplit4A => (StrangA, 2, Quadratic),
            Self::TwoSplit4B => (StrangB, 2, Quadratic),
            Self::TwoSplit5A => (LieA, 5, Linear),
            Self::TwoSplit5B => (LieB, 5, Linear),
            Self::TwoSplit6A => (StrangA, 3, Quadratic),
            Self::TwoSplit6B => (StrangB, 3, Quadratic),
            Self::TwoSplit7A => (LieA, 7, Linear),
            Self::TwoSplit7B => (LieB, 7, Linear),
            Self::TwoSplit8A => (StrangA, 4, Quadratic),
            Self::TwoSplit8B => (StrangB, 4, Quadratic),
        }
    }

    /// Nominal order of accuracy.
    pub fn order(self) -> usize {
        match self {
            Self::TwoSplit1A | Self::TwoSplit1B => 1,
            Self::TwoSplit2A | Self::TwoSplit2B | Self::TwoSplit2S => 2,
            Self::TwoSplit3A | Self::TwoSplit3B | Self::TwoSplit3S => 3,
            Self::TwoSplit4A | Self::TwoSplit4B => 4,
            Self::TwoSplit5A | Self::TwoSplit5B => 5,
            Self::TwoSplit6A | Self::TwoSplit6B => 6,
            Self::TwoSplit7A | Self::TwoSplit7B => 7,
            Self::TwoSplit8A | Self::TwoSplit8B => 8,
        }
    }

    pub fn splitting(self) -> Splitting { self.layout().0 }

    pub fn extrapolation(self) -> Extrapolation { self.layout().2 }

    /// Substep counts and Richardson weights of every level.
    pub fn levels(self) -> Vec<Level> {
        let (_, n, ext) = self.layout();
        let p: i32
            = match ext {
                Extrapolation::Single | Extrapolation::Linear => 1,
                Extrapolation::Quadratic => 2,
            };
        let substeps: Vec<usize> = (1..=n).collect();
        substeps.iter()
            .map(|&nj| {
                let aj = (nj as f64).powi(p);
                let weight: f64
                    = substeps.iter()
                    .filter(|&&ni| ni != nj)
                    .map(|&ni| aj / (aj - (ni as f64).powi(p)))
                    .product();
                Level { substeps: nj, weight }
            })
            .collect()
    }

    /// `true` if the local matrix is a single product of exponentials and
    /// hence has unit determinant without renormalization.
    pub fn is_unimodular(self) -> bool {
        let (split, n, _) = self.layout();
        n == 1 && split != Splitting::Symmetric
    }

    /// `true` if the transfer matrix can be written exactly as a Laurent
    /// polynomial in `exp(iξ·dt/m)`; see [`poly_denominator`][Self::poly_denominator].
    pub fn admits_polynomial(self) -> bool { self.is_unimodular() }

    /// The `m` in the polynomial variable `w = exp(iξ·dt/m)`, if the scheme
    /// admits a polynomial form.
    pub fn poly_denominator(self) -> Option<u32> {
        self.admits_polynomial()
            .then(|| if self.splitting() == Splitting::StrangA { 2 } else { 1 })
    }

    /// The ξ-independent potential factors of a single sample, one per level.
    pub fn potential_factors(self, q: C64, r: C64, h: f64) -> Vec<Mat2> {
        let frac = self.splitting().potential_fraction();
        self.levels().iter()
            .map(|lvl| potential_exp(q, r, frac * h / lvl.substeps as f64))
            .collect()
    }

    /// The free factors of every level at spectral parameter `xi`; these are
    /// shared by all samples.
    pub fn free_factors<E>(self, levels: &[Level], xi: C64, h: f64) -> Vec<E>
    where E: Elem
    {
        let frac = self.splitting().free_fraction();
        levels.iter()
            .map(|lvl| E::phase(xi, frac * h / lvl.substeps as f64))
            .collect()
    }

    /// Assemble the local transfer matrix of one sample from its
    /// [potential factors][Self::potential_factors] and the shared
    /// [free factors][Self::free_factors].
    pub fn assemble<E>(self, levels: &[Level], pot: &[Mat2], free: &[E]) -> E
    where E: Elem
    {
        let split = self.splitting();
        let single = levels.len() == 1;
        let mut acc = E::identity();
        for (j, ((lvl, p), f)) in levels.iter().zip(pot).zip(free).enumerate() {
            let base = split.combine(E::constant(*p), *f);
            let mut prod = base;
            (1..lvl.substeps).for_each(|_| { prod = base * prod; });
            let term = if single { prod } else { prod.weighted(lvl.weight) };
            acc = if j == 0 { term } else { acc + term };
        }
        if self.is_unimodular() { acc } else { acc.unimodular() }
    }

    /// Local transfer matrix of a single sample `(q, r)` with spacing `h`.
    pub fn local<E>(self, q: C64, r: C64, h: f64, xi: C64) -> E
    where E: Elem
    {
        let levels = self.levels();
        let pot = self.potential_factors(q, r, h);
        let free: Vec<E> = self.free_factors(&levels, xi, h);
        self.assemble(&levels, &pot, &free)
    }
}

impl fmt::Display for Discretization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Discretization {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL.into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownDiscretizationName(s.to_string()))
    }
}

impl Splitting {
    fn potential_fraction(self) -> f64 {
        if self == Self::StrangB { 0.5 } else { 1.0 }
    }

    fn free_fraction(self) -> f64 {
        if self == Self::StrangA { 0.5 } else { 1.0 }
    }

    /// One base step from a potential factor and a free factor whose
    /// substeps have already been fractioned.
    pub fn combine<E>(self, pot: E, free: E) -> E
    where E: Elem
    {
        match self {
            Self::LieA => pot * free,
            Self::LieB => free * pot,
            Self::StrangA => free * pot * free,
            Self::StrangB => pot * free * pot,
            Self::Symmetric => (pot * free + free * pot).weighted(0.5),
        }
    }
}

// below this |qrτ²|, the truncated series is exact to round-off
const SERIES_THRESHOLD: f64 = 1e-5;

/// `exp(τ·[[0, q], [r, 0]]) = cosh(ωτ)·I + sinh(ωτ)/ω·[[0, q], [r, 0]]` with
/// `ω² = qr`.
pub fn potential_exp(q: C64, r: C64, tau: f64) -> Mat2 {
    let qr = q * r;
    let x2 = qr * tau * tau;
    let (c, s)
        = if x2.norm() < SERIES_THRESHOLD {
            (
                1.0 + x2 / 2.0 + x2 * x2 / 24.0,
                tau * (1.0 + x2 / 6.0 + x2 * x2 / 120.0),
            )
        } else {
            let w = qr.sqrt();
            ((w * tau).cosh(), (w * tau).sinh() / w)
        };
    Mat2::new(c, s * q, s * r, c)
}
