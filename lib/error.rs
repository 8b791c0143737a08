//! Collection of all error types.
//!
//! All errors derive [`thiserror::Error`], making them composable when allowed
//! and compatible with application code using [`anyhow`][anyhow].
//!
//! Only invalid configurations are hard failures at the top level. Numerical
//! trouble met while evaluating spectra (overflow at a grid point, a singular
//! `a(ξ)`, root finding that falls short of the expected count) is recorded in
//! the returned spectra and summarized by a [`Status`].
//!
//! [anyhow]: https://crates.io/crates/anyhow

use std::fmt;
use ndarray as nd;
use num_complex::Complex64 as C64;
use thiserror::Error;
use crate::scheme::Discretization;

/// Returned when an operation requiring equal-length arrays encounters arrays
/// with unequal length.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[error("encountered arrays with incompatible lengths; got {0} and {1}")]
pub struct LengthError(pub usize, pub usize);

impl LengthError {
    pub(crate) fn check<S, A, T, B>(
        a: &nd::ArrayBase<S, nd::Ix1>,
        b: &nd::ArrayBase<T, nd::Ix1>,
    ) -> Result<(), Self>
    where
        S: nd::Data<Elem = A>,
        T: nd::Data<Elem = B>,
    {
        let na = a.len();
        let nb = b.len();
        (na == nb).then_some(()).ok_or(Self(na, nb))
    }
}

/// Returned when inputs or options are malformed. Maps to
/// [`Status::InvalidConfiguration`].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// Returned when a field has fewer than two samples.
    #[error("sampled fields need at least 2 samples; got {0}")]
    TooFewSamples(usize),

    /// Returned when time bounds are not strictly increasing or not finite.
    #[error("time bounds must be finite and satisfy T1 < T2; got ({0}, {1})")]
    BadTimeBounds(f64, f64),

    /// Returned when a field sample is NaN or infinite.
    #[error("field sample {0} is not finite")]
    NonFiniteSample(usize),

    /// Returned when frequency bounds are not strictly increasing or not
    /// finite.
    #[error("frequency bounds must be finite and satisfy Xi1 < Xi2; got ({0}, {1})")]
    BadFrequencyBounds(f64, f64),

    /// Returned when a frequency grid of zero points is requested.
    #[error("frequency grids need at least 1 point")]
    EmptyGrid,

    #[error("unknown discretization code {0}")]
    UnknownDiscretization(i32),

    #[error("unknown discretization name {0:?}")]
    UnknownDiscretizationName(String),

    #[error("kappa must be +1 or -1; got {0}")]
    UnknownKappa(i32),

    #[error("unknown bound-state filtering code {0}")]
    UnknownFiltering(i32),

    #[error("unknown bound-state localization code {0}")]
    UnknownLocalization(i32),

    /// Returned when a non-positive or non-finite root-finding tolerance is
    /// encountered.
    #[error("tolerance must be positive and finite; got {0}")]
    BadTolerance(f64),

    /// Returned when a subsample size below 2 is requested.
    #[error("subsample size must be at least 2; got {0}")]
    BadSubsample(usize),

    /// Returned when Newton localization is requested without any guesses.
    #[error("newton localization requires at least one initial guess")]
    NoGuesses,

    #[error("initial guess {0} is not finite")]
    BadGuess(C64),

    /// Returned when a polynomial transfer representation is requested for a
    /// scheme that does not admit one.
    #[error("discretization {0} has no polynomial transfer representation")]
    NotPolynomial(Discretization),

    /// [`LengthError`]
    #[error("array length error: {0}")]
    Length(#[from] LengthError),
}

impl ConfigError {
    pub(crate) fn check_samples(n: usize) -> Result<(), Self> {
        (n >= 2).then_some(()).ok_or(Self::TooFewSamples(n))
    }

    pub(crate) fn check_time_bounds(t1: f64, t2: f64) -> Result<(), Self> {
        (t1.is_finite() && t2.is_finite() && t1 < t2)
            .then_some(())
            .ok_or(Self::BadTimeBounds(t1, t2))
    }

    pub(crate) fn check_frequency_bounds(xi1: f64, xi2: f64)
        -> Result<(), Self>
    {
        (xi1.is_finite() && xi2.is_finite() && xi1 < xi2)
            .then_some(())
            .ok_or(Self::BadFrequencyBounds(xi1, xi2))
    }

    pub(crate) fn check_grid_size(m: usize) -> Result<(), Self> {
        (m >= 1).then_some(()).ok_or(Self::EmptyGrid)
    }

    pub(crate) fn check_tolerance(tol: f64) -> Result<(), Self> {
        (tol.is_finite() && tol > 0.0)
            .then_some(())
            .ok_or(Self::BadTolerance(tol))
    }

    pub(crate) fn check_subsample(dsub: usize) -> Result<(), Self> {
        (dsub >= 2).then_some(()).ok_or(Self::BadSubsample(dsub))
    }
}

/// Returned when a transfer-matrix product cannot be represented in floating
/// point. Maps to [`Status::NumericalOverflow`].
#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum PropagationError {
    /// Returned when a running product acquires non-finite entries.
    #[error("transfer matrix became non-finite at ξ = {0}")]
    Overflow(C64),

    /// Returned when a scaled result is requested in unscaled form but its
    /// power-of-two exponent is out of range.
    #[error("transfer matrix scale 2^{exp2} is out of range at ξ = {xi}")]
    Exponent { xi: C64, exp2: i32 },
}

/// Top-level error returned by [`nsev`][crate::nsev::nsev] and
/// [`kdvv`][crate::kdvv::kdvv].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum NftError {
    /// [`ConfigError`]
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// [`PropagationError`]
    #[error("propagation error: {0}")]
    Propagation(#[from] PropagationError),
}

impl NftError {
    /// The status code corresponding to this error.
    pub fn status(&self) -> Status {
        match self {
            Self::Config(_) => Status::InvalidConfiguration,
            Self::Propagation(_) => Status::NumericalOverflow,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
pub type PResult<T> = Result<T, PropagationError>;
pub type NftResult<T> = Result<T, NftError>;

/// Overall outcome of a transform, with stable integer codes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Status {
    #[default]
    Success,
    InvalidConfiguration,
    NumericalOverflow,
    DivisionSingularity,
    RootFindingDivergence,
}

impl Status {
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::InvalidConfiguration => 1,
            Self::NumericalOverflow => 2,
            Self::DivisionSingularity => 3,
            Self::RootFindingDivergence => 4,
        }
    }

    pub fn is_success(self) -> bool { self == Self::Success }

    /// Combine with the status of a later phase, keeping the first
    /// non-success.
    pub fn then(self, later: Self) -> Self {
        if self.is_success() { later } else { self }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Success => "success",
            Self::InvalidConfiguration => "invalid configuration",
            Self::NumericalOverflow => "numerical overflow",
            Self::DivisionSingularity => "division by a singular value",
            Self::RootFindingDivergence => "root finding did not converge",
        };
        write!(f, "{} ({})", msg, self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_precedence_keeps_first_failure() {
        use Status::*;
        assert_eq!(Success.then(Success), Success);
        assert_eq!(Success.then(RootFindingDivergence), RootFindingDivergence);
        assert_eq!(DivisionSingularity.then(RootFindingDivergence), DivisionSingularity);
        assert_eq!(NumericalOverflow.then(Success), NumericalOverflow);
    }

    #[test]
    fn status_codes() {
        let codes: Vec<i32>
            = [
                Status::Success,
                Status::InvalidConfiguration,
                Status::NumericalOverflow,
                Status::DivisionSingularity,
                Status::RootFindingDivergence,
            ]
            .into_iter()
            .map(Status::code)
            .collect();
        assert_eq!(codes, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn check_helpers() {
        assert!(ConfigError::check_samples(2).is_ok());
        assert_eq!(ConfigError::check_samples(1), Err(ConfigError::TooFewSamples(1)));
        assert!(ConfigError::check_time_bounds(1.0, 1.0).is_err());
        assert!(ConfigError::check_time_bounds(-1.0, f64::INFINITY).is_err());
        assert!(ConfigError::check_frequency_bounds(2.0, -2.0).is_err());
        assert_eq!(ConfigError::check_grid_size(0), Err(ConfigError::EmptyGrid));
        assert!(ConfigError::check_tolerance(0.0).is_err());
        assert!(ConfigError::check_subsample(1).is_err());
        let err: NftError = ConfigError::EmptyGrid.into();
        assert_eq!(err.status(), Status::InvalidConfiguration);
    }
}
