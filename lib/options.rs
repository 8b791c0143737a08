//! Option records for [`nsev`][crate::nsev::nsev] and
//! [`kdvv`][crate::kdvv::kdvv].
//!
//! Every enumerated knob can be built from (and converted back to) the integer
//! code of the integer interface, so that option sets can be written compactly,
//! e.g. `NsevOptions::from_codes(17, 1, 2, 2, 0, 0)`.

use std::fmt;
use num_complex::Complex64 as C64;
use crate::{
    DEF_MAXITERS,
    DEF_TOLERANCE,
    error::{ ConfigError, ConfigResult },
    field::{ default_subsample, Coupling },
    scheme::Discretization,
};

/// Sign of the nonlinearity in the NSE.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Kappa {
    /// κ = +1: bright solitons, bound states exist.
    #[default]
    Focusing,
    /// κ = -1: no bound states.
    Defocusing,
}

impl Kappa {
    pub fn from_code(code: i32) -> ConfigResult<Self> {
        match code {
            1 => Ok(Self::Focusing),
            -1 => Ok(Self::Defocusing),
            _ => Err(ConfigError::UnknownKappa(code)),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Focusing => 1,
            Self::Defocusing => -1,
        }
    }

    pub fn coupling(self) -> Coupling {
        match self {
            Self::Focusing => Coupling::Focusing,
            Self::Defocusing => Coupling::Defocusing,
        }
    }

    pub fn is_focusing(self) -> bool { self == Self::Focusing }
}

/// Which located roots are accepted as bound states.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum BoundStateFiltering {
    /// Reject only duplicates.
    None,
    /// Also reject roots outside the open upper half plane.
    Basic,
    /// Also reject roots outside the box in which the discretized problem
    /// can resolve bound states.
    #[default]
    Full,
}

impl BoundStateFiltering {
    pub fn from_code(code: i32) -> ConfigResult<Self> {
        match code {
            0 => Ok(Self::None),
            1 => Ok(Self::Basic),
            2 => Ok(Self::Full),
            _ => Err(ConfigError::UnknownFiltering(code)),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Basic => 1,
            Self::Full => 2,
        }
    }
}

/// How candidate bound states are found before refinement.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum BoundStateLocalization {
    /// Argument-principle scan of the full-resolution problem.
    FullScan,
    /// Refine caller-supplied initial guesses only.
    Newton { guesses: Vec<C64> },
    /// Argument-principle scan of a subsampled problem, then refinement on
    /// the full one.
    #[default]
    SubsampleAndRefine,
}

impl BoundStateLocalization {
    /// Convert from an integer code. Code 1 yields Newton refinement with no
    /// guesses; add them with [`with_guesses`][Self::with_guesses].
    pub fn from_code(code: i32) -> ConfigResult<Self> {
        match code {
            0 => Ok(Self::FullScan),
            1 => Ok(Self::Newton { guesses: Vec::new() }),
            2 => Ok(Self::SubsampleAndRefine),
            _ => Err(ConfigError::UnknownLocalization(code)),
        }
    }

    pub fn with_guesses<I>(guesses: I) -> Self
    where I: IntoIterator<Item = C64>
    {
        Self::Newton { guesses: guesses.into_iter().collect() }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::FullScan => 0,
            Self::Newton { .. } => 1,
            Self::SubsampleAndRefine => 2,
        }
    }

    pub fn is_newton(&self) -> bool { matches!(self, Self::Newton { .. }) }
}

/// Requested discrete-spectrum output.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DiscSpecType {
    #[default]
    NormingConstants,
    Residues,
    /// Norming constants, residues, and the unfiltered candidate roots.
    Both,
    /// Do not search for bound states.
    Skip,
    /// Locate bound states but output neither norming constants nor
    /// residues.
    None,
}

impl DiscSpecType {
    /// Convert from an integer code. Codes outside `0..=3` mean
    /// [`None`][Self::None].
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::NormingConstants,
            1 => Self::Residues,
            2 => Self::Both,
            3 => Self::Skip,
            _ => Self::None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::NormingConstants => 0,
            Self::Residues => 1,
            Self::Both => 2,
            Self::Skip => 3,
            Self::None => -1,
        }
    }

    pub fn is_skip(self) -> bool { self == Self::Skip }

    pub fn wants_norming_constants(self) -> bool {
        matches!(self, Self::NormingConstants | Self::Both)
    }

    pub fn wants_residues(self) -> bool {
        matches!(self, Self::Residues | Self::Both)
    }

    pub fn wants_unfiltered(self) -> bool { self == Self::Both }
}

/// Requested continuous-spectrum output.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ContSpecType {
    #[default]
    Reflection,
    /// The scattering coefficients `a(ξ)` and `b(ξ)`.
    AB,
    Both,
    /// Do not evaluate (and do not validate the frequency grid).
    Skip,
    /// No output.
    None,
}

impl ContSpecType {
    /// Convert from an integer code. Codes outside `0..=3` mean
    /// [`None`][Self::None].
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Reflection,
            1 => Self::AB,
            2 => Self::Both,
            3 => Self::Skip,
            _ => Self::None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Reflection => 0,
            Self::AB => 1,
            Self::Both => 2,
            Self::Skip => 3,
            Self::None => -1,
        }
    }

    pub fn wants_reflection(self) -> bool {
        matches!(self, Self::Reflection | Self::Both)
    }

    pub fn wants_ab(self) -> bool { matches!(self, Self::AB | Self::Both) }

    /// Whether anything is to be evaluated on the frequency grid.
    pub fn is_output(self) -> bool { self.wants_reflection() || self.wants_ab() }
}

/// Options for the NSE transform.
#[derive(Clone, Debug, PartialEq)]
pub struct NsevOptions {
    pub discretization: Discretization,
    pub kappa: Kappa,
    pub bound_state_filtering: BoundStateFiltering,
    pub bound_state_localization: BoundStateLocalization,
    /// Maximum number of Newton iterations per refinement stage.
    pub niter: usize,
    /// Subsample size for [`BoundStateLocalization::SubsampleAndRefine`];
    /// `None` means `ceil(sqrt(D)·log2(D))`.
    pub dsub: Option<usize>,
    /// Relative step size at which Newton refinement stops.
    pub tolerance: f64,
    /// Maximum number of bound states returned; `None` means `D`.
    pub max_bound_states: Option<usize>,
    pub discspec_type: DiscSpecType,
    pub contspec_type: ContSpecType,
    /// Rescale running products by powers of two.
    pub normalization: bool,
}

impl Default for NsevOptions {
    fn default() -> Self {
        Self {
            discretization: Discretization::default(),
            kappa: Kappa::default(),
            bound_state_filtering: BoundStateFiltering::default(),
            bound_state_localization: BoundStateLocalization::default(),
            niter: DEF_MAXITERS,
            dsub: None,
            tolerance: DEF_TOLERANCE,
            max_bound_states: None,
            discspec_type: DiscSpecType::default(),
            contspec_type: ContSpecType::default(),
            normalization: true,
        }
    }
}

impl NsevOptions {
    /// Build from integer codes (`dis`, `kappa`, `bsf`, `bsl`, `dst`, `cst`),
    /// with all other options at their defaults.
    pub fn from_codes(
        dis: i32,
        kappa: i32,
        bsf: i32,
        bsl: i32,
        dst: i32,
        cst: i32,
    ) -> ConfigResult<Self> {
        Ok(Self {
            discretization: Discretization::from_code(dis)?,
            kappa: Kappa::from_code(kappa)?,
            bound_state_filtering: BoundStateFiltering::from_code(bsf)?,
            bound_state_localization: BoundStateLocalization::from_code(bsl)?,
            discspec_type: DiscSpecType::from_code(dst),
            contspec_type: ContSpecType::from_code(cst),
            ..Self::default()
        })
    }

    /// Check option values that do not depend on the input field.
    pub fn check(&self) -> ConfigResult<()> {
        ConfigError::check_tolerance(self.tolerance)?;
        if let Some(dsub) = self.dsub { ConfigError::check_subsample(dsub)?; }
        if let BoundStateLocalization::Newton { guesses } = &self.bound_state_localization {
            if self.kappa.is_focusing() && !self.discspec_type.is_skip() {
                (!guesses.is_empty()).then_some(()).ok_or(ConfigError::NoGuesses)?;
            }
            if let Some(g) = guesses.iter().find(|g| !g.is_finite()) {
                return Err(ConfigError::BadGuess(*g));
            }
        }
        Ok(())
    }

    /// Fill in the defaults that depend on the number of samples `d`.
    pub fn resolved(&self, d: usize) -> Self {
        Self {
            dsub: Some(self.dsub.unwrap_or_else(|| default_subsample(d)).min(d)),
            max_bound_states: Some(self.max_bound_states.unwrap_or(d)),
            ..self.clone()
        }
    }
}

impl fmt::Display for NsevOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dsub = self.dsub.map(|d| d.to_string()).unwrap_or_else(|| "auto".into());
        let k = self.max_bound_states
            .map(|k| k.to_string()).unwrap_or_else(|| "auto".into());
        write!(
            f,
            "NsevOptions(dis={} ({}), kappa={}, bsf={}, bsl={}, niter={}, Dsub={}, \
            tol={:e}, K={}, dst={}, cst={}, nf={})",
            self.discretization.code(),
            self.discretization,
            self.kappa.code(),
            self.bound_state_filtering.code(),
            self.bound_state_localization.code(),
            self.niter,
            dsub,
            self.tolerance,
            k,
            self.discspec_type.code(),
            self.contspec_type.code(),
            self.normalization as i32,
        )
    }
}

/// Options for the KdV transform.
#[derive(Clone, Debug, PartialEq)]
pub struct KdvvOptions {
    pub discretization: Discretization,
    pub contspec_type: ContSpecType,
    pub normalization: bool,
}

impl Default for KdvvOptions {
    fn default() -> Self {
        Self {
            discretization: Discretization::default(),
            contspec_type: ContSpecType::default(),
            normalization: true,
        }
    }
}

impl KdvvOptions {
    pub fn new() -> Self { Self::default() }

    /// Build from integer codes (`dis`, `cst`), with normalization on.
    pub fn from_codes(dis: i32, cst: i32) -> ConfigResult<Self> {
        Ok(Self {
            discretization: Discretization::from_code(dis)?,
            contspec_type: ContSpecType::from_code(cst),
            normalization: true,
        })
    }
}

impl fmt::Display for KdvvOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KdvvOptions(dis={} ({}), cst={}, nf={})",
            self.discretization.code(),
            self.discretization,
            self.contspec_type.code(),
            self.normalization as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = NsevOptions::default();
        assert_eq!(opts.discretization, Discretization::TwoSplit8B);
        assert_eq!(opts.bound_state_filtering, BoundStateFiltering::Full);
        assert_eq!(opts.bound_state_localization, BoundStateLocalization::SubsampleAndRefine);
        assert_eq!(opts.niter, 10);
        assert!(opts.normalization);
        assert!(opts.check().is_ok());
        assert_eq!(
            opts.to_string(),
            "NsevOptions(dis=17 (2SPLIT8B), kappa=1, bsf=2, bsl=2, niter=10, \
            Dsub=auto, tol=1e-10, K=auto, dst=0, cst=0, nf=1)",
        );
        assert!(KdvvOptions::new().normalization);
    }

    #[test]
    fn codes_round_trip() {
        for code in -1..=3 {
            assert_eq!(DiscSpecType::from_code(code).code(), code);
            assert_eq!(ContSpecType::from_code(code).code(), code);
        }
        assert_eq!(DiscSpecType::from_code(7), DiscSpecType::None);
        assert_eq!(ContSpecType::from_code(-5), ContSpecType::None);
        assert!(Kappa::from_code(0).is_err());
        assert!(BoundStateFiltering::from_code(3).is_err());
        assert!(BoundStateLocalization::from_code(3).is_err());
        let opts = NsevOptions::from_codes(8, -1, 1, 2, 1, 2).unwrap();
        assert_eq!(opts.discretization, Discretization::TwoSplit4A);
        assert_eq!(opts.kappa, Kappa::Defocusing);
        assert_eq!(opts.discspec_type, DiscSpecType::Residues);
        assert_eq!(opts.contspec_type, ContSpecType::Both);
        assert!(NsevOptions::from_codes(18, 1, 1, 2, 1, 2).is_err());
    }

    #[test]
    fn output_predicates() {
        assert!(DiscSpecType::Both.wants_norming_constants());
        assert!(DiscSpecType::Both.wants_residues());
        assert!(DiscSpecType::Both.wants_unfiltered());
        assert!(!DiscSpecType::None.wants_residues());
        assert!(!DiscSpecType::None.is_skip());
        assert!(ContSpecType::AB.is_output());
        assert!(!ContSpecType::AB.wants_reflection());
        assert!(!ContSpecType::None.is_output());
        assert!(!ContSpecType::Skip.is_output());
    }

    #[test]
    fn newton_requires_guesses() {
        let mut opts = NsevOptions {
            bound_state_localization: BoundStateLocalization::from_code(1).unwrap(),
            ..NsevOptions::default()
        };
        assert_eq!(opts.check(), Err(ConfigError::NoGuesses));
        opts.bound_state_localization
            = BoundStateLocalization::with_guesses([C64::new(0.0, 1.5)]);
        assert!(opts.check().is_ok());
        opts.bound_state_localization
            = BoundStateLocalization::with_guesses([C64::new(f64::NAN, 1.5)]);
        assert!(matches!(opts.check(), Err(ConfigError::BadGuess(_))));
    }

    #[test]
    fn resolution_fills_defaults() {
        let opts = NsevOptions::default().resolved(256);
        assert_eq!(opts.dsub, Some(128));
        assert_eq!(opts.max_bound_states, Some(256));
        let opts = NsevOptions { dsub: Some(1000), ..NsevOptions::default() }
            .resolved(100);
        assert_eq!(opts.dsub, Some(100));
    }
}
