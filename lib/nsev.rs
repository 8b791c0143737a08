//! Nonlinear Fourier transform for the nonlinear Schrödinger equation with
//! vanishing boundary conditions,
//! ```text
//! i ∂q/∂x + ∂²q/∂t² + 2κ|q|²q = 0,    q(t) → 0 as |t| → ∞.
//! ```

use ndarray as nd;
use num_complex::Complex64 as C64;
use tracing::info;
use crate::{
    Arr1,
    continuous::{ self, ContinuousSpectrum },
    discrete::{ self, DiscreteSpectrum },
    error::{ ConfigError, NftResult, Status },
    field::SampledField,
    options::NsevOptions,
    transfer::{ Transfer, TransferStrategy },
    utils::linspace,
};

/// Output of [`nsev`].
#[derive(Clone, Debug, PartialEq)]
pub struct NsevRecord {
    /// First non-success status of the continuous, then the discrete phase.
    pub status: Status,
    pub contspec: Option<ContinuousSpectrum>,
    pub discspec: Option<DiscreteSpectrum>,
    /// Options as used, with defaults resolved.
    pub options: NsevOptions,
}

impl NsevRecord {
    pub fn reflection(&self) -> Option<&nd::Array1<C64>> {
        self.contspec.as_ref().and_then(|c| c.reflection.as_ref())
    }

    pub fn a(&self) -> Option<&nd::Array1<C64>> {
        self.contspec.as_ref().and_then(|c| c.a.as_ref())
    }

    pub fn b(&self) -> Option<&nd::Array1<C64>> {
        self.contspec.as_ref().and_then(|c| c.b.as_ref())
    }

    pub fn bound_states(&self) -> Option<&nd::Array1<C64>> {
        self.discspec.as_ref().map(|d| &d.bound_states)
    }

    pub fn norming_constants(&self) -> Option<&nd::Array1<C64>> {
        self.discspec.as_ref().and_then(|d| d.norming_constants.as_ref())
    }

    pub fn residues(&self) -> Option<&nd::Array1<C64>> {
        self.discspec.as_ref().and_then(|d| d.residues.as_ref())
    }
}

/// Compute the NFT of `q` sampled uniformly from `t_bounds.0` to
/// `t_bounds.1`, with the continuous spectrum on `m` points evenly spaced
/// over `xi_bounds`.
///
/// Fails only on invalid input; numerical trouble is reported through
/// [`NsevRecord::status`].
///
/// # Example
/// ```
/// use ndarray as nd;
/// use num_complex::Complex64 as C64;
/// use akns::{ nsev::nsev, options::NsevOptions, error::Status };
///
/// let q: nd::Array1<C64>
///     = nd::Array1::linspace(-8.0, 8.0, 128)
///     .mapv(|t: f64| C64::new(1.2 / t.cosh(), 0.0));
/// let res = nsev(&q, (-8.0, 8.0), (-2.0, 2.0), 16, &NsevOptions::default())
///     .unwrap();
/// assert_eq!(res.status, Status::Success);
/// assert_eq!(res.reflection().unwrap().len(), 16);
/// // 1.2 sech(t) has a single bound state near ξ = 0.7i
/// let xi = res.bound_states().unwrap();
/// assert_eq!(xi.len(), 1);
/// assert!((xi[0].im - 0.7).abs() < 1e-3);
/// ```
pub fn nsev<S>(
    q: &Arr1<S>,
    t_bounds: (f64, f64),
    xi_bounds: (f64, f64),
    m: usize,
    opts: &NsevOptions,
) -> NftResult<NsevRecord>
where S: nd::Data<Elem = C64>
{
    let field = SampledField::new(q, t_bounds)?;
    nsev_field(&field, xi_bounds, m, opts)
}

/// Like [`nsev`], but with sample times given explicitly. Only the first and
/// last times are used.
pub fn nsev_tvec<S, T>(
    q: &Arr1<S>,
    tvec: &Arr1<T>,
    xi_bounds: (f64, f64),
    m: usize,
    opts: &NsevOptions,
) -> NftResult<NsevRecord>
where
    S: nd::Data<Elem = C64>,
    T: nd::Data<Elem = f64>,
{
    let field = SampledField::from_tvec(q, tvec)?;
    nsev_field(&field, xi_bounds, m, opts)
}

/// Like [`nsev`], for an already validated field.
pub fn nsev_field(
    field: &SampledField,
    xi_bounds: (f64, f64),
    m: usize,
    opts: &NsevOptions,
) -> NftResult<NsevRecord> {
    opts.check()?;
    let kind = opts.contspec_type;
    if kind.is_output() {
        ConfigError::check_frequency_bounds(xi_bounds.0, xi_bounds.1)?;
        ConfigError::check_grid_size(m)?;
    }
    let opts = opts.resolved(field.len());
    info!(samples = field.len(), points = m, %opts, "nsev");

    let contspec
        = if kind.is_output() {
            let strategy = TransferStrategy::for_points(m, opts.discretization);
            let repr
                = Transfer::new(
                    strategy,
                    field,
                    opts.kappa.coupling(),
                    opts.discretization,
                    opts.normalization,
                );
            continuous::evaluate(&repr, &linspace(xi_bounds, m), kind)
        } else {
            None
        };
    let discspec = discrete::solve(field, &opts)?;

    let status
        = contspec.as_ref().map(ContinuousSpectrum::status).unwrap_or_default()
        .then(discspec.as_ref().map(|d| d.status).unwrap_or_default());
    Ok(NsevRecord { status, contspec, discspec, options: opts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{ ContSpecType, DiscSpecType };

    fn field() -> SampledField {
        SampledField::from_fn((-6.0, 6.0), 96, |t| C64::new(1.2 / t.cosh(), 0.0))
            .unwrap()
    }

    #[test]
    fn frequency_grid_is_validated_only_when_needed() {
        let f = field();
        let opts = NsevOptions::default();
        assert_eq!(
            nsev_field(&f, (2.0, -2.0), 8, &opts),
            Err(ConfigError::BadFrequencyBounds(2.0, -2.0).into()),
        );
        assert_eq!(
            nsev_field(&f, (-2.0, 2.0), 0, &opts),
            Err(ConfigError::EmptyGrid.into()),
        );
        let skip = NsevOptions {
            contspec_type: ContSpecType::Skip,
            discspec_type: DiscSpecType::Skip,
            ..NsevOptions::default()
        };
        let res = nsev_field(&f, (2.0, -2.0), 0, &skip).unwrap();
        assert_eq!(res.status, Status::Success);
        assert!(res.contspec.is_none() && res.discspec.is_none());
    }

    #[test]
    fn record_echoes_resolved_options() {
        let f = field();
        let res = nsev_field(&f, (-1.0, 1.0), 4, &NsevOptions::default()).unwrap();
        assert_eq!(res.options.max_bound_states, Some(96));
        assert!(res.options.dsub.is_some());
        assert_eq!(res.reflection().map(|r| r.len()), Some(4));
        assert!(res.a().is_none() && res.b().is_none());
        assert_eq!(
            res.bound_states().map(|b| b.len()),
            res.norming_constants().map(|n| n.len()),
        );
        assert!(res.residues().is_none());
    }

    #[test]
    fn polynomial_and_kernel_paths_agree() {
        let f = field();
        let opts = NsevOptions::from_codes(3, 1, 2, 2, 3, 0).unwrap();
        let grid = linspace((-2.0, 2.0), 64);
        assert_eq!(
            TransferStrategy::for_points(64, opts.discretization),
            TransferStrategy::Polynomial,
        );
        let poly = nsev_field(&f, (-2.0, 2.0), 64, &opts).unwrap();
        let kernel
            = Transfer::new(
                TransferStrategy::Kernel,
                &f,
                opts.kappa.coupling(),
                opts.discretization,
                true,
            );
        let direct = continuous::evaluate(&kernel, &grid, opts.contspec_type).unwrap();
        let refl_poly = poly.reflection().unwrap();
        let refl_kernel = direct.reflection.unwrap();
        for (p, k) in refl_poly.iter().zip(&refl_kernel) {
            assert!((p - k).norm() < 1e-9, "{} vs {}", p, k);
        }
    }
}
