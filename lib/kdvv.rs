//! Nonlinear Fourier transform for the Korteweg-de Vries equation with
//! vanishing boundary conditions,
//! ```text
//! ∂u/∂x + 6u ∂u/∂t + ∂³u/∂t³ = 0,    u(t) → 0 as |t| → ∞.
//! ```
//!
//! Only the continuous spectrum is computed.

use ndarray as nd;
use num_complex::Complex64 as C64;
use tracing::info;
use crate::{
    Arr1,
    continuous::{ self, ContinuousSpectrum },
    error::{ ConfigError, NftResult, Status },
    field::{ Coupling, SampledField },
    options::KdvvOptions,
    transfer::{ Transfer, TransferStrategy },
    utils::linspace,
};

/// Output of [`kdvv`].
#[derive(Clone, Debug, PartialEq)]
pub struct KdvvRecord {
    pub status: Status,
    pub contspec: Option<ContinuousSpectrum>,
    pub options: KdvvOptions,
}

impl KdvvRecord {
    pub fn reflection(&self) -> Option<&nd::Array1<C64>> {
        self.contspec.as_ref().and_then(|c| c.reflection.as_ref())
    }

    pub fn a(&self) -> Option<&nd::Array1<C64>> {
        self.contspec.as_ref().and_then(|c| c.a.as_ref())
    }

    pub fn b(&self) -> Option<&nd::Array1<C64>> {
        self.contspec.as_ref().and_then(|c| c.b.as_ref())
    }
}

/// Compute the continuous spectrum of `u` sampled uniformly from
/// `t_bounds.0` to `t_bounds.1` on `m` points evenly spaced over
/// `xi_bounds`.
///
/// # Example
/// ```
/// use ndarray as nd;
/// use num_complex::Complex64 as C64;
/// use akns::{ kdvv::kdvv, options::KdvvOptions };
///
/// let u: nd::Array1<C64>
///     = nd::Array1::linspace(-4.0, 4.0, 64)
///     .mapv(|t: f64| C64::new(0.5 * (-t * t).exp(), 0.0));
/// let res = kdvv(&u, (-4.0, 4.0), (-2.0, 2.0), 8, &KdvvOptions::new()).unwrap();
/// assert!(res.status.is_success());
/// assert_eq!(res.reflection().unwrap().len(), 8);
/// ```
pub fn kdvv<S>(
    u: &Arr1<S>,
    t_bounds: (f64, f64),
    xi_bounds: (f64, f64),
    m: usize,
    opts: &KdvvOptions,
) -> NftResult<KdvvRecord>
where S: nd::Data<Elem = C64>
{
    let field = SampledField::new(u, t_bounds)?;
    kdvv_field(&field, xi_bounds, m, opts)
}

/// Like [`kdvv`], for an already validated field.
pub fn kdvv_field(
    field: &SampledField,
    xi_bounds: (f64, f64),
    m: usize,
    opts: &KdvvOptions,
) -> NftResult<KdvvRecord> {
    let kind = opts.contspec_type;
    if !kind.is_output() {
        return Ok(KdvvRecord {
            status: Status::Success,
            contspec: None,
            options: opts.clone(),
        });
    }
    ConfigError::check_frequency_bounds(xi_bounds.0, xi_bounds.1)?;
    ConfigError::check_grid_size(m)?;
    info!(samples = field.len(), points = m, %opts, "kdvv");

    let repr
        = Transfer::new(
            TransferStrategy::for_points(m, opts.discretization),
            field,
            Coupling::Kdv,
            opts.discretization,
            opts.normalization,
        );
    let contspec = continuous::evaluate(&repr, &linspace(xi_bounds, m), kind);
    let status = contspec.as_ref().map(ContinuousSpectrum::status).unwrap_or_default();
    Ok(KdvvRecord { status, contspec, options: opts.clone() })
}
