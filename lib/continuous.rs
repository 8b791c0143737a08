//! Continuous spectrum: scattering data on a real frequency grid.

use ndarray as nd;
use num_complex::Complex64 as C64;
use rayon::prelude::*;
use tracing::warn;
use crate::{
    error::Status,
    options::ContSpecType,
    transfer::{ boundary_phases, scattering_entries, TransferRepr, NEGLIGIBLE },
};

/// Scattering data at a single spectral parameter.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScatteringPoint {
    pub a: C64,
    pub b: C64,
    /// `b/a`.
    pub reflection: C64,
}

/// Outcome classification of a [`ScatteringPoint`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PointFlag {
    Regular,
    /// `a` is numerically zero or the ratio `b/a` is not finite, and the
    /// reflection coefficient is NaN; or `a` and `b` were requested but have
    /// a pole there (KdV at `ξ = 0`) and are NaN.
    Singular,
    /// The transfer matrix (or, if requested, `a` and `b` themselves) could
    /// not be represented; every value is NaN.
    Overflow,
}

const NAN: C64 = C64::new(f64::NAN, f64::NAN);

/// Evaluate `a`, `b`, and `ρ = b/a` at `xi`.
///
/// `a` and `b` are read off the transfer matrix over the domain `(T1', T2')`
/// as described for [`scattering_entries`]. The ratio is formed from the
/// scaled matrix, so the reflection coefficient stays available even when
/// `a` and `b` themselves are out of range; `need_ab` decides whether that
/// case counts as overflow.
pub fn scattering_point<T>(repr: &T, xi: f64, need_ab: bool)
    -> (ScatteringPoint, PointFlag)
where T: TransferRepr + ?Sized
{
    let xi = C64::new(xi, 0.0);
    let coupling = repr.coupling();
    let nan_point = ScatteringPoint { a: NAN, b: NAN, reflection: NAN };
    let t = match repr.transfer(xi) {
        Ok(t) => t,
        Err(_) => return (nan_point, PointFlag::Overflow),
    };
    let (eil, eb) = boundary_phases(xi, repr.domain());
    let (a_num, b_num, den) = scattering_entries(coupling, xi, &t.value);
    let scale = t.value.max_norm() * den.norm().max(1.0);
    let ratio = b_num * eb / (a_num * eil);
    let (reflection, mut flag)
        = if a_num.norm() <= NEGLIGIBLE * scale || !ratio.is_finite() {
            (NAN, PointFlag::Singular)
        } else {
            (ratio, PointFlag::Regular)
        };
    let (a, b)
        = match t.unscaled(xi) {
            Ok(m) => {
                let (a_num, b_num, den) = scattering_entries(coupling, xi, &m);
                let (a, b) = (a_num / den * eil, b_num / den * eb);
                if a.is_finite() && b.is_finite() {
                    (a, b)
                } else {
                    if need_ab { flag = PointFlag::Singular; }
                    (NAN, NAN)
                }
            },
            Err(_) => {
                if need_ab { flag = PointFlag::Overflow; }
                (NAN, NAN)
            },
        };
    (ScatteringPoint { a, b, reflection }, flag)
}

/// Scattering data over a frequency grid.
#[derive(Clone, Debug, PartialEq)]
pub struct ContinuousSpectrum {
    /// Grid points, ascending.
    pub xi: nd::Array1<f64>,
    pub reflection: Option<nd::Array1<C64>>,
    pub a: Option<nd::Array1<C64>>,
    pub b: Option<nd::Array1<C64>>,
    /// Grid indices where `a` vanished or had a pole.
    pub singular: Vec<usize>,
    /// Grid indices where propagation overflowed.
    pub overflowed: Vec<usize>,
}

impl ContinuousSpectrum {
    /// Number of grid points.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize { self.xi.len() }

    pub fn status(&self) -> Status {
        if !self.overflowed.is_empty() {
            Status::NumericalOverflow
        } else if !self.singular.is_empty() {
            Status::DivisionSingularity
        } else {
            Status::Success
        }
    }
}

/// Evaluate the requested continuous-spectrum outputs on `grid`.
///
/// Returns `None` if `kind` requests no output. Grid points are evaluated in
/// parallel; results are in grid order.
pub fn evaluate<T>(repr: &T, grid: &nd::Array1<f64>, kind: ContSpecType)
    -> Option<ContinuousSpectrum>
where T: TransferRepr + ?Sized
{
    if !kind.is_output() { return None; }
    let points: Vec<(ScatteringPoint, PointFlag)>
        = grid.to_vec().into_par_iter()
        .map(|x| scattering_point(repr, x, kind.wants_ab()))
        .collect();
    let indices_of = |want: PointFlag| -> Vec<usize> {
        points.iter().enumerate()
            .filter_map(|(k, (_, flag))| (*flag == want).then_some(k))
            .collect()
    };
    let singular = indices_of(PointFlag::Singular);
    let overflowed = indices_of(PointFlag::Overflow);
    if !singular.is_empty() {
        warn!(count = singular.len(), "a(ξ) vanished or diverged on the frequency grid");
    }
    if !overflowed.is_empty() {
        warn!(count = overflowed.len(), "transfer matrix overflowed on the frequency grid");
    }
    let collect = |f: fn(&ScatteringPoint) -> C64| -> nd::Array1<C64> {
        points.iter().map(|(p, _)| f(p)).collect()
    };
    Some(ContinuousSpectrum {
        xi: grid.clone(),
        reflection: kind.wants_reflection().then(|| collect(|p| p.reflection)),
        a: kind.wants_ab().then(|| collect(|p| p.a)),
        b: kind.wants_ab().then(|| collect(|p| p.b)),
        singular,
        overflowed,
    })
}
