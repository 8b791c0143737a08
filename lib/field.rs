//! Uniformly sampled fields and the spectral problems they enter.

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    Arr1,
    error::{ ConfigError, ConfigResult, LengthError },
};

/// Complex samples `q[0..D]` of a field on the uniform grid
/// `t_n = T1 + n·dt`, `dt = (T2 - T1)/(D - 1)`.
///
/// Each sample stands for the interval `[t_n - dt/2, t_n + dt/2]`, so the
/// field occupies the domain `[T1 - dt/2, T2 + dt/2]` of length `D·dt`.
#[derive(Clone, Debug, PartialEq)]
pub struct SampledField {
    q: nd::Array1<C64>,
    t_bounds: (f64, f64),
    dt: f64,
}

impl SampledField {
    /// Construct from samples and the times of the first and last ones.
    pub fn new<S>(q: &Arr1<S>, t_bounds: (f64, f64)) -> ConfigResult<Self>
    where S: nd::Data<Elem = C64>
    {
        let (t1, t2) = t_bounds;
        let d = q.len();
        ConfigError::check_samples(d)?;
        ConfigError::check_time_bounds(t1, t2)?;
        if let Some(n) = q.iter().position(|qk| !qk.is_finite()) {
            return Err(ConfigError::NonFiniteSample(n));
        }
        let dt = (t2 - t1) / (d - 1) as f64;
        Ok(Self { q: q.to_owned(), t_bounds, dt })
    }

    /// Construct from samples and their time coordinates. Only the extreme
    /// times are used; the grid is assumed uniform.
    pub fn from_tvec<S, T>(q: &Arr1<S>, tvec: &Arr1<T>) -> ConfigResult<Self>
    where
        S: nd::Data<Elem = C64>,
        T: nd::Data<Elem = f64>,
    {
        LengthError::check(q, tvec)?;
        ConfigError::check_samples(tvec.len())?;
        let t1 = tvec.iter().copied().fold(f64::INFINITY, f64::min);
        let t2 = tvec.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self::new(q, (t1, t2))
    }

    /// Sample a function at `n` evenly spaced points between `t_bounds`.
    pub fn from_fn<F>(t_bounds: (f64, f64), n: usize, mut f: F)
        -> ConfigResult<Self>
    where F: FnMut(f64) -> C64
    {
        ConfigError::check_samples(n)?;
        let (t1, t2) = t_bounds;
        let q: nd::Array1<C64>
            = (0..n)
            .map(|k| f(t1 + (t2 - t1) * k as f64 / (n - 1) as f64))
            .collect();
        Self::new(&q, t_bounds)
    }

    pub fn get_q(&self) -> &nd::Array1<C64> { &self.q }

    pub fn get_t_bounds(&self) -> (f64, f64) { self.t_bounds }

    pub fn get_dt(&self) -> f64 { self.dt }

    /// Number of samples `D`.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize { self.q.len() }

    /// Time coordinates of the samples.
    pub fn get_t(&self) -> nd::Array1<f64> {
        let (t1, _) = self.t_bounds;
        (0..self.len()).map(|k| t1 + k as f64 * self.dt).collect()
    }

    /// The scattering domain `(T1 - dt/2, T2 + dt/2)`.
    pub fn domain(&self) -> (f64, f64) {
        let (t1, t2) = self.t_bounds;
        (t1 - self.dt / 2.0, t2 + self.dt / 2.0)
    }

    /// Length `D·dt` of the scattering domain.
    pub fn span(&self) -> f64 { self.len() as f64 * self.dt }

    pub fn max_abs(&self) -> f64 {
        self.q.iter().map(|qk| qk.norm()).fold(0.0, f64::max)
    }

    /// Sample index splitting the field into halves of equal `Σ|q|`: the
    /// samples before it carry (just over) half of the total.
    pub fn split_index(&self) -> usize {
        let mags: Vec<f64> = self.q.iter().map(|qk| qk.norm()).collect();
        let total: f64 = mags.iter().sum();
        if total == 0.0 { return self.len() / 2; }
        let mut acc = 0.0;
        for (k, m) in mags.iter().enumerate() {
            acc += m;
            if acc >= total / 2.0 { return k + 1; }
        }
        self.len()
    }

    /// A coarser field of `dsub` samples (capped at `D`) taken at indices
    /// `round(k(D - 1)/(dsub - 1))`.
    ///
    /// Since both end samples are kept, the time bounds are unchanged and the
    /// spacing grows to `(T2 - T1)/(dsub - 1)`.
    pub fn subsampled(&self, dsub: usize) -> ConfigResult<Self> {
        ConfigError::check_subsample(dsub)?;
        let d = self.len();
        if dsub >= d { return Ok(self.clone()); }
        let q: nd::Array1<C64>
            = (0..dsub)
            .map(|k| {
                let idx
                    = (k as f64 * (d - 1) as f64 / (dsub - 1) as f64).round();
                self.q[(idx as usize).min(d - 1)]
            })
            .collect();
        Self::new(&q, self.t_bounds)
    }
}

/// Default subsample size `ceil(sqrt(D)·log2(D))`, capped at `D`.
pub fn default_subsample(d: usize) -> usize {
    let df = d as f64;
    ((df.sqrt() * df.log2()).ceil() as usize).clamp(2, d.max(2))
}

/// The second off-diagonal entry `r(q)` of the AKNS system
/// `dv/dt = [[-iξ, q], [r, iξ]] v`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Coupling {
    /// NSE with κ = +1: `r = -conj(q)`.
    Focusing,
    /// NSE with κ = -1: `r = conj(q)`.
    Defocusing,
    /// KdV: `r = -1`.
    Kdv,
}

impl Coupling {
    pub fn r(self, q: C64) -> C64 {
        match self {
            Self::Focusing => -q.conj(),
            Self::Defocusing => q.conj(),
            Self::Kdv => C64::new(-1.0, 0.0),
        }
    }

    /// Whether the spectral problem can have bound states in the upper half
    /// plane that the discrete solver looks for.
    pub fn has_bound_states(self) -> bool { self == Self::Focusing }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn construction_and_geometry() {
        let f = SampledField::from_fn((-1.0, 1.0), 5, |t| C64::new(t, 0.0))
            .unwrap();
        assert_eq!(f.len(), 5);
        assert_relative_eq!(f.get_dt(), 0.5);
        assert_eq!(f.domain(), (-1.25, 1.25));
        assert_relative_eq!(f.span(), 2.5);
        assert_relative_eq!(f.max_abs(), 1.0);
        assert_eq!(f.get_t().to_vec(), vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn invalid_fields() {
        let one = nd::array![C64::new(1.0, 0.0)];
        assert_eq!(
            SampledField::new(&one, (0.0, 1.0)),
            Err(ConfigError::TooFewSamples(1)),
        );
        let two = nd::array![C64::new(1.0, 0.0), C64::new(f64::NAN, 0.0)];
        assert_eq!(
            SampledField::new(&two, (0.0, 1.0)),
            Err(ConfigError::NonFiniteSample(1)),
        );
        let two = nd::array![C64::new(1.0, 0.0), C64::new(2.0, 0.0)];
        assert!(SampledField::new(&two, (1.0, 0.0)).is_err());
        let tvec = nd::array![0.0, 1.0, 2.0];
        assert_eq!(
            SampledField::from_tvec(&two, &tvec),
            Err(ConfigError::Length(LengthError(2, 3))),
        );
    }

    #[test]
    fn from_tvec_uses_extremes() {
        let q = nd::Array1::from_elem(4, C64::new(1.0, 0.0));
        let tvec = nd::array![-3.0, -1.0, 1.0, 3.0];
        let f = SampledField::from_tvec(&q, &tvec).unwrap();
        assert_eq!(f.get_t_bounds(), (-3.0, 3.0));
        assert_relative_eq!(f.get_dt(), 2.0);
    }

    #[test]
    fn subsampling_keeps_bounds() {
        let f = SampledField::from_fn((-2.0, 2.0), 101, |t| C64::new(t, 0.0))
            .unwrap();
        let s = f.subsampled(11).unwrap();
        assert_eq!(s.len(), 11);
        assert_eq!(s.get_t_bounds(), (-2.0, 2.0));
        assert_relative_eq!(s.get_dt(), 0.4, epsilon = 1e-14);
        assert_relative_eq!(s.get_q()[5].re, 0.0, epsilon = 1e-14);
        assert_eq!(f.subsampled(500).unwrap().len(), 101);
        assert!(f.subsampled(1).is_err());
        assert_eq!(default_subsample(256), 128);
        assert_eq!(default_subsample(16), 16);
    }

    #[test]
    fn split_index_balances_mass() {
        let f = SampledField::from_fn((-1.0, 1.0), 8, |_| C64::new(1.0, 0.0))
            .unwrap();
        assert_eq!(f.split_index(), 4);
        let z = SampledField::from_fn((-1.0, 1.0), 7, |_| C64::new(0.0, 0.0))
            .unwrap();
        assert_eq!(z.split_index(), 3);
        let lopsided
            = SampledField::from_fn((0.0, 1.0), 4, |t| {
                C64::new(if t > 0.9 { 1.0 } else { 0.0 }, 0.0)
            })
            .unwrap();
        assert_eq!(lopsided.split_index(), 4);
    }

    #[test]
    fn couplings() {
        let q = C64::new(1.0, 2.0);
        assert_eq!(Coupling::Focusing.r(q), C64::new(-1.0, 2.0));
        assert_eq!(Coupling::Defocusing.r(q), C64::new(1.0, -2.0));
        assert_eq!(Coupling::Kdv.r(q), C64::new(-1.0, 0.0));
    }
}
