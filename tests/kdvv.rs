use approx::assert_abs_diff_eq;
use ndarray as nd;
use num_complex::Complex64 as C64;
use akns::{
    error::Status,
    kdvv::kdvv,
    options::{ ContSpecType, KdvvOptions },
    scheme::Discretization,
    utils::linspace,
};

/// Exact `(a, b)` for `u = amp` on `[t1, t2]`, sampled at `d` points.
///
/// With `γ² = -amp - ξ²` the transfer matrix is
/// `cosh(γL) + sinh(γL)/γ·[[-iξ, amp], [-1, iξ]]`; in the eigenbasis of the
/// free problem this gives
/// `a = (cosh(γL) - iξ·sinh(γL)/γ + amp·sinh(γL)/(2iξγ))·exp(iξL)` and
/// `b = -amp·sinh(γL)/(2iξγ)·exp(-iξ(T1' + T2'))`.
fn rectangle(amp: f64, t_bounds: (f64, f64), d: usize, xi: f64) -> (C64, C64) {
    let dt = (t_bounds.1 - t_bounds.0) / (d - 1) as f64;
    let l = d as f64 * dt;
    let (t1, t2) = (t_bounds.0 - dt / 2.0, t_bounds.1 + dt / 2.0);
    let i = C64::i();
    let xi = C64::new(xi, 0.0);
    let gamma = (-amp - xi * xi).sqrt();
    let sinhc = (gamma * l).sinh() / gamma;
    let pole = amp * sinhc / (2.0 * i * xi);
    let a = ((gamma * l).cosh() - i * xi * sinhc + pole) * (i * xi * l).exp();
    let b = -pole * (-i * xi * (t1 + t2)).exp();
    (a, b)
}

fn run(scheme: Discretization, amp: f64, d: usize) -> (nd::Array1<C64>, nd::Array1<C64>) {
    let u = nd::Array1::from_elem(d, C64::new(amp, 0.0));
    let opts = KdvvOptions {
        discretization: scheme,
        contspec_type: ContSpecType::AB,
        ..KdvvOptions::new()
    };
    let res = kdvv(&u, (0.0, 2.0), (-3.0, 3.0), 16, &opts).unwrap();
    assert_eq!(res.status, Status::Success);
    (res.a().unwrap().clone(), res.b().unwrap().clone())
}

fn max_error(scheme: Discretization, amp: f64, d: usize) -> f64 {
    let (a, b) = run(scheme, amp, d);
    linspace((-3.0, 3.0), 16).iter().zip(a.iter().zip(&b))
        .map(|(&xi, (ak, bk))| {
            let (a0, b0) = rectangle(amp, (0.0, 2.0), d, xi);
            (ak - a0).norm().max((bk - b0).norm())
        })
        .fold(0.0, f64::max)
}

#[test]
fn rectangle_matches_closed_form() {
    let err = max_error(Discretization::TwoSplit8B, 1.5, 200);
    assert!(err < 1e-9, "error {:e}", err);
}

#[test]
fn higher_order_is_more_accurate() {
    let schemes = [
        Discretization::TwoSplit1A,
        Discretization::TwoSplit2B,
        Discretization::TwoSplit4B,
        Discretization::TwoSplit6B,
    ];
    let errors: Vec<f64> = schemes.iter().map(|&s| max_error(s, 2.0, 32)).collect();
    for (lo, hi) in errors.iter().zip(errors.iter().skip(1)) {
        assert!(hi < lo, "errors not decreasing: {:?}", errors);
    }
}

#[test]
fn polynomial_path_matches_closed_form() {
    // 2SPLIT2A with at least 64 points goes through the transfer polynomial
    let d = 100;
    let u = nd::Array1::from_elem(d, C64::new(0.8, 0.0));
    let opts = KdvvOptions {
        discretization: Discretization::TwoSplit2A,
        contspec_type: ContSpecType::Both,
        ..KdvvOptions::new()
    };
    let res = kdvv(&u, (-1.0, 1.0), (-2.0, 2.0), 80, &opts).unwrap();
    assert_eq!(res.status, Status::Success);
    let xi = linspace((-2.0, 2.0), 80);
    let refl = res.reflection().unwrap();
    assert_eq!(refl.len(), 80);
    for (&x, r) in xi.iter().zip(refl) {
        let (a0, b0) = rectangle(0.8, (-1.0, 1.0), d, x);
        assert_abs_diff_eq!((r - b0 / a0).norm(), 0.0, epsilon = 5e-3);
    }
}

#[test]
fn zero_field_has_trivial_spectrum() {
    let u = nd::Array1::from_elem(64, C64::new(0.0, 0.0));
    let opts = KdvvOptions { contspec_type: ContSpecType::Both, ..KdvvOptions::new() };
    // the grid contains ξ = 0
    let res = kdvv(&u, (-1.0, 1.0), (-3.0, 3.0), 5, &opts).unwrap();
    assert_eq!(res.status, Status::Success);
    for ((r, a), b) in res.reflection().unwrap().iter()
        .zip(res.a().unwrap())
        .zip(res.b().unwrap())
    {
        assert_abs_diff_eq!(r.norm(), 0.0, epsilon = 1e-11);
        assert_abs_diff_eq!(b.norm(), 0.0, epsilon = 1e-11);
        assert_abs_diff_eq!((a - 1.0).norm(), 0.0, epsilon = 1e-12);
    }
}

#[test]
fn zero_frequency_is_total_reflection() {
    let u = nd::Array1::from_elem(40, C64::new(1.5, 0.0));
    let opts = KdvvOptions { contspec_type: ContSpecType::Reflection, ..KdvvOptions::new() };
    let res = kdvv(&u, (0.0, 2.0), (-1.0, 1.0), 3, &opts).unwrap();
    assert_eq!(res.status, Status::Success);
    assert_abs_diff_eq!((res.reflection().unwrap()[1] + 1.0).norm(), 0.0, epsilon = 1e-12);

    let opts = KdvvOptions { contspec_type: ContSpecType::AB, ..opts };
    let res = kdvv(&u, (0.0, 2.0), (-1.0, 1.0), 3, &opts).unwrap();
    assert_eq!(res.status, Status::DivisionSingularity);
    assert_eq!(res.contspec.as_ref().unwrap().singular, vec![1]);
    assert!(res.a().unwrap()[0].is_finite());
}

#[test]
fn output_kinds() {
    let u = nd::Array1::from_elem(20, C64::new(0.3, 0.0));
    for code in [-1, 0, 1, 2, 3] {
        let opts = KdvvOptions::from_codes(17, code).unwrap();
        let res = kdvv(&u, (0.0, 1.0), (-1.0, 1.0), 5, &opts).unwrap();
        let kind = ContSpecType::from_code(code);
        assert_eq!(res.reflection().is_some(), kind.wants_reflection());
        assert_eq!(res.a().is_some(), kind.wants_ab());
        assert_eq!(res.b().is_some(), kind.wants_ab());
        assert_eq!(res.options, opts);
    }
}
