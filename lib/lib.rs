#![allow(dead_code, non_snake_case)]

//! Provides nonlinear Fourier transforms (NFTs) for the Korteweg-de Vries
//! equation and the focusing and defocusing nonlinear Schrödinger equations
//! with vanishing boundary conditions, computed from uniformly sampled fields.
//!
//! Provides implementations for the following numerical routines:
//! - Transfer matrices of the AKNS eigenvalue problem via exponential
//!   splitting schemes of orders 1 through 8, with Richardson extrapolation
//!   and power-of-two rescaling against overflow
//! - Fast multi-frequency evaluation via Laurent polynomial transfer matrices
//!   (FFT-based product tree)
//! - Continuous spectrum: reflection coefficient and scattering coefficients
//!   *a*(*ξ*) and *b*(*ξ*) on a uniform frequency grid
//! - Discrete spectrum (focusing NSE): bound states via argument-principle
//!   localization and two-stage Newton refinement, with norming constants
//!   and residues from two-sided Jost solutions
//!
//! The main entry points are [`nsev::nsev`] and [`kdvv::kdvv`].
//!
//! See [`docs`] for theoretical background.

pub mod error;
pub mod mat2;
pub mod scheme;
pub mod field;
pub mod transfer;
pub mod poly;
pub mod continuous;
pub mod discrete;
pub mod options;
pub mod nsev;
pub mod kdvv;
pub mod utils;

pub mod docs;

pub(crate) const DEF_TOLERANCE: f64 = 1e-10;
pub(crate) const DEF_MAXITERS: usize = 10;

/// Default number of frequency grid points.
pub const DEF_M: usize = 128;

/// Default frequency bounds.
pub const DEF_XI: (f64, f64) = (-2.0, 2.0);

pub type Arr1<S> = ndarray::ArrayBase<S, ndarray::Ix1>;

pub use error::{ NftError, NftResult, Status };
pub use field::{ Coupling, SampledField };
pub use kdvv::{ kdvv, KdvvRecord };
pub use nsev::{ nsev, NsevRecord };
pub use options::{ KdvvOptions, NsevOptions };
pub use scheme::Discretization;
