//! Theoretical background.
//!
//! # Contents
//! - [Background](#background)
//! - [Scattering data](#scattering-data)
//! - [Discretization](#discretization)
//! - [Fast evaluation](#fast-evaluation)
//! - [Bound states](#bound-states)
//!
//! # Background
//! The nonlinear Fourier transform (NFT) generalizes the ordinary Fourier
//! transform to integrable nonlinear evolution equations. Both the
//! Korteweg-de Vries equation (KdV)
//! ```text
//! ∂u        ∂u   ∂³u
//! -- + 6 u -- + --- = 0
//! ∂x        ∂t   ∂t³
//! ```
//! and the nonlinear Schrödinger equation (NSE)
//! ```text
//!   ∂q   ∂²q
//! i -- + --- + 2 κ |q|² q = 0,    κ = ±1
//!   ∂x   ∂t²
//! ```
//! are treated here, where, following the fiber-optics convention, *x* is the
//! evolution variable and *t* is the variable in which the field is sampled.
//! Both equations are associated with the Ablowitz-Kaup-Newell-Segur (AKNS)
//! eigenvalue problem
//! ```text
//! ∂v   ⌈ -i ξ   q(t) ⌉
//! -- = |             | v(t, ξ)
//! ∂t   ⌊ r(t)   i ξ  ⌋
//! ```
//! for a two-component vector *v* and a complex spectral parameter *ξ*, with
//! the coupling *r* fixed by the equation at hand:
//! ```text
//! focusing NSE     (κ = +1):   r = -q*
//! defocusing NSE   (κ = -1):   r = +q*
//! KdV:                         r = -1
//! ```
//! Evolution in *x* acts on the NFT of *q* by simple phase factors, which is
//! what makes the transform useful: a nonlinear propagation problem becomes a
//! linear one in the nonlinear frequency domain.
//!
//! # Scattering data
//! For vanishing boundaries (*q*(*t*) → 0 as |*t*| → ∞) the AKNS problem
//! reduces to free propagation outside the support of *q*, and the solution
//! that behaves as (*e*<sup>-*iξt*</sup>, 0) for *t* → -∞ takes the form
//! ```text
//! v(t, ξ) → (a(ξ) e^(-i ξ t), b(ξ) e^(i ξ t))    as t → +∞
//! ```
//! which defines the scattering coefficients *a* and *b*. On a finite domain
//! \[*T*₁', *T*₂'\] of length *L* these are read off the transfer matrix
//! *T*(*ξ*) that maps *v*(*T*₁') to *v*(*T*₂'):
//! ```text
//! a(ξ) = T₁₁(ξ) e^(i ξ L)
//! b(ξ) = T₂₁(ξ) e^(-i ξ (T₁' + T₂'))
//! ```
//! This reading assumes the free problem (*q* = 0) is diagonal, which holds
//! for the NSE but not for the KdV, where *r* = -1 survives. There the
//! transfer matrix is first written in the eigenbasis of the free problem,
//! ```text
//!                   ⌈ 2iξ  0 ⌉
//! T → S⁻¹ T S,  S = |        |
//!                   ⌊  1   1 ⌋
//! ```
//! before *a* and *b* are read off. The change of basis is singular at
//! *ξ* = 0, where *a* and *b* have a pole while *ρ* → -1.
//!
//! The NFT then consists of two parts:
//! - the *continuous spectrum*, the reflection coefficient *ρ*(*ξ*) =
//!   *b*(*ξ*)/*a*(*ξ*) on the real axis (or *a* and *b* themselves);
//! - the *discrete spectrum*, the zeros *ξ*<sub>*k*</sub> of *a* in the upper
//!   half plane (bound states, or solitons in the NSE), together with the
//!   norming constants *b*(*ξ*<sub>*k*</sub>) and the residues
//!   *b*(*ξ*<sub>*k*</sub>)/*a*'(*ξ*<sub>*k*</sub>).
//!
//! The defocusing NSE has no bound states. For the focusing NSE with
//! *q*(*t*) = *A* sech(*t*), the bound states lie at *ξ* = *i*(*A* - 1/2 - *n*)
//! for every non-negative integer *n* with *A* - 1/2 - *n* > 0, and the
//! reflection coefficient vanishes identically whenever *A* is an integer.
//!
//! # Discretization
//! Given *D* samples *q*\[*n*\] = *q*(*T*₁ + *n* *h*) taken with spacing *h*,
//! each sample is taken to represent the field on an interval of width *h*,
//! so that the domain is \[*T*₁ - *h*/2, *T*₂ + *h*/2\] and *L* = *D* *h*. The
//! transfer matrix is then a product of one-step matrices,
//! ```text
//! T(ξ) = G[D - 1](ξ) ··· G[1](ξ) G[0](ξ)
//! ```
//! The exact one-step matrix for piecewise-constant *q* is the exponential
//! of the full AKNS matrix, but that exponential mixes *ξ* and *q* in a way
//! that forbids fast algorithms. Splitting schemes instead separate the
//! AKNS matrix into a free part *A* = diag(-*iξ*, *iξ*) and a potential part
//! *Q* = \[\[0, *q*\], \[*r*, 0\]\], and approximate the step by products of
//! the separate exponentials:
//! ```text
//! Lie (A):        e^(Q h) e^(A h)                      O(h²) local error
//! Lie (B):        e^(A h) e^(Q h)
//! Strang (A):     e^(A h/2) e^(Q h) e^(A h/2)          O(h³) local error
//! Strang (B):     e^(Q h/2) e^(A h) e^(Q h/2)
//! symmetric:      (Lie (A) + Lie (B)) / 2
//! ```
//! Higher orders come from Richardson extrapolation: a base splitting is
//! evaluated with *n* substeps of width *h*/*n* for several *n*, and the
//! results are combined with weights
//! ```text
//!         ___   n_j^p
//! w_j =   | |  -------------
//!        i ≠ j  n_j^p - n_i^p
//! ```
//! chosen to cancel the leading error terms, where *p* is the order of the
//! base splitting. The available schemes are catalogued in
//! [`Discretization`][crate::scheme::Discretization]; `2SPLIT8B`, an
//! eighth-order extrapolation of the Strang (B) splitting, is the default.
//! Extrapolated products lose exact unimodularity, so each composite step is
//! renormalized to unit determinant.
//!
//! # Fast evaluation
//! With *z* = *e*<sup>-*iξh*/*m*</sup> for a suitable integer *m*, the
//! free-part exponentials of the unimodular schemes become monomials in *z*,
//! and every one-step matrix becomes a 2×2 matrix of Laurent polynomials in
//! *z*. The full transfer matrix is then a single Laurent polynomial matrix of
//! degree *O*(*D*), found once with a balanced product tree
//! ```text
//!                    T
//!               /          \
//!           T[hi]         T[lo]
//!          /     \        /    \
//!       ···      ···    ···    ···
//!      /   \                  /   \
//!  G[D-1] G[D-2]    ···     G[1] G[0]
//! ```
//! whose large products are formed by FFT convolution, after which each
//! frequency costs only a polynomial evaluation. Schemes without this
//! structure fall back to a precomputed kernel that stores the
//! *ξ*-independent potential factors and redoes only the free-part phases
//! per frequency.
//!
//! Long products of one-step matrices can leave the range of floating-point
//! numbers even when the ratio *b*/*a* is perfectly well behaved. Running
//! products are therefore kept as a mantissa matrix together with a power of
//! two, rescaled whenever the mantissa's largest entry leaves
//! \[2<sup>-64</sup>, 2<sup>64</sup>\].
//!
//! # Bound states
//! Bound states are zeros of *a* in the open upper half plane. The number of
//! zeros in a box is counted with the argument principle,
//! ```text
//!          1    ⌠ a'(ξ)          1
//! N   =  ----   |  ----- dξ  =  ---- Δ arg a(ξ)
//!        2 π i  ⌡  a(ξ)         2 π
//!              ∂R
//! ```
//! where the change in argument along the boundary is tracked by sampling *a*
//! densely enough that consecutive phases differ by less than *π*/4. Boxes
//! containing zeros are bisected until each contains exactly one, and the box
//! center then seeds Newton's method
//! ```text
//! ξ ← ξ - a(ξ) / a'(ξ)
//! ```
//! where *a*' is propagated alongside *a* with the product rule. Refinement
//! first runs on a subsampled copy of the field with a cheap second-order
//! scheme and then on the full field with the requested one.
//!
//! Deep in the upper half plane, *a* computed by a single forward sweep
//! suffers catastrophic cancellation. Both *a* and *b* at a bound state are
//! thus evaluated two-sidedly: the Jost solution *φ* ~ (1, 0)
//! *e*<sup>-*iξt*</sup> is propagated forward from the left edge and the
//! solution *ψ* ~ (0, 1) *e*<sup>*iξt*</sup> backward from the right edge, to
//! a common split point near the middle of the field's mass. There
//! ```text
//! a(ξ) = det [φ ψ],        φ = b(ξ) ψ    at a bound state
//! ```
//! so that *b*(*ξ*<sub>*k*</sub>) is the projection of *φ* onto *ψ*.
