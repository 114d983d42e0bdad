//! Theoretical background.
//!
//! # Contents
//! - [Background](#background)
//! - [Discretization](#discretization)
//! - [Time dependence](#time-dependence)
//! - [Imaginary time](#imaginary-time)
//! - [Observables](#observables)
//! - [Expressions](#expressions)
//!
//! # Background
//! This crate integrates the one-dimensional time-dependent Schrödinger
//! equation (TDSE) for a particle of mass *m* in a static potential *V*(*x*),
//! ```text
//!    ∂ψ       ħ²  ∂²ψ
//! iħ -- = - --- --- + V(x) ψ
//!    ∂t      2 m ∂x²
//! ```
//! keeping *ħ* and *m* as explicit parameters rather than fixing a system of
//! natural units. Setting both to 1 (the default) recovers the usual
//! dimensionless form. The right-hand side is the Hamiltonian *H* = *T* + *V*
//! acting on *ψ*, with kinetic part *T* = *p*²/2*m* and *p* = -*iħ* ∂/∂*x*.
//!
//! # Discretization
//! The wavefunction is sampled on *N* points of a periodic grid covering
//! \[*x*<sub>min</sub>, *x*<sub>max</sub>), so the right endpoint is the
//! image of the left one and is not stored:
//! ```text
//! L = x_max - x_min
//! dx = L / N
//! x[j] = x_min + j dx,   j ∊ {0, ..., N - 1}
//! ```
//! *N* is always a power of two; requested sizes are rounded up. The conjugate
//! wavenumber grid is laid out in the order produced by the discrete Fourier
//! transform:
//! ```text
//! dk = 2π / L
//! k[j] = j dk          for j < N/2
//! k[j] = (j - N) dk    for j ≥ N/2
//! ```
//! The forward transform is unnormalized and the inverse carries the 1/*N*
//! factor, so a forward-then-inverse pair is the identity.
//!
//! Periodicity means anything leaving one edge re-enters at the other. The
//! grid should therefore be wide enough that the wavefunction stays well away
//! from both edges for the duration of a run;
//! [`check_boundaries`][crate::solver::SpectralSolver::check_boundaries]
//! reports when that stops being true.
//!
//! # Time dependence
//! For a time-independent *H* the exact propagator over a step *dt* is
//! exp(-*i* *H* *dt*/*ħ*), but *T* and *V* do not commute, so the exponential
//! cannot simply be split in two. Writing it symmetrically (Strang splitting)
//! ```text
//!                -i V dt/2ħ  -i T dt/ħ  -i V dt/2ħ
//! ψ(t + dt) = [ e           e          e           ] ψ(t) + O(dt³)
//! ```
//! cancels the leading commutator term and leaves a local error of third
//! order in *dt* (second order globally). Every factor is unitary, so the
//! scheme conserves the norm exactly in exact arithmetic.
//!
//! The potential factors are diagonal in position space and are applied as
//! pointwise phases. The kinetic factor is diagonal in momentum space, where
//! it is again a pointwise phase:
//! ```text
//!  -i T dt/ħ             -i ħ k² dt/2m
//! e          ψ = F⁻¹[ e               F[ψ](k) ]
//! ```
//! with *F* the discrete Fourier transform. Both sets of phases depend only
//! on the grid and the constants, so they are computed once (the potential
//! factors again whenever the potential changes) and reused every step.
//! Derivatives are thereby evaluated spectrally, with error that falls off
//! exponentially in *N* for smooth, well-contained wavefunctions.
//!
//! One step proceeds as
//! ```text
//!      ψ(t, x)
//!         |
//!         V
//!  × exp(-i V dt/2ħ)
//!         |
//!         '--> FFT ---.
//!                     |
//!                     V
//!           × exp(-i ħ k² dt/2m)
//!                     |
//!         .-- iFFT <--'
//!         |     (÷ N)
//!         V
//!  × exp(-i V dt/2ħ)
//!         |
//!         V
//!  renormalize, t += dt
//!         |
//!         V
//!    ψ(t + dt, x)
//! ```
//! The final renormalization only removes floating-point drift; it is not
//! needed for correctness.
//!
//! # Imaginary time
//! Substituting *t* → -*iτ* turns every phase factor above into a real decay
//! factor:
//! ```text
//!  -V dt/2ħ      -ħ k² dt/2m
//! e        ,    e
//! ```
//! An eigenstate with energy *E* then decays as exp(-*E* *τ*/*ħ*), so after
//! renormalizing at each step every component dies off relative to the lowest
//! one present. Any initial state with some overlap with the ground state
//! relaxes toward it. The potential is shifted by its minimum beforehand so
//! that none of the factors exceed 1.
//! [`relax`][crate::solver::SpectralSolver::relax] implements this.
//!
//! # Observables
//! Position-space expectation values are rectangle-rule sums,
//! ```text
//! ⟨f(x)⟩ = Σ_j |ψ[j]|² f(x[j]) dx
//! ```
//! Momentum-space ones use the forward transform *ψ̃* = *F*[*ψ*], for which
//! Parseval's relation on this grid reads Σ|*ψ̃*|² *dx*/*N* = Σ|*ψ*|² *dx*.
//! Hence
//! ```text
//! ⟨p⟩ = ħ Σ_j |ψ̃[j]|² k[j] dx / N
//! ⟨T⟩ = Σ_j |ψ̃[j]|² ħ² k[j]² / 2m · dx / N
//! ```
//! and ⟨*H*⟩ = ⟨*T*⟩ + ⟨*V*⟩ is conserved by the evolution up to the
//! splitting error.
//!
//! # Expressions
//! Custom potentials and wavefunctions are written as arithmetic expressions
//! in the position `x`, the time `t`, and any number of named parameters. The
//! grammar, from lowest to highest precedence, is
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := primary ('^' unary)?
//! primary := number | name | name '(' expr ')' | '(' expr ')'
//! ```
//! so `^` is right-associative and binds tighter than unary minus on its
//! left: `-x^2` is `-(x^2)` and `2^-1` is `0.5`. The constants `pi` and `e`
//! are built in, as are the one-argument functions `sin`, `cos`, `tan`,
//! `sinh`, `cosh`, `tanh`, `exp`, `sqrt`, `abs`, `log` and `ln`; `log` is the
//! natural logarithm. The name `i` evaluates to 1 and is kept only so that
//! older expressions continue to evaluate; it does not denote the imaginary
//! unit. Any evaluation that yields a non-finite number is an error.
//!
//! Every other name is a parameter. [`extract_names`][crate::params::extract_names]
//! finds them, and [`ParameterSet::sync`][crate::params::ParameterSet::sync]
//! keeps a set of parameters matched to a group of expressions.
