//! Generalized Minimal Residual method with fixed restart (Saad §6.4).
//!
//! GMRES minimizes the residual over a Krylov subspace built by the Arnoldi
//! process. The upper-Hessenberg least-squares problem is kept triangular
//! with Givens rotations, which also yield the residual norm of every inner
//! step for free, so convergence is monitored without forming the residual.
//! After `restart` inner steps the basis is discarded, the true residual is
//! recomputed and the process starts over from the current approximation.

use num_traits::Float;

use crate::context::Context;
use crate::core::kernels::{axpy, dot, norm2, scale};
use crate::error::ErrorKind;
use crate::solver::{Method, Operation};

/// Plane rotation acting on component pairs.
#[derive(Clone, Copy, Debug)]
struct Givens<T> {
    c: T,
    s: T,
}

impl<T: Float> Givens<T> {
    fn identity() -> Self {
        Givens {
            c: T::one(),
            s: T::zero(),
        }
    }

    /// Rotation that zeroes the second component of (a, b).
    fn zeroing(a: T, b: T) -> Self {
        if b == T::zero() {
            return Givens {
                c: T::one(),
                s: T::zero(),
            };
        }
        if b.abs() > a.abs() {
            let tau = -a / b;
            let s = T::one() / (T::one() + tau * tau).sqrt();
            Givens { c: tau * s, s }
        } else {
            let tau = -b / a;
            let c = T::one() / (T::one() + tau * tau).sqrt();
            Givens { c, s: tau * c }
        }
    }

    fn apply(&self, x: T, y: T) -> (T, T) {
        (self.c * x - self.s * y, self.s * x + self.c * y)
    }
}

/// Resume points of the restarted Arnoldi process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Resume {
    Restart,
    Normalize,
    ApplyOperator,
    SolveInner,
    Orthogonalize,
    CheckInner,
    FinishCycle,
    PostCheck,
    EndCycle,
    Terminated,
}

/// Restarted GMRES for general nonsingular systems.
///
/// GMRES requests `MatVec` and `PSolve` operations. Memory grows linearly
/// with the restart period; the Arnoldi basis holds `restart + 1` vectors of
/// the system dimension.
pub struct Gmres<T> {
    restart: Option<usize>,

    resume: Resume,
    i: usize, // inner iteration counter
    k: usize, // active restart period
    ldv: usize,

    s: Vec<T>,
    w: Vec<T>,
    y: Vec<T>,
    av: Vec<T>,

    v: Vec<T>, // column-major Arnoldi basis, ldv x (k+1)
    h: Vec<T>, // column-major upper Hessenberg, (k+1) x k
    givs: Vec<Givens<T>>,
}

impl<T: Float> Gmres<T> {
    pub fn new() -> Self {
        Gmres {
            restart: None,
            resume: Resume::Terminated,
            i: 0,
            k: 0,
            ldv: 0,
            s: Vec::new(),
            w: Vec::new(),
            y: Vec::new(),
            av: Vec::new(),
            v: Vec::new(),
            h: Vec::new(),
            givs: Vec::new(),
        }
    }

    /// Set the restart period. It must lie in `[1, dim]`; when unset, the
    /// system dimension is used (no restarting in exact arithmetic).
    pub fn with_restart(mut self, restart: usize) -> Self {
        self.restart = Some(restart);
        self
    }

    /// Form x += V y with y from the triangularized least-squares problem of
    /// order `m`.
    fn update_solution(&mut self, x: &mut [T], m: usize) {
        let ldh = self.k + 1;
        self.y[..m].copy_from_slice(&self.s[..m]);
        // Back substitution on the upper-triangular H, column-major.
        for j in (0..m).rev() {
            let mut yj = self.y[j];
            for l in j + 1..m {
                yj = yj - self.h[l * ldh + j] * self.y[l];
            }
            self.y[j] = yj / self.h[j * ldh + j];
        }
        let n = self.ldv;
        for j in 0..m {
            let yj = self.y[j];
            axpy(yj, &self.v[j * n..j * n + n], x);
        }
    }
}

impl<T: Float> Default for Gmres<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float> Method<T> for Gmres<T> {
    fn init(&mut self, dim: usize) {
        assert!(dim > 0, "gmres: dimension not positive");
        let k = self.restart.unwrap_or(dim);
        assert!(1 <= k && k <= dim, "gmres: restart out of range");

        self.k = k;
        self.ldv = dim;
        self.s.resize(k + 1, T::zero());
        self.w.resize(dim, T::zero());
        self.y.resize(k, T::zero());
        self.av.resize(dim, T::zero());
        self.v.resize(dim * (k + 1), T::zero());
        self.h.resize((k + 1) * k, T::zero());
        self.givs.resize(k, Givens::identity());

        self.resume = Resume::Restart;
    }

    fn iterate(&mut self, ctx: &mut Context<T>) -> Result<Operation<'_, T>, ErrorKind> {
        let n = self.ldv;
        match self.resume {
            Resume::Restart => {
                // Construct the first basis vector from the residual.
                self.w.copy_from_slice(&ctx.residual);
                self.resume = Resume::Normalize;
                // Solve M v_0 = r.
                Ok(Operation::PSolve {
                    dst: &mut self.v[..n],
                    rhs: &self.w,
                })
            }
            Resume::Normalize => {
                let v0 = &mut self.v[..n];
                let rnorm = norm2(v0);
                scale(T::one() / rnorm, v0);
                // s = rnorm * e_1.
                for si in self.s.iter_mut() {
                    *si = T::zero();
                }
                self.s[0] = rnorm;

                self.i = 0;
                self.resume = Resume::SolveInner;
                // Compute A v_0.
                Ok(Operation::MatVec {
                    dst: &mut self.av,
                    src: &self.v[..n],
                })
            }
            Resume::ApplyOperator => {
                let i = self.i;
                if i == self.k {
                    self.resume = Resume::FinishCycle;
                    return Ok(Operation::NoOp);
                }
                self.resume = Resume::SolveInner;
                // Compute A v_i.
                Ok(Operation::MatVec {
                    dst: &mut self.av,
                    src: &self.v[i * n..i * n + n],
                })
            }
            Resume::SolveInner => {
                self.resume = Resume::Orthogonalize;
                // Solve M w = A v_i.
                Ok(Operation::PSolve {
                    dst: &mut self.w,
                    rhs: &self.av,
                })
            }
            Resume::Orthogonalize => {
                let i = self.i;
                let ldh = self.k + 1;

                // Modified Gram-Schmidt: orthogonalize w against the basis,
                // filling column i of H.
                for j in 0..=i {
                    let vj = &self.v[j * n..j * n + n];
                    let hji = dot(vj, &self.w);
                    self.h[i * ldh + j] = hji;
                    axpy(-hji, vj, &mut self.w);
                }
                let wnorm = norm2(&self.w);
                self.h[i * ldh + i + 1] = wnorm;
                let vi1 = &mut self.v[(i + 1) * n..(i + 2) * n];
                vi1.copy_from_slice(&self.w);
                scale(T::one() / wnorm, vi1);

                // Apply the previous rotations to column i of H, then
                // compute and apply the rotation zeroing H[i+1, i].
                let hcol = &mut self.h[i * ldh..i * ldh + i + 2];
                for j in 0..i {
                    let (hj, hj1) = self.givs[j].apply(hcol[j], hcol[j + 1]);
                    hcol[j] = hj;
                    hcol[j + 1] = hj1;
                }
                self.givs[i] = Givens::zeroing(hcol[i], hcol[i + 1]);
                let (hi, hi1) = self.givs[i].apply(hcol[i], hcol[i + 1]);
                hcol[i] = hi;
                hcol[i + 1] = hi1;

                // The same rotation applied to s exposes the residual norm
                // of the current least-squares problem as |s[i+1]|.
                let (si, si1) = self.givs[i].apply(self.s[i], self.s[i + 1]);
                self.s[i] = si;
                self.s[i + 1] = si1;
                ctx.residual_norm = si1.abs();
                ctx.converged = false;
                self.resume = Resume::CheckInner;
                Ok(Operation::CheckResidualNorm)
            }
            Resume::CheckInner => {
                if ctx.converged {
                    let m = self.i + 1;
                    self.update_solution(&mut ctx.x, m);
                    self.resume = Resume::Terminated;
                    return Ok(Operation::EndIteration);
                }
                self.i += 1;
                self.resume = Resume::ApplyOperator;
                Ok(Operation::NoOp)
            }
            Resume::FinishCycle => {
                // Out of basis vectors; form the approximation from the full
                // cycle and have the true residual recomputed.
                let m = self.k;
                self.update_solution(&mut ctx.x, m);
                self.resume = Resume::PostCheck;
                Ok(Operation::ComputeResidual)
            }
            Resume::PostCheck => {
                ctx.converged = false;
                self.resume = Resume::EndCycle;
                Ok(Operation::CheckResidualNorm)
            }
            Resume::EndCycle => {
                if ctx.converged {
                    self.resume = Resume::Terminated;
                } else {
                    self.resume = Resume::Restart;
                }
                Ok(Operation::EndIteration)
            }
            Resume::Terminated => panic!("gmres: iterate called without init"),
        }
    }
}
