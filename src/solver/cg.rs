//! Preconditioned Conjugate Gradient (Saad §6.7).

use num_traits::Float;

use crate::context::Context;
use crate::core::kernels::{axpy, dot, norm2};
use crate::error::ErrorKind;
use crate::solver::{Method, Operation};

/// Resume points of the CG recurrence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Resume {
    SolvePrecond,
    FormDirection,
    UpdateIterate,
    EndIteration,
    Terminated,
}

/// Conjugate Gradient method for symmetric positive definite systems.
///
/// CG requests `MatVec` and `PSolve` operations; a supplied preconditioner
/// must itself be symmetric positive definite. For general matrices use
/// [`crate::solver::BiCg`] or [`crate::solver::BiCgStab`].
pub struct Cg<T> {
    first: bool,
    rho: T,
    rho_prev: T,
    resume: Resume,

    r: Vec<T>,
    z: Vec<T>,
    p: Vec<T>,
    ap: Vec<T>,
}

impl<T: Float> Cg<T> {
    pub fn new() -> Self {
        Cg {
            first: true,
            rho: T::zero(),
            rho_prev: T::zero(),
            resume: Resume::Terminated,
            r: Vec::new(),
            z: Vec::new(),
            p: Vec::new(),
            ap: Vec::new(),
        }
    }
}

impl<T: Float> Default for Cg<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float> Method<T> for Cg<T> {
    fn init(&mut self, dim: usize) {
        assert!(dim > 0, "cg: dimension not positive");

        self.r.resize(dim, T::zero());
        self.z.resize(dim, T::zero());
        self.p.resize(dim, T::zero());
        self.ap.resize(dim, T::zero());

        self.first = true;
        self.resume = Resume::SolvePrecond;
    }

    fn iterate(&mut self, ctx: &mut Context<T>) -> Result<Operation<'_, T>, ErrorKind> {
        match self.resume {
            Resume::SolvePrecond => {
                if self.first {
                    self.r.copy_from_slice(&ctx.residual);
                }
                self.resume = Resume::FormDirection;
                // Solve M z = r_{i-1}.
                Ok(Operation::PSolve {
                    dst: &mut self.z,
                    rhs: &self.r,
                })
            }
            Resume::FormDirection => {
                self.rho = dot(&self.r, &self.z); // rho_i = r_{i-1} . z
                if !self.first {
                    let beta = self.rho / self.rho_prev; // beta = rho_i / rho_{i-1}
                    axpy(beta, &self.p, &mut self.z); // z = z + beta * p_{i-1}
                }
                self.p.copy_from_slice(&self.z); // p_i = z
                self.resume = Resume::UpdateIterate;
                // Compute A p_i.
                Ok(Operation::MatVec {
                    dst: &mut self.ap,
                    src: &self.p,
                })
            }
            Resume::UpdateIterate => {
                let alpha = self.rho / dot(&self.p, &self.ap); // alpha = rho_i / (p_i . A p_i)
                axpy(-alpha, &self.ap, &mut self.r); // r_i = r_{i-1} - alpha * A p_i
                axpy(alpha, &self.p, &mut ctx.x); // x_i = x_{i-1} + alpha * p_i

                ctx.residual.copy_from_slice(&self.r);
                ctx.residual_norm = norm2(&self.r);
                ctx.converged = false;
                self.resume = Resume::EndIteration;
                Ok(Operation::CheckResidualNorm)
            }
            Resume::EndIteration => {
                if ctx.converged {
                    self.resume = Resume::Terminated;
                    return Ok(Operation::EndIteration);
                }
                self.rho_prev = self.rho;
                self.first = false;
                self.resume = Resume::SolvePrecond;
                Ok(Operation::EndIteration)
            }
            Resume::Terminated => panic!("cg: iterate called without init"),
        }
    }
}
