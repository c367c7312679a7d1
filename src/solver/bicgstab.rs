//! BiConjugate Gradient Stabilized (Saad §7.4.2).

use num_traits::Float;

use crate::context::Context;
use crate::core::kernels::{axpy, axpy_to, dot, norm2, roundoff, scale};
use crate::error::ErrorKind;
use crate::solver::{Method, Operation};

/// Resume points of the BiCGSTAB recurrence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Resume {
    FormDirection,
    ApplyA,
    HalfStep,
    SolveSecondPrecond,
    ApplyASecond,
    FullStep,
    EndIteration,
    Terminated,
}

/// BiCGSTAB method for general nonsingular systems.
///
/// The stabilized variant of BiCG that avoids the transpose product: it
/// requests only `MatVec` and `PSolve` operations. Each iteration makes two
/// products and two preconditioner solves, and may terminate halfway when
/// the intermediate residual already meets the tolerance.
pub struct BiCgStab<T> {
    first: bool,
    rho: T,
    rho_prev: T,
    alpha: T,
    omega: T,
    resume: Resume,

    rt: Vec<T>,
    p: Vec<T>,
    v: Vec<T>,
    t: Vec<T>,
    phat: Vec<T>,
    s: Vec<T>,
    shat: Vec<T>,
}

impl<T: Float> BiCgStab<T> {
    pub fn new() -> Self {
        BiCgStab {
            first: true,
            rho: T::zero(),
            rho_prev: T::zero(),
            alpha: T::zero(),
            omega: T::zero(),
            resume: Resume::Terminated,
            rt: Vec::new(),
            p: Vec::new(),
            v: Vec::new(),
            t: Vec::new(),
            phat: Vec::new(),
            s: Vec::new(),
            shat: Vec::new(),
        }
    }
}

impl<T: Float> Default for BiCgStab<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float> Method<T> for BiCgStab<T> {
    fn init(&mut self, dim: usize) {
        assert!(dim > 0, "bicgstab: dimension not positive");

        self.rt.resize(dim, T::zero());
        self.p.resize(dim, T::zero());
        self.v.resize(dim, T::zero());
        self.t.resize(dim, T::zero());
        self.phat.resize(dim, T::zero());
        self.s.resize(dim, T::zero());
        self.shat.resize(dim, T::zero());

        self.first = true;
        self.resume = Resume::FormDirection;
    }

    fn iterate(&mut self, ctx: &mut Context<T>) -> Result<Operation<'_, T>, ErrorKind> {
        match self.resume {
            Resume::FormDirection => {
                if self.first {
                    self.rt.copy_from_slice(&ctx.residual);
                }
                self.rho = dot(&self.rt, &ctx.residual); // rho_i = rt . r_{i-1}
                let breakdown = roundoff::<T>() * roundoff::<T>();
                if self.rho < breakdown {
                    self.resume = Resume::Terminated;
                    return Err(ErrorKind::RhoBreakdown);
                }
                if self.first {
                    self.p.copy_from_slice(&ctx.residual);
                } else {
                    // p_i = r_{i-1} + beta * (p_{i-1} - omega * v_{i-1})
                    let beta = (self.rho / self.rho_prev) * (self.alpha / self.omega);
                    axpy(-self.omega, &self.v, &mut self.p);
                    scale(beta, &mut self.p);
                    axpy(T::one(), &ctx.residual, &mut self.p);
                }
                self.resume = Resume::ApplyA;
                // Solve M phat_i = p_i.
                Ok(Operation::PSolve {
                    dst: &mut self.phat,
                    rhs: &self.p,
                })
            }
            Resume::ApplyA => {
                self.resume = Resume::HalfStep;
                // Compute A phat_i -> v_i.
                Ok(Operation::MatVec {
                    dst: &mut self.v,
                    src: &self.phat,
                })
            }
            Resume::HalfStep => {
                self.alpha = self.rho / dot(&self.rt, &self.v);
                // s = r_{i-1} - alpha * v_i, checked early for tolerance.
                axpy_to(&mut self.s, -self.alpha, &self.v, &ctx.residual);
                ctx.residual.copy_from_slice(&self.s);
                ctx.residual_norm = norm2(&self.s);
                ctx.converged = false;
                self.resume = Resume::SolveSecondPrecond;
                Ok(Operation::CheckResidualNorm)
            }
            Resume::SolveSecondPrecond => {
                if ctx.converged {
                    axpy(self.alpha, &self.phat, &mut ctx.x);
                    self.resume = Resume::Terminated;
                    return Ok(Operation::EndIteration);
                }
                self.resume = Resume::ApplyASecond;
                // Solve M shat_i = s.
                Ok(Operation::PSolve {
                    dst: &mut self.shat,
                    rhs: &self.s,
                })
            }
            Resume::ApplyASecond => {
                self.resume = Resume::FullStep;
                // Compute A shat_i -> t_i.
                Ok(Operation::MatVec {
                    dst: &mut self.t,
                    src: &self.shat,
                })
            }
            Resume::FullStep => {
                self.omega = dot(&self.t, &self.s) / dot(&self.t, &self.t);
                axpy(self.alpha, &self.phat, &mut ctx.x);
                axpy(self.omega, &self.shat, &mut ctx.x);
                // r_i = s - omega * t_i
                axpy_to(&mut ctx.residual, -self.omega, &self.t, &self.s);
                ctx.residual_norm = norm2(&ctx.residual);
                ctx.converged = false;
                self.resume = Resume::EndIteration;
                Ok(Operation::CheckResidualNorm)
            }
            Resume::EndIteration => {
                if ctx.converged {
                    self.resume = Resume::Terminated;
                    return Ok(Operation::EndIteration);
                }
                let breakdown = roundoff::<T>() * roundoff::<T>();
                if self.omega.abs() < breakdown {
                    self.resume = Resume::Terminated;
                    return Err(ErrorKind::OmegaBreakdown);
                }
                self.rho_prev = self.rho;
                self.first = false;
                self.resume = Resume::FormDirection;
                Ok(Operation::EndIteration)
            }
            Resume::Terminated => panic!("bicgstab: iterate called without init"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::solver::solve;
    use crate::LinearOperator;
    use approx::assert_abs_diff_eq;

    struct DenseMat {
        n: usize,
        a: Vec<f64>, // row-major
    }

    impl LinearOperator<f64> for DenseMat {
        fn matvec(&self, dst: &mut [f64], src: &[f64]) {
            for (i, di) in dst.iter_mut().enumerate() {
                *di = self.a[i * self.n..(i + 1) * self.n]
                    .iter()
                    .zip(src)
                    .map(|(aij, xj)| aij * xj)
                    .sum();
            }
        }
    }

    #[test]
    fn bicgstab_solves_nonsymmetric() {
        let a = DenseMat {
            n: 3,
            a: vec![
                5.0, 2.0, 1.0, //
                1.0, 6.0, 2.0, //
                2.0, 1.0, 7.0,
            ],
        };
        let x_true = [1.0, 2.0, 3.0];
        let mut b = vec![0.0; 3];
        a.matvec(&mut b, &x_true);

        let settings = Settings::default()
            .with_tolerance(1e-10)
            .with_max_iterations(100);
        let solution = solve(&a, &b, &mut BiCgStab::new(), settings).unwrap();
        for (xi, ei) in solution.x.iter().zip(x_true.iter()) {
            assert_abs_diff_eq!(xi, ei, epsilon = 1e-8);
        }
    }

    #[test]
    fn bicgstab_with_jacobi_preconditioner() {
        let a = DenseMat {
            n: 3,
            a: vec![
                10.0, 1.0, 2.0, //
                1.0, 8.0, 1.0, //
                2.0, 1.0, 12.0,
            ],
        };
        let x_true = [3.0, -1.0, 0.5];
        let mut b = vec![0.0; 3];
        a.matvec(&mut b, &x_true);

        let inv_diag = [0.1, 0.125, 1.0 / 12.0];
        let settings = Settings::default()
            .with_tolerance(1e-12)
            .with_psolve(move |dst: &mut [f64], rhs: &[f64]| {
                for ((di, &ri), &mi) in dst.iter_mut().zip(rhs).zip(inv_diag.iter()) {
                    *di = ri * mi;
                }
                Ok(())
            });
        let solution = solve(&a, &b, &mut BiCgStab::new(), settings).unwrap();
        for (xi, ei) in solution.x.iter().zip(x_true.iter()) {
            assert_abs_diff_eq!(xi, ei, epsilon = 1e-9);
        }
        assert!(solution.stats.psolve_count > 0);
    }
}
