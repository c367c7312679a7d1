//! BiConjugate Gradient (Saad §7.3).

use num_traits::Float;

use crate::context::Context;
use crate::core::kernels::{axpy, dot, norm2, roundoff};
use crate::error::ErrorKind;
use crate::solver::{Method, Operation};

/// Resume points of the BiCG recurrence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Resume {
    SolvePrecond,
    SolvePrecondTrans,
    FormDirections,
    ApplyTrans,
    UpdateIterate,
    EndIteration,
    Terminated,
}

/// BiConjugate Gradient method for general nonsingular systems.
///
/// BiCG runs two coupled recurrences, one on the residual and one on a
/// shadow residual, and therefore requests `MatVec`, `MatTransVec`, `PSolve`
/// and `PSolveTrans` operations. For symmetric positive definite systems
/// use [`crate::solver::Cg`].
pub struct BiCg<T> {
    first: bool,
    rho: T,
    rho_prev: T,
    alpha: T,
    resume: Resume,

    r: Vec<T>,
    rt: Vec<T>,
    z: Vec<T>,
    zt: Vec<T>,
    p: Vec<T>,
    pt: Vec<T>,
    q: Vec<T>,
    qt: Vec<T>,
}

impl<T: Float> BiCg<T> {
    pub fn new() -> Self {
        BiCg {
            first: true,
            rho: T::zero(),
            rho_prev: T::zero(),
            alpha: T::zero(),
            resume: Resume::Terminated,
            r: Vec::new(),
            rt: Vec::new(),
            z: Vec::new(),
            zt: Vec::new(),
            p: Vec::new(),
            pt: Vec::new(),
            q: Vec::new(),
            qt: Vec::new(),
        }
    }
}

impl<T: Float> Default for BiCg<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float> Method<T> for BiCg<T> {
    fn init(&mut self, dim: usize) {
        assert!(dim > 0, "bicg: dimension not positive");

        self.r.resize(dim, T::zero());
        self.rt.resize(dim, T::zero());
        self.z.resize(dim, T::zero());
        self.zt.resize(dim, T::zero());
        self.p.resize(dim, T::zero());
        self.pt.resize(dim, T::zero());
        self.q.resize(dim, T::zero());
        self.qt.resize(dim, T::zero());

        self.first = true;
        self.resume = Resume::SolvePrecond;
    }

    fn iterate(&mut self, ctx: &mut Context<T>) -> Result<Operation<'_, T>, ErrorKind> {
        match self.resume {
            Resume::SolvePrecond => {
                if self.first {
                    // The shadow residual starts out equal to the residual.
                    self.r.copy_from_slice(&ctx.residual);
                    self.rt.copy_from_slice(&self.r);
                }
                self.resume = Resume::SolvePrecondTrans;
                // Solve M z = r_{i-1}.
                Ok(Operation::PSolve {
                    dst: &mut self.z,
                    rhs: &self.r,
                })
            }
            Resume::SolvePrecondTrans => {
                self.resume = Resume::FormDirections;
                // Solve M^T zt = rt_{i-1}.
                Ok(Operation::PSolveTrans {
                    dst: &mut self.zt,
                    rhs: &self.rt,
                })
            }
            Resume::FormDirections => {
                self.rho = dot(&self.z, &self.rt); // rho_i = z . rt_{i-1}
                let breakdown = roundoff::<T>() * roundoff::<T>();
                if self.rho.abs() < breakdown {
                    self.resume = Resume::Terminated;
                    return Err(ErrorKind::RhoBreakdown);
                }
                if !self.first {
                    let beta = self.rho / self.rho_prev;
                    axpy(beta, &self.p, &mut self.z);
                    axpy(beta, &self.pt, &mut self.zt);
                }
                self.p.copy_from_slice(&self.z); // p_i = z + beta * p_{i-1}
                self.pt.copy_from_slice(&self.zt); // pt_i = zt + beta * pt_{i-1}
                self.resume = Resume::ApplyTrans;
                // Compute A p_i.
                Ok(Operation::MatVec {
                    dst: &mut self.q,
                    src: &self.p,
                })
            }
            Resume::ApplyTrans => {
                self.resume = Resume::UpdateIterate;
                // Compute A^T pt_i.
                Ok(Operation::MatTransVec {
                    dst: &mut self.qt,
                    src: &self.pt,
                })
            }
            Resume::UpdateIterate => {
                self.alpha = self.rho / dot(&self.pt, &self.q); // alpha = rho_i / (pt_i . q)
                axpy(self.alpha, &self.p, &mut ctx.x);
                axpy(-self.alpha, &self.q, &mut ctx.residual);

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
                // Prepare the next iteration.
                self.r.copy_from_slice(&ctx.residual);
                axpy(-self.alpha, &self.qt, &mut self.rt); // rt_i = rt_{i-1} - alpha * qt
                self.rho_prev = self.rho;
                self.first = false;
                self.resume = Resume::SolvePrecond;
                Ok(Operation::EndIteration)
            }
            Resume::Terminated => panic!("bicg: iterate called without init"),
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

        fn supports_trans(&self) -> bool {
            true
        }

        fn matvec_trans(&self, dst: &mut [f64], src: &[f64]) {
            for (j, dj) in dst.iter_mut().enumerate() {
                *dj = (0..self.n).map(|i| self.a[i * self.n + j] * src[i]).sum();
            }
        }
    }

    #[test]
    fn bicg_solves_nonsymmetric() {
        // Well-conditioned nonsymmetric system with known solution.
        let a = DenseMat {
            n: 4,
            a: vec![
                4.0, 1.0, 0.0, 0.0, //
                2.0, 5.0, 1.0, 0.0, //
                0.0, 1.0, 3.0, 1.0, //
                0.0, 0.0, 2.0, 4.0,
            ],
        };
        let x_true = [1.0, 2.0, 3.0, 4.0];
        let mut b = vec![0.0; 4];
        a.matvec(&mut b, &x_true);

        let settings = Settings::default().with_tolerance(1e-12);
        let solution = solve(&a, &b, &mut BiCg::new(), settings).unwrap();
        for (xi, ei) in solution.x.iter().zip(x_true.iter()) {
            assert_abs_diff_eq!(xi, ei, epsilon = 1e-9);
        }
        // Both a forward and a transpose product per iteration.
        assert!(solution.stats.matvec_count >= 2 * solution.stats.iterations);
    }

    #[test]
    fn bicg_with_two_sided_jacobi_preconditioner() {
        let a = DenseMat {
            n: 3,
            a: vec![
                10.0, 1.0, 2.0, //
                3.0, 8.0, 1.0, //
                1.0, 2.0, 12.0,
            ],
        };
        let x_true = [2.0, -1.0, 0.25];
        let mut b = vec![0.0; 3];
        a.matvec(&mut b, &x_true);

        // Jacobi is symmetric, so both solves share the same diagonal.
        let inv_diag = [0.1, 0.125, 1.0 / 12.0];
        let jacobi = move |dst: &mut [f64], rhs: &[f64]| {
            for ((di, &ri), &mi) in dst.iter_mut().zip(rhs).zip(inv_diag.iter()) {
                *di = ri * mi;
            }
            Ok(())
        };
        let settings = Settings::default()
            .with_tolerance(1e-12)
            .with_psolve(jacobi)
            .with_psolve_trans(jacobi);
        let solution = solve(&a, &b, &mut BiCg::new(), settings).unwrap();
        for (xi, ei) in solution.x.iter().zip(x_true.iter()) {
            assert_abs_diff_eq!(xi, ei, epsilon = 1e-9);
        }
        // Two preconditioner solves per iteration.
        assert!(solution.stats.psolve_count >= 2 * solution.stats.iterations);
    }
}
