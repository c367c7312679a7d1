//! The reverse-communication driver.

use num_traits::Float;

use crate::config::Settings;
use crate::context::Context;
use crate::core::kernels;
use crate::core::traits::LinearOperator;
use crate::error::{ErrorKind, SolveError};
use crate::solver::{Method, Operation};
use crate::utils::convergence::{self, Solution, Stats};

/// Solve the system of n linear equations A*x = b, where the n x n
/// nonsingular matrix A is represented by the operator `a`. The dimension n
/// is taken from the length of `b`; an empty right-hand side is a trivially
/// successful solve.
///
/// `method` is the iterative method driving the approximation. The operator
/// must provide what the method needs; BiCG, for example, requests transpose
/// products.
///
/// On failure the returned [`SolveError`] carries the approximation and the
/// statistics reached up to that point.
///
/// # Example
///
/// Solving a diagonally dominant tridiagonal system without forming the
/// matrix:
///
/// ```
/// use krylin::{solve, Cg, FnOperator, Settings};
///
/// let op = FnOperator::new(|dst: &mut [f64], src: &[f64]| {
///     let n = src.len();
///     for i in 0..n {
///         dst[i] = 4.0 * src[i];
///         if i > 0 {
///             dst[i] += src[i - 1];
///         }
///         if i + 1 < n {
///             dst[i] += src[i + 1];
///         }
///     }
/// });
/// let b = vec![1.0; 32];
///
/// let solution = solve(&op, &b, &mut Cg::new(), Settings::default()).unwrap();
/// assert!(solution.stats.iterations < 32);
/// ```
pub fn solve<T, A, M>(
    a: &A,
    b: &[T],
    method: &mut M,
    mut settings: Settings<T>,
) -> Result<Solution<T>, SolveError<T>>
where
    T: Float,
    A: LinearOperator<T> + ?Sized,
    M: Method<T> + ?Sized,
{
    let mut stats = Stats::new();
    let dim = b.len();

    if let Some(x0) = &settings.x0 {
        if x0.len() != dim {
            return Err(fail(
                ErrorKind::InvalidArgument("mismatched length of initial guess"),
                vec![T::zero(); dim],
                stats,
            ));
        }
    }

    if dim == 0 {
        stats.runtime = stats.start_time.elapsed();
        return Ok(Solution {
            x: Vec::new(),
            stats,
        });
    }
    if settings.tolerance < kernels::roundoff() || settings.tolerance >= T::one() {
        return Err(fail(
            ErrorKind::InvalidArgument("tolerance out of range"),
            settings.x0.take().unwrap_or_else(|| vec![T::zero(); dim]),
            stats,
        ));
    }
    let max_iterations = settings.max_iterations.unwrap_or(2 * dim);
    if max_iterations == 0 {
        return Err(fail(
            ErrorKind::InvalidArgument("max_iterations must be positive"),
            settings.x0.take().unwrap_or_else(|| vec![T::zero(); dim]),
            stats,
        ));
    }

    let mut ctx = Context::new(dim);
    if let Some(x0) = settings.x0.take() {
        ctx.x.copy_from_slice(&x0);
        a.matvec(&mut ctx.residual, &ctx.x);
        stats.matvec_count += 1;
        kernels::rsub(&mut ctx.residual, b); // r = b - A*x0
    } else {
        ctx.residual.copy_from_slice(b); // r = b
    }
    ctx.residual_norm = kernels::norm2(&ctx.residual);
    stats.final_residual_norm = ctx.residual_norm;

    let outcome = if ctx.residual_norm >= settings.tolerance {
        iterate(a, b, &mut ctx, &mut settings, method, max_iterations, &mut stats)
    } else {
        Ok(())
    };

    stats.runtime = stats.start_time.elapsed();
    let result = Solution { x: ctx.x, stats };
    match outcome {
        Ok(()) => Ok(result),
        Err(kind) => Err(SolveError { kind, result }),
    }
}

fn fail<T>(kind: ErrorKind, x: Vec<T>, mut stats: Stats<T>) -> SolveError<T>
where
    T: Float,
{
    stats.runtime = stats.start_time.elapsed();
    SolveError {
        kind,
        result: Solution { x, stats },
    }
}

fn iterate<T, A, M>(
    a: &A,
    b: &[T],
    ctx: &mut Context<T>,
    settings: &mut Settings<T>,
    method: &mut M,
    max_iterations: usize,
    stats: &mut Stats<T>,
) -> Result<(), ErrorKind>
where
    T: Float,
    A: LinearOperator<T> + ?Sized,
    M: Method<T> + ?Sized,
{
    let bnorm = kernels::norm2(b);

    method.init(ctx.x.len());

    loop {
        match method.iterate(ctx)? {
            Operation::NoOp => {}

            Operation::MatVec { dst, src } => {
                a.matvec(dst, src);
                stats.matvec_count += 1;
            }

            Operation::MatTransVec { dst, src } => {
                if !a.supports_trans() {
                    return Err(ErrorKind::MissingOperator);
                }
                a.matvec_trans(dst, src);
                stats.matvec_count += 1;
            }

            Operation::PSolve { dst, rhs } => match settings.psolve.as_mut() {
                Some(psolve) => {
                    psolve(dst, rhs).map_err(ErrorKind::Preconditioner)?;
                    stats.psolve_count += 1;
                }
                None => dst.copy_from_slice(rhs),
            },

            Operation::PSolveTrans { dst, rhs } => match settings.psolve_trans.as_mut() {
                Some(psolve_trans) => {
                    psolve_trans(dst, rhs).map_err(ErrorKind::Preconditioner)?;
                    stats.psolve_count += 1;
                }
                None => {
                    // A one-sided preconditioner cannot serve a transpose
                    // request; no preconditioner at all acts as identity.
                    if settings.psolve.is_some() {
                        return Err(ErrorKind::MissingOperator);
                    }
                    dst.copy_from_slice(rhs);
                }
            },

            Operation::ComputeResidual => {
                a.matvec(&mut ctx.residual, &ctx.x);
                stats.matvec_count += 1;
                kernels::rsub(&mut ctx.residual, b);
                // Refresh the norm too; the check that follows must see the
                // true residual, not the method's running estimate.
                ctx.residual_norm = kernels::norm2(&ctx.residual);
            }

            Operation::CheckResidualNorm => {
                ctx.converged =
                    convergence::converged(ctx.residual_norm, &ctx.x, bnorm, settings);
            }

            Operation::EndIteration => {
                stats.iterations += 1;
                stats.final_residual_norm = ctx.residual_norm;
                if ctx.converged {
                    return Ok(());
                }
                if stats.iterations == max_iterations {
                    return Err(ErrorKind::IterationLimit);
                }
            }
        }
    }
}
