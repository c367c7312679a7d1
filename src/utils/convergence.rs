//! Convergence tracking & tolerance checks for the iterative driver.

use std::time::{Duration, Instant};

use num_traits::Float;

use crate::config::Settings;
use crate::core::kernels;

/// Statistics about an iterative solve, updated monotonically by the driver.
#[derive(Clone, Copy, Debug)]
pub struct Stats<T> {
    /// Number of outer iterations commanded by the method.
    pub iterations: usize,
    /// Number of forward and transpose matrix-vector products.
    pub matvec_count: usize,
    /// Number of preconditioner solves, counting only calls into a
    /// user-supplied preconditioner.
    pub psolve_count: usize,
    /// Norm of the residual at the last recorded point.
    pub final_residual_norm: T,
    /// Approximate time the solve started.
    pub start_time: Instant,
    /// Approximate duration of the solve.
    pub runtime: Duration,
}

impl<T: Float> Stats<T> {
    pub(crate) fn new() -> Self {
        Stats {
            iterations: 0,
            matvec_count: 0,
            psolve_count: 0,
            final_residual_norm: T::zero(),
            start_time: Instant::now(),
            runtime: Duration::ZERO,
        }
    }
}

/// The outcome of a solve: the approximation and the statistics that
/// produced it. Returned on success, and carried inside
/// [`crate::error::SolveError`] on failure.
#[derive(Clone, Debug)]
pub struct Solution<T> {
    pub x: Vec<T>,
    pub stats: Stats<T>,
}

/// Residual-based stopping test shared by all methods.
///
/// With a norm estimate for A the criterion is
/// `|r| < tol * (|A|*|x| + |b|)`, computing `|x|` on demand; without one it
/// is `|r| < tol * max(|b|, 1)`, the floor guarding against b = 0.
pub(crate) fn converged<T: Float>(
    residual_norm: T,
    x: &[T],
    bnorm: T,
    settings: &Settings<T>,
) -> bool {
    match settings.norm_a {
        Some(norm_a) => residual_norm < settings.tolerance * (norm_a * kernels::norm2(x) + bnorm),
        None => residual_norm / bnorm.max(T::one()) < settings.tolerance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_criterion_floors_small_rhs() {
        let settings = Settings::<f64>::default().with_tolerance(1e-2);
        // |b| < 1 is floored to 1, so the test is absolute there.
        assert!(converged(5e-3, &[], 1e-6, &settings));
        assert!(!converged(0.5, &[], 10.0, &settings));
        assert!(converged(5e-2, &[], 10.0, &settings));
    }

    #[test]
    fn norm_a_criterion_uses_solution_norm() {
        let settings = Settings::<f64>::default()
            .with_tolerance(1e-2)
            .with_norm_a(100.0);
        let x = [3.0, 4.0];
        // Threshold is 1e-2 * (100 * 5 + 1) = 5.01.
        assert!(converged(5.0, &x, 1.0, &settings));
        assert!(!converged(5.02, &x, 1.0, &settings));
    }
}
