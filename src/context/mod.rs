//! Conversation state between the driver and a method.

use num_traits::Float;

/// The state a [`crate::solver::Method`] and the [`crate::solver::solve`]
/// driver share across suspensions. It must not be modified or read except
/// as part of servicing the commanded operations.
pub struct Context<T> {
    /// Current approximate solution. Holds the initial estimate on the
    /// first call to `iterate`; the method updates it before commanding
    /// `ComputeResidual` or `EndIteration`.
    pub x: Vec<T>,
    /// Current residual b - A*x. Holds the initial residual on the first
    /// call to `iterate`. Methods may maintain it by recurrence and refresh
    /// it only periodically.
    pub residual: Vec<T>,
    /// Estimate of the norm of the current residual, updated by the method
    /// before it commands `CheckResidualNorm`. It does not have to equal
    /// the norm of `residual`; GMRES estimates it without forming the
    /// residual at all.
    pub residual_norm: T,
    /// Set while servicing `CheckResidualNorm` when `residual_norm`
    /// satisfies the stopping criterion. After `EndIteration` with this set,
    /// the method must not be iterated again without `init`.
    pub converged: bool,
}

impl<T: Float> Context<T> {
    /// Fresh conversation state for a system of order `dim`.
    pub fn new(dim: usize) -> Self {
        Context {
            x: vec![T::zero(); dim],
            residual: vec![T::zero(); dim],
            residual_norm: T::zero(),
            converged: false,
        }
    }
}
