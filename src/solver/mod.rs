//! Krylov method interfaces and the reverse-communication driver.

use crate::context::Context;
use crate::error::ErrorKind;

/// A request a [`Method`] hands back to the driver.
///
/// The product and preconditioner variants carry views into the method's own
/// storage; each view is valid only for the single dispatch that follows and
/// must not be retained.
pub enum Operation<'a, T> {
    /// Nothing to service; call `iterate` again.
    NoOp,
    /// Compute dst = A * src.
    MatVec { dst: &'a mut [T], src: &'a [T] },
    /// Compute dst = A^T * src.
    MatTransVec { dst: &'a mut [T], src: &'a [T] },
    /// Solve M z = rhs and store z into dst.
    PSolve { dst: &'a mut [T], rhs: &'a [T] },
    /// Solve M^T z = rhs and store z into dst.
    PSolveTrans { dst: &'a mut [T], rhs: &'a [T] },
    /// Recompute the residual b - A*x from the current approximation in
    /// `Context::x`, refreshing `Context::residual` and its norm.
    ComputeResidual,
    /// Evaluate the stopping criterion against `Context::residual_norm`,
    /// storing the verdict in `Context::converged`.
    CheckResidualNorm,
    /// The method finished what it considers one iteration. With
    /// `Context::converged` set the solve terminates, and the method must be
    /// re-initialized before it can be iterated again.
    EndIteration,
}

/// An iterative method producing a sequence of approximations to the
/// solution of A x = b.
///
/// Methods use reverse communication: they never call the operator or the
/// preconditioner themselves, they suspend inside [`Method::iterate`] and
/// command the caller through the returned [`Operation`]. This keeps every
/// method independent of the matrix representation and leaves convergence
/// testing and statistics to the driver.
pub trait Method<T> {
    /// Prepare for solving a `dim` x `dim` system, sizing internal buffers
    /// and resetting the resume state. Buffers are reused in place when the
    /// dimension has not changed.
    fn init(&mut self, dim: usize);

    /// Advance to the next suspension point and return the operation the
    /// caller must service before calling `iterate` again.
    fn iterate(&mut self, ctx: &mut Context<T>) -> Result<Operation<'_, T>, ErrorKind>;
}

pub mod driver;
pub use driver::solve;

pub mod cg;
pub use cg::Cg;

pub mod bicg;
pub use bicg::BiCg;

pub mod bicgstab;
pub use bicgstab::BiCgStab;

pub mod gmres;
pub use gmres::Gmres;
