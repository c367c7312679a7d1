//! Options for an iterative solve.
//!
//! All fields are optional in the sense that [`Settings::default`] yields a
//! working configuration; the driver fills in the dimension-dependent
//! defaults (`max_iterations = 2 * dim`) on entry.

use num_traits::Float;

/// Error type a preconditioner callback may report. It is surfaced verbatim
/// inside [`crate::error::ErrorKind::Preconditioner`].
pub type PrecondError = Box<dyn std::error::Error + Send + Sync>;

/// Preconditioner solve callback: store into `dst` the solution of
/// `M z = rhs` (or `M^T z = rhs` for the transposed variant).
pub type PrecondFn<T> = Box<dyn FnMut(&mut [T], &[T]) -> Result<(), PrecondError>>;

/// Settings for solving a linear system.
pub struct Settings<T> {
    /// Initial guess. If absent, the zero vector is used. When present its
    /// length must equal the dimension of the system.
    pub x0: Option<Vec<T>>,

    /// Error tolerance for the final approximate solution. Must lie in
    /// `[unit roundoff, 1)`.
    ///
    /// If `norm_a` is set, the stopping criterion is
    ///   |r| < tolerance * (norm_a * |x| + |b|),
    /// otherwise
    ///   |r| < tolerance * max(|b|, 1).
    pub tolerance: T,

    /// Estimate of a norm of A, for example an approximation of the largest
    /// entry. Absent means unknown; it is then not used in the stopping
    /// criterion.
    pub norm_a: Option<T>,

    /// Limit on the number of outer iterations. Absent means twice the
    /// dimension of the system.
    pub max_iterations: Option<usize>,

    /// Preconditioner solve `M z = rhs`. Absent means no preconditioning
    /// (M is the identity).
    pub psolve: Option<PrecondFn<T>>,

    /// Transposed preconditioner solve `M^T z = rhs`. Absent means no
    /// preconditioning.
    pub psolve_trans: Option<PrecondFn<T>>,
}

impl<T: Float> Default for Settings<T> {
    fn default() -> Self {
        Settings {
            x0: None,
            tolerance: num_traits::cast(1e-8).unwrap(),
            norm_a: None,
            max_iterations: None,
            psolve: None,
            psolve_trans: None,
        }
    }
}

impl<T: Float> Settings<T> {
    /// Set the initial guess.
    pub fn with_x0(mut self, x0: Vec<T>) -> Self {
        self.x0 = Some(x0);
        self
    }

    /// Set the error tolerance.
    pub fn with_tolerance(mut self, tolerance: T) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the norm estimate used by the stopping criterion.
    pub fn with_norm_a(mut self, norm_a: T) -> Self {
        self.norm_a = Some(norm_a);
        self
    }

    /// Set the iteration limit.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Set the preconditioner solve.
    pub fn with_psolve(
        mut self,
        psolve: impl FnMut(&mut [T], &[T]) -> Result<(), PrecondError> + 'static,
    ) -> Self {
        self.psolve = Some(Box::new(psolve));
        self
    }

    /// Set the transposed preconditioner solve.
    pub fn with_psolve_trans(
        mut self,
        psolve_trans: impl FnMut(&mut [T], &[T]) -> Result<(), PrecondError> + 'static,
    ) -> Self {
        self.psolve_trans = Some(Box::new(psolve_trans));
        self
    }
}
