use std::fmt;

use thiserror::Error;

use crate::utils::convergence::Solution;

// Unified error types for krylin

/// What went wrong during a solve.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// API misuse observable before any iteration work is done.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The method requested a transpose operation but the operator or the
    /// preconditioner does not provide one.
    #[error("transpose operation requested but not supplied")]
    MissingOperator,
    /// The user preconditioner callback reported a failure; the inner error
    /// is carried verbatim.
    #[error("preconditioner failure: {0}")]
    Preconditioner(Box<dyn std::error::Error + Send + Sync>),
    /// rho became numerically zero in BiCG or BiCGSTAB.
    #[error("rho breakdown")]
    RhoBreakdown,
    /// omega became numerically zero in BiCGSTAB.
    #[error("omega breakdown")]
    OmegaBreakdown,
    /// The iteration budget was exhausted before the tolerance was met.
    #[error("iteration limit reached")]
    IterationLimit,
}

/// A failed solve, carrying the best approximation reached and the
/// statistics gathered up to the failure.
#[derive(Debug)]
pub struct SolveError<T> {
    pub kind: ErrorKind,
    pub result: Solution<T>,
}

impl<T> fmt::Display for SolveError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

impl<T: fmt::Debug> std::error::Error for SolveError<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Preconditioner(inner) => {
                Some(inner.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}
