// Adapter for driving the solvers from plain closures.

use crate::core::traits::LinearOperator;

/// Operator backed by plain matrix-vector product functions, for matrix-free
/// systems that have no named operator type.
pub struct FnOperator<F, G = F> {
    matvec: F,
    matvec_trans: Option<G>,
}

impl<F> FnOperator<F> {
    /// Operator with a forward product only. Methods that need the
    /// transpose (BiCG) will fail with `MissingOperator`.
    pub fn new(matvec: F) -> Self {
        FnOperator {
            matvec,
            matvec_trans: None,
        }
    }
}

impl<F, G> FnOperator<F, G> {
    /// Operator with both the forward and the transpose product.
    pub fn with_trans(matvec: F, matvec_trans: G) -> Self {
        FnOperator {
            matvec,
            matvec_trans: Some(matvec_trans),
        }
    }
}

impl<T, F, G> LinearOperator<T> for FnOperator<F, G>
where
    F: Fn(&mut [T], &[T]),
    G: Fn(&mut [T], &[T]),
{
    fn matvec(&self, dst: &mut [T], src: &[T]) {
        (self.matvec)(dst, src)
    }

    fn supports_trans(&self) -> bool {
        self.matvec_trans.is_some()
    }

    fn matvec_trans(&self, dst: &mut [T], src: &[T]) {
        match &self.matvec_trans {
            Some(f) => f(dst, src),
            None => unreachable!("matvec_trans called on an operator without transpose support"),
        }
    }
}
