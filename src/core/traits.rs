//! Core linear-operator trait for krylin.

/// A square linear operator presented through matrix-vector products.
///
/// Implementations must not retain the slices passed to them; the library
/// guarantees `dst` and `src` never alias at the time of a call.
pub trait LinearOperator<T> {
    /// Compute dst = A * src.
    fn matvec(&self, dst: &mut [T], src: &[T]);

    /// Whether [`LinearOperator::matvec_trans`] is available. Methods that
    /// work with the transpose (BiCG) make the driver fail with
    /// `MissingOperator` when this is false.
    fn supports_trans(&self) -> bool {
        false
    }

    /// Compute dst = A^T * src. Only called after `supports_trans` returned
    /// true.
    fn matvec_trans(&self, dst: &mut [T], src: &[T]) {
        let _ = (dst, src);
        unreachable!("matvec_trans called on an operator without transpose support");
    }
}

impl<T, A: LinearOperator<T> + ?Sized> LinearOperator<T> for &A {
    fn matvec(&self, dst: &mut [T], src: &[T]) {
        (**self).matvec(dst, src)
    }

    fn supports_trans(&self) -> bool {
        (**self).supports_trans()
    }

    fn matvec_trans(&self, dst: &mut [T], src: &[T]) {
        (**self).matvec_trans(dst, src)
    }
}
