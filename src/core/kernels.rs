//! Dense vector kernels shared by the driver and the methods.
//!
//! All kernels operate on equal-length contiguous slices and assume the
//! destination does not alias the other operands unless stated otherwise.

use num_traits::Float;

/// Dot product of x and y.
pub fn dot<T: Float>(x: &[T], y: &[T]) -> T {
    debug_assert_eq!(x.len(), y.len());
    x.iter()
        .zip(y)
        .fold(T::zero(), |acc, (&xi, &yi)| acc + xi * yi)
}

/// Euclidean norm of x, computed with the scaled sum of squares so that
/// extreme entries neither overflow nor underflow prematurely.
pub fn norm2<T: Float>(x: &[T]) -> T {
    let mut scale = T::zero();
    let mut ssq = T::one();
    for &xi in x {
        if xi != T::zero() {
            let absxi = xi.abs();
            if scale < absxi {
                let t = scale / absxi;
                ssq = T::one() + ssq * t * t;
                scale = absxi;
            } else {
                let t = absxi / scale;
                ssq = ssq + t * t;
            }
        }
    }
    scale * ssq.sqrt()
}

/// y += alpha * x.
pub fn axpy<T: Float>(alpha: T, x: &[T], y: &mut [T]) {
    debug_assert_eq!(x.len(), y.len());
    for (yi, &xi) in y.iter_mut().zip(x) {
        *yi = *yi + alpha * xi;
    }
}

/// dst = y + alpha * x. `dst` must not alias `x` or `y`.
pub fn axpy_to<T: Float>(dst: &mut [T], alpha: T, x: &[T], y: &[T]) {
    debug_assert_eq!(dst.len(), x.len());
    debug_assert_eq!(dst.len(), y.len());
    for ((di, &xi), &yi) in dst.iter_mut().zip(x).zip(y) {
        *di = yi + alpha * xi;
    }
}

/// x *= alpha.
pub fn scale<T: Float>(alpha: T, x: &mut [T]) {
    for xi in x {
        *xi = alpha * *xi;
    }
}

/// dst = y - dst. The in-place reversal that turns A*x into b - A*x.
pub fn rsub<T: Float>(dst: &mut [T], y: &[T]) {
    debug_assert_eq!(dst.len(), y.len());
    for (di, &yi) in dst.iter_mut().zip(y) {
        *di = yi - *di;
    }
}

/// Unit roundoff of T, half the spacing between 1 and the next larger
/// representable value (2^-53 for f64).
pub(crate) fn roundoff<T: Float>() -> T {
    T::epsilon() / (T::one() + T::one())
}
