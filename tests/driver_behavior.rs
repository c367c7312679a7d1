//! Driver contract tests: validation, defaults, statistics and error
//! propagation.

use std::fmt;

use krylin::{solve, BiCg, Cg, ErrorKind, FnOperator, LinearOperator, Settings};

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

/// 1D Laplacian, symmetric positive definite but slow to converge compared
/// with the diagonally dominant random systems.
fn laplacian(n: usize) -> DenseMat {
    let mut a = vec![0.0; n * n];
    for i in 0..n {
        a[i * n + i] = 2.0;
        if i > 0 {
            a[i * n + i - 1] = -1.0;
        }
        if i + 1 < n {
            a[i * n + i + 1] = -1.0;
        }
    }
    DenseMat { n, a }
}

fn identity_op() -> FnOperator<impl Fn(&mut [f64], &[f64])> {
    FnOperator::new(|dst: &mut [f64], src: &[f64]| dst.copy_from_slice(src))
}

#[test]
fn zero_dimension_is_trivial_success() {
    let b: Vec<f64> = Vec::new();
    let solution = solve(&identity_op(), &b, &mut Cg::new(), Settings::default()).unwrap();
    assert!(solution.x.is_empty());
    assert_eq!(solution.stats.iterations, 0);
    assert_eq!(solution.stats.matvec_count, 0);
}

#[test]
fn exact_initial_guess_returns_in_zero_iterations() {
    let a = laplacian(8);
    let x_true: Vec<f64> = (0..8).map(|i| (i as f64).cos()).collect();
    let mut b = vec![0.0; 8];
    a.matvec(&mut b, &x_true);

    let settings = Settings::default().with_x0(x_true.clone());
    let solution = solve(&a, &b, &mut Cg::new(), settings).unwrap();
    assert_eq!(solution.stats.iterations, 0);
    // One product to build the initial residual.
    assert_eq!(solution.stats.matvec_count, 1);
    assert_eq!(solution.x, x_true);
}

#[test]
fn tolerance_accepts_unit_roundoff() {
    let b = vec![1.0, 1.0];
    let settings = Settings::default().with_tolerance(2f64.powi(-53));
    let solution = solve(&identity_op(), &b, &mut Cg::new(), settings).unwrap();
    assert_eq!(solution.x, b);
}

#[test]
fn tolerance_below_unit_roundoff_is_rejected() {
    let b = vec![1.0, 1.0];
    let settings = Settings::default().with_tolerance(2f64.powi(-54));
    let err = solve(&identity_op(), &b, &mut Cg::new(), settings).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidArgument(_)));
}

#[test]
fn tolerance_of_one_is_rejected() {
    let b = vec![1.0, 1.0];
    let settings = Settings::default().with_tolerance(1.0);
    let err = solve(&identity_op(), &b, &mut Cg::new(), settings).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidArgument(_)));
}

#[test]
fn mismatched_initial_guess_is_rejected() {
    let b = vec![1.0, 1.0];
    let settings = Settings::default().with_x0(vec![0.0; 3]);
    let err = solve(&identity_op(), &b, &mut Cg::new(), settings).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidArgument(_)));
}

#[test]
fn mismatched_initial_guess_is_rejected_before_empty_system() {
    let b: Vec<f64> = Vec::new();
    let settings = Settings::default().with_x0(vec![0.0; 1]);
    let err = solve(&identity_op(), &b, &mut Cg::new(), settings).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidArgument(_)));
}

#[test]
fn zero_iteration_budget_is_rejected() {
    let b = vec![1.0, 1.0];
    let settings = Settings::default().with_max_iterations(0);
    let err = solve(&identity_op(), &b, &mut Cg::new(), settings).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidArgument(_)));
}

#[test]
fn iteration_limit_is_reported_with_statistics() {
    let a = laplacian(20);
    let b = vec![1.0; 20];
    let settings = Settings::default()
        .with_tolerance(1e-12)
        .with_max_iterations(1);
    let err = solve(&a, &b, &mut Cg::new(), settings).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::IterationLimit));
    assert_eq!(err.result.stats.iterations, 1);
    assert!(err.result.stats.final_residual_norm > 0.0);
    assert_eq!(err.result.x.len(), 20);
}

#[derive(Debug)]
struct PrecondSentinel;

impl fmt::Display for PrecondSentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("sentinel preconditioner failure")
    }
}

impl std::error::Error for PrecondSentinel {}

#[test]
fn preconditioner_failure_is_propagated() {
    let a = laplacian(20);
    let b = vec![1.0; 20];
    let mut calls = 0;
    let settings = Settings::default()
        .with_tolerance(1e-12)
        .with_psolve(move |dst: &mut [f64], rhs: &[f64]| {
            calls += 1;
            if calls == 3 {
                return Err(Box::new(PrecondSentinel));
            }
            dst.copy_from_slice(rhs);
            Ok(())
        });
    let err = solve(&a, &b, &mut Cg::new(), settings).unwrap_err();
    match &err.kind {
        ErrorKind::Preconditioner(inner) => {
            assert!(inner.downcast_ref::<PrecondSentinel>().is_some());
        }
        other => panic!("expected preconditioner failure, got {}", other),
    }
    // The failure fired at the start of the third iteration, before its
    // matrix-vector product.
    assert_eq!(err.result.stats.matvec_count, 2);
    assert_eq!(err.result.stats.psolve_count, 2);
}

#[test]
fn bicg_without_transpose_fails_cleanly() {
    let b = vec![1.0, 2.0];
    // The operator provides no transpose product.
    let op = FnOperator::new(|dst: &mut [f64], src: &[f64]| {
        dst[0] = 2.0 * src[0] + src[1];
        dst[1] = 3.0 * src[1];
    });
    let err = solve(&op, &b, &mut BiCg::new(), Settings::default()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MissingOperator));
}

#[test]
fn one_sided_preconditioner_cannot_serve_transpose() {
    let a = laplacian(6);
    let b = vec![1.0; 6];
    let settings = Settings::default().with_psolve(|dst: &mut [f64], rhs: &[f64]| {
        dst.copy_from_slice(rhs);
        Ok(())
    });
    let err = solve(&a, &b, &mut BiCg::new(), settings).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MissingOperator));
}
