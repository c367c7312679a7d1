//! Convergence bookkeeping shared by the driver.

pub mod convergence;
pub use convergence::{Solution, Stats};
