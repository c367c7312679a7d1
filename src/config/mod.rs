//! Solve configuration.

pub mod options;
pub use options::{PrecondError, PrecondFn, Settings};
