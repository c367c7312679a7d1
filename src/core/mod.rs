//! Operator abstraction and dense vector kernels.

pub mod kernels;
pub mod traits;
pub mod wrappers;

pub use traits::LinearOperator;
pub use wrappers::FnOperator;
