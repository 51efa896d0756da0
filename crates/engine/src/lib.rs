//! Best-deal decision engine.
//!
//! This crate defines the storage port the decision needs and the evaluator
//! that flags the cheapest observation of a product inside a trailing window.

pub mod evaluator;
pub mod store;

pub use evaluator::*;
pub use store::*;
