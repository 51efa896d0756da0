//! Core data types for the deal watcher.

pub mod deal;
pub mod extraction;
pub mod observation;

pub use deal::*;
pub use extraction::*;
pub use observation::*;
