//! Error types for extractor construction.
//!
//! Running an extractor never fails: a message without a usable price is a
//! normal `None`, not an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid price pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Currency marker set is empty")]
    EmptyMarkerSet,

    #[error("Default currency is empty")]
    EmptyDefaultCurrency,
}
