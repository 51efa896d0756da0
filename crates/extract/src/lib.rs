//! Rule-based price extraction from free-text marketplace posts.
//!
//! Pipeline: digit normalization, price/currency recognition, product-name
//! extraction. [`Extractor`] is the entry point.

pub mod digits;
pub mod error;
pub mod extractor;
pub mod price;
pub mod product;

pub use digits::normalize_digits;
pub use error::ExtractError;
pub use extractor::{Extractor, ExtractorConfig};
pub use price::{PriceMatch, PriceRecognizer};
pub use product::ProductNameExtractor;
