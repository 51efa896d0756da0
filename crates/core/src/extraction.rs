//! Result of running the extraction pipeline over one message.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Structured `(product, price, currency)` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub product_name: String,
    /// Non-negative, already scaled for magnitude suffixes.
    pub price: f64,
    pub currency: CompactString,
}

impl Extraction {
    pub fn new(
        product_name: impl Into<String>,
        price: f64,
        currency: impl Into<CompactString>,
    ) -> Self {
        Self {
            product_name: product_name.into(),
            price,
            currency: currency.into(),
        }
    }
}
