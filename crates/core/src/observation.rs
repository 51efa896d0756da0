//! Price observation records.

use crate::Extraction;
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Origin of a message: which channel posted it and under which id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    pub channel_id: i64,
    pub channel_name: String,
    pub message_id: i64,
}

impl SourceRef {
    pub fn new(channel_id: i64, channel_name: impl Into<String>, message_id: i64) -> Self {
        Self {
            channel_id,
            channel_name: channel_name.into(),
            message_id,
        }
    }
}

/// An observation that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewObservation {
    pub product_name: String,
    pub price: f64,
    pub currency: CompactString,
    /// When the source text was posted. Only used for window comparisons.
    pub observed_at: DateTime<Utc>,
    pub source: SourceRef,
    /// Original unmodified message text.
    pub raw_text: String,
}

impl NewObservation {
    /// Build an observation from an extraction result and its message context.
    pub fn from_extraction(
        extraction: Extraction,
        observed_at: DateTime<Utc>,
        source: SourceRef,
        raw_text: impl Into<String>,
    ) -> Self {
        Self {
            product_name: extraction.product_name,
            price: extraction.price,
            currency: extraction.currency,
            observed_at,
            source,
            raw_text: raw_text.into(),
        }
    }

    /// Attach the identity assigned by the store.
    pub fn into_stored(self, id: i64) -> PriceObservation {
        PriceObservation {
            id,
            product_name: self.product_name,
            price: self.price,
            currency: self.currency,
            observed_at: self.observed_at,
            source: self.source,
            raw_text: self.raw_text,
        }
    }
}

/// A persisted, immutable price observation.
///
/// `id` is the store-assigned identity. Two observations with the same
/// product and price are still distinct records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub id: i64,
    pub product_name: String,
    pub price: f64,
    pub currency: CompactString,
    pub observed_at: DateTime<Utc>,
    pub source: SourceRef,
    pub raw_text: String,
}

impl PriceObservation {
    /// Identity comparison, ignoring field values.
    pub fn is_same_record(&self, other: &PriceObservation) -> bool {
        self.id == other.id
    }
}
