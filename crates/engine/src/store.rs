//! Storage port for price observations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deal_core::{NewObservation, PriceObservation};
use thiserror::Error;

/// Errors surfaced by an observation store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Stored observation is corrupt: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The two storage operations the best-deal logic needs.
#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// Persist a new observation and return it with its assigned identity.
    async fn insert(&self, observation: NewObservation) -> StoreResult<PriceObservation>;

    /// Cheapest observation of `product_name` observed at or after `since`.
    ///
    /// Ties on price go to the earliest `observed_at`, then the lowest id.
    async fn min_in_window(
        &self,
        product_name: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Option<PriceObservation>>;
}
