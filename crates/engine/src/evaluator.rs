//! Best-deal evaluator.
//!
//! Decides whether a freshly stored observation is the cheapest one seen for
//! its product inside a trailing time window.

use crate::{ObservationStore, StoreResult};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use deal_core::{DealDecision, NewObservation, PriceObservation};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Upper bound on the window, keeps timestamp arithmetic in range.
const MAX_WINDOW_SECS: u64 = 100 * 365 * 86_400;

/// Configuration for the evaluator.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Trailing comparison window in seconds.
    pub window_secs: u64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self { window_secs: 86_400 }
    }
}

impl EvaluatorConfig {
    pub fn window(&self) -> Duration {
        Duration::seconds(self.window_secs.min(MAX_WINDOW_SECS) as i64)
    }
}

/// Best-deal evaluator over an observation store.
pub struct BestDealEvaluator {
    store: Arc<dyn ObservationStore>,
    config: EvaluatorConfig,
    /// One lock per product name; insert + evaluate run under it.
    product_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl BestDealEvaluator {
    pub fn new(store: Arc<dyn ObservationStore>, config: EvaluatorConfig) -> Self {
        Self {
            store,
            config,
            product_locks: DashMap::new(),
        }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ObservationStore> {
        &self.store
    }

    /// Start of the comparison window relative to `now`.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.config.window())
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Evaluate `observation` against the window ending now.
    pub async fn evaluate(&self, observation: &PriceObservation) -> StoreResult<DealDecision> {
        self.evaluate_at(observation, Utc::now()).await
    }

    /// Evaluate `observation` against the window ending at `now`.
    ///
    /// Alerts only when the store's minimum is this very record. An equal
    /// price stored earlier keeps the title.
    pub async fn evaluate_at(
        &self,
        observation: &PriceObservation,
        now: DateTime<Utc>,
    ) -> StoreResult<DealDecision> {
        let since = self.window_start(now);
        let best = self
            .store
            .min_in_window(&observation.product_name, since)
            .await?;

        match best {
            Some(best) if best.is_same_record(observation) => {
                debug!(
                    product = %observation.product_name,
                    price = observation.price,
                    id = observation.id,
                    "New best deal"
                );
                Ok(DealDecision::Alert(observation.clone()))
            }
            Some(best) => {
                debug!(
                    product = %observation.product_name,
                    price = observation.price,
                    best_price = best.price,
                    best_id = best.id,
                    "Not the best deal"
                );
                Ok(DealDecision::NoAlert)
            }
            None => Ok(DealDecision::NoAlert),
        }
    }

    /// Persist `observation` and evaluate it, serialized per product.
    ///
    /// Concurrent calls for the same product name never interleave, so each
    /// minimum is alerted at most once.
    pub async fn record_and_evaluate(
        &self,
        observation: NewObservation,
    ) -> StoreResult<(PriceObservation, DealDecision)> {
        let lock = self.product_lock(&observation.product_name);
        let _guard = lock.lock().await;

        let stored = self.store.insert(observation).await?;
        let decision = self.evaluate(&stored).await?;
        Ok((stored, decision))
    }

    fn product_lock(&self, product_name: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.product_locks.get(product_name) {
            return Arc::clone(lock.value());
        }
        Arc::clone(
            self.product_locks
                .entry(product_name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Drop locks no task is holding or waiting on. Returns how many were removed.
    pub fn prune_idle_locks(&self) -> usize {
        let before = self.product_locks.len();
        self.product_locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before.saturating_sub(self.product_locks.len())
    }

    /// Number of products with a live lock entry.
    pub fn tracked_products(&self) -> usize {
        self.product_locks.len()
    }
}
