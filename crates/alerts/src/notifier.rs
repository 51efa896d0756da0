//! Message-to-alert pipeline.

use crate::db::{Database, DbError};
use crate::telegram::TelegramError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deal_core::{DealDecision, NewObservation, PriceObservation, SourceRef};
use deal_engine::{BestDealEvaluator, EvaluatorConfig, StoreError};
use deal_extract::Extractor;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Why an alert could not be delivered.
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Alert destination is not configured")]
    NotConfigured,
    #[error("Telegram error: {0}")]
    Telegram(#[from] TelegramError),
}

/// Destination for best-deal alerts.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send_best_deal(
        &self,
        observation: &PriceObservation,
        window_secs: u64,
    ) -> Result<(), AlertError>;
}

/// Shortest retention accepted; smaller values are raised to it.
const MIN_RETENTION_DAYS: i64 = 1;

/// Configuration for the notifier.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Days to keep alert history and observations.
    pub history_retention_days: i64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            history_retention_days: 30,
        }
    }
}

/// A post as received from a channel.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub text: String,
    pub source: SourceRef,
    pub posted_at: DateTime<Utc>,
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    /// No price or no usable product name.
    Skipped,
    /// Stored, but not the best price in the window.
    Recorded(PriceObservation),
    /// Stored and the cheapest in the window.
    BestDeal {
        observation: PriceObservation,
        delivered: bool,
    },
}

/// Runs extraction, storage, evaluation and alert delivery for each message.
pub struct Notifier {
    db: Database,
    extractor: Extractor,
    evaluator: BestDealEvaluator,
    sink: Arc<dyn AlertSink>,
    config: NotifierConfig,
}

impl Notifier {
    /// Create a new notifier. The evaluator reads and writes through `db`.
    pub fn new(
        db: Database,
        extractor: Extractor,
        evaluator_config: EvaluatorConfig,
        sink: Arc<dyn AlertSink>,
        mut config: NotifierConfig,
    ) -> Self {
        if config.history_retention_days < MIN_RETENTION_DAYS {
            warn!(
                days = config.history_retention_days,
                min = MIN_RETENTION_DAYS,
                "Retention too short, raising to minimum"
            );
            config.history_retention_days = MIN_RETENTION_DAYS;
        }
        let evaluator = BestDealEvaluator::new(Arc::new(db.clone()), evaluator_config);
        Self {
            db,
            extractor,
            evaluator,
            sink,
            config,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn window_secs(&self) -> u64 {
        self.evaluator.config().window_secs
    }

    /// Process one inbound message end to end.
    pub async fn process_message(
        &self,
        message: InboundMessage,
    ) -> Result<MessageOutcome, NotifierError> {
        let Some(extraction) = self.extractor.extract(&message.text) else {
            debug!(
                channel = %message.source.channel_name,
                message_id = message.source.message_id,
                "No price found, skipping message"
            );
            return Ok(MessageOutcome::Skipped);
        };

        let observation = NewObservation::from_extraction(
            extraction,
            message.posted_at,
            message.source,
            message.text,
        );
        let (stored, decision) = self.evaluator.record_and_evaluate(observation).await?;

        info!(
            product = %stored.product_name,
            price = stored.price,
            currency = %stored.currency,
            channel = %stored.source.channel_name,
            "Saved price observation"
        );

        let DealDecision::Alert(observation) = decision else {
            return Ok(MessageOutcome::Recorded(stored));
        };

        let delivered = match self
            .sink
            .send_best_deal(&observation, self.window_secs())
            .await
        {
            Ok(()) => {
                info!(
                    product = %observation.product_name,
                    price = observation.price,
                    currency = %observation.currency,
                    "Best deal alert sent"
                );
                self.db.record_alert(&observation).await?;
                true
            }
            Err(AlertError::NotConfigured) => {
                warn!(
                    product = %observation.product_name,
                    "Admin chat is not set, cannot send alert"
                );
                false
            }
            Err(e) => {
                error!(
                    product = %observation.product_name,
                    error = %e,
                    "Failed to send alert"
                );
                false
            }
        };

        Ok(MessageOutcome::BestDeal {
            observation,
            delivered,
        })
    }

    /// Current cheapest observation of `product_name` in the window.
    pub async fn current_best(
        &self,
        product_name: &str,
    ) -> Result<Option<PriceObservation>, NotifierError> {
        let since = self.evaluator.window_start(Utc::now());
        Ok(self.db.cheapest_since(product_name, since).await?)
    }

    /// Clean up old observations, old alert history and idle product locks.
    ///
    /// Observations are kept at least as long as the comparison window.
    pub async fn cleanup(&self) -> Result<(u64, u64), NotifierError> {
        let window_days = (self.window_secs() / 86_400) as i64 + 1;
        let observation_days = self.config.history_retention_days.max(window_days);

        let observations_deleted = self.db.cleanup_old_observations(observation_days).await?;
        if observations_deleted > 0 {
            info!(deleted = observations_deleted, "Cleaned up old observations");
        }

        let alerts_deleted = self
            .db
            .cleanup_old_alerts(self.config.history_retention_days)
            .await?;
        if alerts_deleted > 0 {
            info!(deleted = alerts_deleted, "Cleaned up old alert history");
        }

        let pruned = self.evaluator.prune_idle_locks();
        if pruned > 0 {
            debug!(pruned, "Pruned idle product locks");
        }

        Ok((observations_deleted, alerts_deleted))
    }
}
