//! Offline replay of saved posts through the pipeline.

use async_trait::async_trait;
use chrono::Utc;
use deal_alerts::{AlertError, AlertSink, InboundMessage, MessageOutcome, Notifier, NotifierError};
use deal_core::{PriceObservation, SourceRef};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Failed to read replay file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Notifier error: {0}")]
    Notifier(#[from] NotifierError),
}

/// Alert sink that only logs.
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    async fn send_best_deal(
        &self,
        observation: &PriceObservation,
        window_secs: u64,
    ) -> Result<(), AlertError> {
        info!(
            product = %observation.product_name,
            price = observation.price,
            currency = %observation.currency,
            window_secs,
            "Best deal"
        );
        Ok(())
    }
}

/// Counts per outcome.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub skipped: usize,
    pub recorded: usize,
    pub best_deals: usize,
}

/// Feed every non-empty line of `content` to `notifier` as one post.
pub async fn replay_lines(
    notifier: &Notifier,
    content: &str,
) -> Result<ReplaySummary, NotifierError> {
    let mut summary = ReplaySummary::default();

    for (index, line) in content.lines().enumerate() {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let message = InboundMessage {
            text: text.to_string(),
            source: SourceRef::new(0, "replay", index as i64 + 1),
            posted_at: Utc::now(),
        };

        match notifier.process_message(message).await? {
            MessageOutcome::Skipped => summary.skipped += 1,
            MessageOutcome::Recorded(_) => summary.recorded += 1,
            MessageOutcome::BestDeal { .. } => summary.best_deals += 1,
        }
    }

    Ok(summary)
}

/// Replay a file of posts, one per line.
pub async fn replay_file(notifier: &Notifier, path: &Path) -> Result<ReplaySummary, ReplayError> {
    let content = tokio::fs::read_to_string(path).await?;
    let summary = replay_lines(notifier, &content).await?;

    if summary.recorded + summary.best_deals == 0 {
        warn!(path = %path.display(), "Replay found no prices");
    }
    info!(
        skipped = summary.skipped,
        recorded = summary.recorded,
        best_deals = summary.best_deals,
        "Replay finished"
    );
    Ok(summary)
}
