//! SQLite storage for price observations and alert history.

use crate::config::AlertHistory;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use deal_core::{NewObservation, PriceObservation, SourceRef};
use deal_engine::{ObservationStore, StoreError, StoreResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Corrupt row {id}: {reason}")]
    CorruptRow { id: i64, reason: String },
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Sqlx(e) => StoreError::Backend(e.to_string()),
            corrupt @ DbError::CorruptRow { .. } => StoreError::Corrupt(corrupt.to_string()),
        }
    }
}

type ObservationRow = (i64, String, f64, String, i64, i64, String, i64, String);

const SELECT_OBSERVATION: &str = "SELECT id, product_name, price, currency, observed_at, channel_id, channel_name, message_id, raw_text FROM price_observations";

fn observation_from_row(row: ObservationRow) -> Result<PriceObservation, DbError> {
    let (
        id,
        product_name,
        price,
        currency,
        observed_at_ms,
        channel_id,
        channel_name,
        message_id,
        raw_text,
    ) = row;

    let observed_at = DateTime::<Utc>::from_timestamp_millis(observed_at_ms).ok_or_else(|| {
        DbError::CorruptRow {
            id,
            reason: format!("observed_at out of range: {observed_at_ms}"),
        }
    })?;

    Ok(PriceObservation {
        id,
        product_name,
        price,
        currency: currency.into(),
        observed_at,
        source: SourceRef {
            channel_id,
            channel_name,
            message_id,
        },
        raw_text,
    })
}

/// `days` before now. Negative ages count as zero and ages past the
/// representable range keep everything.
fn retention_cutoff(days: i64) -> DateTime<Utc> {
    Duration::try_days(days.max(0))
        .and_then(|age| Utc::now().checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Database connection for observations and alerts.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to SQLite database at the given URL.
    ///
    /// `sqlite::memory:` databases live on a single pinned connection.
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS price_observations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_name TEXT NOT NULL,
                price REAL NOT NULL,
                currency TEXT NOT NULL,
                observed_at INTEGER NOT NULL,
                channel_id INTEGER NOT NULL,
                channel_name TEXT NOT NULL,
                message_id INTEGER NOT NULL,
                raw_text TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_product_window
            ON price_observations(product_name, observed_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS alert_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                observation_id INTEGER NOT NULL,
                product_name TEXT NOT NULL,
                price REAL NOT NULL,
                currency TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert an observation and return it with its row id.
    pub async fn insert_observation(
        &self,
        observation: NewObservation,
    ) -> Result<PriceObservation, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO price_observations
                (product_name, price, currency, observed_at, channel_id, channel_name, message_id, raw_text)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&observation.product_name)
        .bind(observation.price)
        .bind(observation.currency.as_str())
        .bind(observation.observed_at.timestamp_millis())
        .bind(observation.source.channel_id)
        .bind(&observation.source.channel_name)
        .bind(observation.source.message_id)
        .bind(&observation.raw_text)
        .execute(&self.pool)
        .await?;

        Ok(observation.into_stored(result.last_insert_rowid()))
    }

    /// Cheapest observation of a product observed at or after `since`.
    pub async fn cheapest_since(
        &self,
        product_name: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<PriceObservation>, DbError> {
        let row = sqlx::query_as::<_, ObservationRow>(&format!(
            "{SELECT_OBSERVATION} WHERE product_name = ? AND observed_at >= ? ORDER BY price ASC, observed_at ASC, id ASC LIMIT 1"
        ))
        .bind(product_name)
        .bind(since.timestamp_millis())
        .fetch_optional(&self.pool)
        .await?;

        row.map(observation_from_row).transpose()
    }

    /// Get an observation by id.
    pub async fn get_observation(&self, id: i64) -> Result<Option<PriceObservation>, DbError> {
        let row = sqlx::query_as::<_, ObservationRow>(&format!("{SELECT_OBSERVATION} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(observation_from_row).transpose()
    }

    /// Record a delivered alert in history.
    pub async fn record_alert(&self, observation: &PriceObservation) -> Result<i64, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO alert_history (observation_id, product_name, price, currency)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(observation.id)
        .bind(&observation.product_name)
        .bind(observation.price)
        .bind(observation.currency.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Alerts recorded for a product, newest first.
    pub async fn alerts_for_product(&self, product_name: &str) -> Result<Vec<AlertHistory>, DbError> {
        let rows = sqlx::query_as::<_, (i64, i64, String, f64, String, i64)>(
            r#"
            SELECT id, observation_id, product_name, price, currency, CAST(strftime('%s', created_at) AS INTEGER)
            FROM alert_history
            WHERE product_name = ?
            ORDER BY id DESC
            "#,
        )
        .bind(product_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, observation_id, product_name, price, currency, created_secs)| AlertHistory {
                    id,
                    observation_id,
                    product_name,
                    price,
                    currency,
                    created_at: DateTime::<Utc>::from_timestamp(created_secs, 0).unwrap_or_default(),
                },
            )
            .collect())
    }

    /// Delete observations posted more than `days` ago.
    pub async fn cleanup_old_observations(&self, days: i64) -> Result<u64, DbError> {
        let cutoff = retention_cutoff(days);
        let result = sqlx::query("DELETE FROM price_observations WHERE observed_at < ?")
            .bind(cutoff.timestamp_millis())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete alert history older than `days`.
    pub async fn cleanup_old_alerts(&self, days: i64) -> Result<u64, DbError> {
        let cutoff = retention_cutoff(days);
        let result = sqlx::query("DELETE FROM alert_history WHERE created_at < ?")
            .bind(cutoff.format("%Y-%m-%d %H:%M:%S").to_string())
            .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ObservationStore for Database {
    async fn insert(&self, observation: NewObservation) -> StoreResult<PriceObservation> {
        Ok(self.insert_observation(observation).await?)
    }

    async fn min_in_window(
        &self,
        product_name: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Option<PriceObservation>> {
        Ok(self.cheapest_since(product_name, since).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deal_core::Extraction;
    use pretty_assertions::assert_eq;

    fn observation(product: &str, price: f64, at: DateTime<Utc>) -> NewObservation {
        NewObservation::from_extraction(
            Extraction::new(product, price, "ريال"),
            at,
            SourceRef::new(-1001234, "سوق الجوالات", 77),
            format!("{product} بسعر {price} ريال"),
        )
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let now = DateTime::<Utc>::from_timestamp_millis(Utc::now().timestamp_millis()).unwrap();

        let stored = db
            .insert_observation(observation("iPhone 15 Pro Max", 4500.0, now))
            .await
            .unwrap();
        assert!(stored.id > 0);

        let loaded = db.get_observation(stored.id).await.unwrap().unwrap();
        assert_eq!(loaded, stored);
        assert_eq!(loaded.source.channel_name, "سوق الجوالات");
    }

    #[tokio::test]
    async fn test_cheapest_since_orders_and_filters() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let now = Utc::now();

        db.insert_observation(observation("X", 10.0, now - Duration::hours(30)))
            .await
            .unwrap();
        db.insert_observation(observation("X", 100.0, now)).await.unwrap();
        let cheapest = db.insert_observation(observation("X", 90.0, now)).await.unwrap();
        db.insert_observation(observation("Y", 1.0, now)).await.unwrap();

        let best = db
            .cheapest_since("X", now - Duration::hours(24))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(best.id, cheapest.id);

        let none = db.cheapest_since("Z", now - Duration::hours(24)).await.unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_equal_price_tie_break() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let now = Utc::now();

        let later = db
            .insert_observation(observation("X", 50.0, now - Duration::minutes(1)))
            .await
            .unwrap();
        let earlier = db
            .insert_observation(observation("X", 50.0, now - Duration::minutes(9)))
            .await
            .unwrap();
        let same_time = db
            .insert_observation(observation("X", 50.0, now - Duration::minutes(9)))
            .await
            .unwrap();

        let best = db.min_in_window("X", now - Duration::hours(1)).await.unwrap().unwrap();
        assert_eq!(best.id, earlier.id);
        assert!(best.id != later.id && best.id != same_time.id);
    }

    #[tokio::test]
    async fn test_record_alert_history() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let obs = db
            .insert_observation(observation("X", 90.0, Utc::now()))
            .await
            .unwrap();

        db.record_alert(&obs).await.unwrap();

        let history = db.alerts_for_product("X").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].observation_id, obs.id);
        assert_eq!(history[0].currency, "ريال");
        assert!(db.alerts_for_product("Y").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_old_observations() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let now = Utc::now();
        db.insert_observation(observation("X", 1.0, now - Duration::days(40)))
            .await
            .unwrap();
        let fresh = db.insert_observation(observation("X", 2.0, now)).await.unwrap();

        assert_eq!(db.cleanup_old_observations(30).await.unwrap(), 1);
        let best = db.cheapest_since("X", now - Duration::days(365)).await.unwrap().unwrap();
        assert_eq!(best.id, fresh.id);
        assert_eq!(db.cleanup_old_alerts(30).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_with_out_of_range_retention() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let obs = db
            .insert_observation(observation("X", 5.0, Utc::now() - Duration::days(2)))
            .await
            .unwrap();
        db.record_alert(&obs).await.unwrap();

        assert_eq!(db.cleanup_old_alerts(i64::MAX / 2).await.unwrap(), 0);
        assert_eq!(db.cleanup_old_observations(i64::MAX).await.unwrap(), 0);
        assert_eq!(db.cleanup_old_alerts(-1).await.unwrap(), 0);
        assert_eq!(db.alerts_for_product("X").await.unwrap().len(), 1);

        assert_eq!(db.cleanup_old_observations(-5).await.unwrap(), 1);
    }
}
