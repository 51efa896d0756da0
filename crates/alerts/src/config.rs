//! Alert delivery configuration types.

use serde::{Deserialize, Serialize};

/// Where best-deal alerts are delivered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Telegram chat that receives alerts. 0 means not configured.
    pub admin_chat_id: i64,
}

impl AlertConfig {
    pub fn new(admin_chat_id: i64) -> Self {
        Self { admin_chat_id }
    }

    /// Whether a destination chat is set.
    pub fn is_configured(&self) -> bool {
        self.admin_chat_id != 0
    }
}

/// Alert history entry, one per delivered alert.
#[derive(Debug, Clone)]
pub struct AlertHistory {
    pub id: i64,
    pub observation_id: i64,
    pub product_name: String,
    pub price: f64,
    pub currency: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
