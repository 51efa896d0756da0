//! Persistence and Telegram delivery for best-deal alerts.
//!
//! This crate provides:
//! - SQLite storage for price observations and alert history
//! - Telegram bot integration for channel posts and notifications
//! - The message pipeline tying extraction and evaluation together

pub mod channels;
pub mod config;
pub mod db;
pub mod notifier;
pub mod telegram;

pub use channels::{ChannelRef, MonitoredChannels};
pub use config::{AlertConfig, AlertHistory};
pub use db::{Database, DbError};
pub use notifier::{
    AlertError, AlertSink, InboundMessage, MessageOutcome, Notifier, NotifierConfig,
    NotifierError,
};
pub use telegram::{format_best_deal_message, TelegramBot, TelegramError};
