//! Telegram bot handlers.

use crate::channels::MonitoredChannels;
use crate::config::AlertConfig;
use crate::db::{Database, DbError};
use crate::notifier::{
    AlertError, AlertSink, InboundMessage, MessageOutcome, Notifier, NotifierError,
};
use async_trait::async_trait;
use deal_core::{PriceObservation, SourceRef};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use teloxide::utils::html;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
    #[error("Database error: {0}")]
    Db(#[from] DbError),
    #[error("Notifier error: {0}")]
    Notifier(#[from] NotifierError),
}

/// Bot commands.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Show help")]
    Help,
    #[command(description = "List monitored channels")]
    Channels,
    #[command(description = "Show the best price in the window. Usage: /best iPhone 15 Pro")]
    Best(String),
}

/// Telegram bot wrapper.
pub struct TelegramBot {
    bot: Bot,
    db: Database,
    alert_config: AlertConfig,
    channels: MonitoredChannels,
}

impl TelegramBot {
    /// Create a new bot with the given token.
    pub fn new(
        token: &str,
        db: Database,
        alert_config: AlertConfig,
        channels: MonitoredChannels,
    ) -> Self {
        let bot = Bot::new(token);
        Self {
            bot,
            db,
            alert_config,
            channels,
        }
    }

    /// Get the underlying bot for sending messages.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Send an HTML message to a chat.
    pub async fn send_alert(&self, chat_id: ChatId, message: &str) -> Result<(), TelegramError> {
        self.bot
            .send_message(chat_id, message)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }

    /// Run the update dispatcher: channel posts feed `notifier`, private
    /// messages get the command handler.
    pub async fn run(self: Arc<Self>, notifier: Arc<Notifier>) {
        let bot = self.bot.clone();

        let posts = {
            let this = Arc::clone(&self);
            let notifier = Arc::clone(&notifier);
            Update::filter_channel_post().endpoint(move |msg: Message| {
                let this = Arc::clone(&this);
                let notifier = Arc::clone(&notifier);
                async move { this.handle_channel_post(&notifier, msg).await }
            })
        };

        let commands = {
            let this = Arc::clone(&self);
            Update::filter_message().filter_command::<Command>().endpoint(
                move |bot: Bot, msg: Message, cmd: Command| {
                    let this = Arc::clone(&this);
                    let notifier = Arc::clone(&notifier);
                    async move { this.handle_command(&notifier, bot, msg, cmd).await }
                },
            )
        };

        let handler = dptree::entry().branch(posts).branch(commands);

        Dispatcher::builder(bot, handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }

    async fn handle_channel_post(
        &self,
        notifier: &Notifier,
        msg: Message,
    ) -> Result<(), TelegramError> {
        let chat_id = msg.chat.id.0;
        if !self.channels.allows(chat_id, msg.chat.username()) {
            debug!(chat_id, "Post from unmonitored channel, ignoring");
            return Ok(());
        }

        let Some(text) = msg.text().or_else(|| msg.caption()) else {
            return Ok(());
        };

        let channel_name = msg
            .chat
            .title()
            .or_else(|| msg.chat.username())
            .map(str::to_string)
            .unwrap_or_else(|| chat_id.to_string());

        let message = InboundMessage {
            text: text.to_string(),
            source: SourceRef::new(chat_id, channel_name, i64::from(msg.id.0)),
            posted_at: msg.date,
        };

        match notifier.process_message(message).await {
            Ok(MessageOutcome::Skipped) => {}
            Ok(outcome) => debug!(chat_id, message_id = msg.id.0, ?outcome, "Post processed"),
            Err(e) => error!(chat_id, message_id = msg.id.0, error = %e, "Failed to process post"),
        }
        Ok(())
    }

    async fn handle_command(
        &self,
        notifier: &Notifier,
        bot: Bot,
        msg: Message,
        cmd: Command,
    ) -> Result<(), TelegramError> {
        match cmd {
            Command::Help => {
                bot.send_message(msg.chat.id, Command::descriptions().to_string())
                    .await?;
            }

            Command::Channels => {
                let text = if self.channels.is_empty() {
                    "Monitoring all channels the bot is a member of.".to_string()
                } else {
                    let list: Vec<String> = self.channels.iter().map(ToString::to_string).collect();
                    format!("Monitored channels:\n{}", list.join("\n"))
                };
                bot.send_message(msg.chat.id, text).await?;
            }

            Command::Best(product) => {
                let product = product.trim();
                if product.is_empty() {
                    bot.send_message(msg.chat.id, "Usage: /best <product>\nExample: /best iPhone 15 Pro")
                        .await?;
                    return Ok(());
                }

                let best = notifier.current_best(product).await?;

                let text = match best {
                    Some(observation) => {
                        let mut text = format_observation(&observation);
                        let alerts = self.db.alerts_for_product(product).await?;
                        if let Some(last) = alerts.first() {
                            text.push_str(&format!(
                                "\n<b>Last alert:</b> {} {} at {}",
                                format_price(last.price),
                                html::escape(&last.currency),
                                last.created_at.format("%Y-%m-%d %H:%M UTC")
                            ));
                        }
                        text
                    }
                    None => format!(
                        "No prices for <b>{}</b> in the last {}.",
                        html::escape(product),
                        format_window(notifier.window_secs())
                    ),
                };
                bot.send_message(msg.chat.id, text)
                    .parse_mode(ParseMode::Html)
                    .await?;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl AlertSink for TelegramBot {
    async fn send_best_deal(
        &self,
        observation: &PriceObservation,
        window_secs: u64,
    ) -> Result<(), AlertError> {
        if !self.alert_config.is_configured() {
            return Err(AlertError::NotConfigured);
        }
        let message = format_best_deal_message(observation, window_secs);
        self.send_alert(ChatId(self.alert_config.admin_chat_id), &message)
            .await?;
        info!(
            chat_id = self.alert_config.admin_chat_id,
            product = %observation.product_name,
            "Alert delivered"
        );
        Ok(())
    }
}

/// Whole prices without decimals, otherwise two places.
fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("{price:.0}")
    } else {
        format!("{price:.2}")
    }
}

fn format_window(window_secs: u64) -> String {
    match window_secs {
        s if s >= 3_600 && s % 3_600 == 0 => format!("{} hours", s / 3_600),
        s if s >= 3_600 => format!("{:.1} hours", s as f64 / 3_600.0),
        s => format!("{} minutes", s.div_ceil(60)),
    }
}

fn format_observation(observation: &PriceObservation) -> String {
    format!(
        "<b>Product:</b> {}\n\
         <b>Price:</b> {} {}\n\
         <b>Channel:</b> {}\n\
         <b>Posted:</b> {}",
        html::escape(&observation.product_name),
        format_price(observation.price),
        html::escape(&observation.currency),
        html::escape(&observation.source.channel_name),
        observation.observed_at.format("%Y-%m-%d %H:%M UTC"),
    )
}

/// Format a best-deal alert message.
pub fn format_best_deal_message(observation: &PriceObservation, window_secs: u64) -> String {
    format!(
        "🚨 <b>Best deal found!</b>\n\n{}\n\nLowest price in the last {}.",
        format_observation(observation),
        format_window(window_secs)
    )
}
