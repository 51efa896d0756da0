//! Deal Watcher - Headless Server
//!
//! Watches Telegram marketplace channels and alerts on the best price seen
//! for each product within a rolling window.

mod config;
mod replay;

use clap::Parser;
use config::AppConfig;
use deal_alerts::{
    AlertConfig, AlertSink, Database, MonitoredChannels, Notifier, NotifierConfig, TelegramBot,
};
use deal_engine::EvaluatorConfig;
use deal_extract::{Extractor, ExtractorConfig};
use replay::LogSink;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Database used by `--replay` when no `--database-url` is given.
const REPLAY_DATABASE_URL: &str = "sqlite::memory:";

/// Deal Watcher CLI
#[derive(Parser, Debug)]
#[command(name = "deal-watcher")]
#[command(about = "Best-price alerts for Telegram marketplace channels", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long)]
    log_level: Option<String>,

    /// SQLite database URL
    #[arg(long)]
    database_url: Option<String>,

    /// Comparison window in seconds
    #[arg(short, long)]
    window_secs: Option<u64>,

    /// Currency assumed when a post names none
    #[arg(long)]
    default_currency: Option<String>,

    /// Monitored channel list file
    #[arg(long)]
    channels: Option<String>,

    /// Telegram chat receiving alerts
    #[arg(long, allow_hyphen_values = true)]
    admin_chat_id: Option<i64>,

    /// Process each line of a file as a post and exit, sending nothing
    #[arg(long)]
    replay: Option<PathBuf>,
}

impl Args {
    /// Apply command-line overrides on top of the file config.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(url) = &self.database_url {
            config.database_url = url.clone();
        } else if self.replay.is_some() {
            // Replayed posts stay out of the live history unless asked for.
            config.database_url = REPLAY_DATABASE_URL.to_string();
        }
        if let Some(window) = self.window_secs {
            config.comparison.window_secs = window;
        }
        if let Some(currency) = &self.default_currency {
            config.extraction.default_currency = currency.clone();
        }
        if let Some(channels) = &self.channels {
            config.channels_file = channels.clone();
        }
        if let Some(chat_id) = self.admin_chat_id {
            config.alerts.admin_chat_id = chat_id;
        }
    }
}

fn init_logging(level: &str) {
    let level = match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// The log level decides whether config loading is visible, so peek at
/// it before the subscriber exists.
fn initial_log_level(args: &Args, path: &Path) -> String {
    if let Some(level) = &args.log_level {
        return level.clone();
    }
    AppConfig::load(path)
        .map(|c| c.log_level)
        .unwrap_or_else(|_| "info".to_string())
}

async fn run_cleanup_loop(notifier: Arc<Notifier>, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    loop {
        interval.tick().await;
        if let Err(e) = notifier.cleanup().await {
            error!(error = %e, "Cleanup failed");
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    init_logging(&initial_log_level(&args, &args.config));

    let mut config = AppConfig::load_or_default(&args.config);
    args.apply(&mut config);

    info!("🚀 Deal Watcher starting...");
    info!("  Database: {}", config.database_url);
    info!("  Window: {} seconds", config.comparison.window_secs);
    info!("  Default currency: {}", config.extraction.default_currency);

    let extractor = match Extractor::new(ExtractorConfig::from(&config.extraction)) {
        Ok(extractor) => extractor,
        Err(e) => {
            error!("Invalid extraction settings: {}", e);
            return;
        }
    };

    let db = match Database::connect(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return;
        }
    };

    let evaluator_config = EvaluatorConfig::from(&config.comparison);
    let notifier_config = NotifierConfig::from(&config.alerts);

    if let Some(path) = &args.replay {
        info!("📼 Replaying {}", path.display());
        let notifier = Notifier::new(
            db,
            extractor,
            evaluator_config,
            Arc::new(LogSink),
            notifier_config,
        );
        if let Err(e) = replay::replay_file(&notifier, path).await {
            error!("Replay failed: {}", e);
        }
        return;
    }

    let token = match std::env::var("TELEGRAM_BOT_TOKEN") {
        Ok(token) if !token.trim().is_empty() => token,
        _ => {
            error!("TELEGRAM_BOT_TOKEN is not set");
            return;
        }
    };

    let channels = MonitoredChannels::load(Path::new(&config.channels_file));
    if channels.is_empty() {
        info!("  Channels: all");
    } else {
        info!("  Channels: {}", channels.len());
    }

    let alert_config = AlertConfig::from(&config.alerts);
    if !alert_config.is_configured() {
        warn!("Admin chat id is not set, alerts will only be logged");
    }

    let bot = Arc::new(TelegramBot::new(
        &token,
        db.clone(),
        alert_config,
        channels,
    ));
    let sink: Arc<dyn AlertSink> = bot.clone();
    let notifier = Arc::new(Notifier::new(
        db,
        extractor,
        evaluator_config,
        sink,
        notifier_config,
    ));

    let cleanup_notifier = notifier.clone();
    let cleanup_interval = config.alerts.cleanup_interval_secs;
    let cleanup_handle = tokio::spawn(async move {
        run_cleanup_loop(cleanup_notifier, cleanup_interval).await;
    });

    info!("📡 Listening for channel posts, press Ctrl+C to stop...");

    // Returns once the dispatcher handles Ctrl+C.
    bot.run(notifier).await;

    warn!("Shutdown signal received");
    cleanup_handle.abort();

    info!("👋 Deal Watcher stopped");
}
