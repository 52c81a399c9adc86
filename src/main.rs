// src/main.rs
use anyhow::Result;
use log::{error, info};
use std::sync::Arc;

mod analyzers;
mod dedup;
mod error;
mod models;
mod pacing;
mod scanners;
mod scheduler;
mod settings;
mod telegram;
mod utils;

use analyzers::social_filter::SocialFilter;
use dedup::SeenProjects;
use pacing::QuotaPacer;
use scanners::coingecko::CoinGeckoClient;
use scanners::project_scanner::{ProjectScanner, ScanLimits};
use scanners::MetadataSource;
use settings::Settings;
use telegram::TelegramBot;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine, the variables may come from the environment
    dotenv::dotenv().ok();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("🚀 Starting Project Scanner Bot");

    // Load configuration
    let settings = Settings::load()?;
    info!("✅ Configuration loaded");

    let metadata: Arc<dyn MetadataSource> = Arc::new(CoinGeckoClient::new(&settings)?);
    let pacer = Arc::new(QuotaPacer::new(settings.detail_delay())?);
    info!("⏱️ Detail requests paced every {:?}", pacer.period());

    let scanner = ProjectScanner::new(
        metadata.clone(),
        pacer,
        Arc::new(SeenProjects::new()),
        SocialFilter::new(settings.max_twitter_followers, settings.max_telegram_users),
        ScanLimits::from_settings(&settings),
    );

    // Initialize Telegram bot
    let telegram = TelegramBot::new(&settings.telegram_bot_token).await?;
    info!("✅ Telegram bot initialized");

    // Create shared state
    let app_state = Arc::new(AppState {
        settings,
        scanner,
        metadata,
        telegram,
    });

    let scheduler = tokio::spawn(scheduler::start_scan_scheduler(app_state.clone()));

    info!("🔥 All services started! Bot is now running...");

    // Runs until Ctrl-C
    if let Err(e) = app_state.telegram.start(app_state.clone()).await {
        error!("Telegram bot error: {}", e);
    }

    scheduler.abort();
    info!("🛑 Bot stopped");

    Ok(())
}

/// Shared application state
pub struct AppState {
    pub settings: Settings,
    pub scanner: ProjectScanner,
    /// Used directly when a user expands an alert
    pub metadata: Arc<dyn MetadataSource>,
    pub telegram: TelegramBot,
}
