// src/settings.rs
// Everything the bot can be tuned with, read from the environment (or .env).
// Only the two secrets are mandatory; the rest default to the values the
// bot was designed around.

use anyhow::{bail, Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    // Secrets
    pub telegram_bot_token: String,
    pub coingecko_api_key: String,

    // CoinGecko
    pub coingecko_base_url: String,
    pub http_timeout_secs: u64,

    /// How often the scheduler scans (in seconds)
    pub scan_interval_secs: u64,

    /// Minimum gap between two detail requests (in milliseconds)
    pub detail_delay_ms: u64,

    /// Newest entries kept from the coin list
    pub listing_window: usize,

    /// Entries of that window inspected per scan
    pub max_candidates_per_scan: usize,

    // Social filter, both bounds exclusive
    pub max_twitter_followers: u64,
    pub max_telegram_users: u64,

    /// Description length kept in alerts (characters)
    pub description_limit: usize,
}

impl Settings {
    /// Load from the process environment. Fails if a secret is missing.
    pub fn load() -> Result<Self> {
        Self::build(defaults()?.add_source(Environment::default()))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings: Settings = builder
            .build()?
            .try_deserialize()
            .context("Invalid configuration (TELEGRAM_BOT_TOKEN and COINGECKO_API_KEY are required)")?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.telegram_bot_token.trim().is_empty() {
            bail!("TELEGRAM_BOT_TOKEN must not be empty");
        }
        if self.coingecko_api_key.trim().is_empty() {
            bail!("COINGECKO_API_KEY must not be empty");
        }
        if self.detail_delay_ms == 0 {
            bail!("DETAIL_DELAY_MS must be greater than zero");
        }
        if self.scan_interval_secs == 0 {
            bail!("SCAN_INTERVAL_SECS must be greater than zero");
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn detail_delay(&self) -> Duration {
        Duration::from_millis(self.detail_delay_ms)
    }

    /// Human wording of the scan interval for chat messages.
    pub fn scan_interval_label(&self) -> String {
        match self.scan_interval_secs {
            3600 => "Every hour".to_string(),
            s if s % 3600 == 0 => format!("Every {} hours", s / 3600),
            s if s % 60 == 0 => format!("Every {} minutes", s / 60),
            s => format!("Every {} seconds", s),
        }
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>> {
    Ok(Config::builder()
        .set_default("coingecko_base_url", "https://api.coingecko.com/api/v3")?
        .set_default("http_timeout_secs", 30_i64)?
        .set_default("scan_interval_secs", 3600_i64)?
        .set_default("detail_delay_ms", 1500_i64)?
        .set_default("listing_window", 100_i64)?
        .set_default("max_candidates_per_scan", 20_i64)?
        .set_default("max_twitter_followers", 200_i64)?
        .set_default("max_telegram_users", 50_i64)?
        .set_default("description_limit", 500_i64)?)
}

#[cfg(test)]
impl Settings {
    /// Load from an explicit set of `NAME=value` pairs instead of the
    /// process environment.
    pub fn from_vars<'a, I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut builder = defaults()?;
        for (name, value) in vars {
            builder = builder.set_override(name.to_lowercase(), value)?;
        }
        Self::build(builder)
    }

    pub fn for_tests() -> Self {
        Settings {
            telegram_bot_token: "123:test".to_string(),
            coingecko_api_key: "test-key".to_string(),
            coingecko_base_url: "http://127.0.0.1:1".to_string(),
            http_timeout_secs: 5,
            scan_interval_secs: 3600,
            detail_delay_ms: 1500,
            listing_window: 100,
            max_candidates_per_scan: 20,
            max_twitter_followers: 200,
            max_telegram_users: 50,
            description_limit: 500,
        }
    }
}
