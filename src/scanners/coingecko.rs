// Talks to CoinGecko:
//
// /coins/list       -> every coin the provider knows, newest listings last
// /coins/{id}       -> community, market and link data for one coin
//
// Failures are logged here and handed back as a FetchError so the scanner
// can decide to skip.

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;

use crate::error::FetchError;
use crate::models::{AssetDetail, AssetSummary};
use crate::scanners::MetadataSource;
use crate::settings::Settings;
use crate::utils::non_empty;

const DEMO_KEY_HEADER: &str = "x-cg-demo-api-key";
const PRO_KEY_HEADER: &str = "x-cg-pro-api-key";

const DETAIL_QUERY: [(&str, &str); 5] = [
    ("localization", "false"),
    ("tickers", "false"),
    ("market_data", "true"),
    ("community_data", "true"),
    ("developer_data", "false"),
];

pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    api_key: String,
    listing_window: usize,
}

impl CoinGeckoClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_secs))
            .user_agent(concat!("coinscout/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.coingecko_base_url.trim_end_matches('/').to_string(),
            api_key: settings.coingecko_api_key.clone(),
            listing_window: settings.listing_window,
        })
    }

    /// Pro keys are only accepted on the pro host and demo keys everywhere else.
    fn api_key_header(&self) -> &'static str {
        api_key_header_for(&self.base_url)
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response, FetchError> {
        self.client
            .get(url)
            .header("accept", "application/json")
            .header(self.api_key_header(), &self.api_key)
            .query(query)
            .send()
            .await
            .map_err(FetchError::Transport)
    }
}

fn api_key_header_for(base_url: &str) -> &'static str {
    if base_url.contains("pro-api.coingecko.com") {
        PRO_KEY_HEADER
    } else {
        DEMO_KEY_HEADER
    }
}

#[async_trait]
impl MetadataSource for CoinGeckoClient {
    async fn list_recent_assets(&self) -> Result<Vec<AssetSummary>, FetchError> {
        let url = format!("{}/coins/list", self.base_url);

        let response = match self.get(&url, &[("include_platform", "true")]).await {
            Ok(response) => response,
            Err(e) => {
                error!("❌ Error fetching coin list: {}", e);
                return Err(e);
            }
        };

        if !response.status().is_success() {
            error!("❌ CoinGecko API error: {}", response.status());
            return Err(FetchError::Status(response.status()));
        }

        let mut coins: Vec<AssetSummary> = response.json().await.map_err(|e| {
            error!("❌ Could not decode coin list: {}", e);
            FetchError::Decode(e)
        })?;

        // The list is ordered oldest listing first
        if coins.len() > self.listing_window {
            coins.drain(..coins.len() - self.listing_window);
        }

        debug!("🌐 CoinGecko returned {} recent coins", coins.len());
        Ok(coins)
    }

    async fn asset_detail(&self, id: &str) -> Result<AssetDetail, FetchError> {
        let url = format!("{}/coins/{}", self.base_url, id);

        let response = match self.get(&url, &DETAIL_QUERY).await {
            Ok(response) => response,
            Err(e) => {
                error!("❌ Error fetching coin details for {}: {}", id, e);
                return Err(e);
            }
        };

        if !response.status().is_success() {
            warn!("⚠️ Failed to get details for {}: {}", id, response.status());
            return Err(FetchError::Status(response.status()));
        }

        let raw: CoinDetailResponse = response.json().await.map_err(|e| {
            error!("❌ Could not decode details for {}: {}", id, e);
            FetchError::Decode(e)
        })?;

        Ok(raw.into_detail(id))
    }
}

// CoinGecko API Response Types
//
// Nearly everything in the detail payload can be null or missing for young
// coins, hence the Options all the way down.

#[derive(Debug, Deserialize)]
struct CoinDetailResponse {
    name: Option<String>,
    symbol: Option<String>,
    description: Option<Description>,
    community_data: Option<CommunityData>,
    links: Option<Links>,
    categories: Option<Vec<Option<String>>>,
    contract_address: Option<String>,
    market_data: Option<MarketData>,
}

#[derive(Debug, Deserialize)]
struct Description {
    en: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommunityData {
    twitter_followers: Option<u64>,
    telegram_channel_user_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Links {
    homepage: Option<Vec<Option<String>>>,
    twitter_screen_name: Option<String>,
    telegram_channel_identifier: Option<String>,
    chat_url: Option<Vec<Option<String>>>,
}

#[derive(Debug, Deserialize)]
struct MarketData {
    market_cap: Option<CurrencyValues>,
}

#[derive(Debug, Deserialize)]
struct CurrencyValues {
    usd: Option<f64>,
}

impl CoinDetailResponse {
    fn into_detail(self, id: &str) -> AssetDetail {
        let community = self.community_data;
        let links = self.links;

        let (homepage, twitter_handle, telegram_channel, discord_url) = match links {
            Some(links) => (
                non_empty(links.homepage.and_then(|urls| {
                    urls.into_iter().flatten().find(|url| !url.trim().is_empty())
                })),
                non_empty(links.twitter_screen_name),
                non_empty(links.telegram_channel_identifier),
                non_empty(links.chat_url.and_then(|urls| {
                    urls.into_iter()
                        .flatten()
                        .find(|url| url.to_lowercase().contains("discord"))
                })),
            ),
            None => (None, None, None, None),
        };

        AssetDetail {
            id: id.to_string(),
            name: non_empty(self.name).unwrap_or_else(|| "Unknown".to_string()),
            symbol: self.symbol.unwrap_or_default().to_uppercase(),
            description: self
                .description
                .and_then(|d| d.en)
                .unwrap_or_default()
                .trim()
                .to_string(),
            twitter_followers: community
                .as_ref()
                .and_then(|c| c.twitter_followers)
                .unwrap_or(0),
            telegram_users: community
                .as_ref()
                .and_then(|c| c.telegram_channel_user_count)
                .unwrap_or(0),
            homepage,
            twitter_handle,
            telegram_channel,
            discord_url,
            categories: self
                .categories
                .unwrap_or_default()
                .into_iter()
                .flatten()
                .filter(|c| !c.trim().is_empty())
                .collect(),
            contract_address: non_empty(self.contract_address),
            market_cap_usd: self
                .market_data
                .and_then(|m| m.market_cap)
                .and_then(|mc| mc.usd)
                .filter(|usd| *usd > 0.0),
        }
    }
}
