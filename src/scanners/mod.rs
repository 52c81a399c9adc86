// src/scanners/mod.rs
use async_trait::async_trait;

use crate::error::FetchError;
use crate::models::{AssetDetail, AssetSummary};

pub mod coingecko;
pub mod project_scanner;

/// Where coin listings and detail records come from.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Most recently listed coins, in upstream order.
    async fn list_recent_assets(&self) -> Result<Vec<AssetSummary>, FetchError>;

    async fn asset_detail(&self, id: &str) -> Result<AssetDetail, FetchError>;
}
