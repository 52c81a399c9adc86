// src/models.rs
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::utils::truncate_chars;

/// One entry of the provider's coin list. The symbol, name and platforms
/// that come with it are ignored; only the id drives the scan.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetSummary {
    pub id: String,
}

/// Detail record for a single coin, with every optional upstream field
/// already defaulted.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetDetail {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub twitter_followers: u64,
    pub telegram_users: u64,
    pub homepage: Option<String>,
    pub twitter_handle: Option<String>,
    pub telegram_channel: Option<String>,
    pub discord_url: Option<String>,
    pub categories: Vec<String>,
    pub contract_address: Option<String>,
    pub market_cap_usd: Option<f64>,
}

#[cfg(test)]
impl AssetDetail {
    /// Bare record with zeroed metrics, mostly useful as a base for struct
    /// update syntax.
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: "Unknown".to_string(),
            symbol: String::new(),
            description: String::new(),
            twitter_followers: 0,
            telegram_users: 0,
            homepage: None,
            twitter_handle: None,
            telegram_channel: None,
            discord_url: None,
            categories: Vec::new(),
            contract_address: None,
            market_cap_usd: None,
        }
    }
}

/// A coin that passed the social filter during a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedProject {
    /// Detail record in compact form: the description is cut down.
    pub detail: AssetDetail,
    pub matched_at: DateTime<Utc>,
}

impl MatchedProject {
    pub fn from_detail(mut detail: AssetDetail, description_limit: usize) -> Self {
        detail.description = truncate_chars(&detail.description, description_limit);
        Self {
            detail,
            matched_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.detail.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_description_is_cut_to_limit() {
        let detail = AssetDetail {
            description: "x".repeat(600),
            ..AssetDetail::empty("foo")
        };

        let project = MatchedProject::from_detail(detail, 500);

        assert_eq!(project.detail.description.chars().count(), 500);
        assert_eq!(project.id(), "foo");
    }

    #[test]
    fn short_description_is_kept() {
        let detail = AssetDetail {
            description: "A small DeFi protocol".to_string(),
            ..AssetDetail::empty("bar")
        };

        let project = MatchedProject::from_detail(detail, 500);

        assert_eq!(project.detail.description, "A small DeFi protocol");
    }
}
