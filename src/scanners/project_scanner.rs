// Looks at the newest CoinGecko listings and keeps the ones that are still
// flying under the radar:
//
// 1. pull the most recent coins
// 2. skip anything we already alerted on
// 3. fetch details one coin at a time, paced
// 4. keep coins whose social reach is below both thresholds
//    and remember them so they are never alerted twice

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::analyzers::social_filter::SocialFilter;
use crate::dedup::SeenProjects;
use crate::models::MatchedProject;
use crate::pacing::Pacer;
use crate::scanners::MetadataSource;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    /// Candidates inspected per scan, taken from the front of the listing
    pub max_candidates: usize,
    /// Characters of description kept in a match
    pub description_limit: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_candidates: 20,
            description_limit: 500,
        }
    }
}

impl ScanLimits {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_candidates: settings.max_candidates_per_scan,
            description_limit: settings.description_limit,
        }
    }
}

pub struct ProjectScanner {
    source: Arc<dyn MetadataSource>,
    pacer: Arc<dyn Pacer>,
    seen: Arc<SeenProjects>,
    filter: SocialFilter,
    limits: ScanLimits,
    // Held for the whole scan so two triggers never interleave
    scan_lock: Mutex<()>,
    last_scan: RwLock<Option<DateTime<Utc>>>,
}

impl ProjectScanner {
    pub fn new(
        source: Arc<dyn MetadataSource>,
        pacer: Arc<dyn Pacer>,
        seen: Arc<SeenProjects>,
        filter: SocialFilter,
        limits: ScanLimits,
    ) -> Self {
        Self {
            source,
            pacer,
            seen,
            filter,
            limits,
            scan_lock: Mutex::new(()),
            last_scan: RwLock::new(None),
        }
    }

    /// Run one scan and return the new matches in listing order.
    ///
    /// Every match is already recorded as seen when this returns. A coin whose
    /// details could not be fetched is skipped but stays eligible for the next
    /// scan.
    pub async fn scan(&self) -> Vec<MatchedProject> {
        let _guard = self.scan_lock.lock().await;
        let mut matches = Vec::new();

        let coins = match self.source.list_recent_assets().await {
            Ok(coins) => coins,
            Err(e) => {
                debug!("Coin list unavailable, skipping this scan: {}", e);
                self.finish_scan().await;
                return matches;
            }
        };
        info!("🔍 Scanning {} coins...", coins.len());

        for coin in coins.iter().take(self.limits.max_candidates) {
            if self.seen.contains(&coin.id).await {
                continue;
            }

            self.pacer.ready().await;

            let detail = match self.source.asset_detail(&coin.id).await {
                Ok(detail) => detail,
                Err(e) => {
                    if e.is_status() {
                        debug!("Skipping {}: {}", coin.id, e);
                    } else {
                        warn!("Skipping {}: {}", coin.id, e);
                    }
                    continue;
                }
            };

            if !self.filter.matches(&detail) {
                debug!(
                    "{} has too much reach ({} X followers, {} Telegram members)",
                    detail.id, detail.twitter_followers, detail.telegram_users
                );
                continue;
            }

            info!(
                "🎯 Found matching project: {} ({} X followers, {} Telegram members)",
                detail.name, detail.twitter_followers, detail.telegram_users
            );
            self.seen.insert(&detail.id).await;
            matches.push(MatchedProject::from_detail(detail, self.limits.description_limit));
        }

        self.finish_scan().await;
        matches
    }

    async fn finish_scan(&self) {
        *self.last_scan.write().await = Some(Utc::now());
    }

    pub fn seen(&self) -> &SeenProjects {
        &self.seen
    }

    pub async fn last_scan(&self) -> Option<DateTime<Utc>> {
        *self.last_scan.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::models::{AssetDetail, AssetSummary};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// In-memory provider that records which details were requested.
    #[derive(Default)]
    struct FakeSource {
        listing: Option<Vec<AssetSummary>>,
        details: HashMap<String, AssetDetail>,
        requested: StdMutex<Vec<String>>,
    }

    impl FakeSource {
        fn listing(ids: &[&str]) -> Self {
            Self {
                listing: Some(ids.iter().map(|id| summary(id)).collect()),
                ..Self::default()
            }
        }

        fn with_detail(mut self, id: &str, twitter_followers: u64, telegram_users: u64) -> Self {
            let detail = AssetDetail {
                name: format!("{} token", id),
                twitter_followers,
                telegram_users,
                ..AssetDetail::empty(id)
            };
            self.details.insert(id.to_string(), detail);
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MetadataSource for FakeSource {
        async fn list_recent_assets(&self) -> Result<Vec<AssetSummary>, FetchError> {
            self.listing
                .clone()
                .ok_or(FetchError::Status(StatusCode::SERVICE_UNAVAILABLE))
        }

        async fn asset_detail(&self, id: &str) -> Result<AssetDetail, FetchError> {
            self.requested.lock().unwrap().push(id.to_string());
            self.details
                .get(id)
                .cloned()
                .ok_or(FetchError::Status(StatusCode::NOT_FOUND))
        }
    }

    #[derive(Default)]
    struct CountingPacer {
        waits: AtomicUsize,
    }

    #[async_trait]
    impl Pacer for CountingPacer {
        async fn ready(&self) {
            self.waits.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn summary(id: &str) -> AssetSummary {
        AssetSummary { id: id.to_string() }
    }

    fn scanner(source: Arc<FakeSource>, pacer: Arc<CountingPacer>) -> ProjectScanner {
        ProjectScanner::new(
            source,
            pacer,
            Arc::new(SeenProjects::new()),
            SocialFilter::default(),
            ScanLimits::default(),
        )
    }

    #[tokio::test]
    async fn empty_listing_fetches_nothing() {
        let source = Arc::new(FakeSource::listing(&[]));
        let pacer = Arc::new(CountingPacer::default());
        let scanner = scanner(source.clone(), pacer.clone());

        assert!(scanner.scan().await.is_empty());
        assert!(source.requested().is_empty());
        assert_eq!(pacer.waits.load(Ordering::SeqCst), 0);
        assert!(scanner.last_scan().await.is_some());
    }

    #[tokio::test]
    async fn failed_listing_yields_no_matches() {
        let source = Arc::new(FakeSource::default());
        let scanner = scanner(source.clone(), Arc::new(CountingPacer::default()));

        assert!(scanner.scan().await.is_empty());
        assert!(source.requested().is_empty());
    }

    #[tokio::test]
    async fn thresholds_are_strict_and_both_required() {
        let source = Arc::new(
            FakeSource::listing(&["edge-telegram", "edge-twitter", "quiet"])
                .with_detail("edge-telegram", 199, 50)
                .with_detail("edge-twitter", 200, 0)
                .with_detail("quiet", 199, 49),
        );
        let scanner = scanner(source, Arc::new(CountingPacer::default()));

        let matches = scanner.scan().await;

        let ids: Vec<&str> = matches.iter().map(|m| m.id()).collect();
        assert_eq!(ids, vec!["quiet"]);
        assert!(scanner.seen().contains("quiet").await);
        assert!(!scanner.seen().contains("edge-telegram").await);
        assert!(!scanner.seen().contains("edge-twitter").await);
    }

    #[tokio::test]
    async fn missing_detail_is_skipped_and_retried_next_scan() {
        let source = Arc::new(FakeSource::listing(&["flaky", "solid"]).with_detail("solid", 1, 1));
        let pacer = Arc::new(CountingPacer::default());
        let scanner = scanner(source.clone(), pacer.clone());

        let matches = scanner.scan().await;

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id(), "solid");
        assert!(!scanner.seen().contains("flaky").await);
        // failed requests are paced too
        assert_eq!(pacer.waits.load(Ordering::SeqCst), 2);

        scanner.scan().await;
        assert_eq!(source.requested(), vec!["flaky", "solid", "flaky"]);
    }

    #[tokio::test]
    async fn only_first_candidates_are_considered_and_seen_ones_are_not_refetched() {
        let ids: Vec<String> = (0..25)
            .map(|i| if i == 3 { "foo".to_string() } else { format!("popular-{}", i) })
            .collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();

        let mut source = FakeSource::listing(&id_refs).with_detail("foo", 10, 5);
        for id in ids.iter().filter(|id| id.as_str() != "foo") {
            source = source.with_detail(id, 10_000, 900);
        }
        let source = Arc::new(source);
        let pacer = Arc::new(CountingPacer::default());
        let scanner = scanner(source.clone(), pacer.clone());

        let first = scanner.scan().await;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id(), "foo");
        assert!(scanner.seen().contains("foo").await);
        assert_eq!(source.requested().len(), 20);
        assert!(!source.requested().contains(&"popular-20".to_string()));

        let second = scanner.scan().await;
        assert!(second.is_empty());
        let foo_fetches = source.requested().iter().filter(|id| *id == "foo").count();
        assert_eq!(foo_fetches, 1);
        assert_eq!(source.requested().len(), 39);
        assert_eq!(pacer.waits.load(Ordering::SeqCst), 39);
    }

    #[tokio::test]
    async fn seen_count_tracks_distinct_matches_across_scans() {
        let source = Arc::new(
            FakeSource::listing(&["alpha", "beta", "gamma"])
                .with_detail("alpha", 5, 5)
                .with_detail("beta", 150, 10)
                .with_detail("gamma", 1_000, 1_000),
        );
        let scanner = scanner(source, Arc::new(CountingPacer::default()));

        assert_eq!(scanner.scan().await.len(), 2);
        assert!(scanner.scan().await.is_empty());
        assert!(scanner.scan().await.is_empty());

        assert_eq!(scanner.seen().len().await, 2);
    }

    #[tokio::test]
    async fn match_carries_compact_description() {
        let mut source = FakeSource::listing(&["wordy"]);
        source.details.insert(
            "wordy".to_string(),
            AssetDetail {
                description: "d".repeat(600),
                ..AssetDetail::empty("wordy")
            },
        );
        let scanner = scanner(Arc::new(source), Arc::new(CountingPacer::default()));

        let matches = scanner.scan().await;

        assert_eq!(matches.len(), 1);
        assert!(matches[0].detail.description.chars().count() <= 500);
    }

    #[tokio::test]
    async fn concurrent_scans_never_alert_twice() {
        let source = Arc::new(FakeSource::listing(&["foo"]).with_detail("foo", 0, 0));
        let scanner = Arc::new(scanner(source.clone(), Arc::new(CountingPacer::default())));

        let (a, b) = tokio::join!(scanner.scan(), scanner.scan());

        assert_eq!(a.len() + b.len(), 1);
        assert_eq!(source.requested(), vec!["foo"]);
    }
}
