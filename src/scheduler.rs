// src/scheduler.rs
use anyhow::Result;
use async_trait::async_trait;
use log::{error, info};
use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};

use crate::models::MatchedProject;
use crate::scanners::project_scanner::ProjectScanner;
use crate::AppState;

/// Something that can deliver a match to whoever is listening.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns `Ok(false)` when there was nobody to deliver to.
    async fn send_alert(&self, project: &MatchedProject) -> Result<bool>;
}

/// Scan immediately, then once per configured interval, forever.
pub async fn start_scan_scheduler(state: Arc<AppState>) -> Result<()> {
    let period = state.settings.scan_interval();
    info!("⏰ Scheduling scans every {:?}", period);

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // The first tick completes immediately
        ticker.tick().await;
        info!("🔄 Running scheduled scan...");

        let outcome = run_scan_cycle(&state.scanner, &state.telegram).await;
        if outcome.sent > 0 {
            info!("📤 Sent {} project alerts", outcome.sent);
        } else {
            info!("📭 No new projects found in scheduled scan");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOutcome {
    /// New matches found by the scan
    pub found: usize,
    /// Alerts that actually went out
    pub sent: usize,
}

/// One scan followed by an alert per match.
///
/// Matches are marked seen by the scan, so delivery happens here before the
/// caller gets a chance to fail on anything else.
pub async fn run_scan_cycle(scanner: &ProjectScanner, notifier: &dyn Notifier) -> ScanOutcome {
    let projects = scanner.scan().await;
    let sent = deliver(&projects, notifier).await;
    ScanOutcome {
        found: projects.len(),
        sent,
    }
}

/// Send each project, carrying on past individual failures.
async fn deliver(projects: &[MatchedProject], notifier: &dyn Notifier) -> usize {
    let mut sent = 0;

    for project in projects {
        match notifier.send_alert(project).await {
            Ok(true) => sent += 1,
            Ok(false) => {}
            Err(e) => error!("❌ Failed to send alert for {}: {}", project.id(), e),
        }
    }

    sent
}
