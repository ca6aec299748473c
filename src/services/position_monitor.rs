//! Position monitoring background service
//!
//! Polls the market data provider for resolution of every open tracked bet
//! and drives the calibration tracker when a market settles. Per-market
//! failures are logged and skipped so one bad market never stalls the loop.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, RwLock};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::adapters::{MarketDataProvider, Notifier};
use crate::config::MonitorConfig;
use crate::tracker::{CalibrationTracker, DEFAULT_BET_SIZE};

/// Monitoring statistics
#[derive(Debug, Clone, Default)]
pub struct MonitorStats {
    pub bets_checked: u64,
    pub bets_resolved: u64,
    pub check_errors: u64,
    pub last_check: Option<DateTime<Utc>>,
}

/// Resolution polling service
pub struct PositionMonitor {
    provider: Arc<dyn MarketDataProvider>,
    tracker: Arc<CalibrationTracker>,
    notifier: Arc<dyn Notifier>,
    config: MonitorConfig,
    running: Arc<AtomicBool>,
    stats: Arc<RwLock<MonitorStats>>,
}

impl PositionMonitor {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        tracker: Arc<CalibrationTracker>,
        notifier: Arc<dyn Notifier>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            provider,
            tracker,
            notifier,
            config,
            running: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(RwLock::new(MonitorStats::default())),
        }
    }

    pub async fn get_stats(&self) -> MonitorStats {
        self.stats.read().await.clone()
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        info!("position monitor stop requested");
    }

    /// Check all open bets for resolution once
    pub async fn check_resolutions(&self) -> usize {
        let open_bets = self.tracker.get_open_bets().await;
        if open_bets.is_empty() {
            return 0;
        }

        debug!(count = open_bets.len(), "checking open positions");

        let mut checked = 0u64;
        let mut errors = 0u64;
        let mut resolved_count = 0usize;
        // Both sides of a market share one resolution; query each market once
        let mut handled: HashSet<String> = HashSet::new();

        for bet in &open_bets {
            if !handled.insert(bet.market_id.clone()) {
                continue;
            }
            checked += 1;

            let outcome = match timeout(
                Duration::from_secs(self.config.resolution_timeout_secs),
                self.provider.check_resolution(&bet.market_id),
            )
            .await
            {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    debug!(market_id = %bet.market_id, error = %e, "resolution check failed");
                    errors += 1;
                    continue;
                }
                Err(_) => {
                    warn!(market_id = %bet.market_id, "resolution check timed out");
                    errors += 1;
                    continue;
                }
            };

            let Some(outcome) = outcome else {
                continue;
            };

            match self
                .tracker
                .resolve_bet(&bet.market_id, outcome, DEFAULT_BET_SIZE)
                .await
            {
                Ok(rows) => {
                    resolved_count += rows.len();
                    for row in rows {
                        let won = row.side == outcome;
                        info!(
                            market_id = %row.market_id,
                            %outcome,
                            result = if won { "WIN" } else { "LOSS" },
                            pnl = %row.profit_loss,
                            "position resolved"
                        );
                        self.notifier
                            .notify_resolution(
                                &row.question,
                                row.side,
                                row.market_price,
                                outcome,
                                row.profit_loss,
                            )
                            .await;
                    }
                }
                Err(e) => {
                    warn!(market_id = %bet.market_id, error = %e, "failed to record resolution");
                    errors += 1;
                }
            }
        }

        {
            let mut stats = self.stats.write().await;
            stats.bets_checked += checked;
            stats.bets_resolved += resolved_count as u64;
            stats.check_errors += errors;
            stats.last_check = Some(Utc::now());
        }

        if resolved_count > 0 {
            info!(resolved = resolved_count, "resolution pass complete");
            self.maybe_send_digest().await;
        }

        resolved_count
    }

    /// Calibration digest on every Nth resolution
    async fn maybe_send_digest(&self) {
        if let Some(report) = self.tracker.get_calibration_report().await {
            if report.total_resolved % self.config.digest_every == 0 {
                self.notifier.notify_calibration(&report).await;
            }
        }
    }

    /// Monitoring loop: poll at the configured interval until shutdown
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("position monitor already running");
            return;
        }

        info!(
            interval_secs = self.config.poll_interval_secs,
            "position monitor started"
        );

        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                _ = interval.tick() => {
                    self.check_resolutions().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("position monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::provider::MockMarketDataProvider;
    use crate::domain::{Confidence, Side};
    use crate::error::PolyedgeError;
    use crate::tracker::BetTicket;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct RecordingNotifier {
        messages: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, text: &str) {
            self.messages.lock().unwrap().push(text.to_string());
        }
    }

    fn temp_tracker() -> Arc<CalibrationTracker> {
        let path = std::env::temp_dir().join(format!("polyedge-mon-{}.json", Uuid::new_v4()));
        Arc::new(CalibrationTracker::new(path))
    }

    fn ticket(market_id: &str, side: Side) -> BetTicket {
        BetTicket {
            market_id: market_id.to_string(),
            question: "Will it settle?".to_string(),
            category: "test".to_string(),
            side,
            market_price: 0.5,
            our_probability: 0.6,
            ev: 0.1,
            kelly: 0.1,
            confidence: Confidence::High,
            rationale: "test".to_string(),
            end_date: None,
            stake_usd: None,
        }
    }

    #[tokio::test]
    async fn test_resolves_and_notifies() {
        let tracker = temp_tracker();
        tracker.log_bet(ticket("m1", Side::Yes)).await.unwrap();

        let mut provider = MockMarketDataProvider::new();
        provider
            .expect_check_resolution()
            .returning(|_| Ok(Some(Side::Yes)));

        let notifier = Arc::new(RecordingNotifier {
            messages: Mutex::new(Vec::new()),
        });
        let monitor = PositionMonitor::new(
            Arc::new(provider),
            tracker.clone(),
            notifier.clone(),
            MonitorConfig::default(),
        );

        let resolved = monitor.check_resolutions().await;
        assert_eq!(resolved, 1);
        assert!(tracker.get_open_bets().await.is_empty());
        assert_eq!(notifier.messages.lock().unwrap().len(), 1);
        assert!(notifier.messages.lock().unwrap()[0].contains("WIN"));
    }

    #[tokio::test]
    async fn test_open_market_stays_open() {
        let tracker = temp_tracker();
        tracker.log_bet(ticket("m1", Side::Yes)).await.unwrap();

        let mut provider = MockMarketDataProvider::new();
        provider.expect_check_resolution().returning(|_| Ok(None));

        let monitor = PositionMonitor::new(
            Arc::new(provider),
            tracker.clone(),
            Arc::new(RecordingNotifier {
                messages: Mutex::new(Vec::new()),
            }),
            MonitorConfig::default(),
        );

        assert_eq!(monitor.check_resolutions().await, 0);
        assert_eq!(tracker.get_open_bets().await.len(), 1);
    }

    #[tokio::test]
    async fn test_per_market_errors_do_not_abort() {
        let tracker = temp_tracker();
        tracker.log_bet(ticket("bad", Side::Yes)).await.unwrap();
        tracker.log_bet(ticket("good", Side::Yes)).await.unwrap();

        let mut provider = MockMarketDataProvider::new();
        provider.expect_check_resolution().returning(|market_id| {
            if market_id == "bad" {
                Err(PolyedgeError::MarketDataUnavailable("boom".into()))
            } else {
                Ok(Some(Side::Yes))
            }
        });

        let monitor = PositionMonitor::new(
            Arc::new(provider),
            tracker.clone(),
            Arc::new(RecordingNotifier {
                messages: Mutex::new(Vec::new()),
            }),
            MonitorConfig::default(),
        );

        // "bad" errors, "good" still resolves
        assert_eq!(monitor.check_resolutions().await, 1);
        let stats = monitor.get_stats().await;
        assert_eq!(stats.check_errors, 1);
        assert_eq!(stats.bets_resolved, 1);
    }

    #[tokio::test]
    async fn test_dual_side_market_queried_once_resolves_both() {
        let tracker = temp_tracker();
        tracker.log_bet(ticket("m1", Side::Yes)).await.unwrap();
        tracker.log_bet(ticket("m1", Side::No)).await.unwrap();

        let mut provider = MockMarketDataProvider::new();
        provider
            .expect_check_resolution()
            .times(1)
            .returning(|_| Ok(Some(Side::No)));

        let notifier = Arc::new(RecordingNotifier {
            messages: Mutex::new(Vec::new()),
        });
        let monitor = PositionMonitor::new(
            Arc::new(provider),
            tracker.clone(),
            notifier.clone(),
            MonitorConfig::default(),
        );

        assert_eq!(monitor.check_resolutions().await, 2);
        assert!(tracker.get_open_bets().await.is_empty());
        // One notification per resolved row
        assert_eq!(notifier.messages.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_digest_sent_on_multiple_of_ten() {
        let tracker = temp_tracker();
        for i in 0..10 {
            tracker
                .log_bet(ticket(&format!("m{}", i), Side::Yes))
                .await
                .unwrap();
        }

        let mut provider = MockMarketDataProvider::new();
        provider
            .expect_check_resolution()
            .returning(|_| Ok(Some(Side::Yes)));

        let notifier = Arc::new(RecordingNotifier {
            messages: Mutex::new(Vec::new()),
        });
        let monitor = PositionMonitor::new(
            Arc::new(provider),
            tracker.clone(),
            notifier.clone(),
            MonitorConfig::default(),
        );

        assert_eq!(monitor.check_resolutions().await, 10);

        let messages = notifier.messages.lock().unwrap();
        // 10 resolution notices plus the calibration digest
        assert_eq!(messages.len(), 11);
        assert!(messages.last().unwrap().contains("CALIBRATION"));
    }
}
