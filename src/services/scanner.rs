//! Scan service
//!
//! One cycle: snapshot the risk state, refresh the spot price, fetch the
//! market universe, rank opportunities, overlay the term-structure model on
//! BTC threshold markets, then size and place the top few. Evaluation is
//! strictly sequential; the RiskState snapshot is taken once at cycle start
//! and only read during sizing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::adapters::{MarketDataProvider, Notifier, TradeExecutor, FALLBACK_SPOT};
use crate::config::ScanConfig;
use crate::domain::RiskState;
use crate::error::Result;
use crate::pricing::VolModel;
use crate::strategy::{OpportunityRanker, PositionSizer};
use crate::tracker::{BetTicket, CalibrationTracker};

/// Timeout around each collaborator call so one bad endpoint cannot stall
/// the cycle
const COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(30);
const SPOT_TIMEOUT: Duration = Duration::from_secs(5);

/// What one scan cycle did
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleSummary {
    pub scanned: usize,
    pub flagged: usize,
    pub placed: usize,
}

pub struct ScanService {
    provider: Arc<dyn MarketDataProvider>,
    executor: Arc<dyn TradeExecutor>,
    notifier: Arc<dyn Notifier>,
    tracker: Arc<CalibrationTracker>,
    ranker: OpportunityRanker,
    sizer: PositionSizer,
    config: ScanConfig,
    live: bool,
}

impl ScanService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        executor: Arc<dyn TradeExecutor>,
        notifier: Arc<dyn Notifier>,
        tracker: Arc<CalibrationTracker>,
        ranker: OpportunityRanker,
        sizer: PositionSizer,
        config: ScanConfig,
        live: bool,
    ) -> Self {
        Self {
            provider,
            executor,
            notifier,
            tracker,
            ranker,
            sizer,
            config,
            live,
        }
    }

    /// Snapshot bankroll and exposure for this cycle
    async fn risk_state(&self) -> RiskState {
        let bankroll = if self.live {
            match timeout(COLLABORATOR_TIMEOUT, self.executor.balance()).await {
                Ok(Ok(balance)) => balance,
                Ok(Err(e)) => {
                    warn!(error = %e, "balance refresh failed, using configured bankroll");
                    self.config.starting_bankroll
                }
                Err(_) => {
                    warn!("balance refresh timed out, using configured bankroll");
                    self.config.starting_bankroll
                }
            }
        } else {
            self.config.starting_bankroll
        };

        RiskState::new(bankroll, self.tracker.open_exposure().await)
    }

    /// Run a single scan cycle
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        let now = Utc::now();
        let risk_state = self.risk_state().await;

        // Spot feed fails soft to the calibration-era reference
        let spot = match timeout(SPOT_TIMEOUT, self.provider.spot_price()).await {
            Ok(Ok(price)) => price,
            Ok(Err(e)) => {
                warn!(error = %e, "spot fetch failed, using fallback");
                FALLBACK_SPOT
            }
            Err(_) => {
                warn!("spot fetch timed out, using fallback");
                FALLBACK_SPOT
            }
        };
        let vol_model = VolModel::new(spot, self.config.regime);

        let markets = timeout(
            COLLABORATOR_TIMEOUT,
            self.provider.fetch_markets(self.config.market_limit),
        )
        .await
        .map_err(|_| crate::error::PolyedgeError::Timeout("market fetch".into()))??;

        let mut opportunities = self.ranker.rank(&markets, now);
        let summary_base = (markets.len(), opportunities.len());

        if opportunities.is_empty() {
            info!("no opportunities this scan, market looks efficient");
            return Ok(CycleSummary {
                scanned: summary_base.0,
                flagged: 0,
                placed: 0,
            });
        }

        // Overlay the full term-structure model on BTC threshold markets;
        // it replaces the first-pass crypto screen when it sees a real edge
        let min_ev = self.sizer.config().min_ev;
        for opp in opportunities.iter_mut() {
            let question_lower = opp.market.question.to_lowercase();
            let is_btc = question_lower.contains("bitcoin") || question_lower.contains("btc");
            if !is_btc {
                continue;
            }
            let Some(end_date) = opp.market.end_date else {
                continue;
            };
            if let Some(analysis) =
                vol_model.analyze_market(&opp.market.question, opp.market.yes_price, end_date, now)
            {
                if analysis.edge.abs() > min_ev {
                    opp.our_probability = analysis.our_probability;
                    opp.edge = analysis.edge;
                    opp.rationale = analysis.reasoning;
                }
            }
        }

        let top: Vec<_> = opportunities
            .iter()
            .take(self.config.max_bets_per_scan)
            .cloned()
            .collect();
        self.notifier
            .notify_opportunities(&opportunities, self.config.max_bets_per_scan)
            .await;

        let mut placed = 0usize;
        for opp in &top {
            let side = opp.recommended_side;
            let (ev, kelly, price) = opp.side_terms(side);

            let sizing = self.sizer.size_bet(
                ev,
                kelly,
                opp.confidence,
                opp.market.liquidity,
                &risk_state,
            );

            if !sizing.approved {
                info!(
                    market_id = %opp.market.id,
                    reason = sizing.rejection_reason.as_deref().unwrap_or("unknown"),
                    "bet rejected"
                );
                continue;
            }

            let stake = if self.live {
                match timeout(
                    COLLABORATOR_TIMEOUT,
                    self.executor.execute(&opp.market, side, sizing.bet_size_usd),
                )
                .await
                {
                    Ok(Ok(result)) if result.success => Some(result.cost_usd),
                    Ok(Ok(result)) => {
                        error!(
                            market_id = %opp.market.id,
                            error = result.error.as_deref().unwrap_or("unknown"),
                            "execution failed"
                        );
                        continue;
                    }
                    Ok(Err(e)) => {
                        error!(market_id = %opp.market.id, error = %e, "execution failed");
                        continue;
                    }
                    Err(_) => {
                        error!(market_id = %opp.market.id, "execution timed out");
                        continue;
                    }
                }
            } else {
                None
            };

            self.tracker
                .log_bet(BetTicket::from_opportunity(opp, side, stake))
                .await?;
            self.notifier
                .notify_bet_placed(opp, side, sizing.bet_size_usd, self.live)
                .await;

            info!(
                mode = if self.live { "LIVE" } else { "PAPER" },
                %side,
                price,
                size = %sizing.bet_size_usd,
                ev,
                question = %opp.market.question.chars().take(50).collect::<String>(),
                "bet placed"
            );
            placed += 1;
        }

        if placed == 0 {
            info!("no bets placed this cycle, all rejected by the sizer");
        }

        Ok(CycleSummary {
            scanned: summary_base.0,
            flagged: summary_base.1,
            placed,
        })
    }

    /// Scan loop: run a cycle, sleep, repeat until shutdown
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.scan_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            interval_secs = self.config.scan_interval_secs,
            live = self.live,
            "scan loop started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.run_cycle().await {
                        Ok(summary) => info!(
                            scanned = summary.scanned,
                            flagged = summary.flagged,
                            placed = summary.placed,
                            "scan cycle complete"
                        ),
                        // Transient failures skip the cycle, not the loop
                        Err(e) => error!(error = %e, "scan cycle failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scan loop stopping");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::provider::MockMarketDataProvider;
    use crate::adapters::PaperExecutor;
    use crate::config::ScanConfig;
    use crate::domain::Market;
    use crate::strategy::{RankerConfig, SizerConfig};
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    struct SilentNotifier;

    #[async_trait]
    impl Notifier for SilentNotifier {
        async fn send(&self, _text: &str) {}
    }

    fn temp_tracker() -> Arc<CalibrationTracker> {
        let path = std::env::temp_dir().join(format!("polyedge-scan-{}.json", Uuid::new_v4()));
        Arc::new(CalibrationTracker::new(path))
    }

    fn longshot_market(id: &str) -> Market {
        Market {
            id: id.to_string(),
            question: "Will the underdog prevail?".to_string(),
            category: "sports".to_string(),
            yes_price: 0.05,
            no_price: 0.94,
            volume_24h: 50_000.0,
            total_volume: 500_000.0,
            liquidity: 60_000.0,
            end_date: Some(Utc::now() + ChronoDuration::days(14)),
            resolved: false,
            outcome: None,
        }
    }

    fn service(provider: MockMarketDataProvider) -> ScanService {
        ScanService::new(
            Arc::new(provider),
            Arc::new(PaperExecutor::new(dec!(1000))),
            Arc::new(SilentNotifier),
            temp_tracker(),
            OpportunityRanker::new(RankerConfig::default()),
            PositionSizer::new(SizerConfig::default()),
            ScanConfig {
                starting_bankroll: dec!(1000),
                ..ScanConfig::default()
            },
            false,
        )
    }

    #[tokio::test]
    async fn test_cycle_places_paper_bet() {
        let mut provider = MockMarketDataProvider::new();
        provider
            .expect_spot_price()
            .returning(|| Ok(65_900.0));
        provider
            .expect_fetch_markets()
            .returning(|_| Ok(vec![longshot_market("m1")]));

        let svc = service(provider);
        let summary = svc.run_cycle().await.unwrap();
        assert_eq!(summary.flagged, 1);
        assert_eq!(summary.placed, 1);
        assert_eq!(svc.tracker.get_open_bets().await.len(), 1);
    }

    #[tokio::test]
    async fn test_cycle_idempotent_across_scans() {
        let mut provider = MockMarketDataProvider::new();
        provider.expect_spot_price().returning(|| Ok(65_900.0));
        provider
            .expect_fetch_markets()
            .returning(|_| Ok(vec![longshot_market("m1")]));

        let svc = service(provider);
        svc.run_cycle().await.unwrap();
        svc.run_cycle().await.unwrap();
        // Same (market, side) flagged twice, stored once
        assert_eq!(svc.tracker.get_open_bets().await.len(), 1);
    }

    #[tokio::test]
    async fn test_zero_opportunities_is_normal() {
        let mut provider = MockMarketDataProvider::new();
        provider.expect_spot_price().returning(|| Ok(65_900.0));
        provider.expect_fetch_markets().returning(|_| Ok(vec![]));

        let svc = service(provider);
        let summary = svc.run_cycle().await.unwrap();
        assert_eq!(summary.flagged, 0);
        assert_eq!(summary.placed, 0);
    }

    #[tokio::test]
    async fn test_spot_failure_falls_back() {
        let mut provider = MockMarketDataProvider::new();
        provider.expect_spot_price().returning(|| {
            Err(crate::error::PolyedgeError::MarketDataUnavailable(
                "feed down".into(),
            ))
        });
        provider
            .expect_fetch_markets()
            .returning(|_| Ok(vec![longshot_market("m1")]));

        let svc = service(provider);
        // Cycle still completes on the fallback spot
        let summary = svc.run_cycle().await.unwrap();
        assert_eq!(summary.placed, 1);
    }

    #[tokio::test]
    async fn test_btc_overlay_replaces_rationale() {
        let mut provider = MockMarketDataProvider::new();
        provider.expect_spot_price().returning(|| Ok(65_900.0));
        provider.expect_fetch_markets().returning(|_| {
            // Cheap YES on a near-target BTC market: crypto screen flags it,
            // and the term-structure overlay rewrites the rationale
            let mut m = longshot_market("btc-70k");
            m.question = "Will BTC be above $70k in 30 days?".to_string();
            m.yes_price = 0.05;
            m.no_price = 0.94;
            m.end_date = Some(Utc::now() + ChronoDuration::days(30));
            Ok(vec![m])
        });

        let svc = service(provider);
        let summary = svc.run_cycle().await.unwrap();
        assert_eq!(summary.flagged, 1);

        let open = svc.tracker.get_open_bets().await;
        assert_eq!(open.len(), 1);
        assert!(
            open[0].rationale.contains("Z-score"),
            "overlay should install the vol model rationale: {}",
            open[0].rationale
        );
    }
}
