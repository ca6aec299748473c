//! Calibration tracking for flagged opportunities
//!
//! Durable store of every bet we flagged (paper or live) and its eventual
//! outcome. After enough resolutions this is what tells us whether the
//! estimated probabilities were real or noise: win rate, P&L on a fixed
//! hypothetical stake, and per-bucket calibration error.
//!
//! Storage is a JSON file guarded by a single RwLock; every mutation goes
//! through the write guard and saves before returning, so the two loops
//! (scanner and monitor) can share the tracker without lost updates.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{Confidence, Opportunity, Side};
use crate::error::Result;

/// Hypothetical stake used for calibration P&L when none was recorded
pub const DEFAULT_BET_SIZE: Decimal = dec!(100);

/// One tracked bet. Created unresolved, resolved exactly once, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedBet {
    pub id: String,
    pub market_id: String,
    pub question: String,
    #[serde(default)]
    pub category: String,
    pub side: Side,
    /// Entry price of the tracked side when flagged
    pub market_price: f64,
    pub our_probability: f64,
    pub ev: f64,
    pub kelly: f64,
    pub confidence: Confidence,
    pub rationale: String,
    pub flagged_at: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    /// Actual stake for live fills; None for paper rows
    #[serde(default)]
    pub stake_usd: Option<Decimal>,
    pub resolved: bool,
    pub outcome: Option<Side>,
    #[serde(default)]
    pub profit_loss: Decimal,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// What the scanner hands the tracker when flagging a bet
#[derive(Debug, Clone)]
pub struct BetTicket {
    pub market_id: String,
    pub question: String,
    pub category: String,
    pub side: Side,
    pub market_price: f64,
    pub our_probability: f64,
    pub ev: f64,
    pub kelly: f64,
    pub confidence: Confidence,
    pub rationale: String,
    pub end_date: Option<DateTime<Utc>>,
    pub stake_usd: Option<Decimal>,
}

impl BetTicket {
    /// Build a ticket for one side of a flagged opportunity
    pub fn from_opportunity(opp: &Opportunity, side: Side, stake_usd: Option<Decimal>) -> Self {
        let (ev, kelly, price) = opp.side_terms(side);
        Self {
            market_id: opp.market.id.clone(),
            question: opp.market.question.clone(),
            category: opp.market.category.clone(),
            side,
            market_price: price,
            our_probability: opp.our_probability,
            ev,
            kelly,
            confidence: opp.confidence,
            rationale: opp.rationale.clone(),
            end_date: opp.market.end_date,
            stake_usd,
        }
    }
}

/// Calibration for one probability bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketCalibration {
    /// Estimated probability rounded to the nearest 0.1
    pub bucket: f64,
    pub n: u32,
    pub actual_frequency: f64,
    /// |actual_frequency - bucket|
    pub calibration_error: f64,
}

/// Aggregate calibration over all resolved bets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub total_resolved: u32,
    pub win_rate: f64,
    /// Sum of per-bet P&L at the $100 hypothetical stake
    pub total_pnl: Decimal,
    /// total_pnl / (total_resolved * $100), in percent
    pub roi_pct: f64,
    pub avg_kelly: f64,
    pub high_confidence_win_rate: f64,
    /// Buckets in ascending probability order
    pub buckets: Vec<BucketCalibration>,
    /// 50+ resolutions and positive P&L
    pub ready_for_live: bool,
}

/// Round a probability to its nearest 0.1 bucket.
/// Half-away-from-zero: 0.75 lands in 0.8, 0.73 in 0.7.
fn probability_bucket(p: f64) -> f64 {
    (p * 10.0).round() / 10.0
}

/// Durable calibration store
pub struct CalibrationTracker {
    store_path: PathBuf,
    bets: RwLock<Vec<TrackedBet>>,
}

impl CalibrationTracker {
    pub fn new(store_path: PathBuf) -> Self {
        Self {
            store_path,
            bets: RwLock::new(Vec::new()),
        }
    }

    /// Default store location (./data/paper_bets.json)
    pub fn default_path() -> Self {
        Self::new(PathBuf::from("data/paper_bets.json"))
    }

    /// Load existing bets from disk. Missing file starts fresh.
    pub async fn load(&self) -> Result<()> {
        if !self.store_path.exists() {
            debug!("no existing bet store, starting fresh");
            return Ok(());
        }

        let content = tokio::fs::read_to_string(&self.store_path).await?;
        let bets: Vec<TrackedBet> = serde_json::from_str(&content)?;
        info!("loaded {} tracked bets", bets.len());

        let mut cache = self.bets.write().await;
        *cache = bets;
        Ok(())
    }

    /// Persist the full store. Called under the write guard by every mutator.
    async fn save_locked(&self, bets: &[TrackedBet]) -> Result<()> {
        if let Some(parent) = self.store_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(bets)?;
        tokio::fs::write(&self.store_path, content).await?;
        Ok(())
    }

    /// Log a flagged bet. Idempotent per (market_id, side) while unresolved:
    /// a duplicate returns the existing row's id without inserting.
    pub async fn log_bet(&self, ticket: BetTicket) -> Result<String> {
        let mut bets = self.bets.write().await;

        if let Some(existing) = bets
            .iter()
            .find(|b| b.market_id == ticket.market_id && b.side == ticket.side && !b.resolved)
        {
            debug!(
                market_id = %ticket.market_id,
                side = %ticket.side,
                "already tracking, returning existing row"
            );
            return Ok(existing.id.clone());
        }

        let bet = TrackedBet {
            id: Uuid::new_v4().to_string(),
            market_id: ticket.market_id,
            question: ticket.question,
            category: ticket.category,
            side: ticket.side,
            market_price: ticket.market_price,
            our_probability: ticket.our_probability,
            ev: ticket.ev,
            kelly: ticket.kelly,
            confidence: ticket.confidence,
            rationale: ticket.rationale,
            flagged_at: Utc::now(),
            end_date: ticket.end_date,
            stake_usd: ticket.stake_usd,
            resolved: false,
            outcome: None,
            profit_loss: Decimal::ZERO,
            resolved_at: None,
        };

        info!(
            side = %bet.side,
            price = bet.market_price,
            question = %bet.question.chars().take(50).collect::<String>(),
            "logged paper bet"
        );

        let id = bet.id.clone();
        bets.push(bet);
        self.save_locked(&bets).await?;
        Ok(id)
    }

    /// Resolve every unresolved row for a market, both sides. A row that is
    /// already resolved is never touched again. Returns the rows resolved by
    /// this call.
    pub async fn resolve_bet(
        &self,
        market_id: &str,
        outcome: Side,
        bet_size: Decimal,
    ) -> Result<Vec<TrackedBet>> {
        let mut bets = self.bets.write().await;
        let now = Utc::now();
        let mut resolved = Vec::new();

        for bet in bets
            .iter_mut()
            .filter(|b| b.market_id == market_id && !b.resolved)
        {
            let won = bet.side == outcome;
            let pnl = if won {
                // Net profit on the stake at entry price
                let payout_multiple =
                    Decimal::try_from(1.0 / bet.market_price - 1.0).unwrap_or(Decimal::ZERO);
                payout_multiple * bet_size
            } else {
                -bet_size
            };

            bet.resolved = true;
            bet.outcome = Some(outcome);
            bet.profit_loss = pnl;
            bet.resolved_at = Some(now);
            resolved.push(bet.clone());
        }

        if resolved.is_empty() {
            debug!(market_id, "no unresolved rows for market");
        } else {
            info!(
                market_id,
                outcome = %outcome,
                count = resolved.len(),
                "resolved tracked bets"
            );
            self.save_locked(&bets).await?;
        }

        Ok(resolved)
    }

    /// All unresolved bets, most recently flagged first
    pub async fn get_open_bets(&self) -> Vec<TrackedBet> {
        let bets = self.bets.read().await;
        let mut open: Vec<TrackedBet> = bets.iter().filter(|b| !b.resolved).cloned().collect();
        open.sort_by(|a, b| b.flagged_at.cmp(&a.flagged_at));
        open
    }

    /// USD currently deployed across open bets with a recorded stake
    pub async fn open_exposure(&self) -> Decimal {
        let bets = self.bets.read().await;
        bets.iter()
            .filter(|b| !b.resolved)
            .filter_map(|b| b.stake_usd)
            .sum()
    }

    /// Number of resolved rows
    pub async fn total_resolved(&self) -> u32 {
        let bets = self.bets.read().await;
        bets.iter().filter(|b| b.resolved).count() as u32
    }

    /// Measure calibration over all resolved bets.
    /// None until at least one bet has resolved.
    pub async fn get_calibration_report(&self) -> Option<CalibrationReport> {
        let bets = self.bets.read().await;
        let resolved: Vec<&TrackedBet> = bets.iter().filter(|b| b.resolved).collect();
        if resolved.is_empty() {
            return None;
        }

        let total = resolved.len() as u32;
        let wins = resolved
            .iter()
            .filter(|b| b.outcome == Some(b.side))
            .count() as u32;
        let total_pnl: Decimal = resolved.iter().map(|b| b.profit_loss).sum();
        let avg_kelly = resolved.iter().map(|b| b.kelly).sum::<f64>() / total as f64;

        // Bucket by estimated probability, nearest 0.1
        let mut bucket_counts: std::collections::BTreeMap<i64, (u32, u32)> =
            std::collections::BTreeMap::new();
        for bet in &resolved {
            let bucket_key = (probability_bucket(bet.our_probability) * 10.0).round() as i64;
            let entry = bucket_counts.entry(bucket_key).or_insert((0, 0));
            entry.0 += 1;
            if bet.outcome == Some(bet.side) {
                entry.1 += 1;
            }
        }
        let buckets = bucket_counts
            .into_iter()
            .map(|(key, (n, bucket_wins))| {
                let bucket = key as f64 / 10.0;
                let actual_frequency = bucket_wins as f64 / n as f64;
                BucketCalibration {
                    bucket,
                    n,
                    actual_frequency,
                    calibration_error: (actual_frequency - bucket).abs(),
                }
            })
            .collect();

        let high_conf: Vec<&&TrackedBet> = resolved
            .iter()
            .filter(|b| b.confidence == Confidence::High)
            .collect();
        let high_confidence_win_rate = if high_conf.is_empty() {
            0.0
        } else {
            high_conf.iter().filter(|b| b.outcome == Some(b.side)).count() as f64
                / high_conf.len() as f64
        };

        let pnl_f64 = total_pnl.to_f64().unwrap_or(0.0);
        Some(CalibrationReport {
            total_resolved: total,
            win_rate: wins as f64 / total as f64,
            total_pnl,
            roi_pct: pnl_f64 / (total as f64 * 100.0) * 100.0,
            avg_kelly,
            high_confidence_win_rate,
            buckets,
            ready_for_live: total >= 50 && total_pnl > Decimal::ZERO,
        })
    }

    /// Human-readable tracker status
    pub async fn format_status(&self) -> String {
        let open = self.get_open_bets().await;
        let report = self.get_calibration_report().await;

        let mut out = String::new();
        out.push_str("\n================ PAPER TRACKER STATUS ================\n");
        out.push_str(&format!("  Open positions:  {}\n", open.len()));

        match report {
            Some(r) => {
                out.push_str(&format!("  Resolved bets:   {}\n", r.total_resolved));
                out.push_str(&format!("  Win rate:        {:.1}%\n", r.win_rate * 100.0));
                out.push_str(&format!(
                    "  Total P&L:       ${:.2} (hypothetical $100/bet)\n",
                    r.total_pnl
                ));
                out.push_str(&format!("  ROI:             {:+.1}%\n", r.roi_pct));
                out.push_str(&format!(
                    "  High conf WR:    {:.1}%\n",
                    r.high_confidence_win_rate * 100.0
                ));
                out.push_str(&format!(
                    "  Ready for live:  {}\n",
                    if r.ready_for_live { "YES" } else { "not yet" }
                ));
            }
            None => {
                out.push_str("  No resolved bets yet. Need 50+ for meaningful stats.\n");
            }
        }

        for bet in open.iter().take(10) {
            out.push_str(&format!(
                "  [{}] {} @ {:.1}% | {}\n",
                bet.confidence,
                bet.side,
                bet.market_price * 100.0,
                bet.question.chars().take(55).collect::<String>()
            ));
        }
        out.push_str("======================================================\n");
        out
    }
}
