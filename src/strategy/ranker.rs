//! Opportunity ranking
//!
//! Runs the probability engine and the EV/Kelly calculator across the market
//! universe, filters out anything untradeable or low-conviction, and ranks
//! what survives by Kelly fraction. Evaluation is strictly sequential and
//! per-market failures only skip that market.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::{Confidence, Market, Opportunity, Side};
use crate::estimator::ProbabilityEngine;

use super::kelly::{ev_and_kelly, DEFAULT_MAX_KELLY_FRACTION};

/// Filters applied before and after estimation
#[derive(Debug, Clone, Deserialize)]
pub struct RankerConfig {
    /// Minimum market liquidity in USD
    #[serde(default = "default_min_liquidity")]
    pub min_liquidity: f64,
    /// Minimum 24h volume in USD
    #[serde(default = "default_min_volume_24h")]
    pub min_volume_24h: f64,
    /// Maximum spread (YES + NO - 1)
    #[serde(default = "default_max_spread")]
    pub max_spread: f64,
    /// Minimum estimator confidence to keep a market
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// Minimum EV on the better side
    #[serde(default = "default_min_ev")]
    pub min_ev: f64,
    /// Minimum Kelly on the better side
    #[serde(default = "default_min_kelly")]
    pub min_kelly: f64,
    /// Cap on every Kelly fraction
    #[serde(default = "default_max_kelly_fraction")]
    pub max_kelly_fraction: f64,
}

fn default_min_liquidity() -> f64 {
    5_000.0
}

fn default_min_volume_24h() -> f64 {
    10_000.0
}

fn default_max_spread() -> f64 {
    0.05
}

fn default_min_confidence() -> f64 {
    0.40
}

fn default_min_ev() -> f64 {
    0.03
}

fn default_min_kelly() -> f64 {
    0.01
}

fn default_max_kelly_fraction() -> f64 {
    DEFAULT_MAX_KELLY_FRACTION
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            min_liquidity: default_min_liquidity(),
            min_volume_24h: default_min_volume_24h(),
            max_spread: default_max_spread(),
            min_confidence: default_min_confidence(),
            min_ev: default_min_ev(),
            min_kelly: default_min_kelly(),
            max_kelly_fraction: default_max_kelly_fraction(),
        }
    }
}

/// Market scanner: filter, estimate, calculate, rank
pub struct OpportunityRanker {
    config: RankerConfig,
    engine: ProbabilityEngine,
}

impl OpportunityRanker {
    pub fn new(config: RankerConfig) -> Self {
        Self {
            config,
            engine: ProbabilityEngine::new(),
        }
    }

    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    /// Scan a market universe and return opportunities ranked by conviction
    /// (descending Kelly). Ties keep their input order.
    pub fn rank(&self, markets: &[Market], now: DateTime<Utc>) -> Vec<Opportunity> {
        let mut opportunities = Vec::new();

        for market in markets {
            if let Some(opp) = self.evaluate(market, now) {
                opportunities.push(opp);
            }
        }

        // Stable sort preserves input order for equal conviction
        opportunities.sort_by(|a, b| {
            b.best_kelly()
                .partial_cmp(&a.best_kelly())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        info!(
            scanned = markets.len(),
            flagged = opportunities.len(),
            "scan complete"
        );

        opportunities
    }

    /// Evaluate one market against the filter chain
    fn evaluate(&self, market: &Market, now: DateTime<Utc>) -> Option<Opportunity> {
        let cfg = &self.config;

        if market.validate().is_err() {
            debug!(id = %market.id, "skipping malformed market");
            return None;
        }
        if market.resolved {
            return None;
        }
        if market.liquidity < cfg.min_liquidity {
            return None;
        }
        if market.volume_24h < cfg.min_volume_24h {
            return None;
        }
        if market.spread() > cfg.max_spread {
            return None;
        }

        let estimate = self
            .engine
            .estimate(&market.question, market.yes_price, market.end_date, now);

        if estimate.confidence < cfg.min_confidence {
            return None;
        }

        let terms = ev_and_kelly(
            estimate.probability,
            market.yes_price,
            market.no_price,
            cfg.max_kelly_fraction,
        );

        let best_ev = terms.ev_yes.max(terms.ev_no);
        let best_kelly = if terms.ev_yes > terms.ev_no {
            terms.kelly_yes
        } else {
            terms.kelly_no
        };

        if best_ev < cfg.min_ev {
            return None;
        }
        if best_kelly < cfg.min_kelly {
            return None;
        }

        let recommended_side = if terms.ev_yes > terms.ev_no {
            Side::Yes
        } else {
            Side::No
        };

        debug!(
            id = %market.id,
            side = %recommended_side,
            best_ev,
            best_kelly,
            "opportunity flagged"
        );

        Some(Opportunity {
            market: market.clone(),
            our_probability: estimate.probability,
            edge: estimate.probability - market.yes_price,
            ev_yes: terms.ev_yes,
            ev_no: terms.ev_no,
            kelly_yes: terms.kelly_yes,
            kelly_no: terms.kelly_no,
            recommended_side,
            confidence: Confidence::from_score(estimate.confidence),
            rationale: estimate.rationale,
        })
    }
}
