//! Risk gates and position sizing
//!
//! A pure function of the opportunity's numbers, the cycle's RiskState
//! snapshot, and configuration. Hard gates run first, in a fixed order, and
//! the first failure rejects with that reason; only a fully gated-through
//! opportunity gets a size. Rejection is a normal outcome, not an error.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing::debug;

use crate::domain::{Confidence, RiskState, SizingDecision};

/// Risk limits for position sizing
#[derive(Debug, Clone, Deserialize)]
pub struct SizerConfig {
    /// Max fraction of bankroll on a single market
    #[serde(default = "default_max_single_bet_pct")]
    pub max_single_bet_pct: Decimal,
    /// Max fraction of bankroll deployed at once
    #[serde(default = "default_max_total_exposure")]
    pub max_total_exposure: Decimal,
    /// Fraction of full Kelly to actually use
    #[serde(default = "default_kelly_fraction")]
    pub kelly_fraction: f64,
    /// Minimum EV before any bet
    #[serde(default = "default_min_ev")]
    pub min_ev: f64,
    /// Minimum Kelly fraction before any bet
    #[serde(default = "default_min_kelly")]
    pub min_kelly: f64,
    /// Minimum market liquidity in USD
    #[serde(default = "default_min_liquidity")]
    pub min_liquidity: f64,
}

fn default_max_single_bet_pct() -> Decimal {
    dec!(0.05)
}

fn default_max_total_exposure() -> Decimal {
    dec!(0.40)
}

fn default_kelly_fraction() -> f64 {
    0.25
}

fn default_min_ev() -> f64 {
    0.04
}

fn default_min_kelly() -> f64 {
    0.02
}

fn default_min_liquidity() -> f64 {
    10_000.0
}

impl Default for SizerConfig {
    fn default() -> Self {
        Self {
            max_single_bet_pct: default_max_single_bet_pct(),
            max_total_exposure: default_max_total_exposure(),
            kelly_fraction: default_kelly_fraction(),
            min_ev: default_min_ev(),
            min_kelly: default_min_kelly(),
            min_liquidity: default_min_liquidity(),
        }
    }
}

/// Position sizer applying the hard gates and exposure caps
#[derive(Debug, Clone, Default)]
pub struct PositionSizer {
    config: SizerConfig,
}

impl PositionSizer {
    pub fn new(config: SizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SizerConfig {
        &self.config
    }

    /// Size a bet, or reject it with the first failing gate's reason.
    /// Reads RiskState without mutating it.
    pub fn size_bet(
        &self,
        ev: f64,
        kelly: f64,
        confidence: Confidence,
        market_liquidity: f64,
        state: &RiskState,
    ) -> SizingDecision {
        let cfg = &self.config;

        if ev < cfg.min_ev {
            return SizingDecision::rejected(format!(
                "EV {:.1}% below minimum {:.0}%",
                ev * 100.0,
                cfg.min_ev * 100.0
            ));
        }

        if kelly < cfg.min_kelly {
            return SizingDecision::rejected(format!(
                "Kelly {:.1}% below minimum {:.0}%",
                kelly * 100.0,
                cfg.min_kelly * 100.0
            ));
        }

        if market_liquidity < cfg.min_liquidity {
            return SizingDecision::rejected(format!(
                "Liquidity ${:.0} below ${:.0}",
                market_liquidity, cfg.min_liquidity
            ));
        }

        if confidence == Confidence::Low {
            return SizingDecision::rejected("Low confidence, skip");
        }

        let remaining_capacity = state.remaining_capacity(cfg.max_total_exposure);
        if remaining_capacity <= Decimal::ZERO {
            return SizingDecision::rejected(format!(
                "Max exposure reached ({:.0}% of bankroll)",
                cfg.max_total_exposure * dec!(100)
            ));
        }

        let kelly_dec = Decimal::try_from(kelly).unwrap_or(Decimal::ZERO);
        let kelly_fraction = Decimal::try_from(cfg.kelly_fraction).unwrap_or(Decimal::ZERO);
        let conf_mult = confidence.size_multiplier();

        let full_kelly = kelly_dec * state.bankroll_usd;
        let fractional = full_kelly * kelly_fraction;
        let sized = fractional * conf_mult;

        let liquidity_cap =
            Decimal::try_from(market_liquidity * 0.02).unwrap_or(Decimal::ZERO);
        let max_bet = (state.bankroll_usd * cfg.max_single_bet_pct)
            .min(remaining_capacity)
            .min(liquidity_cap);

        let final_size = sized.min(max_bet).round_dp(2).max(Decimal::ONE);

        debug!(
            %full_kelly,
            %sized,
            %max_bet,
            %final_size,
            "position sized"
        );

        SizingDecision {
            bet_size_usd: final_size,
            effective_kelly_fraction: cfg.kelly_fraction
                * match confidence {
                    Confidence::High => 1.0,
                    Confidence::Medium => 0.6,
                    Confidence::Low => 0.3,
                },
            approved: true,
            rejection_reason: None,
            rationale: format!(
                "Full Kelly: ${:.2} x {:.0}% Kelly x {:.0}% conf = ${:.2}, capped at ${:.2} -> ${:.2}",
                full_kelly,
                cfg.kelly_fraction * 100.0,
                conf_mult * dec!(100),
                sized,
                max_bet,
                final_size
            ),
        }
    }
}
