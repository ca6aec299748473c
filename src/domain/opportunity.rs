use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::market::{Market, Side};

/// Confidence label attached to a flagged opportunity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Label a raw estimator confidence score
    pub fn from_score(score: f64) -> Self {
        if score >= 0.65 {
            Confidence::High
        } else if score >= 0.50 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    /// Sizing multiplier applied on top of fractional Kelly
    pub fn size_multiplier(&self) -> Decimal {
        match self {
            Confidence::High => Decimal::ONE,
            Confidence::Medium => Decimal::new(6, 1),
            Confidence::Low => Decimal::new(3, 1),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "HIGH",
            Confidence::Medium => "MEDIUM",
            Confidence::Low => "LOW",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A detected mispricing, ready for sizing. Derived per scan, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub market: Market,
    /// Our estimated true probability of YES
    pub our_probability: f64,
    /// our_probability - yes_price
    pub edge: f64,
    pub ev_yes: f64,
    pub ev_no: f64,
    pub kelly_yes: f64,
    pub kelly_no: f64,
    pub recommended_side: Side,
    pub confidence: Confidence,
    pub rationale: String,
}

impl Opportunity {
    /// EV of the recommended side
    pub fn best_ev(&self) -> f64 {
        self.ev_yes.max(self.ev_no)
    }

    /// Kelly fraction used for conviction ranking
    pub fn best_kelly(&self) -> f64 {
        self.kelly_yes.max(self.kelly_no)
    }

    /// EV and Kelly of a specific side, plus its entry price
    pub fn side_terms(&self, side: Side) -> (f64, f64, f64) {
        match side {
            Side::Yes => (self.ev_yes, self.kelly_yes, self.market.yes_price),
            Side::No => (self.ev_no, self.kelly_no, self.market.no_price),
        }
    }
}

/// Bankroll snapshot taken once at the start of each scan cycle.
/// Read-only during sizing; the sizer never mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskState {
    pub bankroll_usd: Decimal,
    pub open_exposure_usd: Decimal,
}

impl RiskState {
    pub fn new(bankroll_usd: Decimal, open_exposure_usd: Decimal) -> Self {
        Self {
            bankroll_usd,
            open_exposure_usd,
        }
    }

    /// USD still deployable under the total-exposure cap
    pub fn remaining_capacity(&self, max_total_exposure: Decimal) -> Decimal {
        self.bankroll_usd * max_total_exposure - self.open_exposure_usd
    }
}

/// Position sizing verdict. A rejection is a normal outcome, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingDecision {
    pub bet_size_usd: Decimal,
    pub effective_kelly_fraction: f64,
    pub approved: bool,
    pub rejection_reason: Option<String>,
    pub rationale: String,
}

impl SizingDecision {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            bet_size_usd: Decimal::ZERO,
            effective_kelly_fraction: 0.0,
            approved: false,
            rejection_reason: Some(reason.into()),
            rationale: String::new(),
        }
    }
}
