//! Base-rate estimator: systematic bias corrections
//!
//! The default when no specialist category claims a question. Applies three
//! mutually exclusive corrections, tested in order:
//!
//! 1. Longshot bias: retail overpays for longshots by roughly 2-3x, so
//!    cheap YES contracts get deflated hard.
//! 2. Favorite bias: near-certain markets are sometimes underpriced.
//! 3. Near-resolution discount: markets about to resolve in the high 80s
//!    often trade a few cents below where they should.
//!
//! Anything else is assumed fairly priced, with a confidence low enough that
//! the ranker filters it out.

use super::{CategoryEstimator, ProbabilityEstimate};

/// YES below this price is treated as a retail-overpriced longshot
const LONGSHOT_OVERPRICED_BELOW: f64 = 0.08;
/// YES above this price is treated as a potentially underpriced favorite
const FAVORITE_UNDERPRICED_ABOVE: f64 = 0.92;

pub struct BaseRateEstimator;

impl BaseRateEstimator {
    pub fn base_rate(&self, yes_price: f64, days_to_end: Option<f64>) -> ProbabilityEstimate {
        if yes_price < LONGSHOT_OVERPRICED_BELOW {
            let our_prob = (yes_price * 0.45).max(0.01);
            return ProbabilityEstimate::new(
                our_prob,
                0.65,
                "longshot bias correction",
                format!(
                    "YES at {:.1}%, below the {:.0}% longshot threshold. Retail overpays \
                     for longshots by ~2-3x. True prob est. {:.1}%. SELL YES or BUY NO.",
                    yes_price * 100.0,
                    LONGSHOT_OVERPRICED_BELOW * 100.0,
                    our_prob * 100.0
                ),
            );
        }

        if yes_price > FAVORITE_UNDERPRICED_ABOVE {
            let our_prob = (yes_price * 1.03).min(0.98);
            return ProbabilityEstimate::new(
                our_prob,
                0.55,
                "favorite bias correction",
                format!(
                    "YES at {:.1}%, near certainty. May be underpriced. \
                     Est. true prob {:.1}%.",
                    yes_price * 100.0,
                    our_prob * 100.0
                ),
            );
        }

        if let Some(days) = days_to_end {
            if days > 0.0 && days <= 3.0 && yes_price > 0.85 {
                let our_prob = (yes_price + 0.04).min(0.97);
                return ProbabilityEstimate::new(
                    our_prob,
                    0.60,
                    "near-resolution arb",
                    format!(
                        "Market resolves in {:.0} days, YES at {:.1}%. Near-resolution \
                         discount often exists. True prob likely {:.1}%.",
                        days,
                        yes_price * 100.0,
                        our_prob * 100.0
                    ),
                );
            }
        }

        ProbabilityEstimate::new(
            yes_price,
            0.20,
            "no edge detected",
            "No systematic mispricing detected. Market price likely fair.",
        )
    }
}

impl CategoryEstimator for BaseRateEstimator {
    fn name(&self) -> &'static str {
        "base-rate"
    }

    fn matches(&self, _question_lower: &str) -> bool {
        true
    }

    fn estimate(
        &self,
        _question: &str,
        yes_price: f64,
        days_to_end: Option<f64>,
    ) -> Option<ProbabilityEstimate> {
        Some(self.base_rate(yes_price, days_to_end))
    }
}

/// Generic price-target category. Claims the question so political and other
/// lower-priority categories never see it, then defers to the base rate.
pub struct PriceTargetEstimator;

impl CategoryEstimator for PriceTargetEstimator {
    fn name(&self) -> &'static str {
        "price-target"
    }

    fn matches(&self, question_lower: &str) -> bool {
        ["price", "above", "below", "reach", "$"]
            .iter()
            .any(|w| question_lower.contains(w))
    }

    fn estimate(
        &self,
        _question: &str,
        _yes_price: f64,
        _days_to_end: Option<f64>,
    ) -> Option<ProbabilityEstimate> {
        // No specialist model; decline so the engine applies the base rate
        None
    }
}
