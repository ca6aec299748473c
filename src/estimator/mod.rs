//! Probability estimation for prediction markets
//!
//! Routes each question to the first matching category estimator, tested in
//! fixed priority: crypto, macro, political, generic price target, then the
//! base-rate default. The ordering is explicit (a plain `Vec` walked front to
//! back) so it stays unit-testable.

pub mod base_rate;
pub mod crypto;
pub mod macroecon;
pub mod political;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use base_rate::{BaseRateEstimator, PriceTargetEstimator};
pub use crypto::CryptoEstimator;
pub use macroecon::MacroEstimator;
pub use political::PoliticalEstimator;

/// A probability estimate with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbabilityEstimate {
    /// Estimated true probability of YES, in [0.01, 0.99]
    pub probability: f64,
    /// How confident the estimator is in its own number, [0, 1]
    pub confidence: f64,
    /// Which method produced the estimate
    pub method: String,
    /// Human-readable explanation
    pub rationale: String,
}

impl ProbabilityEstimate {
    pub fn new(
        probability: f64,
        confidence: f64,
        method: &str,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            probability,
            confidence,
            method: method.to_string(),
            rationale: rationale.into(),
        }
    }
}

/// One category-specific estimator in the routing chain.
///
/// `estimate` may return None to decline (category keyword hit but no usable
/// signal), in which case the engine falls through to the base-rate default.
pub trait CategoryEstimator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Does this category claim the question?
    fn matches(&self, question_lower: &str) -> bool;

    fn estimate(
        &self,
        question: &str,
        yes_price: f64,
        days_to_end: Option<f64>,
    ) -> Option<ProbabilityEstimate>;
}

/// Ordered routing engine over the category estimators
pub struct ProbabilityEngine {
    routes: Vec<Box<dyn CategoryEstimator>>,
    fallback: BaseRateEstimator,
}

impl Default for ProbabilityEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbabilityEngine {
    pub fn new() -> Self {
        Self {
            routes: vec![
                Box::new(CryptoEstimator::default()),
                Box::new(MacroEstimator),
                Box::new(PoliticalEstimator),
                Box::new(PriceTargetEstimator),
            ],
            fallback: BaseRateEstimator,
        }
    }

    /// Estimate the true YES probability for a market question.
    ///
    /// The first category whose predicate matches gets the question; if it
    /// declines, the base-rate estimator takes over. The final probability is
    /// clamped to [0.01, 0.99].
    pub fn estimate(
        &self,
        question: &str,
        yes_price: f64,
        end_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> ProbabilityEstimate {
        let days_to_end = end_date.map(|end| ((end - now).num_seconds() as f64 / 86_400.0).max(0.0));
        let question_lower = question.to_lowercase();

        let mut estimate = None;
        for route in &self.routes {
            if route.matches(&question_lower) {
                debug!(category = route.name(), "question routed");
                estimate = route.estimate(question, yes_price, days_to_end);
                break;
            }
        }

        let mut estimate = estimate.unwrap_or_else(|| {
            self.fallback
                .base_rate(yes_price, days_to_end)
        });

        estimate.probability = estimate.probability.clamp(0.01, 0.99);
        estimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn engine() -> ProbabilityEngine {
        ProbabilityEngine::new()
    }

    fn estimate(question: &str, yes_price: f64, days: Option<i64>) -> ProbabilityEstimate {
        let now = Utc::now();
        engine().estimate(question, yes_price, days.map(|d| now + Duration::days(d)), now)
    }

    #[test]
    fn test_routing_priority_crypto_first() {
        // "btc" and "rate" both appear; crypto is tested first
        let est = estimate("Will BTC rally if the Fed holds the rate at $70k?", 0.50, Some(30));
        assert_eq!(est.method, "log-normal vol model");
    }

    #[test]
    fn test_macro_route() {
        let est = estimate("Will the Fed announce a rate cut in March?", 0.25, Some(60));
        assert_eq!(est.method, "macro model");
        assert!((est.probability - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_political_route_trusts_market() {
        let est = estimate("Will the incumbent win the election?", 0.62, Some(90));
        assert_eq!(est.method, "market trust");
        assert!((est.probability - 0.62).abs() < 1e-12);
        assert!((est.confidence - 0.30).abs() < 1e-12);
    }

    #[test]
    fn test_price_target_delegates_to_base_rate() {
        let est = estimate("Will the price reach a new high?", 0.50, Some(30));
        assert_eq!(est.method, "no edge detected");
    }

    #[test]
    fn test_default_base_rate() {
        let est = estimate("Will the movie gross a record opening weekend?", 0.05, Some(30));
        assert_eq!(est.method, "longshot bias correction");
    }

    #[test]
    fn test_probability_always_clamped() {
        // Political route passes the market price through; the engine clamps it
        let est = estimate("Will the incumbent win the election?", 0.001, Some(90));
        assert!(est.probability >= 0.01);

        let est = estimate("Will the incumbent win the election?", 0.999, Some(90));
        assert!(est.probability <= 0.99);
    }

    #[test]
    fn test_crypto_without_target_falls_back() {
        let est = estimate("Is this the year of crypto adoption?", 0.05, Some(120));
        assert_eq!(est.method, "longshot bias correction");
    }
}
