//! Political market estimator
//!
//! Political markets attract the most flow and tend to be efficient, so the
//! market price is taken at face value with low confidence. Edge on these
//! comes from the systematic corrections (longshot, near-resolution), which
//! the base-rate path already applies to everything else.

use super::{CategoryEstimator, ProbabilityEstimate};

const KEYWORDS: [&str; 6] = ["election", "president", "senate", "congress", "vote", "win"];

pub struct PoliticalEstimator;

impl CategoryEstimator for PoliticalEstimator {
    fn name(&self) -> &'static str {
        "political"
    }

    fn matches(&self, question_lower: &str) -> bool {
        KEYWORDS.iter().any(|w| question_lower.contains(w))
    }

    fn estimate(
        &self,
        _question: &str,
        yes_price: f64,
        _days_to_end: Option<f64>,
    ) -> Option<ProbabilityEstimate> {
        Some(ProbabilityEstimate::new(
            yes_price,
            0.30,
            "market trust",
            "Political markets are relatively efficient. No strong prior to \
             deviate from market price.",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trusts_market_price() {
        let est = PoliticalEstimator
            .estimate("Will the challenger win the senate seat?", 0.37, Some(60.0))
            .unwrap();
        assert!((est.probability - 0.37).abs() < 1e-12);
        assert!((est.confidence - 0.30).abs() < 1e-12);
        assert_eq!(est.method, "market trust");
    }
}
