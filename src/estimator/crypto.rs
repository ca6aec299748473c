//! Crypto price-target estimator
//!
//! Prices "$X by date" crypto questions with a flat 70% annualized vol
//! scaled by √(days/365) against a fixed reference spot. The full term
//! structure lives in `pricing::VolModel`; the scanner overlays that model
//! on BTC markets after ranking, so this estimator only needs to be a
//! first-pass screen.

use regex::Regex;

use crate::pricing::normal_cdf;

use super::{CategoryEstimator, ProbabilityEstimate};

const KEYWORDS: [&str; 7] = ["bitcoin", "btc", "ethereum", "eth", "crypto", "sol", "solana"];
const ABOVE_WORDS: [&str; 3] = ["above", "over", "exceed"];

/// Reference spot used when no live price is available
const REFERENCE_SPOT: f64 = 65_900.0;
/// Flat annualized vol for the first-pass screen
const ANNUALIZED_VOL: f64 = 0.70;

pub struct CryptoEstimator {
    target_pattern: Regex,
}

impl Default for CryptoEstimator {
    fn default() -> Self {
        Self {
            target_pattern: Regex::new(r"\$([0-9,]+)k?").expect("static target pattern"),
        }
    }
}

impl CategoryEstimator for CryptoEstimator {
    fn name(&self) -> &'static str {
        "crypto"
    }

    fn matches(&self, question_lower: &str) -> bool {
        KEYWORDS.iter().any(|w| question_lower.contains(w))
    }

    fn estimate(
        &self,
        question: &str,
        _yes_price: f64,
        days_to_end: Option<f64>,
    ) -> Option<ProbabilityEstimate> {
        let caps = self.target_pattern.captures(question)?;
        let mut target: f64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
        if target < 1000.0 {
            // "k" shorthand
            target *= 1000.0;
        }

        let days = days_to_end.filter(|d| *d > 0.0)?;

        let log_return_needed = (target / REFERENCE_SPOT).ln();
        let vol = ANNUALIZED_VOL * (days / 365.0).sqrt();
        let mut prob = normal_cdf(log_return_needed / vol);

        let question_lower = question.to_lowercase();
        if ABOVE_WORDS.iter().any(|w| question_lower.contains(w)) {
            prob = 1.0 - prob;
        }

        Some(ProbabilityEstimate::new(
            prob.clamp(0.02, 0.98),
            0.6,
            "log-normal vol model",
            format!(
                "Spot ~${:.0}, target ${:.0}, {:.0}d window, {:.0}% annualized vol -> P={:.1}%",
                REFERENCE_SPOT,
                target,
                days,
                ANNUALIZED_VOL * 100.0,
                prob * 100.0
            ),
        ))
    }
}
