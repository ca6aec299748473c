//! Log-normal pricer for binary price-threshold markets
//!
//! Answers "given the current spot, what is the probability the price is
//! above a target at expiry?" using an interpolated annualized volatility
//! term structure and a regime multiplier:
//!
//!     d2 = [ln(S/K) + (μ - σ²/2)T] / (σ√T)
//!     P(price > K) = Φ(d2)

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::normal::normal_cdf;

/// Annualized vol term structure, keyed by horizon in days.
/// Short horizons run hot; the curve decays toward the long-run level.
const VOL_TERM_STRUCTURE: [(f64, f64); 8] = [
    (7.0, 0.85),
    (14.0, 0.80),
    (30.0, 0.72),
    (60.0, 0.68),
    (90.0, 0.65),
    (180.0, 0.60),
    (365.0, 0.55),
    (730.0, 0.50),
];

/// Qualitative market-condition label scaling the vol curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    /// Trending market, slightly lower realized vol
    Cooperation,
    /// Normal conditions
    Mixed,
    /// High vol, liquidation cascades
    Defection,
}

impl Default for Regime {
    fn default() -> Self {
        Regime::Mixed
    }
}

impl Regime {
    pub fn vol_multiplier(&self) -> f64 {
        match self {
            Regime::Cooperation => 0.90,
            Regime::Mixed => 1.00,
            Regime::Defection => 1.20,
        }
    }
}

impl std::str::FromStr for Regime {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cooperation" => Ok(Regime::Cooperation),
            "mixed" => Ok(Regime::Mixed),
            "defection" => Ok(Regime::Defection),
            other => Err(format!(
                "invalid regime '{}'; expected cooperation|mixed|defection",
                other
            )),
        }
    }
}

/// Result of pricing one binary threshold contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryQuote {
    /// P(price > target), clamped to [0.01, 0.99]
    pub probability_above: f64,
    /// P(price < target), clamped independently; the pair may not sum to 1
    /// at the extremes
    pub probability_below: f64,
    /// Annualized vol used
    pub implied_vol: f64,
    pub days_to_expiry: f64,
    pub current_price: f64,
    pub target_price: f64,
    /// ln(target / current), the move needed to reach the target
    pub log_return_needed: f64,
    /// Standardized move needed (d2)
    pub z_score: f64,
}

/// Full analysis of a price-threshold question versus its market price
#[derive(Debug, Clone, Serialize)]
pub struct MarketAnalysis {
    pub target: f64,
    pub direction: &'static str,
    pub our_probability: f64,
    pub market_probability: f64,
    pub edge: f64,
    pub days_to_expiry: f64,
    pub implied_vol: f64,
    pub z_score: f64,
    pub move_needed_pct: f64,
    pub reasoning: String,
}

const ABOVE_KEYWORDS: [&str; 6] = ["above", "over", "exceed", "higher than", "more than", ">"];
const BELOW_KEYWORDS: [&str; 4] = ["below", "under", "less than", "<"];

/// Binary option pricer for price-threshold prediction markets
#[derive(Debug, Clone)]
pub struct VolModel {
    /// Current spot price
    pub spot: f64,
    pub regime: Regime,
    /// Annual drift; zero is the conservative default
    pub drift: f64,
    target_patterns: Vec<Regex>,
}

impl VolModel {
    pub fn new(spot: f64, regime: Regime) -> Self {
        Self::with_drift(spot, regime, 0.0)
    }

    pub fn with_drift(spot: f64, regime: Regime, drift: f64) -> Self {
        // Fixed priority: $70k, $70,000, $70K, bare 70,000.
        // First pattern producing an in-range target wins.
        let target_patterns = [
            r"(?i)\$([0-9,]+)k\b",
            r"\$([0-9,]+),([0-9]+)",
            r"\$([0-9]+)K\b",
            r"([0-9]+),([0-9]{3})\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static target pattern"))
        .collect();

        Self {
            spot,
            regime,
            drift,
            target_patterns,
        }
    }

    /// Interpolated annualized vol for a horizon, scaled by regime.
    /// Clamps to the 7-day value below the curve and the 730-day value above it.
    pub fn get_vol(&self, days: f64) -> f64 {
        if days <= 0.0 {
            return 0.85;
        }

        let (first_day, first_vol) = VOL_TERM_STRUCTURE[0];
        let (last_day, last_vol) = VOL_TERM_STRUCTURE[VOL_TERM_STRUCTURE.len() - 1];

        let base_vol = if days <= first_day {
            first_vol
        } else if days >= last_day {
            last_vol
        } else {
            let upper_idx = VOL_TERM_STRUCTURE
                .iter()
                .position(|(d, _)| *d >= days)
                .expect("days bracketed by term structure");
            let (hi_day, hi_vol) = VOL_TERM_STRUCTURE[upper_idx];
            let (lo_day, lo_vol) = VOL_TERM_STRUCTURE[upper_idx - 1];
            if (hi_day - lo_day).abs() < f64::EPSILON {
                lo_vol
            } else {
                let t = (days - lo_day) / (hi_day - lo_day);
                lo_vol * (1.0 - t) + hi_vol * t
            }
        };

        base_vol * self.regime.vol_multiplier()
    }

    /// P(spot > target) at expiry.
    ///
    /// T <= 0 returns the deterministic indicator with vol and z both zero;
    /// numeric inputs never raise.
    pub fn price_above_target(&self, target: f64, days_to_expiry: f64) -> BinaryQuote {
        let s = self.spot;
        let k = target;
        let t = days_to_expiry / 365.0;

        if t <= 0.0 {
            let prob = if s > k { 1.0 } else { 0.0 };
            return BinaryQuote {
                probability_above: prob,
                probability_below: 1.0 - prob,
                implied_vol: 0.0,
                days_to_expiry: 0.0,
                current_price: s,
                target_price: k,
                log_return_needed: 0.0,
                z_score: 0.0,
            };
        }

        let vol = self.get_vol(days_to_expiry);
        let vol_t = vol * t.sqrt();

        let log_return = (k / s).ln();
        let d2 = ((s / k).ln() + (self.drift - 0.5 * vol * vol) * t) / vol_t;

        let prob_above = normal_cdf(d2);
        let prob_below = 1.0 - prob_above;

        BinaryQuote {
            probability_above: prob_above.clamp(0.01, 0.99),
            probability_below: prob_below.clamp(0.01, 0.99),
            implied_vol: vol,
            days_to_expiry,
            current_price: s,
            target_price: k,
            log_return_needed: log_return,
            z_score: d2,
        }
    }

    /// P(lower < spot < upper) at expiry, floored at 0.01
    pub fn price_range_market(&self, lower: f64, upper: f64, days_to_expiry: f64) -> f64 {
        let p_above_lower = self.price_above_target(lower, days_to_expiry).probability_above;
        let p_above_upper = self.price_above_target(upper, days_to_expiry).probability_above;
        (p_above_lower - p_above_upper).max(0.01)
    }

    /// Extract a dollar target from free text.
    ///
    /// Patterns are tried in fixed priority; the first one whose value lands
    /// strictly inside ($1k, $10M) after scaling (×1000 for a k/K suffix or a
    /// sub-1000 raw value) wins. Returns None when nothing qualifies.
    pub fn extract_target(&self, question: &str) -> Option<f64> {
        for pattern in &self.target_patterns {
            let Some(caps) = pattern.captures(question) else {
                continue;
            };
            let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            let num_str = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let Ok(mut target) = num_str.replace(',', "").parse::<f64>() else {
                continue;
            };
            if whole.to_lowercase().contains('k') || target < 1000.0 {
                target *= 1000.0;
            }
            if target > 1_000.0 && target < 10_000_000.0 {
                return Some(target);
            }
        }
        None
    }

    /// Full analysis of a price-threshold question: extract the target,
    /// detect direction, price it, and compare against the market.
    ///
    /// Direction tests the "above" keyword set first, then "below"; when
    /// neither matches the analysis uses the below probability (the original
    /// model's fallback, kept as-is so downstream EV matches it).
    pub fn analyze_market(
        &self,
        question: &str,
        yes_price: f64,
        end_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<MarketAnalysis> {
        let days = ((end_date - now).num_seconds() as f64 / 86_400.0).max(1.0);
        let target = self.extract_target(question)?;

        let question_lower = question.to_lowercase();
        let is_above = ABOVE_KEYWORDS.iter().any(|w| question_lower.contains(w));
        let is_below = BELOW_KEYWORDS.iter().any(|w| question_lower.contains(w));

        let quote = self.price_above_target(target, days);

        let (our_prob, direction) = if is_above {
            (quote.probability_above, "above")
        } else if is_below {
            (quote.probability_below, "below")
        } else {
            // No direction keyword: keep the below probability
            (quote.probability_below, "below")
        };

        let move_pct = (target - self.spot) / self.spot * 100.0;
        let edge = our_prob - yes_price;

        debug!(
            price_target = target,
            direction,
            days,
            our_prob,
            edge,
            "priced threshold market"
        );

        Some(MarketAnalysis {
            target,
            direction,
            our_probability: our_prob,
            market_probability: yes_price,
            edge,
            days_to_expiry: days,
            implied_vol: quote.implied_vol,
            z_score: quote.z_score,
            move_needed_pct: move_pct,
            reasoning: format!(
                "Spot ${:.0}, target ${:.0} ({}), {:.0}d window. Move needed: {:+.1}%. \
                 Vol: {:.0}% ann. Z-score: {:.2}. Model prob: {:.1}% vs market {:.1}% (edge: {:+.1}%)",
                self.spot,
                target,
                direction,
                days,
                move_pct,
                quote.implied_vol * 100.0,
                quote.z_score,
                our_prob * 100.0,
                yes_price * 100.0,
                edge * 100.0
            ),
        })
    }
}
