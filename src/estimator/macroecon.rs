//! Macro / Fed market estimator
//!
//! Fixed-probability lookups keyed by phrase presence. These are priors,
//! not forecasts: the point is to catch markets drifting far from any
//! reasonable base rate, and the confidence scores reflect that.

use super::{CategoryEstimator, ProbabilityEstimate};

const KEYWORDS: [&str; 8] = [
    "fed",
    "rate",
    "fomc",
    "cpi",
    "inflation",
    "gdp",
    "nfp",
    "payroll",
];

pub struct MacroEstimator;

impl CategoryEstimator for MacroEstimator {
    fn name(&self) -> &'static str {
        "macro"
    }

    fn matches(&self, question_lower: &str) -> bool {
        KEYWORDS.iter().any(|w| question_lower.contains(w))
    }

    fn estimate(
        &self,
        question: &str,
        _yes_price: f64,
        _days_to_end: Option<f64>,
    ) -> Option<ProbabilityEstimate> {
        let q = question.to_lowercase();

        if q.contains("rate cut") || q.contains("cut rates") {
            return Some(ProbabilityEstimate::new(
                0.15,
                0.65,
                "macro model",
                "Fed hawkish, sticky inflation, no cuts likely near term. \
                 Fed funds futures pricing minimal cuts.",
            ));
        }

        if q.contains("rate hike") || q.contains("hike") {
            return Some(ProbabilityEstimate::new(
                0.05,
                0.75,
                "macro model",
                "Fed hiking cycle over. Hike probability near zero given current data.",
            ));
        }

        if q.contains("recession") {
            return Some(ProbabilityEstimate::new(
                0.30,
                0.50,
                "macro model",
                "Yield curve recently re-steepened after inversion, historically \
                 elevated recession risk 6-18 months out.",
            ));
        }

        if q.contains("cpi") && (q.contains("above") || q.contains("below") || q.contains("beat")) {
            return Some(ProbabilityEstimate::new(
                0.45,
                0.45,
                "macro model",
                "CPI markets are near coin-flip. Slight miss bias given sticky \
                 services inflation.",
            ));
        }

        None
    }
}
