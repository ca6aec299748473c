//! Expected value and Kelly fraction for both sides of a binary market
//!
//! For a contract priced at P in (0, 1) paying $1, net odds are
//! b = 1/P - 1 and the full Kelly fraction is f = (p*b - q) / b.
//! Fractions are capped: full Kelly on a heuristic edge estimate is how
//! bankrolls die.

use serde::{Deserialize, Serialize};

/// Cap applied to every Kelly fraction
pub const DEFAULT_MAX_KELLY_FRACTION: f64 = 0.25;

/// EV and Kelly for both sides of one market
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvKelly {
    pub ev_yes: f64,
    pub ev_no: f64,
    pub kelly_yes: f64,
    pub kelly_no: f64,
}

/// Kelly fraction for backing an outcome with probability `prob` at `price`.
///
/// Out-of-domain prices (<= 0 or >= 1) return 0 rather than erroring; the
/// result is always within [0, max_fraction].
pub fn kelly_fraction(prob: f64, price: f64, max_fraction: f64) -> f64 {
    if price <= 0.0 || price >= 1.0 {
        return 0.0;
    }
    let odds = 1.0 / price - 1.0;
    let f = (prob * odds - (1.0 - prob)) / odds;
    f.clamp(0.0, max_fraction)
}

/// EV and capped Kelly for both sides given our probability estimate.
///
/// EV(YES) = p - yes_price, EV(NO) = (1 - p) - no_price.
pub fn ev_and_kelly(our_prob: f64, yes_price: f64, no_price: f64, max_fraction: f64) -> EvKelly {
    EvKelly {
        ev_yes: our_prob - yes_price,
        ev_no: (1.0 - our_prob) - no_price,
        kelly_yes: kelly_fraction(our_prob, yes_price, max_fraction),
        kelly_no: kelly_fraction(1.0 - our_prob, no_price, max_fraction),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ev_both_sides() {
        let r = ev_and_kelly(0.60, 0.50, 0.52, DEFAULT_MAX_KELLY_FRACTION);
        assert!((r.ev_yes - 0.10).abs() < 1e-12);
        assert!((r.ev_no - (-0.12)).abs() < 1e-12);
    }

    #[test]
    fn test_kelly_known_value() {
        // p=0.6 at price 0.5: odds=1, f = 0.6 - 0.4 = 0.2
        let f = kelly_fraction(0.60, 0.50, DEFAULT_MAX_KELLY_FRACTION);
        assert!((f - 0.20).abs() < 1e-12);
    }

    #[test]
    fn test_kelly_cap() {
        // Huge edge would want f=0.8; cap holds it at the maximum
        let f = kelly_fraction(0.90, 0.50, DEFAULT_MAX_KELLY_FRACTION);
        assert_eq!(f, DEFAULT_MAX_KELLY_FRACTION);
    }

    #[test]
    fn test_kelly_never_negative() {
        // Negative edge clamps to zero
        assert_eq!(kelly_fraction(0.30, 0.50, DEFAULT_MAX_KELLY_FRACTION), 0.0);
    }

    #[test]
    fn test_kelly_degenerate_prices() {
        assert_eq!(kelly_fraction(0.60, 0.0, DEFAULT_MAX_KELLY_FRACTION), 0.0);
        assert_eq!(kelly_fraction(0.60, 1.0, DEFAULT_MAX_KELLY_FRACTION), 0.0);
        assert_eq!(kelly_fraction(0.60, -0.5, DEFAULT_MAX_KELLY_FRACTION), 0.0);
        assert_eq!(kelly_fraction(0.60, 1.5, DEFAULT_MAX_KELLY_FRACTION), 0.0);
    }

    #[test]
    fn test_kelly_bounds_hold_across_grid() {
        for p in [0.01, 0.2, 0.5, 0.8, 0.99] {
            for price in [0.01, 0.1, 0.5, 0.9, 0.99] {
                let f = kelly_fraction(p, price, DEFAULT_MAX_KELLY_FRACTION);
                assert!((0.0..=DEFAULT_MAX_KELLY_FRACTION).contains(&f));
            }
        }
    }
}
