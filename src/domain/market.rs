use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PolyedgeError, Result};

/// Side of the binary market (YES or NO)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Yes,
    No,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Yes => Side::No,
            Side::No => Side::Yes,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Yes => "YES",
            Side::No => "NO",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Side {
    type Err = PolyedgeError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "YES" => Ok(Side::Yes),
            "NO" => Ok(Side::No),
            other => Err(PolyedgeError::Validation(format!(
                "invalid side '{}'; expected YES|NO",
                other
            ))),
        }
    }
}

/// A single binary prediction market, fetched fresh each scan cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub category: String,
    /// Current YES price (0-1)
    pub yes_price: f64,
    /// Current NO price (0-1)
    pub no_price: f64,
    /// 24h trading volume in USD
    pub volume_24h: f64,
    /// All-time volume in USD
    #[serde(default)]
    pub total_volume: f64,
    /// Current liquidity in USD
    pub liquidity: f64,
    pub end_date: Option<DateTime<Utc>>,
    pub resolved: bool,
    pub outcome: Option<Side>,
}

impl Market {
    /// Price quoted for a given side
    pub fn price(&self, side: Side) -> f64 {
        match side {
            Side::Yes => self.yes_price,
            Side::No => self.no_price,
        }
    }

    /// YES + NO - 1.0 (the market maker's take)
    pub fn spread(&self) -> f64 {
        self.yes_price + self.no_price - 1.0
    }

    /// Days until resolution, clamped at zero. None when no end date is known.
    pub fn days_to_end(&self, now: DateTime<Utc>) -> Option<f64> {
        self.end_date
            .map(|end| ((end - now).num_seconds() as f64 / 86_400.0).max(0.0))
    }

    /// Reject markets with out-of-range prices before they reach the pipeline
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(PolyedgeError::InvalidMarketData("empty market id".into()));
        }
        for (label, price) in [("yes_price", self.yes_price), ("no_price", self.no_price)] {
            if !(0.0..=1.0).contains(&price) || !price.is_finite() {
                return Err(PolyedgeError::InvalidMarketData(format!(
                    "{} out of range: {}",
                    label, price
                )));
            }
        }
        if self.liquidity < 0.0 || self.volume_24h < 0.0 {
            return Err(PolyedgeError::InvalidMarketData(
                "negative liquidity or volume".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn market() -> Market {
        Market {
            id: "0xabc".to_string(),
            question: "Will BTC be above $70k in 30 days?".to_string(),
            category: "crypto".to_string(),
            yes_price: 0.55,
            no_price: 0.47,
            volume_24h: 25_000.0,
            total_volume: 500_000.0,
            liquidity: 80_000.0,
            end_date: Some(Utc::now() + Duration::days(30)),
            resolved: false,
            outcome: None,
        }
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Yes.opposite(), Side::No);
        assert_eq!(Side::No.opposite(), Side::Yes);
    }

    #[test]
    fn test_side_parse() {
        assert_eq!("yes".parse::<Side>().unwrap(), Side::Yes);
        assert_eq!(" NO ".parse::<Side>().unwrap(), Side::No);
        assert!("maybe".parse::<Side>().is_err());
    }

    #[test]
    fn test_spread() {
        let m = market();
        assert!((m.spread() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_days_to_end() {
        let m = market();
        let days = m.days_to_end(Utc::now()).unwrap();
        assert!(days > 29.9 && days <= 30.0);

        let mut past = market();
        past.end_date = Some(Utc::now() - Duration::days(2));
        assert_eq!(past.days_to_end(Utc::now()), Some(0.0));
    }

    #[test]
    fn test_validate_rejects_bad_prices() {
        let mut m = market();
        m.yes_price = 1.7;
        assert!(m.validate().is_err());

        let mut m = market();
        m.no_price = f64::NAN;
        assert!(m.validate().is_err());

        assert!(market().validate().is_ok());
    }
}
