//! Market data provider
//!
//! Trait seam over the exchange's public read APIs plus the reference spot
//! feed. The concrete client talks to Polymarket's Gamma API and CoinGecko;
//! everything downstream only sees the trait, which is what the tests mock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::domain::{Market, Side};
use crate::error::{PolyedgeError, Result};

const GAMMA_BASE: &str = "https://gamma-api.polymarket.com";
const COINGECKO_BASE: &str = "https://api.coingecko.com/api/v3";

/// Fallback spot when the price feed is down; roughly where BTC traded when
/// the vol curve was calibrated
pub const FALLBACK_SPOT: f64 = 65_900.0;

/// Read-only market data source
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Active markets sorted by volume, newest data each call
    async fn fetch_markets(&self, limit: usize) -> Result<Vec<Market>>;

    /// Resolution status for one market: Some(outcome) once resolved,
    /// None while still open
    async fn check_resolution(&self, market_id: &str) -> Result<Option<Side>>;

    /// Current spot price for the reference asset
    async fn spot_price(&self) -> Result<f64>;

    /// USDC balance of the trading wallet, when the provider can see one
    async fn balance(&self) -> Result<Option<Decimal>> {
        Ok(None)
    }
}

/// Polymarket Gamma API client
pub struct GammaClient {
    client: reqwest::Client,
    base_url: String,
    spot_url: String,
}

impl GammaClient {
    pub fn new() -> Self {
        Self::with_base_urls(GAMMA_BASE.to_string(), COINGECKO_BASE.to_string())
    }

    pub fn with_base_urls(base_url: String, spot_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            client,
            base_url,
            spot_url,
        }
    }

    /// Parse one Gamma market object; malformed entries are skipped upstream
    fn parse_market(raw: &Value) -> Option<Market> {
        let tokens = raw.get("tokens").and_then(|t| t.as_array());
        let token_price = |outcome: &str| -> f64 {
            tokens
                .and_then(|ts| {
                    ts.iter()
                        .find(|t| t.get("outcome").and_then(|o| o.as_str()) == Some(outcome))
                })
                .and_then(|t| t.get("price"))
                .and_then(Self::as_f64)
                .unwrap_or(0.5)
        };

        let end_date = raw
            .get("endDate")
            .and_then(|d| d.as_str())
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map(|d| d.with_timezone(&Utc));

        let outcome = raw
            .get("resolution")
            .and_then(|r| r.as_str())
            .and_then(|r| r.parse::<Side>().ok());

        let id = raw
            .get("conditionId")
            .or_else(|| raw.get("id"))
            .and_then(|v| v.as_str())?
            .to_string();

        Some(Market {
            id,
            question: raw
                .get("question")
                .and_then(|q| q.as_str())
                .unwrap_or_default()
                .to_string(),
            category: raw
                .get("category")
                .and_then(|c| c.as_str())
                .unwrap_or_default()
                .to_string(),
            yes_price: token_price("Yes"),
            no_price: token_price("No"),
            volume_24h: raw.get("volume24hr").and_then(Self::as_f64).unwrap_or(0.0),
            total_volume: raw.get("volume").and_then(Self::as_f64).unwrap_or(0.0),
            liquidity: raw.get("liquidity").and_then(Self::as_f64).unwrap_or(0.0),
            end_date,
            resolved: raw
                .get("closed")
                .and_then(|c| c.as_bool())
                .unwrap_or(false),
            outcome,
        })
    }

    /// Gamma returns numbers both as JSON numbers and as strings
    fn as_f64(value: &Value) -> Option<f64> {
        value
            .as_f64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
    }
}

impl Default for GammaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for GammaClient {
    async fn fetch_markets(&self, limit: usize) -> Result<Vec<Market>> {
        let url = format!("{}/markets", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("limit", limit.to_string()),
                ("active", "true".to_string()),
                ("closed", "false".to_string()),
                ("order", "volume24hr".to_string()),
                ("ascending", "false".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PolyedgeError::MarketDataUnavailable(format!(
                "gamma markets returned {}",
                response.status()
            )));
        }

        let raw: Vec<Value> = response.json().await?;
        let mut markets = Vec::with_capacity(raw.len());
        for entry in &raw {
            match Self::parse_market(entry) {
                Some(market) => markets.push(market),
                None => debug!("skipping unparseable market entry"),
            }
        }

        debug!(fetched = markets.len(), "fetched markets");
        Ok(markets)
    }

    async fn check_resolution(&self, market_id: &str) -> Result<Option<Side>> {
        let url = format!("{}/markets/{}", self.base_url, market_id);
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(market_id, error = %e, "resolution check failed");
                return Err(e.into());
            }
        };

        if !response.status().is_success() {
            return Ok(None);
        }

        let data: Value = response.json().await?;
        let closed = data.get("closed").and_then(|c| c.as_bool()).unwrap_or(false)
            || data
                .get("resolved")
                .and_then(|r| r.as_bool())
                .unwrap_or(false);
        if !closed {
            return Ok(None);
        }

        let outcome = data
            .get("resolution")
            .or_else(|| data.get("outcome"))
            .and_then(|o| o.as_str())
            .and_then(|o| o.parse::<Side>().ok());
        Ok(outcome)
    }

    async fn spot_price(&self) -> Result<f64> {
        let url = format!("{}/simple/price", self.spot_url);
        let result = self
            .client
            .get(&url)
            .query(&[("ids", "bitcoin"), ("vs_currencies", "usd")])
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match result {
            Ok(response) => {
                let data: Value = response.json().await?;
                data.get("bitcoin")
                    .and_then(|b| b.get("usd"))
                    .and_then(|p| p.as_f64())
                    .ok_or_else(|| {
                        PolyedgeError::MarketDataUnavailable("spot price missing".into())
                    })
            }
            Err(e) => {
                error!(error = %e, "spot price fetch failed");
                Err(e.into())
            }
        }
    }
}
