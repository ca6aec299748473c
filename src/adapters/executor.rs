//! Trade execution seam
//!
//! The core never inspects order-book internals: it hands an approved
//! sizing decision to a `TradeExecutor` and gets back a fill or a failure
//! reason. The paper executor fills at the quoted price; real execution
//! lives behind the same trait and reports itself unconfigured until a
//! signing backend is wired in.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{Market, Side};
use crate::error::{PolyedgeError, Result};

/// Outcome of one execution attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub order_id: Option<String>,
    pub filled_price: f64,
    pub cost_usd: Decimal,
    pub error: Option<String>,
    pub executed_at: DateTime<Utc>,
}

impl ExecutionResult {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            order_id: None,
            filled_price: 0.0,
            cost_usd: Decimal::ZERO,
            error: Some(reason.into()),
            executed_at: Utc::now(),
        }
    }
}

/// Order placement seam
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TradeExecutor: Send + Sync {
    /// Can this executor actually place orders?
    fn is_configured(&self) -> bool;

    /// Buy `size_usd` worth of the given side at the market's quoted price
    async fn execute(&self, market: &Market, side: Side, size_usd: Decimal)
        -> Result<ExecutionResult>;

    /// Current wallet balance, for bankroll refresh in live mode
    async fn balance(&self) -> Result<Decimal>;
}

/// Paper executor: every order fills at the quoted price, nothing leaves
/// the process
pub struct PaperExecutor {
    starting_bankroll: Decimal,
}

impl PaperExecutor {
    pub fn new(starting_bankroll: Decimal) -> Self {
        Self { starting_bankroll }
    }
}

impl Default for PaperExecutor {
    fn default() -> Self {
        Self::new(dec!(500))
    }
}

#[async_trait]
impl TradeExecutor for PaperExecutor {
    fn is_configured(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        market: &Market,
        side: Side,
        size_usd: Decimal,
    ) -> Result<ExecutionResult> {
        let price = market.price(side);
        info!(
            market_id = %market.id,
            %side,
            %size_usd,
            price,
            "paper fill"
        );
        Ok(ExecutionResult {
            success: true,
            order_id: Some(format!("paper-{}", Utc::now().timestamp_millis())),
            filled_price: price,
            cost_usd: size_usd,
            error: None,
            executed_at: Utc::now(),
        })
    }

    async fn balance(&self) -> Result<Decimal> {
        Ok(self.starting_bankroll)
    }
}

/// Placeholder for live CLOB execution. Always unconfigured: running with
/// `--live` surfaces a configuration error instead of silently paper-trading.
pub struct UnconfiguredLiveExecutor;

#[async_trait]
impl TradeExecutor for UnconfiguredLiveExecutor {
    fn is_configured(&self) -> bool {
        false
    }

    async fn execute(
        &self,
        _market: &Market,
        _side: Side,
        _size_usd: Decimal,
    ) -> Result<ExecutionResult> {
        Err(PolyedgeError::MissingCapability(
            "live execution requires a configured exchange signer".into(),
        ))
    }

    async fn balance(&self) -> Result<Decimal> {
        Err(PolyedgeError::MissingCapability(
            "live balance requires a configured wallet".into(),
        ))
    }
}
