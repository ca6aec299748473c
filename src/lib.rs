pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod estimator;
pub mod pricing;
pub mod services;
pub mod strategy;
pub mod tracker;

pub use adapters::{
    ExecutionResult, GammaClient, MarketDataProvider, Notifier, NullNotifier, PaperExecutor,
    TelegramNotifier, TradeExecutor, UnconfiguredLiveExecutor,
};
pub use config::AppConfig;
pub use domain::{Confidence, Market, Opportunity, RiskState, Side, SizingDecision};
pub use error::{PolyedgeError, Result};
pub use estimator::{ProbabilityEngine, ProbabilityEstimate};
pub use pricing::{BinaryQuote, MarketAnalysis, Regime, VolModel};
pub use services::{PositionMonitor, ScanService};
pub use strategy::{OpportunityRanker, PositionSizer, RankerConfig, SizerConfig};
pub use tracker::{BetTicket, CalibrationReport, CalibrationTracker, TrackedBet};
