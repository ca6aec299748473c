use config::{Config, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::error::Result;
use crate::pricing::Regime;
use crate::strategy::{RankerConfig, SizerConfig};

/// Main configuration structure
///
/// Every field has a default carrying the documented constants, so the
/// process runs with no config file at all; `config/default.toml`,
/// `config/local.toml` and `POLYEDGE_`-prefixed environment variables
/// override in that order.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub ranker: RankerConfig,
    #[serde(default)]
    pub sizer: SizerConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Seconds between scan cycles; markets do not move fast
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    /// Markets fetched per scan
    #[serde(default = "default_market_limit")]
    pub market_limit: usize,
    /// Max new bets per cycle
    #[serde(default = "default_max_bets_per_scan")]
    pub max_bets_per_scan: usize,
    /// Paper bankroll when no wallet is connected
    #[serde(default = "default_starting_bankroll")]
    pub starting_bankroll: Decimal,
    /// Vol regime applied to the pricing model
    #[serde(default)]
    pub regime: Regime,
}

fn default_scan_interval_secs() -> u64 {
    3600
}

fn default_market_limit() -> usize {
    100
}

fn default_max_bets_per_scan() -> usize {
    3
}

fn default_starting_bankroll() -> Decimal {
    dec!(500)
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval_secs(),
            market_limit: default_market_limit(),
            max_bets_per_scan: default_max_bets_per_scan(),
            starting_bankroll: default_starting_bankroll(),
            regime: Regime::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between resolution checks
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Timeout per resolution query
    #[serde(default = "default_resolution_timeout_secs")]
    pub resolution_timeout_secs: u64,
    /// Send a calibration digest every N resolutions
    #[serde(default = "default_digest_every")]
    pub digest_every: u32,
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_resolution_timeout_secs() -> u64 {
    10
}

fn default_digest_every() -> u32 {
    10
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            resolution_timeout_secs: default_resolution_timeout_secs(),
            digest_every: default_digest_every(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// Path to the JSON bet store
    #[serde(default = "default_store_path")]
    pub store_path: String,
}

fn default_store_path() -> String {
    "data/paper_bets.json".to_string()
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("POLYEDGE").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_carry_documented_constants() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.scan.scan_interval_secs, 3600);
        assert_eq!(cfg.scan.max_bets_per_scan, 3);
        assert_eq!(cfg.scan.starting_bankroll, dec!(500));
        assert_eq!(cfg.monitor.poll_interval_secs, 300);
        assert_eq!(cfg.monitor.digest_every, 10);
        assert_eq!(cfg.sizer.max_single_bet_pct, dec!(0.05));
        assert_eq!(cfg.sizer.max_total_exposure, dec!(0.40));
        assert!((cfg.sizer.kelly_fraction - 0.25).abs() < 1e-12);
        assert!((cfg.sizer.min_ev - 0.04).abs() < 1e-12);
        assert!((cfg.ranker.min_ev - 0.03).abs() < 1e-12);
        assert_eq!(cfg.ranker.min_liquidity, 5_000.0);
    }
}
