pub mod executor;
pub mod provider;
pub mod telegram;

pub use executor::{ExecutionResult, PaperExecutor, TradeExecutor, UnconfiguredLiveExecutor};
pub use provider::{GammaClient, MarketDataProvider, FALLBACK_SPOT};
pub use telegram::{Notifier, NullNotifier, TelegramNotifier};
