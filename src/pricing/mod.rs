pub mod normal;
pub mod vol_model;

pub use normal::normal_cdf;
pub use vol_model::{BinaryQuote, MarketAnalysis, Regime, VolModel};
