//! Strategy module
//!
//! The quantitative decision pipeline: EV/Kelly math, the risk-gated
//! position sizer, and the opportunity ranker that ties the probability
//! engine to the market universe.

pub mod kelly;
pub mod ranker;
pub mod sizer;

pub use kelly::{ev_and_kelly, kelly_fraction, EvKelly, DEFAULT_MAX_KELLY_FRACTION};
pub use ranker::{OpportunityRanker, RankerConfig};
pub use sizer::{PositionSizer, SizerConfig};
