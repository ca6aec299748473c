pub mod market;
pub mod opportunity;

pub use market::{Market, Side};
pub use opportunity::{Confidence, Opportunity, RiskState, SizingDecision};
