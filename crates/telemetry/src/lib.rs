//! Cost tracking for Asika.
//!
//! Built-in model pricing plus the usage summary attached to every chat
//! response.

pub mod pricing;
pub mod usage;

pub use pricing::{ModelPricing, PricingTable};
pub use usage::UsageSummary;
