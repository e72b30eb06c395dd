//! Token usage and cost summaries for response envelopes.

use asika_core::Usage;
use serde::{Deserialize, Serialize};

use crate::pricing::PricingTable;

/// Usage reported back to the caller of a chat turn or extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    /// Estimated spend in USD (0.0 for unpriced models).
    pub estimated_cost_usd: f64,
}

impl UsageSummary {
    /// A summary with every counter at zero.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Price a provider's usage report. Missing usage counts as zero.
    pub fn from_usage(usage: Option<Usage>, model: &str, pricing: &PricingTable) -> Self {
        let usage = usage.unwrap_or_default();
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            estimated_cost_usd: pricing.compute_cost(
                model,
                usage.prompt_tokens,
                usage.completion_tokens,
            ),
        }
    }
}
