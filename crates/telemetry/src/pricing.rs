//! Built-in pricing table for the models Asika talks to.
//!
//! Prices are in USD per 1 million tokens. Each model has an input and
//! output price. Custom pricing can be added at runtime via TOML config.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Per-million-token pricing for a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Price per 1M input tokens in USD.
    pub input_per_m: f64,
    /// Price per 1M output tokens in USD.
    pub output_per_m: f64,
}

impl ModelPricing {
    /// Create a new pricing entry.
    pub fn new(input_per_m: f64, output_per_m: f64) -> Self {
        Self {
            input_per_m,
            output_per_m,
        }
    }

    /// Compute cost for the given token counts.
    pub fn cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        (input_tokens as f64 * self.input_per_m + output_tokens as f64 * self.output_per_m)
            / 1_000_000.0
    }
}

/// Thread-safe pricing table with built-in defaults and custom overrides.
pub struct PricingTable {
    prices: RwLock<HashMap<String, ModelPricing>>,
}

impl PricingTable {
    /// Create a pricing table with built-in model prices.
    pub fn with_defaults() -> Self {
        let mut prices = HashMap::new();

        // ── Groq-hosted open-weight models ─────────────────────────
        prices.insert("openai/gpt-oss-20b".into(), ModelPricing::new(0.10, 0.50));
        prices.insert("openai/gpt-oss-120b".into(), ModelPricing::new(0.15, 0.75));
        prices.insert(
            "llama-3.3-70b-versatile".into(),
            ModelPricing::new(0.59, 0.79),
        );
        prices.insert("llama-3.1-8b-instant".into(), ModelPricing::new(0.05, 0.08));
        prices.insert(
            "meta-llama/llama-4-scout-17b-16e-instruct".into(),
            ModelPricing::new(0.11, 0.34),
        );
        prices.insert(
            "meta-llama/llama-4-maverick-17b-128e-instruct".into(),
            ModelPricing::new(0.20, 0.60),
        );
        prices.insert("qwen/qwen3-32b".into(), ModelPricing::new(0.29, 0.59));

        // ── OpenAI ─────────────────────────────────────────────────
        prices.insert("openai/gpt-4o".into(), ModelPricing::new(2.5, 10.0));
        prices.insert("openai/gpt-4o-mini".into(), ModelPricing::new(0.15, 0.6));
        prices.insert(
            "openai/text-embedding-3-small".into(),
            ModelPricing::new(0.02, 0.0),
        );

        Self {
            prices: RwLock::new(prices),
        }
    }

    /// Create an empty pricing table.
    pub fn empty() -> Self {
        Self {
            prices: RwLock::new(HashMap::new()),
        }
    }

    /// Look up pricing for a model. Returns None if not found.
    pub fn get(&self, model: &str) -> Option<ModelPricing> {
        let prices = self.prices.read().unwrap_or_else(PoisonError::into_inner);
        prices.get(model).cloned()
    }

    /// Add or update pricing for a model.
    pub fn set(&self, model: impl Into<String>, pricing: ModelPricing) {
        let mut prices = self.prices.write().unwrap_or_else(PoisonError::into_inner);
        prices.insert(model.into(), pricing);
    }

    /// Compute cost for a model call, returning 0.0 if model is not in table.
    ///
    /// Tries an exact match first, then the `openai/` and `meta-llama/`
    /// prefixes, then the longest key whose bare name prefixes the model
    /// (`llama-3.1-8b-instant-0524` matches `llama-3.1-8b-instant`).
    pub fn compute_cost(&self, model: &str, input_tokens: u32, output_tokens: u32) -> f64 {
        let prices = self.prices.read().unwrap_or_else(PoisonError::into_inner);

        if let Some(p) = prices.get(model) {
            return p.cost(input_tokens, output_tokens);
        }

        for prefix in ["openai/", "meta-llama/"] {
            if let Some(p) = prices.get(&format!("{prefix}{model}")) {
                return p.cost(input_tokens, output_tokens);
            }
        }

        let model_lower = model.to_lowercase();
        let bare_model = model_lower.rsplit('/').next().unwrap_or(&model_lower);

        let best = prices
            .iter()
            .map(|(key, pricing)| (key.rsplit('/').next().unwrap_or(key), pricing))
            .filter(|(bare_key, _)| bare_model.starts_with(&bare_key.to_lowercase()))
            .max_by_key(|(bare_key, _)| bare_key.len());

        best.map(|(_, p)| p.cost(input_tokens, output_tokens))
            .unwrap_or(0.0)
    }

    /// List all known model names.
    pub fn models(&self) -> Vec<String> {
        let prices = self.prices.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = prices.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of models in the pricing table.
    pub fn len(&self) -> usize {
        self.prices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}
