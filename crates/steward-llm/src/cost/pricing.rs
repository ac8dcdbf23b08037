//! Model pricing
//!
//! Per-million-token USD rates for the tier models. Unknown models fall
//! back to standard-tier rates rather than failing: cost tracking is
//! advisory, not authoritative billing.

use serde::{Deserialize, Serialize};

/// Default cost per 1M input tokens (USD) for unknown models
pub const DEFAULT_INPUT_COST_PER_MILLION: f64 = 0.30;

/// Default cost per 1M output tokens (USD) for unknown models
pub const DEFAULT_OUTPUT_COST_PER_MILLION: f64 = 2.50;

/// Gemini 2.5 Flash-Lite input cost per 1M tokens
pub const GEMINI_FLASH_LITE_INPUT_COST: f64 = 0.10;
/// Gemini 2.5 Flash-Lite output cost per 1M tokens
pub const GEMINI_FLASH_LITE_OUTPUT_COST: f64 = 0.40;

/// Gemini 2.5 Flash input cost per 1M tokens
pub const GEMINI_FLASH_INPUT_COST: f64 = 0.30;
/// Gemini 2.5 Flash output cost per 1M tokens
pub const GEMINI_FLASH_OUTPUT_COST: f64 = 2.50;

/// Gemini 2.5 Pro input cost per 1M tokens
pub const GEMINI_PRO_INPUT_COST: f64 = 1.25;
/// Gemini 2.5 Pro output cost per 1M tokens
pub const GEMINI_PRO_OUTPUT_COST: f64 = 10.00;

/// Pricing for a model (per 1M tokens)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Cost per 1M input tokens (USD)
    pub input_cost_per_million: f64,
    /// Cost per 1M output tokens (USD)
    pub output_cost_per_million: f64,
}

impl ModelPricing {
    /// Calculate cost for given token counts
    #[must_use]
    pub fn calculate_cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        let input_cost = (f64::from(input_tokens) / 1_000_000.0) * self.input_cost_per_million;
        let output_cost = (f64::from(output_tokens) / 1_000_000.0) * self.output_cost_per_million;
        input_cost + output_cost
    }
}

/// Look up pricing for a model, falling back to default rates
#[must_use]
pub fn pricing_for(model: &str) -> ModelPricing {
    match model {
        "gemini-2.5-flash-lite" => ModelPricing {
            input_cost_per_million: GEMINI_FLASH_LITE_INPUT_COST,
            output_cost_per_million: GEMINI_FLASH_LITE_OUTPUT_COST,
        },
        "gemini-2.5-flash" => ModelPricing {
            input_cost_per_million: GEMINI_FLASH_INPUT_COST,
            output_cost_per_million: GEMINI_FLASH_OUTPUT_COST,
        },
        "gemini-2.5-pro" => ModelPricing {
            input_cost_per_million: GEMINI_PRO_INPUT_COST,
            output_cost_per_million: GEMINI_PRO_OUTPUT_COST,
        },
        _ => ModelPricing {
            input_cost_per_million: DEFAULT_INPUT_COST_PER_MILLION,
            output_cost_per_million: DEFAULT_OUTPUT_COST_PER_MILLION,
        },
    }
}
