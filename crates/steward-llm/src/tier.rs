//! Model tier selection
//!
//! Selection is a pure function of the prompt size and configured
//! thresholds; a forced model bypasses tier logic entirely. Swapping tiers
//! only changes the model name - sampling parameters stay fixed on the
//! client instance.

use crate::config::ClientConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Model tier for cost/performance optimization
///
/// Tiers are ordered by cost (ascending) and quality (ascending).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Cheapest tier for short prompts
    Cheap,
    /// Balanced tier for typical prompts
    Standard,
    /// Premium tier for large, complex prompts
    Premium,
}

impl ModelTier {
    /// The configured model name for this tier
    #[must_use]
    pub fn model<'a>(&self, config: &'a ClientConfig) -> &'a str {
        match self {
            Self::Cheap => &config.tiers.cheap,
            Self::Standard => &config.tiers.standard,
            Self::Premium => &config.tiers.premium,
        }
    }
}

/// Coarse token estimate: one token per four characters
///
/// Exact tokenization is an optimization, not a correctness requirement;
/// the thresholds are calibrated for this heuristic.
#[must_use]
pub fn estimate_tokens(prompt: &str) -> u32 {
    (prompt.len() / 4) as u32
}

/// Pick a tier from the estimated prompt size
#[must_use]
pub fn tier_for_prompt(prompt: &str, config: &ClientConfig) -> ModelTier {
    let estimated = estimate_tokens(prompt);
    if estimated < config.simple_threshold {
        ModelTier::Cheap
    } else if estimated < config.standard_threshold {
        ModelTier::Standard
    } else {
        ModelTier::Premium
    }
}

/// Resolve the model for a call: an explicit override wins, otherwise
/// the tier policy applies
#[must_use]
pub fn select_model(prompt: &str, config: &ClientConfig, force_model: Option<&str>) -> String {
    if let Some(forced) = force_model {
        debug!(model = forced, "Using forced model, bypassing tier selection");
        return forced.to_string();
    }

    let tier = tier_for_prompt(prompt, config);
    let model = tier.model(config);
    debug!(
        tier = ?tier,
        model = model,
        estimated_tokens = estimate_tokens(prompt),
        "Selected model tier"
    );
    model.to_string()
}
