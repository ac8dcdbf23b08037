//! Cost tracking against daily and monthly budgets
//!
//! # Module Structure
//!
//! - `pricing`: static per-model rates with a default fallback
//! - `tracker`: period-bucketed accumulators, spend limits, persistence

mod pricing;
mod tracker;

pub use pricing::{
    pricing_for, ModelPricing, DEFAULT_INPUT_COST_PER_MILLION, DEFAULT_OUTPUT_COST_PER_MILLION,
};
pub use tracker::{CostRecord, CostTracker, DailyUsage, ModelUsage, MonthlyUsage, SpendLimits};

#[cfg(test)]
mod tests;
