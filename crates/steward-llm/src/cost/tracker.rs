//! Cost tracker with daily/monthly buckets and hard spend caps
//!
//! Buckets roll over when the wall-clock date/month key changes, not on a
//! timer. The record is persisted through [`Storage`] after every update;
//! a persisted bucket whose period key is stale is discarded at load, never
//! carried forward.

use super::pricing::pricing_for;
use crate::error::{Error, Result, SpendPeriod};
use crate::storage::Storage;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Storage key for the persisted cost record
const COST_RECORD_KEY: &str = "cost-record";

/// One calendar day of spend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyUsage {
    /// Date key, `YYYY-MM-DD`
    pub date: String,
    /// Spend in USD
    pub cost: f64,
    /// Total tokens (input + output)
    pub tokens: u64,
}

/// One calendar month of spend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonthlyUsage {
    /// Month key, `YYYY-MM`
    pub month: String,
    /// Spend in USD
    pub cost: f64,
    /// Total tokens (input + output)
    pub tokens: u64,
}

/// Lifetime accumulators for one model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelUsage {
    /// Spend in USD
    pub cost: f64,
    /// Total tokens (input + output)
    pub tokens: u64,
    /// Number of calls
    pub calls: u64,
}

/// The persisted cost state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostRecord {
    /// Current-day bucket
    pub daily: DailyUsage,
    /// Current-month bucket
    pub monthly: MonthlyUsage,
    /// Per-model lifetime usage
    pub models: HashMap<String, ModelUsage>,
}

/// Hard caps and the alert threshold
#[derive(Debug, Clone, Copy)]
pub struct SpendLimits {
    /// Daily hard cap (USD)
    pub daily: f64,
    /// Monthly hard cap (USD)
    pub monthly: f64,
    /// Fraction of a budget that triggers a warning
    pub alert_threshold: f64,
}

/// Spend tracker backed by a [`Storage`] record
pub struct CostTracker {
    storage: Arc<dyn Storage>,
    limits: SpendLimits,
    record: Mutex<CostRecord>,
}

impl CostTracker {
    /// Create a tracker, reloading any persisted record
    ///
    /// Stale daily/monthly buckets (period key different from today's) are
    /// zeroed on load. Per-model usage has no period key and survives.
    pub fn new(storage: Arc<dyn Storage>, limits: SpendLimits) -> Self {
        let mut record = match storage.get(COST_RECORD_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Corrupt cost record, starting fresh");
                CostRecord::default()
            }),
            Ok(None) => CostRecord::default(),
            Err(e) => {
                warn!(error = %e, "Unreadable cost record, starting fresh");
                CostRecord::default()
            }
        };
        Self::roll_over(&mut record, &date_key(), &month_key());

        Self {
            storage,
            limits,
            record: Mutex::new(record),
        }
    }

    /// Record the cost of one completed call
    ///
    /// Rolls period buckets on key change, accumulates, persists, and warns
    /// when a budget crosses the alert threshold. Returns the computed cost.
    pub fn track(&self, model: &str, input_tokens: u32, output_tokens: u32) -> f64 {
        let cost = pricing_for(model).calculate_cost(input_tokens, output_tokens);
        let tokens = u64::from(input_tokens) + u64::from(output_tokens);

        let mut record = self.lock();
        Self::roll_over(&mut record, &date_key(), &month_key());

        let daily_before = record.daily.cost;
        let monthly_before = record.monthly.cost;

        record.daily.cost += cost;
        record.daily.tokens += tokens;
        record.monthly.cost += cost;
        record.monthly.tokens += tokens;

        let usage = record.models.entry(model.to_string()).or_default();
        usage.cost += cost;
        usage.tokens += tokens;
        usage.calls += 1;

        debug!(
            model = model,
            cost = %format!("${cost:.6}"),
            daily = %format!("${:.4}", record.daily.cost),
            monthly = %format!("${:.4}", record.monthly.cost),
            "Tracked call cost"
        );

        self.warn_on_crossing(
            SpendPeriod::Daily,
            daily_before,
            record.daily.cost,
            self.limits.daily,
        );
        self.warn_on_crossing(
            SpendPeriod::Monthly,
            monthly_before,
            record.monthly.cost,
            self.limits.monthly,
        );

        self.persist(&record);
        cost
    }

    /// Fail if a hard cap is already met or exceeded
    ///
    /// Evaluated before every paid call, ahead of the cache lookup.
    pub fn check_limits(&self) -> Result<()> {
        let mut record = self.lock();
        Self::roll_over(&mut record, &date_key(), &month_key());

        if record.daily.cost >= self.limits.daily {
            return Err(Error::SpendingLimit {
                period: SpendPeriod::Daily,
                spent: record.daily.cost,
                limit: self.limits.daily,
            });
        }
        if record.monthly.cost >= self.limits.monthly {
            return Err(Error::SpendingLimit {
                period: SpendPeriod::Monthly,
                spent: record.monthly.cost,
                limit: self.limits.monthly,
            });
        }
        Ok(())
    }

    /// Clone of the current record, for reporting
    #[must_use]
    pub fn snapshot(&self) -> CostRecord {
        let mut record = self.lock();
        Self::roll_over(&mut record, &date_key(), &month_key());
        record.clone()
    }

    /// Compact usage summary for operator logs
    #[must_use]
    pub fn format_usage(&self) -> String {
        let record = self.snapshot();
        let mut out = format!(
            "Spend: today ${:.4} / ${:.2}, month ${:.4} / ${:.2}\n",
            record.daily.cost, self.limits.daily, record.monthly.cost, self.limits.monthly
        );
        let mut models: Vec<_> = record.models.iter().collect();
        models.sort_by(|a, b| {
            b.1.cost
                .partial_cmp(&a.1.cost)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for (model, usage) in models {
            out.push_str(&format!(
                "  {model}: ${:.4} over {} calls ({} tokens)\n",
                usage.cost, usage.calls, usage.tokens
            ));
        }
        out
    }

    /// Zero any bucket whose period key no longer matches
    fn roll_over(record: &mut CostRecord, date: &str, month: &str) {
        if record.daily.date != date {
            if !record.daily.date.is_empty() {
                debug!(
                    from = %record.daily.date,
                    to = %date,
                    "Daily cost bucket rolled over"
                );
            }
            record.daily = DailyUsage {
                date: date.to_string(),
                ..DailyUsage::default()
            };
        }
        if record.monthly.month != month {
            if !record.monthly.month.is_empty() {
                debug!(
                    from = %record.monthly.month,
                    to = %month,
                    "Monthly cost bucket rolled over"
                );
            }
            record.monthly = MonthlyUsage {
                month: month.to_string(),
                ..MonthlyUsage::default()
            };
        }
    }

    fn warn_on_crossing(&self, period: SpendPeriod, before: f64, after: f64, limit: f64) {
        let alert_at = limit * self.limits.alert_threshold;
        if before < alert_at && after >= alert_at {
            warn!(
                period = %period,
                spent = %format!("${after:.4}"),
                limit = %format!("${limit:.2}"),
                "Spend crossed alert threshold"
            );
        }
    }

    /// Best-effort persistence; a write failure is logged, not fatal
    fn persist(&self, record: &CostRecord) {
        match serde_json::to_string(record) {
            Ok(raw) => {
                if let Err(e) = self.storage.put(COST_RECORD_KEY, &raw) {
                    warn!(error = %e, "Failed to persist cost record");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize cost record"),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CostRecord> {
        self.record.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(test)]
    pub(super) fn roll_over_for_test(record: &mut CostRecord, date: &str, month: &str) {
        Self::roll_over(record, date, month);
    }
}

/// Today's bucket key, `YYYY-MM-DD`
fn date_key() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// This month's bucket key, `YYYY-MM`
fn month_key() -> String {
    Utc::now().format("%Y-%m").to_string()
}
