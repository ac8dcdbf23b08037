//! Tests for cost module

use super::*;
use crate::error::Error;
use crate::storage::{MemoryStorage, Storage};
use std::sync::Arc;

fn limits(daily: f64, monthly: f64) -> SpendLimits {
    SpendLimits {
        daily,
        monthly,
        alert_threshold: 0.8,
    }
}

fn tracker(daily: f64, monthly: f64) -> CostTracker {
    CostTracker::new(Arc::new(MemoryStorage::new()), limits(daily, monthly))
}

#[test]
fn test_pricing_calculation() {
    let pricing = pricing_for("gemini-2.5-pro");
    // 1M in at $1.25 + 1M out at $10.00
    let cost = pricing.calculate_cost(1_000_000, 1_000_000);
    assert!((cost - 11.25).abs() < 1e-9);

    // 10K in, 2K out
    let cost = pricing.calculate_cost(10_000, 2_000);
    assert!((cost - (0.0125 + 0.02)).abs() < 1e-9);
}

#[test]
fn test_unknown_model_uses_default_pricing() {
    let pricing = pricing_for("mystery-model-9000");
    assert!((pricing.input_cost_per_million - DEFAULT_INPUT_COST_PER_MILLION).abs() < f64::EPSILON);
    assert!(
        (pricing.output_cost_per_million - DEFAULT_OUTPUT_COST_PER_MILLION).abs() < f64::EPSILON
    );
    assert!(pricing.calculate_cost(1_000_000, 0) > 0.0);
}

#[test]
fn test_track_accumulates_all_buckets() {
    let tracker = tracker(100.0, 1000.0);

    let cost = tracker.track("gemini-2.5-flash", 1_000_000, 100_000);
    // $0.30 input + $0.25 output
    assert!((cost - 0.55).abs() < 1e-9);

    tracker.track("gemini-2.5-flash", 1_000_000, 100_000);
    tracker.track("gemini-2.5-pro", 100_000, 0);

    let snap = tracker.snapshot();
    assert!((snap.daily.cost - (0.55 * 2.0 + 0.125)).abs() < 1e-9);
    assert!((snap.monthly.cost - snap.daily.cost).abs() < 1e-9);
    assert_eq!(snap.daily.tokens, 2 * 1_100_000 + 100_000);

    let flash = &snap.models["gemini-2.5-flash"];
    assert_eq!(flash.calls, 2);
    assert!((flash.cost - 1.10).abs() < 1e-9);
}

#[test]
fn test_daily_rollover_preserves_monthly() {
    let mut record = CostRecord::default();
    CostTracker::roll_over_for_test(&mut record, "2026-08-28", "2026-08");
    record.daily.cost = 1.5;
    record.daily.tokens = 100;
    record.monthly.cost = 10.0;
    record.monthly.tokens = 800;

    // Next day, same month: daily resets, monthly survives
    CostTracker::roll_over_for_test(&mut record, "2026-08-29", "2026-08");
    assert_eq!(record.daily.date, "2026-08-29");
    assert!((record.daily.cost).abs() < f64::EPSILON);
    assert_eq!(record.daily.tokens, 0);
    assert!((record.monthly.cost - 10.0).abs() < f64::EPSILON);

    // New month: both reset
    CostTracker::roll_over_for_test(&mut record, "2026-09-01", "2026-09");
    assert_eq!(record.monthly.month, "2026-09");
    assert!((record.monthly.cost).abs() < f64::EPSILON);
}

#[test]
fn test_check_limits_trips_daily_cap() {
    // $1.00 daily cap, $0.60 per call
    let tracker = tracker(1.0, 100.0);

    assert!(tracker.check_limits().is_ok());
    tracker.track("gemini-2.5-flash", 2_000_000, 0); // $0.60
    assert!(tracker.check_limits().is_ok());
    tracker.track("gemini-2.5-flash", 2_000_000, 0); // $1.20 total

    match tracker.check_limits() {
        Err(Error::SpendingLimit { period, spent, limit }) => {
            assert_eq!(period, crate::error::SpendPeriod::Daily);
            assert!(spent >= limit);
        }
        other => panic!("expected SpendingLimit, got {other:?}"),
    }
}

#[test]
fn test_check_limits_trips_monthly_cap() {
    let tracker = tracker(100.0, 0.5);
    tracker.track("gemini-2.5-flash", 2_000_000, 0); // $0.60
    match tracker.check_limits() {
        Err(Error::SpendingLimit { period, .. }) => {
            assert_eq!(period, crate::error::SpendPeriod::Monthly);
        }
        other => panic!("expected SpendingLimit, got {other:?}"),
    }
}

#[test]
fn test_record_persists_and_reloads() {
    let storage = Arc::new(MemoryStorage::new());
    {
        let tracker = CostTracker::new(storage.clone(), limits(100.0, 1000.0));
        tracker.track("gemini-2.5-flash", 1_000_000, 0);
    }

    // Same period: reload keeps today's spend
    let tracker = CostTracker::new(storage.clone(), limits(100.0, 1000.0));
    let snap = tracker.snapshot();
    assert!((snap.daily.cost - 0.30).abs() < 1e-9);
    assert_eq!(snap.models["gemini-2.5-flash"].calls, 1);
}

#[test]
fn test_stale_persisted_period_is_discarded() {
    let storage = Arc::new(MemoryStorage::new());
    let stale = CostRecord {
        daily: DailyUsage {
            date: "1999-01-01".to_string(),
            cost: 42.0,
            tokens: 1,
        },
        monthly: MonthlyUsage {
            month: "1999-01".to_string(),
            cost: 99.0,
            tokens: 1,
        },
        models: std::collections::HashMap::new(),
    };
    storage
        .put("cost-record", &serde_json::to_string(&stale).unwrap())
        .unwrap();

    let tracker = CostTracker::new(storage, limits(1.0, 10.0));
    // Stale spend must not trip today's limits
    assert!(tracker.check_limits().is_ok());
    let snap = tracker.snapshot();
    assert!((snap.daily.cost).abs() < f64::EPSILON);
    assert!((snap.monthly.cost).abs() < f64::EPSILON);
}

#[test]
fn test_corrupt_record_starts_fresh() {
    let storage = Arc::new(MemoryStorage::new());
    storage.put("cost-record", "{ not json").unwrap();

    let tracker = CostTracker::new(storage, limits(1.0, 10.0));
    assert!(tracker.check_limits().is_ok());
}

#[test]
fn test_format_usage_mentions_models() {
    let tracker = tracker(100.0, 1000.0);
    tracker.track("gemini-2.5-pro", 10_000, 5_000);

    let report = tracker.format_usage();
    assert!(report.contains("gemini-2.5-pro"));
    assert!(report.contains("Spend:"));
}
