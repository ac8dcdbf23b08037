//! Tests for the circuit breaker

use super::*;

fn breaker(failures: u32, successes: u32, recovery: Duration) -> CircuitBreaker {
    CircuitBreaker::new(
        CircuitBreakerConfig::new()
            .with_consecutive_failure_threshold(failures)
            .with_half_open_success_threshold(successes)
            .with_recovery_timeout(recovery),
    )
}

#[test]
fn test_initial_state() {
    let cb = CircuitBreaker::with_defaults();
    assert_eq!(cb.state(), CircuitState::Closed);
    assert!(cb.check().is_ok());

    let snap = cb.snapshot();
    assert_eq!(snap.failures, 0);
    assert_eq!(snap.consecutive_failures, 0);
}

#[test]
fn test_opens_exactly_at_threshold() {
    let cb = breaker(3, 2, Duration::from_secs(60));

    cb.record_failure();
    assert_eq!(cb.state(), CircuitState::Closed);
    cb.record_failure();
    assert_eq!(cb.state(), CircuitState::Closed);
    cb.record_failure();
    assert_eq!(cb.state(), CircuitState::Open);

    // Further failures keep it open, no oscillation
    cb.record_failure();
    assert_eq!(cb.state(), CircuitState::Open);
}

#[test]
fn test_check_throws_while_open() {
    let cb = breaker(1, 2, Duration::from_secs(60));
    cb.record_failure();
    assert_eq!(cb.state(), CircuitState::Open);

    match cb.check() {
        Err(Error::CircuitOpen {
            retry_after_secs,
            consecutive_failures,
        }) => {
            assert!(retry_after_secs > 0);
            assert_eq!(consecutive_failures, 1);
        }
        other => panic!("expected CircuitOpen, got {other:?}"),
    }
}

#[test]
fn test_closed_success_resets_consecutive_but_not_lifetime() {
    let cb = breaker(3, 2, Duration::from_secs(60));

    cb.record_failure();
    cb.record_failure();
    let snap = cb.snapshot();
    assert_eq!(snap.consecutive_failures, 2);
    assert_eq!(snap.failures, 2);

    cb.record_success();
    let snap = cb.snapshot();
    assert_eq!(snap.consecutive_failures, 0);
    assert_eq!(snap.failures, 2);
    assert_eq!(cb.state(), CircuitState::Closed);
}

#[test]
fn test_recovery_scenario() {
    // threshold 3, recovery 1000ms: open, blocked, then half-open after the
    // timeout, then closed after 2 successes with all counters zeroed.
    let cb = breaker(3, 2, Duration::from_millis(1000));

    cb.record_failure();
    cb.record_failure();
    cb.record_failure();
    assert_eq!(cb.state(), CircuitState::Open);
    assert!(cb.check().is_err());

    std::thread::sleep(Duration::from_millis(1100));
    assert!(cb.check().is_ok());
    assert_eq!(cb.state(), CircuitState::HalfOpen);

    cb.record_success();
    assert_eq!(cb.state(), CircuitState::HalfOpen);
    cb.record_success();
    assert_eq!(cb.state(), CircuitState::Closed);

    let snap = cb.snapshot();
    assert_eq!(snap.failures, 0);
    assert_eq!(snap.consecutive_failures, 0);
    assert_eq!(snap.success_count, 0);
}

#[test]
fn test_half_open_failure_reopens() {
    let cb = breaker(2, 2, Duration::from_millis(20));

    cb.record_failure();
    cb.record_failure();
    assert_eq!(cb.state(), CircuitState::Open);

    std::thread::sleep(Duration::from_millis(30));
    assert!(cb.check().is_ok());
    assert_eq!(cb.state(), CircuitState::HalfOpen);

    cb.record_success();
    cb.record_failure();
    assert_eq!(cb.state(), CircuitState::Open);

    // A fresh probation starts with a zeroed success count
    std::thread::sleep(Duration::from_millis(30));
    assert!(cb.check().is_ok());
    assert_eq!(cb.snapshot().success_count, 0);
}

#[test]
fn test_manual_reset() {
    let cb = breaker(1, 2, Duration::from_secs(60));
    cb.record_failure();
    assert_eq!(cb.state(), CircuitState::Open);

    cb.reset();
    assert_eq!(cb.state(), CircuitState::Closed);
    assert!(cb.check().is_ok());
    assert_eq!(cb.snapshot().failures, 0);
}

#[test]
fn test_opened_for() {
    let cb = breaker(1, 2, Duration::from_secs(60));
    assert!(cb.opened_for().is_none());

    cb.record_failure();
    std::thread::sleep(Duration::from_millis(10));
    let open_for = cb.opened_for().expect("breaker should be open");
    assert!(open_for >= Duration::from_millis(10));
}

#[test]
fn test_state_display() {
    assert_eq!(format!("{}", CircuitState::Closed), "Closed");
    assert_eq!(format!("{}", CircuitState::Open), "Open");
    assert_eq!(format!("{}", CircuitState::HalfOpen), "HalfOpen");
}
