use super::{breaker_with, fail_times, T0};
use fusebox_circuitbreaker::CircuitState;
use fusebox_storage::{MemoryStorage, Storage};
use fusebox_tests::RecordingStorage;
use std::sync::Arc;

/// The check that observes the elapsed timeout writes half-open and nothing else.
#[tokio::test]
async fn elapsed_check_writes_half_open_only() {
    let storage = Arc::new(RecordingStorage::new(MemoryStorage::new()));
    let (cb, clock) = breaker_with(Arc::clone(&storage), 2, 10);

    fail_times(&cb, "svc", 2).await;
    storage.clear();
    clock.advance(11);

    assert!(!cb.is_open("svc").await.unwrap());
    assert_eq!(
        storage.writes(),
        vec![("circuit:svc:state".to_owned(), "half-open".to_owned())]
    );
    // lastOpened and the counter are untouched
    assert_eq!(
        storage.inner().get("circuit:svc:lastOpened").await.unwrap(),
        Some(T0.to_string())
    );
    assert_eq!(cb.failure_count("svc").await.unwrap(), 2);
}

/// Half-open is not open: every check passes until an outcome is reported.
#[tokio::test]
async fn half_open_admits_every_check() {
    let storage = Arc::new(RecordingStorage::new(MemoryStorage::new()));
    let (cb, clock) = breaker_with(Arc::clone(&storage), 1, 10);

    cb.attempt_failure("svc").await.unwrap();
    clock.advance(11);
    assert!(!cb.is_open("svc").await.unwrap());
    storage.clear();

    for _ in 0..5 {
        assert!(!cb.is_open("svc").await.unwrap());
    }
    assert!(storage.writes().is_empty());
    assert_eq!(cb.state("svc").await.unwrap(), CircuitState::HalfOpen);
}

/// A successful trial call closes the circuit and clears the counter.
#[tokio::test]
async fn successful_trial_closes() {
    let (cb, clock) = breaker_with(MemoryStorage::new(), 3, 10);

    fail_times(&cb, "svc", 3).await;
    clock.advance(11);
    assert!(!cb.is_open("svc").await.unwrap());

    cb.attempt_success("svc").await.unwrap();

    assert_eq!(cb.state("svc").await.unwrap(), CircuitState::Closed);
    assert_eq!(cb.failure_count("svc").await.unwrap(), 0);

    // needs a full threshold of new failures to trip again
    fail_times(&cb, "svc", 2).await;
    assert!(!cb.is_open("svc").await.unwrap());
}

/// A failed trial call re-opens immediately with a fresh open timestamp.
#[tokio::test]
async fn failed_trial_reopens() {
    let storage = MemoryStorage::new();
    let (cb, clock) = breaker_with(storage.clone(), 3, 10);

    fail_times(&cb, "svc", 3).await;
    clock.advance(11);
    assert!(!cb.is_open("svc").await.unwrap());

    cb.attempt_failure("svc").await.unwrap();

    assert_eq!(cb.state("svc").await.unwrap(), CircuitState::Open);
    assert_eq!(cb.failure_count("svc").await.unwrap(), 4);
    assert_eq!(
        storage.get("circuit:svc:lastOpened").await.unwrap(),
        Some((T0 + 11).to_string())
    );

    // the full timeout applies again from the re-open
    clock.advance(10);
    assert!(cb.is_open("svc").await.unwrap());
    clock.advance(1);
    assert!(!cb.is_open("svc").await.unwrap());
}

/// The transition is lazy: nothing changes until someone checks.
#[tokio::test]
async fn transition_happens_on_check_only() {
    let (cb, clock) = breaker_with(MemoryStorage::new(), 1, 10);

    cb.attempt_failure("svc").await.unwrap();
    clock.advance(3_600);

    assert_eq!(cb.state("svc").await.unwrap(), CircuitState::Open);
    assert!(!cb.is_open("svc").await.unwrap());
    assert_eq!(cb.state("svc").await.unwrap(), CircuitState::HalfOpen);
}
