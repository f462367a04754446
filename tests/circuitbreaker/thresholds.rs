use super::{breaker_with, fail_times};
use fusebox_circuitbreaker::{CircuitBreaker, CircuitState};
use fusebox_storage::{MemoryStorage, Storage};

/// One failure below the threshold keeps the circuit closed.
#[tokio::test]
async fn below_threshold_stays_closed() {
    let (cb, _clock) = breaker_with(MemoryStorage::new(), 5, 60);

    fail_times(&cb, "svc", 4).await;

    assert!(!cb.is_open("svc").await.unwrap());
    assert_eq!(cb.state("svc").await.unwrap(), CircuitState::Closed);
    assert_eq!(cb.failure_count("svc").await.unwrap(), 4);
}

/// Reaching the threshold exactly opens the circuit.
#[tokio::test]
async fn exactly_at_threshold_opens() {
    let (cb, _clock) = breaker_with(MemoryStorage::new(), 5, 60);

    fail_times(&cb, "svc", 5).await;

    assert!(cb.is_open("svc").await.unwrap());
}

/// A threshold of one trips on the first failure.
#[tokio::test]
async fn threshold_of_one() {
    let (cb, _clock) = breaker_with(MemoryStorage::new(), 1, 60);

    cb.attempt_failure("svc").await.unwrap();

    assert!(cb.is_open("svc").await.unwrap());
}

/// Failures are not windowed: they accumulate until a success resets them.
#[tokio::test]
async fn failures_accumulate_across_time() {
    let (cb, clock) = breaker_with(MemoryStorage::new(), 3, 60);

    cb.attempt_failure("svc").await.unwrap();
    clock.advance(3_600);
    cb.attempt_failure("svc").await.unwrap();
    clock.advance(86_400);
    cb.attempt_failure("svc").await.unwrap();

    assert!(cb.is_open("svc").await.unwrap());
}

/// A success in between resets the count.
#[tokio::test]
async fn success_resets_count() {
    let (cb, _clock) = breaker_with(MemoryStorage::new(), 3, 60);

    fail_times(&cb, "svc", 2).await;
    cb.attempt_success("svc").await.unwrap();
    fail_times(&cb, "svc", 2).await;

    assert!(!cb.is_open("svc").await.unwrap());
    assert_eq!(cb.failure_count("svc").await.unwrap(), 2);
}

/// The default breaker opens at five failures.
#[tokio::test]
async fn default_threshold_is_five() {
    let cb = CircuitBreaker::new(MemoryStorage::new());

    fail_times(&cb, "svc", 4).await;
    assert!(!cb.is_open("svc").await.unwrap());

    cb.attempt_failure("svc").await.unwrap();
    assert!(cb.is_open("svc").await.unwrap());
}

/// The counter continues from whatever integer another writer left behind.
#[tokio::test]
async fn counter_continues_from_existing_value() {
    let storage = MemoryStorage::new();
    storage.set("circuit:svc:failures", "9", None).await.unwrap();
    let (cb, _clock) = breaker_with(storage, 10, 60);

    cb.attempt_failure("svc").await.unwrap();

    assert!(cb.is_open("svc").await.unwrap());
    assert_eq!(cb.failure_count("svc").await.unwrap(), 10);
}

/// Below the threshold only the counter is touched.
#[tokio::test]
async fn below_threshold_writes_no_state() {
    let storage = MemoryStorage::new();
    let (cb, _clock) = breaker_with(storage.clone(), 3, 60);

    fail_times(&cb, "svc", 2).await;

    assert_eq!(storage.get("circuit:svc:state").await.unwrap(), None);
    assert_eq!(storage.get("circuit:svc:lastOpened").await.unwrap(), None);
    assert_eq!(storage.get("circuit:svc:failures").await.unwrap().as_deref(), Some("2"));
}
