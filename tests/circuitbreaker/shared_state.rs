use super::{breaker_with, fail_times};
use fusebox_circuitbreaker::{CircuitBreaker, CircuitState, ManualClock};
use fusebox_storage::{MemoryStorage, RedisStorage, Storage};
use fusebox_tests::{init_tracing, FakeRedis};
use std::time::Duration;

/// Breakers on clones of one in-process backend see each other's state.
#[tokio::test]
async fn memory_backend_is_shared_by_clones() {
    let storage = MemoryStorage::new();
    let (worker_a, clock) = breaker_with(storage.clone(), 2, 30);
    let worker_b = CircuitBreaker::builder(storage)
        .failure_threshold(2)
        .timeout_period(Duration::from_secs(30))
        .clock(clock.clone())
        .build()
        .unwrap();

    worker_a.attempt_failure("svc").await.unwrap();
    worker_b.attempt_failure("svc").await.unwrap();

    assert!(worker_a.is_open("svc").await.unwrap());
    assert!(worker_b.is_open("svc").await.unwrap());
}

/// Two breakers with their own connections trip and recover together.
#[tokio::test]
async fn redis_backend_is_shared_across_connections() {
    init_tracing();
    let server = FakeRedis::start().await.unwrap();
    let clock = ManualClock::new(super::T0);

    let build = || {
        CircuitBreaker::builder(RedisStorage::from_settings(server.settings()))
            .failure_threshold(3)
            .timeout_period(Duration::from_secs(60))
            .clock(clock.clone())
            .build()
            .unwrap()
    };
    let host_a = build();
    let host_b = build();

    fail_times(&host_a, "payments", 2).await;
    host_b.attempt_failure("payments").await.unwrap();

    assert!(host_a.is_open("payments").await.unwrap());
    assert!(host_b.is_open("payments").await.unwrap());

    clock.advance(61);
    assert!(!host_b.is_open("payments").await.unwrap());
    assert_eq!(host_a.state("payments").await.unwrap(), CircuitState::HalfOpen);

    host_b.attempt_success("payments").await.unwrap();
    assert!(!host_a.is_open("payments").await.unwrap());
    assert_eq!(host_a.failure_count("payments").await.unwrap(), 0);

    assert_eq!(
        server.store().get("circuit:payments:state").await.unwrap().as_deref(),
        Some("closed")
    );
}

/// The entry TTL reaches the server as SET PX plus PEXPIRE on the counter.
#[tokio::test]
async fn redis_entry_ttl_commands() {
    let server = FakeRedis::start().await.unwrap();
    let cb = CircuitBreaker::builder(RedisStorage::from_settings(server.settings()))
        .failure_threshold(1)
        .entry_ttl(Duration::from_secs(600))
        .clock(ManualClock::new(super::T0))
        .build()
        .unwrap();

    cb.attempt_failure("svc").await.unwrap();

    let commands = server.commands();
    let expected: Vec<Vec<String>> = [
        vec!["INCR", "circuit:svc:failures"],
        vec!["PEXPIRE", "circuit:svc:failures", "600000"],
        vec!["SET", "circuit:svc:state", "open", "PX", "600000"],
        vec!["SET", "circuit:svc:lastOpened", "1700000000", "PX", "600000"],
    ]
    .into_iter()
    .map(|args| args.into_iter().map(String::from).collect())
    .collect();
    assert_eq!(commands, expected);
}

/// An unreachable Redis server surfaces as a connection error, never as a state.
#[tokio::test]
async fn redis_unreachable_is_an_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let cb = CircuitBreaker::new(RedisStorage::new("127.0.0.1", port));

    let err = cb.is_open("svc").await.unwrap_err();
    assert!(err.is_connection());
    assert!(cb.attempt_failure("svc").await.is_err());
    assert!(cb.attempt_success("svc").await.is_err());
}
