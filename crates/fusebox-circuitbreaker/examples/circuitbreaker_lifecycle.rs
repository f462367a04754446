//! Walks one service through a full circuit breaker lifecycle.
//!
//! A manual clock stands in for wall time so the open timeout can be skipped
//! instead of waited out.
//!
//! Run with:
//! ```sh
//! cargo run -p fusebox-circuitbreaker --example circuitbreaker_lifecycle
//! ```

use fusebox_circuitbreaker::{CircuitBreaker, ManualClock};
use fusebox_storage::MemoryStorage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A dependency that fails while `down` is set.
struct Inventory {
    down: AtomicBool,
}

impl Inventory {
    async fn reserve(&self, sku: &str) -> Result<String, String> {
        if self.down.load(Ordering::SeqCst) {
            Err(format!("inventory unavailable for {sku}"))
        } else {
            Ok(format!("reserved {sku}"))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Circuit Breaker Lifecycle Example");
    println!("=================================\n");

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let clock = ManualClock::new(i64::try_from(now)?);

    let breaker = CircuitBreaker::builder(MemoryStorage::new())
        .failure_threshold(3)
        .timeout_period(Duration::from_secs(30))
        .clock(clock.clone())
        .name("checkout")
        .on_state_transition(|service, state| {
            println!("  [EVENT] {service} -> {state}");
        })
        .on_call_rejected(|service| println!("  [EVENT] call to {service} skipped"))
        .build()?;

    let inventory = Inventory {
        down: AtomicBool::new(true),
    };

    let call = |sku: &'static str| {
        let breaker = &breaker;
        let inventory = &inventory;
        async move {
            if breaker.is_open("inventory").await? {
                println!("  {sku}: served from fallback");
                return Ok::<_, fusebox_storage::StorageError>(());
            }
            match inventory.reserve(sku).await {
                Ok(msg) => {
                    println!("  {sku}: {msg}");
                    breaker.attempt_success("inventory").await?;
                }
                Err(msg) => {
                    println!("  {sku}: {msg}");
                    breaker.attempt_failure("inventory").await?;
                }
            }
            Ok(())
        }
    };

    println!("Phase 1: dependency down, failures accumulate");
    for sku in ["sku-1", "sku-2", "sku-3"] {
        call(sku).await?;
    }
    println!();

    println!("Phase 2: circuit open, calls skipped");
    call("sku-4").await?;
    call("sku-5").await?;
    println!();

    println!("Phase 3: 31 seconds later the dependency has recovered");
    clock.advance(31);
    inventory.down.store(false, Ordering::SeqCst);
    call("sku-6").await?;
    call("sku-7").await?;
    println!();

    println!(
        "Final state: {} ({} failures)",
        breaker.state("inventory").await?,
        breaker.failure_count("inventory").await?
    );
    Ok(())
}
