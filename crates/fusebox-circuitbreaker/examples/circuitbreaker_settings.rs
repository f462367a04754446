//! Builds a breaker from JSON configuration and a custom backend registry.
//!
//! Run with:
//! ```sh
//! cargo run -p fusebox-circuitbreaker --example circuitbreaker_settings --features serde
//! ```

use fusebox_circuitbreaker::BreakerSettings;
use fusebox_storage::{MemoryStorage, SharedStorage, StorageRegistry};
use std::sync::Arc;

const CONFIG: &str = r#"{
    "storage_service": "process-wide",
    "failure_threshold": 2,
    "timeout_period": 120,
    "entry_ttl": 3600,
    "name": "billing"
}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Circuit Breaker Settings Example");
    println!("================================\n");

    let settings: BreakerSettings = serde_json::from_str(CONFIG)?;
    println!("Loaded: {settings:#?}\n");

    // Every breaker built from this registry shares one in-process store.
    let shared = MemoryStorage::new();
    let mut registry = StorageRegistry::with_defaults();
    {
        let shared = shared.clone();
        registry.register("process-wide", move |_| {
            Ok(Arc::new(shared.clone()) as SharedStorage)
        });
    }
    println!("Registered backends: {:?}\n", registry.backends());

    let worker_a = settings.build_with(&registry)?;
    let worker_b = settings.build_with(&registry)?;

    worker_a.attempt_failure("ledger").await?;
    worker_b.attempt_failure("ledger").await?;
    println!("Two workers each saw one failure");
    println!("  worker_a sees open: {}", worker_a.is_open("ledger").await?);
    println!("  worker_b sees open: {}", worker_b.is_open("ledger").await?);
    println!("  entries in shared store: {}\n", shared.len());

    let bad = BreakerSettings {
        entry_ttl: Some(60),
        ..settings
    };
    match bad.build_with(&registry) {
        Ok(_) => println!("unexpectedly accepted"),
        Err(err) => println!("Rejected configuration: {err}"),
    }
    Ok(())
}
