//! Exercises the Redis backend against a live server.
//!
//! Reads `REDIS_HOST` and `REDIS_PORT` (default `127.0.0.1:6379`).
//!
//! Run with:
//! ```sh
//! cargo run -p fusebox-storage --example storage_redis
//! ```

use fusebox_storage::{RedisSettings, RedisStorage, Storage};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Redis Storage Example");
    println!("=====================\n");

    let host = std::env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".into());
    let port = match std::env::var("REDIS_PORT") {
        Ok(port) => port.parse()?,
        Err(_) => 6379,
    };
    let storage = RedisStorage::from_settings(
        RedisSettings::new(host, port).timeout(Duration::from_secs(1)),
    );
    println!("Using {storage:?}\n");

    let key = "fusebox:example:hits";
    match storage.increment(key).await {
        Ok(hits) => println!("INCR {key} -> {hits}"),
        Err(err) => {
            println!("Redis unavailable: {err}");
            println!("Start a server (e.g. `redis-server`) and run again.");
            return Ok(());
        }
    }

    storage.expire(key, Duration::from_secs(30)).await?;
    println!("PEXPIRE {key} 30000");

    storage
        .set("fusebox:example:greeting", "hello", Some(Duration::from_secs(5)))
        .await?;
    let greeting = storage.get("fusebox:example:greeting").await?;
    println!("GET fusebox:example:greeting -> {greeting:?}");

    tokio::time::sleep(Duration::from_millis(5_100)).await;
    let greeting = storage.get("fusebox:example:greeting").await?;
    println!("after 5s TTL -> {greeting:?}");
    Ok(())
}
