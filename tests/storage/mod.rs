//! Test organization:
//! - memory.rs: In-process backend sharing, expiry and capacity
//! - redis.rs: Redis backend against an in-process server
//! - registry.rs: Backend selection by id

mod memory;
mod redis;
mod registry;
