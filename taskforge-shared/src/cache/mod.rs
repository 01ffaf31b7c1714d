/// Read-through cache layer over Redis
///
/// The cache is an accelerator, never a source of truth: every entry can be
/// rebuilt from the database, and every operation degrades to a no-op when
/// Redis is unreachable. Callers must treat a miss and an outage the same
/// way.
///
/// - [`client`]: the `CacheClient` wrapper around `redis::aio::ConnectionManager`
/// - [`keys`]: namespaced key and invalidation-pattern builders

pub mod client;
pub mod keys;

pub use client::{CacheClient, CacheConfig, CacheError};
