//! Cache Module
//!
//! Provides bounded in-memory caching with TTL expiration and LRU eviction.

mod bounded;
mod entry;
mod lru;
mod stats;


// Re-export public types
pub use bounded::BoundedCache;
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use stats::CacheStats;
