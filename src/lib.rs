//! Mini Memo - per-owner memoization with bounded caches
//!
//! Caches the results of expensive operations keyed by their arguments, with
//! TTL expiration and LRU eviction. Each owning object gets its own caches.

pub mod cache;
pub mod config;
pub mod error;
pub mod memo;
pub mod tasks;

pub use cache::{BoundedCache, CacheStats};
pub use config::Config;
pub use error::{MemoError, Result};
pub use memo::{
    Callback, CleanupOutcome, MemoOptions, Memoizable, MemoizationManager, MemoizedExt, Memoizer,
};
pub use tasks::spawn_cleanup_task;
