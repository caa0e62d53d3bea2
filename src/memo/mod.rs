//! Memo Module
//!
//! Per-owner memoization built on [`crate::cache::BoundedCache`].
//!
//! # Components
//! - `key`: deterministic cache keys and owner/callback identities
//! - `manager`: per-owner table of operation caches
//! - `memoizer`: operation declarations and the owner-facing call surface

mod key;
mod manager;
mod memoizer;

pub use key::{derive_key, CacheKey, Callback, OwnerId};
pub use manager::{CleanupOutcome, MemoizationManager, SharedCache};
pub use memoizer::{MemoOptions, Memoizable, MemoizedExt, Memoizer};
