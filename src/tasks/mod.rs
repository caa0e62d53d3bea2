//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside memoized owners.
//!
//! # Tasks
//! - TTL Cleanup: Sweeps expired memoized results at a configured interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
