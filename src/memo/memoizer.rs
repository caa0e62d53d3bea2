//! Memoizer Module
//!
//! Declares operations of an owner type as memoized and routes calls to them
//! through the owner's [`MemoizationManager`].

use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::info;

use crate::error::{MemoError, Result};
use crate::memo::{Callback, CleanupOutcome, MemoizationManager};

// == Memo Options ==
/// Cache configuration of one memoized operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoOptions {
    /// Lifetime of each cached result
    pub ttl: Duration,
    /// Maximum number of cached results per owner
    pub max_size: usize,
}

impl Default for MemoOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            max_size: 100,
        }
    }
}

impl MemoOptions {
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self { ttl, max_size }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Rejects zero ttl or max_size for `operation`.
    pub fn validate(&self, operation: &str) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(MemoError::configuration(operation, "ttl must be positive"));
        }
        if self.max_size == 0 {
            return Err(MemoError::configuration(operation, "max_size must be positive"));
        }
        Ok(())
    }
}

// == Memoizable ==
/// An owner type whose operations can be memoized.
///
/// Implementors embed a [`MemoizationManager`] and expose their un-memoized
/// operations through [`Memoizable::call_original`].
pub trait Memoizable: Send + Sync {
    /// Result type shared by the owner's operations
    type Output: Clone + Send + 'static;

    /// Identifiers of every operation the type implements.
    fn operations() -> &'static [&'static str];

    /// The owner's memoization state.
    fn memo(&self) -> &MemoizationManager<Self::Output>;

    /// Runs the original, un-memoized implementation of `operation`.
    fn call_original(
        &self,
        operation: &str,
        args: &[Value],
        callback: Option<&Callback>,
    ) -> anyhow::Result<Self::Output>;
}

// == Memoizer ==
/// Declaration table of memoized operations for an owner type.
///
/// Declaring is done once per operation, typically at startup; the table is
/// then shared by every owner instance of `T`.
pub struct Memoizer<T> {
    declarations: RwLock<HashMap<String, MemoOptions>>,
    _owner: PhantomData<fn(&T)>,
}

impl<T: Memoizable> Default for Memoizer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Memoizable> Memoizer<T> {
    pub fn new() -> Self {
        Self {
            declarations: RwLock::new(HashMap::new()),
            _owner: PhantomData,
        }
    }

    // == Memoize ==
    /// Declares `operation` as memoized with `options`.
    ///
    /// Fails if `T` has no such operation, if the options are not positive, or
    /// if the operation was already declared with different options.
    /// Repeating an identical declaration is a no-op.
    pub fn memoize(&self, operation: &str, options: MemoOptions) -> Result<()> {
        if !T::operations().iter().any(|known| *known == operation) {
            return Err(MemoError::configuration(
                operation,
                "no such operation on the owner type",
            ));
        }
        options.validate(operation)?;

        let mut declarations = self.declarations.write();
        if let Some(existing) = declarations.get(operation) {
            if *existing == options {
                return Ok(());
            }
            return Err(MemoError::configuration(
                operation,
                format!(
                    "already memoized with ttl={:?} max_size={}, refusing ttl={:?} max_size={}",
                    existing.ttl, existing.max_size, options.ttl, options.max_size
                ),
            ));
        }

        declarations.insert(operation.to_string(), options);
        info!(operation, ttl = ?options.ttl, max_size = options.max_size, "memoized operation");
        Ok(())
    }

    // == Call ==
    /// Invokes `operation` on `owner`.
    ///
    /// Declared operations are served from the owner's cache; anything else
    /// goes straight to the original implementation.
    pub fn call(
        &self,
        owner: &T,
        operation: &str,
        args: &[Value],
        callback: Option<&Callback>,
    ) -> anyhow::Result<T::Output> {
        let Some(options) = self.options(operation) else {
            return owner.call_original(operation, args, callback);
        };

        owner.memo().fetch_or_compute(
            operation,
            options.ttl,
            options.max_size,
            args,
            callback,
            |args, callback| owner.call_original(operation, args, callback),
        )
    }

    pub fn is_declared(&self, operation: &str) -> bool {
        self.declarations.read().contains_key(operation)
    }

    pub fn options(&self, operation: &str) -> Option<MemoOptions> {
        self.declarations.read().get(operation).copied()
    }
}

// == Memoized Ext ==
/// Per-instance management calls available on every [`Memoizable`] owner.
pub trait MemoizedExt: Memoizable {
    /// Drops the cached results of one operation on this owner.
    fn clear_memoized_operation(&self, operation: &str) -> bool {
        self.memo().clear(operation)
    }

    /// Drops every cached result on this owner.
    fn clear_all_memoized_operations(&self) -> usize {
        self.memo().clear_all()
    }

    /// Sweeps expired results from every cache on this owner.
    fn cleanup_memoized_operations(&self) -> BTreeMap<String, CleanupOutcome> {
        self.memo().cleanup_all()
    }

    /// Whether `operation` has a cache on this owner.
    fn is_memoized(&self, operation: &str) -> bool {
        self.memo().exists(operation)
    }
}

impl<T: Memoizable> MemoizedExt for T {}
