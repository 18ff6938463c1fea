// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock store implementation for testing.
//!
//! This module provides `MockStore`, an in-memory store that records all operations
//! and supports failure injection, hanging calls, and corrupt entries for testing
//! degraded paths.

use std::{collections::HashMap, sync::Arc, time::Duration};

use parking_lot::Mutex;

use crate::{CacheStore, StoreError, StoreErrorKind};

/// Recorded store operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// A get operation was performed with the given key.
    Get(String),
    /// A set operation was performed.
    Set {
        /// The key that was written.
        key: String,
        /// The bytes that were written.
        value: Vec<u8>,
        /// The requested time-to-live.
        ttl: Option<Duration>,
    },
}

impl StoreOp {
    /// Returns the key the operation targeted.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Get(key) | Self::Set { key, .. } => key,
        }
    }

    /// Returns `true` for set operations.
    #[must_use]
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set { .. })
    }
}

type OpPredicate = Box<dyn Fn(&StoreOp) -> bool + Send + Sync>;

struct FailRule {
    kind: StoreErrorKind,
    predicate: OpPredicate,
}

/// A configurable mock store for testing.
///
/// Values live in memory. Every operation is recorded, including failed ones, so tests
/// can assert exactly which keys were read and written.
///
/// # Examples
///
/// ```no_run
/// use streamcache_store::{CacheStore, testing::{MockStore, StoreOp}};
///
/// # async fn example() {
/// let store = MockStore::new();
///
/// store.set("key", vec![1, 2, 3], None).await.unwrap();
/// assert_eq!(store.get("key").await.unwrap(), Some(vec![1, 2, 3]));
///
/// assert_eq!(store.operations(), vec![
///     StoreOp::Set { key: "key".to_string(), value: vec![1, 2, 3], ttl: None },
///     StoreOp::Get("key".to_string()),
/// ]);
/// # }
/// ```
///
/// # Failure Injection
///
/// ```no_run
/// use streamcache_store::{CacheStore, StoreErrorKind, testing::{MockStore, StoreOp}};
///
/// # async fn example() {
/// let store = MockStore::new();
///
/// // Refuse every read as if the store were down
/// store.fail_when(StoreErrorKind::Connection, |op| matches!(op, StoreOp::Get(_)));
/// assert!(store.get("key").await.is_err());
/// # }
/// ```
#[derive(Clone)]
pub struct MockStore {
    data: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    ttls: Arc<Mutex<HashMap<String, Option<Duration>>>>,
    operations: Arc<Mutex<Vec<StoreOp>>>,
    fail_when: Arc<Mutex<Option<FailRule>>>,
    hang_when: Arc<Mutex<Option<OpPredicate>>>,
}

impl std::fmt::Debug for MockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStore")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().as_ref().map(|rule| rule.kind))
            .field("hang_when", &self.hang_when.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    /// Creates a new empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            ttls: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
            hang_when: Arc::new(Mutex::new(None)),
        }
    }

    /// Places raw bytes under `key` without recording an operation.
    ///
    /// Useful for seeding entries, including deliberately undecodable ones.
    pub fn seed(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.data.lock().insert(key.into(), value.into());
    }

    /// Returns the bytes currently stored under `key`.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<Vec<u8>> {
        self.data.lock().get(key).cloned()
    }

    /// Returns the time-to-live the last write under `key` requested.
    #[must_use]
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        self.ttls.lock().get(key).copied().flatten()
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns true if the store holds the given key.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Makes operations matching `predicate` fail with an error of the given kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use streamcache_store::{StoreErrorKind, testing::{MockStore, StoreOp}};
    ///
    /// let store = MockStore::new();
    ///
    /// // Fail all operations
    /// store.fail_when(StoreErrorKind::Connection, |_| true);
    ///
    /// // Fail only writes
    /// store.fail_when(StoreErrorKind::Protocol, StoreOp::is_set);
    /// ```
    pub fn fail_when<F>(&self, kind: StoreErrorKind, predicate: F)
    where
        F: Fn(&StoreOp) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(FailRule {
            kind,
            predicate: Box::new(predicate),
        });
    }

    /// Makes operations matching `predicate` never complete.
    ///
    /// Pair this with a caller-side timeout to exercise slow-store paths.
    pub fn hang_when<F>(&self, predicate: F)
    where
        F: Fn(&StoreOp) -> bool + Send + Sync + 'static,
    {
        *self.hang_when.lock() = Some(Box::new(predicate));
    }

    /// Clears failure and hang rules, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
        *self.hang_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<StoreOp> {
        self.operations.lock().clone()
    }

    /// Returns the recorded set operations.
    #[must_use]
    pub fn writes(&self) -> Vec<StoreOp> {
        self.operations.lock().iter().filter(|op| op.is_set()).cloned().collect()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn record(&self, op: StoreOp) {
        self.operations.lock().push(op);
    }

    fn failure(&self, op: &StoreOp) -> Option<StoreError> {
        self.fail_when
            .lock()
            .as_ref()
            .filter(|rule| (rule.predicate)(op))
            .map(|rule| StoreError::caused_by(rule.kind, format!("mock: {} failed", op.key())))
    }

    fn should_hang(&self, op: &StoreOp) -> bool {
        self.hang_when.lock().as_ref().is_some_and(|predicate| predicate(op))
    }
}

impl CacheStore for MockStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let op = StoreOp::Get(key.to_string());
        let hang = self.should_hang(&op);
        let failure = self.failure(&op);
        self.record(op);
        if hang {
            std::future::pending::<()>().await;
        }
        if let Some(error) = failure {
            return Err(error);
        }
        Ok(self.data.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), StoreError> {
        let op = StoreOp::Set {
            key: key.to_string(),
            value: value.clone(),
            ttl,
        };
        let hang = self.should_hang(&op);
        let failure = self.failure(&op);
        self.record(op);
        if hang {
            std::future::pending::<()>().await;
        }
        if let Some(error) = failure {
            return Err(error);
        }
        self.data.lock().insert(key.to_string(), value);
        self.ttls.lock().insert(key.to_string(), ttl);
        Ok(())
    }
}
