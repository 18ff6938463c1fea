// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The byte store contract.

use std::{sync::Arc, time::Duration};

use crate::StoreError;

/// A remote key/value store holding encoded cache payloads.
///
/// Implementations own their connection (or pool) and must be safe to call
/// concurrently. They report failures through [`StoreError`] so callers can tell
/// a timeout from a connectivity problem or a protocol violation.
///
/// Calls are not expected to bound themselves in time; callers wrap them in their
/// own timeout.
pub trait CacheStore: Send + Sync {
    /// Reads the bytes stored under `key`.
    ///
    /// Returns `Ok(None)` when the key does not exist or has expired.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>, StoreError>> + Send;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// When `ttl` is given the store drops the value once it elapses.
    fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl<S: CacheStore> CacheStore for Arc<S> {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>, StoreError>> + Send {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).set(key, value, ttl)
    }
}
