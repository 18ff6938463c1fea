// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Store decorator that adds deadlines and telemetry.
//!
//! `TimedStore` bounds every store call by a deadline taken from the injected clock
//! and records the outcome of each call as a cache event. A deadline overrun is
//! reported as a [`StoreErrorKind::Timeout`] error so callers treat it like any other
//! transient store failure.

use std::time::Duration;

use streamcache_store::{CacheStore, StoreError, StoreErrorKind};
use tick::{Clock, FutureExt};

use crate::CacheKey;
use crate::telemetry::ext::{ClockExt, TimedResult};
use crate::telemetry::{CacheActivity, CacheOperation, CacheTelemetry};

#[derive(Debug)]
pub(crate) struct TimedStore<S> {
    pub(crate) name: String,
    pub(crate) inner: S,
    pub(crate) clock: Clock,
    pub(crate) lookup_timeout: Duration,
    pub(crate) write_timeout: Duration,
    pub(crate) telemetry: CacheTelemetry,
}

impl<S: CacheStore> TimedStore<S> {
    /// Reads `key`, giving up once the lookup timeout elapses.
    pub(crate) async fn get(&self, key: &CacheKey) -> TimedResult<Result<Option<Vec<u8>>, StoreError>> {
        let timed = self
            .clock
            .timed_async(self.inner.get(key.as_str()).timeout(&self.clock, self.lookup_timeout))
            .await;

        let result = timed.result.unwrap_or_else(|elapsed| Err(StoreError::timeout(elapsed)));
        let activity = match &result {
            Ok(Some(_)) => CacheActivity::Hit,
            Ok(None) => CacheActivity::Miss,
            Err(error) => failure_activity(error),
        };
        self.telemetry
            .record(&self.name, CacheOperation::Get, activity, Some(timed.duration));

        TimedResult {
            result,
            duration: timed.duration,
        }
    }

    /// Writes `value` under `key`, giving up once the write timeout elapses.
    pub(crate) async fn set(&self, key: &CacheKey, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), StoreError> {
        let timed = self
            .clock
            .timed_async(self.inner.set(key.as_str(), value, ttl).timeout(&self.clock, self.write_timeout))
            .await;

        let result = timed.result.unwrap_or_else(|elapsed| Err(StoreError::timeout(elapsed)));
        let activity = match &result {
            Ok(()) => CacheActivity::Inserted,
            Err(error) => failure_activity(error),
        };
        self.telemetry
            .record(&self.name, CacheOperation::Set, activity, Some(timed.duration));

        result
    }
}

fn failure_activity(error: &StoreError) -> CacheActivity {
    match error.kind() {
        StoreErrorKind::Timeout => CacheActivity::Timeout,
        StoreErrorKind::Connection => CacheActivity::Unavailable,
        _ => CacheActivity::Error,
    }
}
