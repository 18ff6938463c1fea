// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Field names shared by `cache.event` logs and metric attributes.
//!
//! The log fields in [`emit`](super::emit) are spelled out literally because `tracing`
//! needs them at compile time; the tests keep both spellings in sync.

use opentelemetry::KeyValue;

use super::{CacheActivity, CacheOperation};

pub(crate) const CACHE_NAME: &str = "cache.name";
pub(crate) const CACHE_OPERATION: &str = "cache.operation";
pub(crate) const CACHE_ACTIVITY: &str = "cache.activity";
#[cfg(test)]
pub(crate) const CACHE_DURATION: &str = "cache.duration_ns";
#[cfg(test)]
pub(crate) const EVENT_MESSAGE: &str = "cache.event";

pub(crate) fn event_attributes(cache_name: &str, operation: CacheOperation, activity: CacheActivity) -> [KeyValue; 3] {
    [
        KeyValue::new(CACHE_NAME, cache_name.to_string()),
        KeyValue::new(CACHE_OPERATION, operation.as_str()),
        KeyValue::new(CACHE_ACTIVITY, activity.as_str()),
    ]
}
