// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cached response payloads and their freshness.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use streamcache_directory::StreamRecord;

use crate::error::{DecodeError, EncodeError};

/// How a response came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// Fetched from the upstream and handed to the caller without touching the store.
    Upstream,
    /// Produced by the cache-write path: either read from the store or fetched and written to it.
    Cache,
}

/// Whether a response is still within the staleness threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The response may be served as-is.
    Fresh,
    /// The response is past the threshold but still usable as a fallback.
    Stale {
        /// How old the response is.
        age: Duration,
    },
}

/// An immutable page of streams with the moment it was captured from the upstream.
///
/// The capture timestamp has millisecond precision. Freshness is a pure function of
/// the timestamp and the instant it is evaluated at: a response is fresh while its age
/// is at most the staleness threshold.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// use streamcache::{CachedResponse, Freshness};
///
/// let captured = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
/// let response = CachedResponse::new(Vec::new(), captured);
///
/// let threshold = Duration::from_secs(120);
/// assert_eq!(response.freshness(captured + threshold, threshold), Freshness::Fresh);
/// assert!(matches!(
///     response.freshness(captured + threshold + Duration::from_millis(1), threshold),
///     Freshness::Stale { .. }
/// ));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    streams: Vec<StreamRecord>,
    captured_at_ms: u64,
    origin: Origin,
}

impl CachedResponse {
    /// Creates a freshly fetched response captured at `captured_at`.
    #[must_use]
    pub fn new(streams: Vec<StreamRecord>, captured_at: SystemTime) -> Self {
        Self {
            streams,
            captured_at_ms: millis_since_epoch(captured_at),
            origin: Origin::Upstream,
        }
    }

    /// Returns the same response marked as produced by the cache-write path.
    #[must_use]
    pub fn into_cached(self) -> Self {
        Self {
            origin: Origin::Cache,
            ..self
        }
    }

    /// Returns the streams in upstream order.
    #[must_use]
    pub fn streams(&self) -> &[StreamRecord] {
        &self.streams
    }

    /// Consumes the response and returns its streams.
    #[must_use]
    pub fn into_streams(self) -> Vec<StreamRecord> {
        self.streams
    }

    /// Returns when the response was captured from the upstream.
    #[must_use]
    pub fn captured_at(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.captured_at_ms)
    }

    /// Returns how the response came to be.
    #[must_use]
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Returns `true` when the response went through the cache-write path.
    #[must_use]
    pub fn is_from_cache(&self) -> bool {
        self.origin == Origin::Cache
    }

    /// Returns the age of the response at `now`, or zero if `now` is earlier than capture.
    #[must_use]
    pub fn age(&self, now: SystemTime) -> Duration {
        Duration::from_millis(millis_since_epoch(now).saturating_sub(self.captured_at_ms))
    }

    /// Classifies the response at `now` against `threshold`.
    #[must_use]
    pub fn freshness(&self, now: SystemTime, threshold: Duration) -> Freshness {
        let age = self.age(now);
        if age <= threshold {
            Freshness::Fresh
        } else {
            Freshness::Stale { age }
        }
    }

    /// Returns `true` when the response is fresh at `now`.
    #[must_use]
    pub fn is_fresh(&self, now: SystemTime, threshold: Duration) -> bool {
        self.freshness(now, threshold) == Freshness::Fresh
    }

    /// Returns `true` when the response turns stale within `lead` of `now`, or already has.
    #[must_use]
    pub fn expires_within(&self, now: SystemTime, threshold: Duration, lead: Duration) -> bool {
        self.age(now) >= threshold.saturating_sub(lead)
    }

    /// Encodes the response for the store.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        postcard::to_allocvec(self).map_err(EncodeError::caused_by)
    }

    /// Decodes a response previously produced by [`encode`](Self::encode).
    ///
    /// # Errors
    ///
    /// Returns an error when `bytes` are not a complete encoded response.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        match postcard::take_from_bytes::<Self>(bytes) {
            Ok((response, [])) => Ok(response),
            Ok((_, rest)) => Err(DecodeError::caused_by(format!("{} trailing bytes", rest.len()))),
            Err(error) => Err(DecodeError::caused_by(error)),
        }
    }
}

fn millis_since_epoch(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}
