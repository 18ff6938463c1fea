// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use crate::CachedResponse;

/// The outcome of a single cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheStatus {
    /// The store returned a decodable response.
    Hit,
    /// The store had nothing usable, or could not be reached in time.
    Miss,
    /// The request is not cacheable; the store was not consulted.
    Skipped,
}

/// What a cache lookup produced and how long it took.
///
/// A payload is present exactly when the status is [`CacheStatus::Hit`]. Skipped
/// lookups report zero latency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheResult {
    status: CacheStatus,
    payload: Option<CachedResponse>,
    latency: Duration,
}

impl CacheResult {
    pub(crate) fn hit(payload: CachedResponse, latency: Duration) -> Self {
        Self {
            status: CacheStatus::Hit,
            payload: Some(payload),
            latency,
        }
    }

    pub(crate) fn miss(latency: Duration) -> Self {
        Self {
            status: CacheStatus::Miss,
            payload: None,
            latency,
        }
    }

    pub(crate) fn skipped() -> Self {
        Self {
            status: CacheStatus::Skipped,
            payload: None,
            latency: Duration::ZERO,
        }
    }

    /// Returns the lookup status.
    #[must_use]
    pub fn status(&self) -> CacheStatus {
        self.status
    }

    /// Returns the cached response on a hit.
    #[must_use]
    pub fn payload(&self) -> Option<&CachedResponse> {
        self.payload.as_ref()
    }

    /// Consumes the result and returns the cached response on a hit.
    #[must_use]
    pub fn into_payload(self) -> Option<CachedResponse> {
        self.payload
    }

    /// Returns how long the lookup took.
    #[must_use]
    pub fn latency(&self) -> Duration {
        self.latency
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    #[test]
    fn payload_present_only_on_hit() {
        let response = CachedResponse::new(Vec::new(), SystemTime::UNIX_EPOCH);

        let hit = CacheResult::hit(response.clone(), Duration::from_millis(3));
        assert_eq!(hit.status(), CacheStatus::Hit);
        assert_eq!(hit.payload(), Some(&response));
        assert_eq!(hit.latency(), Duration::from_millis(3));

        let miss = CacheResult::miss(Duration::from_millis(4));
        assert_eq!(miss.status(), CacheStatus::Miss);
        assert!(miss.payload().is_none());
    }

    #[test]
    fn skipped_has_zero_latency() {
        let skipped = CacheResult::skipped();
        assert_eq!(skipped.status(), CacheStatus::Skipped);
        assert_eq!(skipped.latency(), Duration::ZERO);
        assert!(skipped.into_payload().is_none());
    }
}
