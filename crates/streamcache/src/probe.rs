// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Liveness probes for the store and the upstream.

use std::time::{Duration, UNIX_EPOCH};

use streamcache_directory::Directory;
use streamcache_store::CacheStore;
use tick::{Clock, FutureExt};

use crate::telemetry::ext::ClockExt;

const PROBE_KEY: &str = "healthcheck";
const PROBE_GAME: &str = "Dota 2";
const PROBE_LIMIT: usize = 25;
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// The result of a liveness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Health {
    /// The dependency answered correctly.
    Up {
        /// How long the probe took.
        elapsed: Duration,
    },
    /// The dependency failed, timed out, or answered incorrectly.
    Down {
        /// What went wrong.
        reason: String,
    },
}

impl Health {
    /// Returns `true` for [`Health::Up`].
    #[must_use]
    pub fn is_up(&self) -> bool {
        matches!(self, Self::Up { .. })
    }
}

/// Checks that the store can be written and read back.
///
/// The probe writes the current time in milliseconds under a dedicated key and expects
/// to read the same bytes back.
#[derive(Debug)]
pub struct StoreProbe<S> {
    store: S,
    clock: Clock,
    timeout: Duration,
}

impl<S: CacheStore> StoreProbe<S> {
    /// Creates a probe with a 1 second deadline per store call.
    pub fn new(store: S, clock: Clock) -> Self {
        Self {
            store,
            clock,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Overrides the per-call deadline.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Runs one write/read round trip.
    pub async fn check(&self) -> Health {
        let timed = self.clock.timed_async(self.round_trip()).await;
        match timed.result {
            Ok(()) => Health::Up { elapsed: timed.duration },
            Err(reason) => Health::Down { reason },
        }
    }

    async fn round_trip(&self) -> Result<(), String> {
        let now_ms = self
            .clock
            .system_time()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        let written = now_ms.to_be_bytes().to_vec();

        self.store
            .set(PROBE_KEY, written.clone(), None)
            .timeout(&self.clock, self.timeout)
            .await
            .map_err(|error| format!("write: {error}"))?
            .map_err(|error| format!("write: {error}"))?;

        let read = self
            .store
            .get(PROBE_KEY)
            .timeout(&self.clock, self.timeout)
            .await
            .map_err(|error| format!("read: {error}"))?
            .map_err(|error| format!("read: {error}"))?;

        match read {
            Some(bytes) if bytes == written => Ok(()),
            Some(_) => Err("read back a different value than written".to_string()),
            None => Err("written value is missing".to_string()),
        }
    }
}

/// Checks that the upstream serves a fixed streams query.
#[derive(Debug)]
pub struct DirectoryProbe<D> {
    directory: D,
    clock: Clock,
}

impl<D: Directory> DirectoryProbe<D> {
    /// Creates a probe over `directory`.
    pub fn new(directory: D, clock: Clock) -> Self {
        Self { directory, clock }
    }

    /// Fetches the first page of a well-known game.
    pub async fn check(&self) -> Health {
        let timed = self
            .clock
            .timed_async(self.directory.fetch_streams(PROBE_GAME, 0, PROBE_LIMIT))
            .await;
        match timed.result {
            Ok(_) => Health::Up { elapsed: timed.duration },
            Err(error) => Health::Down {
                reason: error.to_string(),
            },
        }
    }
}
