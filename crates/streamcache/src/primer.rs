// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Background priming of popular games.
//!
//! Every run asks the upstream for the most popular games and replays the cacheable
//! first-page lookup for each of them on a bounded pool of tasks. Pages that are
//! missing get fetched by the lookup itself; pages that are about to turn stale are
//! refreshed ahead of time so client requests keep hitting fresh entries.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use streamcache_directory::Directory;
use streamcache_store::CacheStore;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::{FetchOutcome, Result, StreamCache, StreamsRequest};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_LEAD_TIME: Duration = Duration::from_secs(30);
const DEFAULT_WORKERS: usize = 8;
const DEFAULT_GAME_COUNT: usize = 50;

/// How priming went for a single game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimeOutcome {
    /// The cached page is fresh and not close to expiring; nothing was done.
    Hit,
    /// The cached page was about to turn stale and has been refreshed.
    ExpiringSoon,
    /// Nothing usable was cached; the lookup fetched and cached the page.
    Miss,
    /// The upstream failed for this game.
    Fail,
}

/// Counts of priming outcomes for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrimeReport {
    /// Games whose cached page was fresh.
    pub hits: usize,
    /// Games whose cached page was refreshed ahead of expiry.
    pub expiring_soon: usize,
    /// Games whose page had to be fetched.
    pub misses: usize,
    /// Games that could not be primed.
    pub failures: usize,
}

impl PrimeReport {
    /// Returns the number of games primed in the run.
    #[must_use]
    pub fn total(&self) -> usize {
        self.hits + self.expiring_soon + self.misses + self.failures
    }

    fn record(&mut self, outcome: PrimeOutcome) {
        match outcome {
            PrimeOutcome::Hit => self.hits += 1,
            PrimeOutcome::ExpiringSoon => self.expiring_soon += 1,
            PrimeOutcome::Miss => self.misses += 1,
            PrimeOutcome::Fail => self.failures += 1,
        }
    }
}

/// Keeps the first page of popular games warm in the store.
///
/// # Examples
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), streamcache::Error> {
/// use std::sync::Arc;
///
/// use streamcache::{Primer, StreamCache};
/// use streamcache_directory::testing::{StubDirectory, sample_game, sample_stream};
/// use streamcache_store::testing::MockStore;
/// use tick::Clock;
///
/// let directory = StubDirectory::new()
///     .with_games(vec![sample_game("Dota 2", 1_000)])
///     .with_streams("Dota 2", vec![sample_stream("Dota 2", "dendi")]);
/// let cache = Arc::new(StreamCache::builder(MockStore::new(), directory, Clock::new_frozen()).build());
///
/// let report = Primer::builder(cache).workers(4).build().run_once().await?;
/// assert_eq!(report.misses, 1);
/// # Ok(())
/// # }
/// ```
pub struct Primer<S, D> {
    cache: Arc<StreamCache<S, D>>,
    interval: Duration,
    lead_time: Duration,
    workers: usize,
    game_count: usize,
}

impl<S, D> fmt::Debug for Primer<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Primer")
            .field("interval", &self.interval)
            .field("lead_time", &self.lead_time)
            .field("workers", &self.workers)
            .field("game_count", &self.game_count)
            .finish_non_exhaustive()
    }
}

impl<S, D> Primer<S, D>
where
    S: CacheStore + 'static,
    D: Directory + 'static,
{
    /// Starts building a primer over `cache`.
    pub fn builder(cache: Arc<StreamCache<S, D>>) -> PrimerBuilder<S, D> {
        PrimerBuilder {
            cache,
            interval: DEFAULT_INTERVAL,
            lead_time: DEFAULT_LEAD_TIME,
            workers: DEFAULT_WORKERS,
            game_count: DEFAULT_GAME_COUNT,
        }
    }

    /// Primes every popular game once and waits for all of them to finish.
    ///
    /// # Errors
    ///
    /// Returns an error when the popular games cannot be fetched. Failures for
    /// individual games are counted in the report instead.
    pub async fn run_once(&self) -> Result<PrimeReport> {
        let games = self.cache.fetch_popular_games(self.game_count).await?;
        let permits = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for game in games {
            let cache = Arc::clone(&self.cache);
            let permits = Arc::clone(&permits);
            let lead_time = self.lead_time;
            tasks.spawn(async move { prime_pooled(&permits, &cache, &game.name, lead_time).await });
        }

        let mut report = PrimeReport::default();
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.unwrap_or_else(|error| {
                warn!(error = %error, "priming task did not complete");
                PrimeOutcome::Fail
            });
            report.record(outcome);
        }

        info!(
            hits = report.hits,
            expiring_soon = report.expiring_soon,
            misses = report.misses,
            failures = report.failures,
            "priming run finished"
        );
        Ok(report)
    }

    /// Runs forever, pausing for the configured interval between runs.
    pub async fn run(&self) {
        loop {
            if let Err(error) = self.run_once().await {
                warn!(error = %error, "priming run aborted, popular games unavailable");
            }
            self.cache.clock().delay(self.interval).await;
        }
    }

    /// Runs the primer on the current tokio runtime until the handle is stopped or dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    #[must_use = "dropping the handle stops the primer"]
    pub fn spawn(self) -> PrimerHandle {
        PrimerHandle {
            task: tokio::spawn(async move { self.run().await }),
        }
    }
}

async fn prime_pooled<S, D>(permits: &Semaphore, cache: &StreamCache<S, D>, game: &str, lead_time: Duration) -> PrimeOutcome
where
    S: CacheStore,
    D: Directory,
{
    let Ok(_permit) = permits.acquire().await else {
        warn!(game, "priming pool closed, skipping game");
        return PrimeOutcome::Fail;
    };
    prime(cache, game, lead_time).await
}

async fn prime<S, D>(cache: &StreamCache<S, D>, game: &str, lead_time: Duration) -> PrimeOutcome
where
    S: CacheStore,
    D: Directory,
{
    let request = StreamsRequest::new(game, 0, cache.page_size());

    match cache.fetch_streams_with_outcome(&request).await {
        Ok((response, FetchOutcome::FreshHit)) => {
            if !response.expires_within(cache.clock().system_time(), cache.stale_threshold(), lead_time) {
                return PrimeOutcome::Hit;
            }

            debug!(game, "cached page expiring soon, refreshing");
            match cache.refresh(game).await {
                Ok(_) => PrimeOutcome::ExpiringSoon,
                Err(error) => {
                    warn!(game, error = %error, "priming refresh failed");
                    PrimeOutcome::Fail
                }
            }
        }
        Ok((_, FetchOutcome::Fetched | FetchOutcome::Uncached)) => PrimeOutcome::Miss,
        Ok((_, FetchOutcome::StaleFallback)) => {
            warn!(game, "priming fetch failed, stale page left in place");
            PrimeOutcome::Fail
        }
        Err(error) => {
            warn!(game, error = %error, "priming fetch failed");
            PrimeOutcome::Fail
        }
    }
}

/// Builder for [`Primer`].
pub struct PrimerBuilder<S, D> {
    cache: Arc<StreamCache<S, D>>,
    interval: Duration,
    lead_time: Duration,
    workers: usize,
    game_count: usize,
}

impl<S, D> fmt::Debug for PrimerBuilder<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimerBuilder")
            .field("interval", &self.interval)
            .field("lead_time", &self.lead_time)
            .field("workers", &self.workers)
            .field("game_count", &self.game_count)
            .finish_non_exhaustive()
    }
}

impl<S, D> PrimerBuilder<S, D> {
    /// Sets the pause between runs. Defaults to 5 seconds.
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets how long before turning stale a page gets refreshed. Defaults to 30 seconds.
    #[must_use]
    pub fn lead_time(mut self, lead_time: Duration) -> Self {
        self.lead_time = lead_time;
        self
    }

    /// Sets how many games are primed concurrently. Defaults to 8; values below 1 are raised to 1.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Sets how many popular games each run primes. Defaults to 50.
    #[must_use]
    pub fn game_count(mut self, game_count: usize) -> Self {
        self.game_count = game_count;
        self
    }

    /// Builds the primer.
    #[must_use]
    pub fn build(self) -> Primer<S, D> {
        Primer {
            cache: self.cache,
            interval: self.interval,
            lead_time: self.lead_time,
            workers: self.workers,
            game_count: self.game_count,
        }
    }
}

/// Controls a primer started with [`Primer::spawn`].
///
/// The primer stops when the handle is dropped.
#[derive(Debug)]
pub struct PrimerHandle {
    task: JoinHandle<()>,
}

impl PrimerHandle {
    /// Stops the primer. A run in progress is abandoned.
    pub fn stop(self) {
        self.task.abort();
    }

    /// Returns `true` once the primer is no longer running.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PrimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
