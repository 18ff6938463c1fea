// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The caching decision engine.
//!
//! [`StreamCache`] decides, per request, whether a cached page can be served as-is,
//! whether the upstream must be consulted, and what to hand back when the upstream
//! fails. The store is only ever read and written here, under keys derived here.

use std::time::Duration;

use futures::future::join_all;
use streamcache_directory::{Directory, GameRecord};
use streamcache_store::CacheStore;
use tick::Clock;
use tracing::{debug, error, warn};

use crate::telemetry::{CacheActivity, CacheOperation, CacheTelemetry};
use crate::wrapper::TimedStore;
use crate::{CacheKey, CacheResult, CachedResponse, Error, Freshness, Result, StreamsRequest, TelemetryConfig};

const DEFAULT_NAMESPACE: &str = "streamcache.v1";
const DEFAULT_PAGE_SIZE: usize = 25;
const DEFAULT_STALE_THRESHOLD: Duration = Duration::from_secs(120);
const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_millis(200);
const DEFAULT_STORE_TTL: Duration = Duration::from_secs(60 * 60);

/// How [`StreamCache::fetch_streams_with_outcome`] produced its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FetchOutcome {
    /// A fresh cached page was served; the upstream was not called.
    FreshHit,
    /// The upstream was called and its response written to the store.
    Fetched,
    /// The upstream failed and a stale cached page was served instead.
    StaleFallback,
    /// The request was not cacheable and went straight to the upstream.
    Uncached,
}

/// A read-through cache of live streams per game.
///
/// Cacheable requests (one full, page-aligned window with caching allowed) are
/// served from the store while fresh. Everything else goes to the upstream.
/// When the upstream fails, a stale cached page is preferred over an error.
///
/// Store trouble never fails a request: timeouts, connectivity problems and
/// undecodable entries all degrade to a miss.
///
/// # Examples
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), streamcache::Error> {
/// use streamcache::{StreamCache, StreamsRequest};
/// use streamcache_directory::testing::{StubDirectory, sample_stream};
/// use streamcache_store::testing::MockStore;
/// use tick::Clock;
///
/// let directory = StubDirectory::new().with_streams("Dota 2", vec![sample_stream("Dota 2", "dendi")]);
/// let cache = StreamCache::builder(MockStore::new(), directory, Clock::new_frozen()).build();
///
/// let response = cache.fetch_streams(&StreamsRequest::new("Dota 2", 0, 25)).await?;
/// assert_eq!(response.streams().len(), 1);
/// assert!(response.is_from_cache());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct StreamCache<S, D> {
    store: TimedStore<S>,
    directory: D,
    clock: Clock,
    namespace: String,
    page_size: usize,
    stale_threshold: Duration,
    store_ttl: Duration,
    telemetry: CacheTelemetry,
}

impl<S: CacheStore, D: Directory> StreamCache<S, D> {
    /// Starts building a cache over `store` and `directory`, reading time from `clock`.
    pub fn builder(store: S, directory: D, clock: Clock) -> StreamCacheBuilder<S, D> {
        StreamCacheBuilder::new(store, directory, clock)
    }

    /// Fetches a window of streams, serving from the store when possible.
    ///
    /// # Errors
    ///
    /// Returns an error only when the upstream fails and no cached page, fresh or
    /// stale, exists for the request.
    pub async fn fetch_streams(&self, request: &StreamsRequest) -> Result<CachedResponse> {
        self.fetch_streams_with_outcome(request).await.map(|(response, _)| response)
    }

    /// Like [`fetch_streams`](Self::fetch_streams), also reporting how the response was produced.
    ///
    /// # Errors
    ///
    /// Returns an error only when the upstream fails and no cached page exists.
    pub async fn fetch_streams_with_outcome(&self, request: &StreamsRequest) -> Result<(CachedResponse, FetchOutcome)> {
        let Some(page) = request.page(self.page_size) else {
            self.telemetry
                .record(&self.namespace, CacheOperation::Get, CacheActivity::Skipped, None);
            let response = self.fetch_upstream(request).await?;
            return Ok((response, FetchOutcome::Uncached));
        };

        let key = self.key(request.game(), page);
        let cached = match self.lookup_key(&key, request).await.into_payload() {
            Some(payload) => match payload.freshness(self.clock.system_time(), self.stale_threshold) {
                Freshness::Fresh => return Ok((payload, FetchOutcome::FreshHit)),
                Freshness::Stale { age } => Some((payload, age)),
            },
            None => None,
        };

        match self.fetch_upstream(request).await {
            Ok(response) => {
                let response = response.into_cached();
                self.write(&key, &response).await;
                Ok((response, FetchOutcome::Fetched))
            }
            Err(error) => match cached {
                Some((stale, age)) => {
                    warn!(
                        %request,
                        age_ms = age.as_millis(),
                        error = %error,
                        "upstream unavailable, serving stale cache entry"
                    );
                    self.telemetry
                        .record(&self.namespace, CacheOperation::Fetch, CacheActivity::Fallback, None);
                    Ok((stale, FetchOutcome::StaleFallback))
                }
                None => Err(error),
            },
        }
    }

    /// Fetches streams for several games concurrently.
    ///
    /// Results are returned in the order of `games`; one game failing does not affect
    /// the others.
    pub async fn fetch_streams_for_games<I>(&self, games: I, start: usize, limit: usize, disallow_cache: bool) -> Vec<Result<CachedResponse>>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let requests: Vec<_> = games
            .into_iter()
            .map(|game| StreamsRequest::new(game, start, limit).disallow_cache(disallow_cache))
            .collect();

        join_all(requests.iter().map(|request| self.fetch_streams(request))).await
    }

    /// Fetches the most popular games. These are never cached.
    ///
    /// # Errors
    ///
    /// Returns an error when the upstream fails.
    pub async fn fetch_popular_games(&self, limit: usize) -> Result<Vec<GameRecord>> {
        self.directory.fetch_popular_games(limit).await.map_err(Error::upstream)
    }

    /// Looks `request` up in the store without touching the upstream.
    ///
    /// Requests that are not cacheable report [`CacheStatus::Skipped`](crate::CacheStatus::Skipped)
    /// and never reach the store.
    pub async fn lookup(&self, request: &StreamsRequest) -> CacheResult {
        match request.page(self.page_size) {
            Some(page) => self.lookup_key(&self.key(request.game(), page), request).await,
            None => CacheResult::skipped(),
        }
    }

    /// Fetches the first page of `game` from the upstream and writes it to the store
    /// regardless of what is cached.
    ///
    /// # Errors
    ///
    /// Returns an error when the upstream fails. Nothing is written in that case.
    pub async fn refresh(&self, game: &str) -> Result<CachedResponse> {
        let request = StreamsRequest::new(game, 0, self.page_size);
        let response = self.fetch_upstream(&request).await?.into_cached();
        self.write(&self.key(game, 0), &response).await;
        Ok(response)
    }

    async fn lookup_key(&self, key: &CacheKey, request: &StreamsRequest) -> CacheResult {
        let timed = self.store.get(key).await;
        let latency = timed.duration;

        match timed.result {
            Ok(Some(bytes)) => match CachedResponse::decode(&bytes) {
                Ok(payload) => {
                    let age = payload.age(self.clock.system_time());
                    if age > self.stale_threshold {
                        debug!(%request, latency_ms = latency.as_millis(), age_ms = age.as_millis(), "stale cache hit");
                    } else {
                        debug!(%request, latency_ms = latency.as_millis(), age_ms = age.as_millis(), "cache hit");
                    }
                    CacheResult::hit(payload, latency)
                }
                Err(error) => {
                    warn!(%key, error = %error, "ignoring undecodable cache entry");
                    self.telemetry
                        .record(&self.namespace, CacheOperation::Get, CacheActivity::Corrupt, Some(latency));
                    CacheResult::miss(latency)
                }
            },
            Ok(None) => {
                debug!(%request, latency_ms = latency.as_millis(), "cache miss");
                CacheResult::miss(latency)
            }
            Err(error) => {
                if error.is_transient() {
                    debug!(%key, error = %error, "cache store lookup failed");
                } else {
                    error!(%key, error = ?error, "cache store lookup failed");
                }
                debug!(%request, latency_ms = latency.as_millis(), "cache miss");
                CacheResult::miss(latency)
            }
        }
    }

    async fn write(&self, key: &CacheKey, response: &CachedResponse) {
        let bytes = match response.encode() {
            Ok(bytes) => bytes,
            Err(error) => {
                error!(%key, error = ?error, "cache entry could not be encoded");
                return;
            }
        };

        if let Err(error) = self.store.set(key, bytes, Some(self.store_ttl)).await {
            if error.is_transient() {
                debug!(%key, error = %error, "cache store write failed");
            } else {
                error!(%key, error = ?error, "cache store write failed");
            }
        }
    }

    async fn fetch_upstream(&self, request: &StreamsRequest) -> Result<CachedResponse> {
        let streams = self
            .directory
            .fetch_streams(request.game(), request.start(), request.limit())
            .await
            .map_err(Error::upstream)?;

        Ok(CachedResponse::new(streams, self.clock.system_time()))
    }

    fn key(&self, game: &str, page: usize) -> CacheKey {
        CacheKey::new(&self.namespace, page, game)
    }
}

impl<S, D> StreamCache<S, D> {
    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store.inner
    }

    /// Returns the upstream directory.
    #[must_use]
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Returns the clock the cache reads time from.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Returns the namespace prefixed to every key.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the number of streams in a cacheable page.
    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns how long a cached page stays fresh.
    #[must_use]
    pub fn stale_threshold(&self) -> Duration {
        self.stale_threshold
    }
}

/// Builder for [`StreamCache`].
///
/// Created by [`StreamCache::builder`].
#[derive(Debug)]
pub struct StreamCacheBuilder<S, D> {
    store: S,
    directory: D,
    clock: Clock,
    namespace: String,
    page_size: usize,
    stale_threshold: Duration,
    lookup_timeout: Duration,
    write_timeout: Option<Duration>,
    store_ttl: Duration,
    telemetry: TelemetryConfig,
}

impl<S: CacheStore, D: Directory> StreamCacheBuilder<S, D> {
    fn new(store: S, directory: D, clock: Clock) -> Self {
        Self {
            store,
            directory,
            clock,
            namespace: DEFAULT_NAMESPACE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            stale_threshold: DEFAULT_STALE_THRESHOLD,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            write_timeout: None,
            store_ttl: DEFAULT_STORE_TTL,
            telemetry: TelemetryConfig::new().with_logs(),
        }
    }

    /// Sets the prefix of every key. Defaults to `streamcache.v1`.
    ///
    /// Bump it whenever the page size or the payload encoding changes, since keys
    /// written under the old layout no longer mean the same thing.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the number of streams per cacheable page. Defaults to 25; values below 1 are raised to 1.
    #[must_use]
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sets how long a cached page is served without consulting the upstream. Defaults to 120 seconds.
    #[must_use]
    pub fn stale_threshold(mut self, threshold: Duration) -> Self {
        self.stale_threshold = threshold;
        self
    }

    /// Sets the deadline for a store read. Defaults to 200 milliseconds.
    #[must_use]
    pub fn lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Sets the deadline for a store write. Defaults to the lookup deadline.
    ///
    /// The write back happens before a fetched page is returned, so a stalled store
    /// delays a cache miss by up to the lookup deadline plus this deadline.
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    /// Sets how long the store keeps a written page. Defaults to 1 hour.
    ///
    /// The value is never allowed below the stale threshold, so a stale page stays
    /// available as a fallback.
    #[must_use]
    pub fn store_ttl(mut self, ttl: Duration) -> Self {
        self.store_ttl = ttl;
        self
    }

    /// Replaces the telemetry configuration. Logs are enabled by default.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetryConfig) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Builds the cache.
    #[must_use]
    pub fn build(self) -> StreamCache<S, D> {
        let telemetry = self.telemetry.build();

        StreamCache {
            store: TimedStore {
                name: self.namespace.clone(),
                inner: self.store,
                clock: self.clock.clone(),
                lookup_timeout: self.lookup_timeout,
                write_timeout: self.write_timeout.unwrap_or(self.lookup_timeout),
                telemetry: telemetry.clone(),
            },
            directory: self.directory,
            clock: self.clock,
            namespace: self.namespace,
            page_size: self.page_size,
            stale_threshold: self.stale_threshold,
            store_ttl: self.store_ttl.max(self.stale_threshold),
            telemetry,
        }
    }
}
