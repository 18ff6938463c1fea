// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Staleness-aware read-through cache for a game-streaming directory.
//!
//! This crate sits between clients and a slow, rate-limited upstream directory:
//! - [`StreamCache`] serves page-aligned stream listings from a shared store while
//!   they are fresh, fetches and writes back when they are not, and falls back to a
//!   stale page when the upstream fails
//! - [`Primer`] keeps the first page of the most popular games warm in the background
//! - [`StoreProbe`] and [`DirectoryProbe`] report the liveness of both dependencies
//!
//! The store is reached through the [`CacheStore`](streamcache_store::CacheStore)
//! contract and the upstream through [`Directory`](streamcache_directory::Directory).
//! Time is read from an injected [`tick::Clock`].
//!
//! # Examples
//!
//! ```
//! use streamcache::{FetchOutcome, StreamCache, StreamsRequest};
//! use streamcache_directory::testing::{StubDirectory, sample_stream};
//! use streamcache_store::testing::MockStore;
//! use tick::Clock;
//! # futures::executor::block_on(async {
//!
//! let directory = StubDirectory::new().with_streams("Dota 2", vec![sample_stream("Dota 2", "dendi")]);
//! let cache = StreamCache::builder(MockStore::new(), directory, Clock::new_frozen()).build();
//! let request = StreamsRequest::new("Dota 2", 0, 25);
//!
//! let (_, outcome) = cache.fetch_streams_with_outcome(&request).await?;
//! assert_eq!(outcome, FetchOutcome::Fetched);
//!
//! let (response, outcome) = cache.fetch_streams_with_outcome(&request).await?;
//! assert_eq!(outcome, FetchOutcome::FreshHit);
//! assert_eq!(response.streams()[0].channel_name, "dendi");
//! # Ok::<(), streamcache::Error>(())
//! # });
//! ```

mod engine;
mod entry;
mod error;
mod key;
mod primer;
mod probe;
mod request;
mod result;
mod telemetry;
mod wrapper;

#[doc(inline)]
pub use engine::{FetchOutcome, StreamCache, StreamCacheBuilder};
#[doc(inline)]
pub use entry::{CachedResponse, Freshness, Origin};
#[doc(inline)]
pub use error::{DecodeError, EncodeError, Error, Result};
#[doc(inline)]
pub use key::CacheKey;
#[doc(inline)]
pub use primer::{PrimeOutcome, PrimeReport, Primer, PrimerBuilder, PrimerHandle};
#[doc(inline)]
pub use probe::{DirectoryProbe, Health, StoreProbe};
#[doc(inline)]
pub use request::StreamsRequest;
#[doc(inline)]
pub use result::{CacheResult, CacheStatus};
#[doc(inline)]
pub use telemetry::TelemetryConfig;
