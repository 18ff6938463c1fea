// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Redis-backed [`CacheStore`](streamcache_store::CacheStore).
//!
//! [`RedisStore`] keeps one multiplexed [`ConnectionManager`](redis::aio::ConnectionManager)
//! shared by all callers. The store may be down when the process starts: the failed
//! connection attempt is logged, and every later call tries to connect again until one
//! succeeds. Once connected, the manager reconnects on its own after drops.
//!
//! # Example
//!
//! ```no_run
//! use streamcache_redis::{RedisConfig, RedisStore};
//! use streamcache_store::CacheStore;
//!
//! # async fn example() -> Result<(), streamcache_store::StoreError> {
//! let store = RedisStore::connect(RedisConfig::new("redis://127.0.0.1:6379")).await?;
//! store.set("key", b"value".to_vec(), None).await?;
//! # Ok(())
//! # }
//! ```

mod store;

#[doc(inline)]
pub use store::{RedisConfig, RedisStore};
