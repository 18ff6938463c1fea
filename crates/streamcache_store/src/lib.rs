// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Byte-level key/value store abstraction for the stream directory cache.
//!
//! This crate defines the [`CacheStore`] trait that remote stores must satisfy, along
//! with the [`StoreError`] taxonomy every store reports failures through.
//!
//! # Overview
//!
//! A store is an external, possibly-unavailable service. It only moves opaque bytes under
//! UTF-8 keys; encoding, freshness and key derivation belong to the `streamcache` crate,
//! which also bounds every call with a timeout.
//!
//! # Implementing a Store
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Mutex;
//! use std::time::Duration;
//!
//! use streamcache_store::{CacheStore, StoreError};
//!
//! struct LocalStore(Mutex<HashMap<String, Vec<u8>>>);
//!
//! impl CacheStore for LocalStore {
//!     async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
//!         Ok(self.0.lock().unwrap().get(key).cloned())
//!     }
//!
//!     async fn set(&self, key: &str, value: Vec<u8>, _ttl: Option<Duration>) -> Result<(), StoreError> {
//!         self.0.lock().unwrap().insert(key.to_string(), value);
//!         Ok(())
//!     }
//! }
//! ```
//!
//! # Testing
//!
//! Enable the `test-util` feature for [`testing::MockStore`], an in-memory store that
//! records operations and can be told to fail, hang, or hold corrupt bytes.

mod error;
mod store;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use error::{Result, StoreError, StoreErrorKind};
#[doc(inline)]
pub use store::CacheStore;
