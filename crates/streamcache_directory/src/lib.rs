// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Upstream game-streaming directory client.
//!
//! The [`Directory`] trait is the narrow contract the stream cache needs from the
//! upstream provider: the live streams for one game, and the currently popular games.
//! [`KrakenDirectory`] implements it over HTTP against Kraken v5 style endpoints.
//!
//! Responses are mapped into [`StreamRecord`] and [`GameRecord`] through a fixed table of
//! JSON field paths. Stream records missing a required display field are logged and kept.
//!
//! # Example
//!
//! ```no_run
//! use streamcache_directory::{Directory, KrakenConfig, KrakenDirectory};
//!
//! # async fn example() -> Result<(), streamcache_directory::UpstreamError> {
//! let directory = KrakenDirectory::new(KrakenConfig::new("my-client-id"))?;
//!
//! let streams = directory.fetch_streams("Dota 2", 0, 25).await?;
//! let games = directory.fetch_popular_games(10).await?;
//! # Ok(())
//! # }
//! ```

mod directory;
mod error;
mod kraken;
mod mapping;
mod records;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use directory::Directory;
#[doc(inline)]
pub use error::{UpstreamError, UpstreamErrorKind};
#[doc(inline)]
pub use kraken::{KrakenConfig, KrakenDirectory};
#[doc(inline)]
pub use records::{GameRecord, StreamRecord};
