// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use crate::{GameRecord, StreamRecord, UpstreamError};

/// The upstream provider of stream listings.
///
/// Implementations must bound their own waits (connect and read timeouts) and be
/// safe to share across concurrent callers.
pub trait Directory: Send + Sync {
    /// Fetches up to `limit` live streams for `game`, skipping the first `offset`.
    fn fetch_streams(
        &self,
        game: &str,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<StreamRecord>, UpstreamError>> + Send;

    /// Fetches the `limit` most watched games, most popular first.
    fn fetch_popular_games(&self, limit: usize) -> impl Future<Output = Result<Vec<GameRecord>, UpstreamError>> + Send;
}

impl<D: Directory> Directory for Arc<D> {
    fn fetch_streams(
        &self,
        game: &str,
        offset: usize,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<StreamRecord>, UpstreamError>> + Send {
        (**self).fetch_streams(game, offset, limit)
    }

    fn fetch_popular_games(&self, limit: usize) -> impl Future<Output = Result<Vec<GameRecord>, UpstreamError>> + Send {
        (**self).fetch_popular_games(limit)
    }
}
