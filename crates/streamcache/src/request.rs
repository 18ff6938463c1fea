// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

/// A request for one window of live streams of a game.
///
/// # Examples
///
/// ```
/// use streamcache::StreamsRequest;
///
/// let request = StreamsRequest::new("Dota 2", 25, 25);
/// assert_eq!(request.to_string(), "[game=Dota 2 start=25 limit=25]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamsRequest {
    game: String,
    start: usize,
    limit: usize,
    disallow_cache: bool,
}

impl StreamsRequest {
    /// Creates a request for `limit` streams of `game` starting at offset `start`.
    #[must_use]
    pub fn new(game: impl Into<String>, start: usize, limit: usize) -> Self {
        Self {
            game: game.into(),
            start,
            limit,
            disallow_cache: false,
        }
    }

    /// Forces the request to bypass the cache entirely.
    #[must_use]
    pub fn disallow_cache(self, disallow: bool) -> Self {
        Self {
            disallow_cache: disallow,
            ..self
        }
    }

    /// Returns the game name.
    #[must_use]
    pub fn game(&self) -> &str {
        &self.game
    }

    /// Returns the offset of the first requested stream.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Returns the number of requested streams.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns `true` when the request must bypass the cache.
    #[must_use]
    pub fn is_cache_disallowed(&self) -> bool {
        self.disallow_cache
    }

    /// Returns the page this request maps to, or `None` when it is not cacheable.
    ///
    /// A request is cacheable when caching is allowed, the window is exactly one page
    /// long and it starts on a page boundary.
    pub(crate) fn page(&self, page_size: usize) -> Option<usize> {
        let aligned = page_size > 0 && self.start % page_size == 0 && self.limit == page_size;
        (!self.disallow_cache && aligned).then(|| self.start / page_size)
    }
}

impl fmt::Display for StreamsRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[game={} start={} limit={}]", self.game, self.start, self.limit)
    }
}
