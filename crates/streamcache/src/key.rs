// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

/// The store key for one page of streams of one game.
///
/// Keys have the shape `<namespace>:<page>:<game>`. Two requests map to the same key
/// exactly when they name the same game and the same page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds the key for `page` of `game` under `namespace`.
    #[must_use]
    pub fn new(namespace: &str, page: usize, game: &str) -> Self {
        Self(format!("{namespace}:{page}:{game}"))
    }

    /// Returns the key as it is written to the store.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
