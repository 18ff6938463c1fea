// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache operations.

use recoverable::{Recovery, RecoveryInfo};
use streamcache_directory::{UpstreamError, UpstreamErrorKind};

/// The error returned to callers of the cache.
///
/// Store trouble never surfaces here: it degrades to a cache miss. The only failure a
/// caller sees is an upstream failure with no cached value to fall back on.
#[ohno::error]
#[display("stream directory request failed")]
pub struct Error {
    kind: UpstreamErrorKind,
}

impl Error {
    pub(crate) fn upstream(error: UpstreamError) -> Self {
        Self::caused_by(error.kind(), error)
    }

    /// Returns the kind of upstream failure behind this error.
    #[must_use]
    pub fn upstream_kind(&self) -> UpstreamErrorKind {
        self.kind
    }
}

impl Recovery for Error {
    fn recovery(&self) -> RecoveryInfo {
        match self.kind {
            UpstreamErrorKind::Transport => RecoveryInfo::retry(),
            UpstreamErrorKind::Decode => RecoveryInfo::never(),
            _ => RecoveryInfo::unavailable(),
        }
    }
}

/// Cached bytes that do not decode into a response.
#[ohno::error]
#[display("cached payload is not a valid response")]
pub struct DecodeError {}

/// A response that could not be encoded for the store.
#[ohno::error]
#[display("response could not be encoded")]
pub struct EncodeError {}

/// A specialized [`Result`] type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;
