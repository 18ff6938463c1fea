// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for upstream calls.

use std::fmt;

use recoverable::{Recovery, RecoveryInfo};

/// Where an upstream call went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum UpstreamErrorKind {
    /// The request never produced a response: connect failure, read timeout, reset.
    Transport,
    /// The upstream answered with a non-success status.
    Status,
    /// The response body could not be mapped into records.
    Decode,
}

impl UpstreamErrorKind {
    /// Returns a short, stable name for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Status => "status",
            Self::Decode => "decode",
        }
    }
}

impl fmt::Display for UpstreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error from the upstream directory.
///
/// # Example
///
/// ```
/// use streamcache_directory::{UpstreamError, UpstreamErrorKind};
///
/// let error = UpstreamError::status("503 Service Unavailable");
/// assert_eq!(error.kind(), UpstreamErrorKind::Status);
/// ```
#[ohno::error]
#[display("upstream {kind} failure")]
pub struct UpstreamError {
    kind: UpstreamErrorKind,
}

impl UpstreamError {
    /// Creates a transport error.
    pub fn transport(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(UpstreamErrorKind::Transport, cause)
    }

    /// Creates an error for a non-success response status.
    pub fn status(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(UpstreamErrorKind::Status, cause)
    }

    /// Creates an error for an unreadable response body.
    pub fn decode(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(UpstreamErrorKind::Decode, cause)
    }

    /// Returns the kind of failure.
    #[must_use]
    pub fn kind(&self) -> UpstreamErrorKind {
        self.kind
    }
}

impl Recovery for UpstreamError {
    fn recovery(&self) -> RecoveryInfo {
        match self.kind {
            UpstreamErrorKind::Transport => RecoveryInfo::retry(),
            UpstreamErrorKind::Status => RecoveryInfo::unavailable(),
            UpstreamErrorKind::Decode => RecoveryInfo::never(),
        }
    }
}
