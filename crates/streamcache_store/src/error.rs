// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for store operations.

use std::fmt;

use recoverable::{Recovery, RecoveryInfo};

/// The broad class of a store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum StoreErrorKind {
    /// The store did not answer within the allotted time.
    Timeout,
    /// The store could not be reached, or the connection dropped mid-call.
    Connection,
    /// The store answered with something unexpected.
    Protocol,
}

impl StoreErrorKind {
    /// Returns a short, stable name for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connection => "connection",
            Self::Protocol => "protocol",
        }
    }
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error from a store operation.
///
/// Every error carries a [`StoreErrorKind`] and usually the underlying cause.
///
/// # Example
///
/// ```
/// use streamcache_store::{StoreError, StoreErrorKind};
///
/// let error = StoreError::connection("connection refused");
/// assert_eq!(error.kind(), StoreErrorKind::Connection);
/// assert!(error.is_transient());
/// ```
#[ohno::error]
#[display("cache store {kind} failure")]
pub struct StoreError {
    kind: StoreErrorKind,
}

impl StoreError {
    /// Creates a timeout error.
    pub fn timeout(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(StoreErrorKind::Timeout, cause)
    }

    /// Creates a connectivity error.
    pub fn connection(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(StoreErrorKind::Connection, cause)
    }

    /// Creates a protocol error.
    pub fn protocol(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(StoreErrorKind::Protocol, cause)
    }

    /// Returns the kind of failure.
    #[must_use]
    pub fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    /// Returns `true` for failures expected while the store is briefly unavailable.
    ///
    /// Callers log these at reduced verbosity.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, StoreErrorKind::Timeout | StoreErrorKind::Connection)
    }
}

impl Recovery for StoreError {
    fn recovery(&self) -> RecoveryInfo {
        match self.kind {
            StoreErrorKind::Timeout => RecoveryInfo::retry(),
            StoreErrorKind::Connection => RecoveryInfo::unavailable(),
            StoreErrorKind::Protocol => RecoveryInfo::never(),
        }
    }
}

/// A specialized [`Result`] type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
