// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cache telemetry integration.
//!
//! Every store operation and every engine decision is recorded as a `cache.event`
//! through `tracing`. With the `metrics` feature the same events also feed
//! OpenTelemetry instruments.

use std::{sync::Arc, time::Duration};

#[cfg(any(feature = "metrics", test))]
use opentelemetry::metrics::MeterProvider;

#[cfg(any(feature = "metrics", test))]
pub(crate) mod attributes;
pub(crate) mod ext;
#[cfg(any(feature = "metrics", test))]
pub(crate) mod metrics;
#[cfg(test)]
pub(crate) mod testing;

/// Configuration for cache telemetry.
///
/// Everything is disabled by default; the cache builder enables logs unless told
/// otherwise.
///
/// # Examples
///
/// ```
/// use streamcache::TelemetryConfig;
///
/// // Structured logs only
/// let config = TelemetryConfig::new().with_logs();
/// ```
#[derive(Clone, Debug, Default)]
pub struct TelemetryConfig {
    logs_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    instruments: Option<metrics::CacheInstruments>,
}

impl TelemetryConfig {
    /// Creates a configuration with logs and metrics disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables structured `cache.event` logs via `tracing`.
    #[must_use]
    pub fn with_logs(self) -> Self {
        Self {
            logs_enabled: true,
            ..self
        }
    }

    /// Enables OpenTelemetry metrics using the provided meter provider.
    #[cfg(any(feature = "metrics", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
    #[must_use]
    pub fn with_metrics(self, provider: &dyn MeterProvider) -> Self {
        Self {
            instruments: Some(metrics::CacheInstruments::new(provider)),
            ..self
        }
    }

    pub(crate) fn build(self) -> CacheTelemetry {
        CacheTelemetry { config: Arc::new(self) }
    }
}

/// Records cache events as logs and, optionally, metrics.
#[derive(Clone, Debug)]
pub(crate) struct CacheTelemetry {
    config: Arc<TelemetryConfig>,
}

impl CacheTelemetry {
    pub(crate) fn record(&self, cache_name: &str, operation: CacheOperation, activity: CacheActivity, duration: Option<Duration>) {
        #[cfg(any(feature = "metrics", test))]
        if let Some(instruments) = &self.config.instruments {
            instruments.record(&attributes::event_attributes(cache_name, operation, activity), duration);
        }

        if self.config.logs_enabled {
            emit(cache_name, operation, activity, duration);
        }
    }
}

fn emit(cache_name: &str, operation: CacheOperation, activity: CacheActivity, duration: Option<Duration>) {
    let operation = operation.as_str();
    let outcome = activity.as_str();
    let duration_ns = duration.map(|d| d.as_nanos());

    // tracing levels are fixed per call site
    macro_rules! cache_event {
        ($level:ident) => {
            tracing::$level!(
                cache.name = cache_name,
                cache.operation = operation,
                cache.activity = outcome,
                cache.duration_ns = ?duration_ns,
                "cache.event"
            )
        };
    }

    match activity.severity() {
        Severity::Error => cache_event!(error),
        Severity::Warn => cache_event!(warn),
        Severity::Debug => cache_event!(debug),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Severity {
    Debug,
    Warn,
    Error,
}

/// What the cache was doing when an event happened.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CacheOperation {
    /// A store read.
    Get,
    /// A store write.
    Set,
    /// An engine decision about an upstream fetch.
    Fetch,
}

impl CacheOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "cache.get",
            Self::Set => "cache.set",
            Self::Fetch => "cache.fetch",
        }
    }
}

/// How a cache operation turned out.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CacheActivity {
    Hit,
    Miss,
    Skipped,
    Inserted,
    Corrupt,
    Fallback,
    Timeout,
    Unavailable,
    Error,
}

impl CacheActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::Miss => "cache.miss",
            Self::Skipped => "cache.skipped",
            Self::Inserted => "cache.inserted",
            Self::Corrupt => "cache.corrupt",
            Self::Fallback => "cache.fallback",
            Self::Timeout => "cache.timeout",
            Self::Unavailable => "cache.unavailable",
            Self::Error => "cache.error",
        }
    }

    /// Events that happen on every request, an unreachable store included, stay at debug.
    pub fn severity(self) -> Severity {
        match self {
            Self::Hit | Self::Miss | Self::Skipped | Self::Inserted | Self::Unavailable => Severity::Debug,
            Self::Corrupt | Self::Fallback | Self::Timeout => Severity::Warn,
            Self::Error => Severity::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use opentelemetry::KeyValue;

    use super::*;
    use crate::telemetry::testing::{LogCapture, MetricTester};

    #[test]
    fn severity_follows_activity() {
        assert_eq!(CacheActivity::Hit.severity(), Severity::Debug);
        assert_eq!(CacheActivity::Skipped.severity(), Severity::Debug);
        assert_eq!(CacheActivity::Inserted.severity(), Severity::Debug);
        assert_eq!(CacheActivity::Unavailable.severity(), Severity::Debug);
        assert_eq!(CacheActivity::Timeout.severity(), Severity::Warn);
        assert_eq!(CacheActivity::Fallback.severity(), Severity::Warn);
        assert_eq!(CacheActivity::Corrupt.severity(), Severity::Warn);
        assert_eq!(CacheActivity::Error.severity(), Severity::Error);
    }

    #[test]
    fn log_fields_match_attribute_names() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        emit("streamcache.v1", CacheOperation::Set, CacheActivity::Error, Some(Duration::from_nanos(12345)));

        for field in [
            attributes::CACHE_NAME,
            attributes::CACHE_OPERATION,
            attributes::CACHE_ACTIVITY,
            attributes::CACHE_DURATION,
            attributes::EVENT_MESSAGE,
        ] {
            capture.assert_contains(field);
        }
        capture.assert_contains("streamcache.v1");
        capture.assert_contains("cache.set");
        capture.assert_contains("cache.error");
        capture.assert_contains("12345");
    }

    #[test]
    fn log_level_follows_severity() {
        for (activity, level) in [
            (CacheActivity::Error, "ERROR"),
            (CacheActivity::Timeout, "WARN"),
            (CacheActivity::Unavailable, "DEBUG"),
            (CacheActivity::Inserted, "DEBUG"),
            (CacheActivity::Hit, "DEBUG"),
        ] {
            let capture = LogCapture::new();
            let _guard = tracing::subscriber::set_default(capture.subscriber());
            emit("streamcache.v1", CacheOperation::Get, activity, None);
            capture.assert_contains(level);
        }
    }

    #[test]
    fn disabled_telemetry_is_silent() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        TelemetryConfig::new()
            .build()
            .record("streamcache.v1", CacheOperation::Get, CacheActivity::Hit, Some(Duration::from_secs(1)));

        assert!(capture.output().is_empty());
    }

    #[test]
    fn metrics_count_events_and_time_store_calls() {
        let tester = MetricTester::new();
        let telemetry = TelemetryConfig::new().with_metrics(tester.meter_provider()).build();

        telemetry.record(
            "streamcache.v1",
            CacheOperation::Get,
            CacheActivity::Timeout,
            Some(Duration::from_millis(200)),
        );
        telemetry.record("streamcache.v1", CacheOperation::Fetch, CacheActivity::Fallback, None);

        let timeout = [
            KeyValue::new(attributes::CACHE_NAME, "streamcache.v1"),
            KeyValue::new(attributes::CACHE_OPERATION, "cache.get"),
            KeyValue::new(attributes::CACHE_ACTIVITY, "cache.timeout"),
        ];
        tester.assert_recorded("cache.event.count", &timeout);
        tester.assert_recorded("cache.operation.duration", &timeout);
        tester.assert_recorded(
            "cache.event.count",
            &[KeyValue::new(attributes::CACHE_ACTIVITY, "cache.fallback")],
        );
    }
}
