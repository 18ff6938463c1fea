// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! OpenTelemetry instruments fed by cache events.

use std::time::Duration;

use opentelemetry::{
    InstrumentationScope, KeyValue,
    metrics::{Counter, Histogram, MeterProvider},
};

const SCOPE_NAME: &str = "streamcache";
const EVENT_COUNT: &str = "cache.event.count";
const OPERATION_DURATION: &str = "cache.operation.duration";

/// The counter and histogram every cache event is recorded into.
#[derive(Clone, Debug)]
pub(crate) struct CacheInstruments {
    events: Counter<u64>,
    durations: Histogram<f64>,
}

impl CacheInstruments {
    pub(crate) fn new(provider: &dyn MeterProvider) -> Self {
        let meter = provider.meter_with_scope(
            InstrumentationScope::builder(SCOPE_NAME)
                .with_version(env!("CARGO_PKG_VERSION"))
                .build(),
        );

        Self {
            events: meter
                .u64_counter(EVENT_COUNT)
                .with_description("Store calls and caching decisions")
                .with_unit("{event}")
                .build(),
            durations: meter
                .f64_histogram(OPERATION_DURATION)
                .with_description("Time spent waiting on the store")
                .with_unit("s")
                .build(),
        }
    }

    pub(crate) fn record(&self, attributes: &[KeyValue], duration: Option<Duration>) {
        self.events.add(1, attributes);
        if let Some(duration) = duration {
            self.durations.record(duration.as_secs_f64(), attributes);
        }
    }
}
