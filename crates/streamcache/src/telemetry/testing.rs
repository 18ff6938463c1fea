// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Collectors for asserting on emitted logs and metrics.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::data::{AggregatedMetrics, Metric, MetricData, ResourceMetrics, ScopeMetrics};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, SdkMeterProvider};
use tracing_subscriber::fmt::MakeWriter;

/// A meter provider that keeps exported metrics in memory.
#[derive(Debug)]
pub(crate) struct MetricTester {
    exporter: InMemoryMetricExporter,
    provider: SdkMeterProvider,
}

impl MetricTester {
    pub fn new() -> Self {
        let exporter = InMemoryMetricExporter::default();
        let provider = SdkMeterProvider::builder().with_periodic_exporter(exporter.clone()).build();
        Self { exporter, provider }
    }

    pub fn meter_provider(&self) -> &SdkMeterProvider {
        &self.provider
    }

    /// Flushes the provider and returns every exported data point as (metric name, attributes).
    pub fn data_points(&self) -> Vec<(String, Vec<KeyValue>)> {
        self.provider.force_flush().expect("flush should succeed");
        self.exporter
            .get_finished_metrics()
            .expect("metrics should be readable")
            .iter()
            .flat_map(ResourceMetrics::scope_metrics)
            .flat_map(ScopeMetrics::metrics)
            .flat_map(|metric| attribute_sets(metric).into_iter().map(move |set| (metric.name().to_string(), set)))
            .collect()
    }

    pub fn assert_recorded(&self, metric_name: &str, expected: &[KeyValue]) {
        let points = self.data_points();
        let found = points
            .iter()
            .any(|(name, attributes)| name == metric_name && expected.iter().all(|kv| attributes.contains(kv)));
        assert!(found, "no {metric_name} point with {expected:?}, got: {points:?}");
    }
}

// Only u64 sums and f64 histograms are created by this crate.
fn attribute_sets(metric: &Metric) -> Vec<Vec<KeyValue>> {
    match metric.data() {
        AggregatedMetrics::U64(MetricData::Sum(sum)) => sum.data_points().map(|p| p.attributes().cloned().collect()).collect(),
        AggregatedMetrics::F64(MetricData::Histogram(histogram)) => {
            histogram.data_points().map(|p| p.attributes().cloned().collect()).collect()
        }
        _ => Vec::new(),
    }
}

/// Captures formatted `tracing` output.
///
/// Install with `tracing::subscriber::set_default(capture.subscriber())`.
#[derive(Debug, Clone, Default)]
pub(crate) struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().expect("log buffer poisoned")).into_owned()
    }

    pub fn assert_contains(&self, expected: &str) {
        let output = self.output();
        assert!(output.contains(expected), "expected '{expected}' in logs:\n{output}");
    }

    pub fn subscriber(&self) -> impl tracing::Subscriber {
        use tracing_subscriber::layer::SubscriberExt;

        let layer = tracing_subscriber::fmt::layer().with_writer(self.clone()).with_ansi(false);
        tracing_subscriber::registry().with(layer)
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().expect("log buffer poisoned").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
