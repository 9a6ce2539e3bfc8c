//! Metric sinks: where processed telemetry goes.

use std::sync::Arc;

use dpdkscope_common::{Format, KeyExprBuilder, Metric, encode};

/// Receives finished metrics for storage or forwarding.
///
/// Fire-and-forget from the processor's perspective; a sink that cannot
/// deliver logs the failure itself.
#[allow(async_fn_in_trait)]
pub trait MetricSink {
    /// Accept one metric.
    async fn add_metric(&mut self, metric: Metric);
}

/// Publishes metrics to Zenoh, keyed by device and command.
pub struct ZenohSink {
    session: Arc<zenoh::Session>,
    key_builder: KeyExprBuilder,
    source: String,
    format: Format,
}

impl ZenohSink {
    /// Create a sink publishing under `<key_prefix>/<source>/<command>`.
    pub fn new(
        session: Arc<zenoh::Session>,
        key_prefix: &str,
        source: impl Into<String>,
        format: Format,
    ) -> Self {
        Self {
            session,
            key_builder: KeyExprBuilder::with_prefix(key_prefix),
            source: source.into(),
            format,
        }
    }

    fn key_for(&self, metric: &Metric) -> String {
        let command = metric
            .tags
            .get("command")
            .map(String::as_str)
            .unwrap_or(metric.measurement.as_str());
        self.key_builder.build(&self.source, command)
    }
}

impl MetricSink for ZenohSink {
    async fn add_metric(&mut self, metric: Metric) {
        let key = self.key_for(&metric);

        match encode(&metric, self.format) {
            Ok(payload) => {
                if let Err(e) = self.session.put(&key, payload).await {
                    tracing::error!(key = %key, error = %e, "Failed to publish to Zenoh");
                } else {
                    tracing::trace!(key = %key, "Published metric");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode metric");
            }
        }
    }
}

/// Buffers metrics in memory.
///
/// Used by the test suites and available for embedding the processor
/// without a Zenoh session.
#[derive(Debug, Default)]
pub struct MemorySink {
    metrics: Vec<Metric>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Metrics accepted so far, in arrival order.
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    /// Drain the buffered metrics.
    pub fn take(&mut self) -> Vec<Metric> {
        std::mem::take(&mut self.metrics)
    }
}

impl MetricSink for MemorySink {
    async fn add_metric(&mut self, metric: Metric) {
        self.metrics.push(metric);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_sink_buffers_in_order() {
        let mut sink = MemorySink::new();

        sink.add_metric(Metric::new("dpdk").with_field("a", 1.0)).await;
        sink.add_metric(Metric::new("dpdk").with_field("b", 2.0)).await;

        assert_eq!(sink.metrics().len(), 2);
        assert!(sink.metrics()[0].fields.contains_key("a"));

        let drained = sink.take();
        assert_eq!(drained.len(), 2);
        assert!(sink.metrics().is_empty());
    }

    #[test]
    fn test_zenoh_key_shape() {
        // Key building is pure; exercise it without a session.
        let builder = KeyExprBuilder::with_prefix("dpdkscope/dpdk");
        let key = builder.build("fwd0", "ethdev_link_status");
        assert_eq!(key, "dpdkscope/dpdk/fwd0/ethdev_link_status");
    }
}
