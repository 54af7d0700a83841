//! Metrics sink used by the consumer.
//!
//! The consumer records counters through [`Monitor`]; implementations must
//! tolerate concurrent calls from every worker and should not block.

use std::sync::Arc;

use tracing::debug;

const METRICS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::metrics");

/// Label pairs attached to a metric sample.
pub type Labels<'a> = [(&'a str, &'a str)];

/// Counter emitted for every event forwarded by the reader.
pub const EVENTS_RECEIVED: &str = "events_received";
/// Counter emitted for every event the handler processed successfully.
pub const EVENTS_PROCESSED: &str = "events_processed";
/// Counter emitted for every event the handler rejected.
pub const EVENTS_ERRORS: &str = "events_errors";
/// Gauge tracking the intake queue depth after each forward.
pub const EVENTS_QUEUED: &str = "events_queued";
/// Gauge tracking the size of the running worker pool.
pub const WORKERS: &str = "workers";

/// Fire-and-forget metrics sink.
pub trait Monitor: Send + Sync {
    /// Sets a gauge to `value`.
    fn gauge(&self, key: &str, value: i64, labels: &Labels<'_>);

    /// Increments a counter by one.
    fn incr(&self, key: &str, labels: &Labels<'_>);
}

impl<T> Monitor for Arc<T>
where
    T: Monitor + ?Sized,
{
    fn gauge(&self, key: &str, value: i64, labels: &Labels<'_>) {
        (**self).gauge(key, value, labels);
    }

    fn incr(&self, key: &str, labels: &Labels<'_>) {
        (**self).incr(key, labels);
    }
}

/// Monitor that discards every sample.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMonitor;

impl Monitor for NoopMonitor {
    fn gauge(&self, _key: &str, _value: i64, _labels: &Labels<'_>) {}

    fn incr(&self, _key: &str, _labels: &Labels<'_>) {}
}

/// Monitor that emits samples as `tracing` debug events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMonitor;

impl Monitor for TracingMonitor {
    fn gauge(&self, key: &str, value: i64, labels: &Labels<'_>) {
        debug!(
            target: METRICS_TARGET,
            metric = key,
            kind = "gauge",
            value,
            labels = ?labels,
            "metric sample"
        );
    }

    fn incr(&self, key: &str, labels: &Labels<'_>) {
        debug!(
            target: METRICS_TARGET,
            metric = key,
            kind = "counter",
            labels = ?labels,
            "metric sample"
        );
    }
}
