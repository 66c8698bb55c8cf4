//! Prometheus metrics for heartbeat.

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::atomic::AtomicU64;
use std::time::Duration;

/// Metrics registry shared by the jobs and the `/metrics` endpoint
#[derive(Debug)]
pub struct MetricsRegistry {
    /// Prometheus registry
    pub registry: Registry,

    /// Messages printed, exposed as `messages_printed_total`
    messages_printed: Counter,
    /// Elapsed time since start, in seconds
    runtime_seconds: Gauge<f64, AtomicU64>,
}

impl MetricsRegistry {
    /// Create a registry with both instruments registered
    pub fn new() -> Self {
        let mut registry = Registry::default();

        // The encoder appends the `_total` suffix to counters.
        let messages_printed = Counter::default();
        registry.register(
            "messages_printed",
            "Total number of messages printed",
            messages_printed.clone(),
        );

        let runtime_seconds = Gauge::<f64, AtomicU64>::default();
        registry.register(
            "app_runtime_seconds",
            "Elapsed time since application started in seconds",
            runtime_seconds.clone(),
        );

        Self {
            registry,
            messages_printed,
            runtime_seconds,
        }
    }

    /// Record one printed message
    pub fn record_message(&self) {
        self.messages_printed.inc();
    }

    /// Set the runtime gauge
    pub fn set_runtime(&self, elapsed: Duration) {
        self.runtime_seconds.set(elapsed.as_secs_f64());
    }

    /// Current value of the message counter
    pub fn messages_printed(&self) -> u64 {
        self.messages_printed.get()
    }

    /// Current value of the runtime gauge
    pub fn runtime_seconds(&self) -> f64 {
        self.runtime_seconds.get()
    }

    /// Encode every registered metric in the text exposition format
    pub fn encode_text(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_starts_at_zero() {
        let registry = MetricsRegistry::new();
        assert_eq!(registry.messages_printed(), 0);
        assert_eq!(registry.runtime_seconds(), 0.0);
    }

    #[test]
    fn test_record_message() {
        let registry = MetricsRegistry::new();

        registry.record_message();
        registry.record_message();
        registry.record_message();

        assert_eq!(registry.messages_printed(), 3);
    }

    #[test]
    fn test_set_runtime_overwrites() {
        let registry = MetricsRegistry::new();

        registry.set_runtime(Duration::from_secs(5));
        registry.set_runtime(Duration::from_millis(10_500));

        assert_eq!(registry.runtime_seconds(), 10.5);
    }

    #[test]
    fn test_encode_text() {
        let registry = MetricsRegistry::new();
        registry.record_message();
        registry.record_message();
        registry.set_runtime(Duration::from_secs(5));

        let text = registry.encode_text().unwrap();

        assert!(text.contains("# TYPE messages_printed counter"));
        assert!(text.contains("messages_printed_total 2"));
        assert!(text.contains("# TYPE app_runtime_seconds gauge"));
        assert!(text.contains("app_runtime_seconds 5"));
    }
}
