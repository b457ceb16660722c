//! Injectable metrics sink.
//!
//! Components receive a sink at construction time instead of reaching for a
//! process-global registry, so tests can observe exactly what a component
//! recorded and the binary decides where the numbers go.

use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};
use prometheus::{CounterVec, Gauge, HistogramOpts, HistogramVec, Opts, Registry};

/// Write-only sink for the service's counters, histograms, and gauges.
///
/// Label names for a metric are fixed by its first use; later calls must
/// pass the same labels in the same order.
pub trait MetricsSink: Send + Sync {
    fn increment_counter(&self, name: &str, labels: &[(&str, &str)]);
    fn observe_histogram(&self, name: &str, labels: &[(&str, &str)], value: f64);
    fn set_gauge(&self, name: &str, value: f64);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn increment_counter(&self, _name: &str, _labels: &[(&str, &str)]) {}
    fn observe_histogram(&self, _name: &str, _labels: &[(&str, &str)], _value: f64) {}
    fn set_gauge(&self, _name: &str, _value: f64) {}
}

/// Prometheus-backed sink over an explicitly injected registry.
///
/// Collectors are registered lazily on first use. Registration failures are
/// logged and the observation dropped; recording a metric never panics.
pub struct PrometheusSink {
    registry: Registry,
    counters: RwLock<HashMap<String, CounterVec>>,
    histograms: RwLock<HashMap<String, HistogramVec>>,
    gauges: RwLock<HashMap<String, Gauge>>,
}

impl PrometheusSink {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            counters: RwLock::new(HashMap::new()),
            histograms: RwLock::new(HashMap::new()),
            gauges: RwLock::new(HashMap::new()),
        }
    }

    /// The registry backing this sink, for text exposition.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn counter(&self, name: &str, label_names: &[&str]) -> Option<CounterVec> {
        if let Some(existing) = self.counters.read().get(name) {
            return Some(existing.clone());
        }

        let mut counters = self.counters.write();
        if let Some(existing) = counters.get(name) {
            return Some(existing.clone());
        }

        let vec = match CounterVec::new(Opts::new(name, format!("{name} counter")), label_names) {
            Ok(vec) => vec,
            Err(e) => {
                tracing::warn!("failed to create counter {}: {}", name, e);
                return None;
            }
        };
        if let Err(e) = self.registry.register(Box::new(vec.clone())) {
            tracing::warn!("failed to register counter {}: {}", name, e);
            return None;
        }
        counters.insert(name.to_string(), vec.clone());
        Some(vec)
    }

    fn histogram(&self, name: &str, label_names: &[&str]) -> Option<HistogramVec> {
        if let Some(existing) = self.histograms.read().get(name) {
            return Some(existing.clone());
        }

        let mut histograms = self.histograms.write();
        if let Some(existing) = histograms.get(name) {
            return Some(existing.clone());
        }

        let vec = match HistogramVec::new(
            HistogramOpts::new(name, format!("{name} histogram")),
            label_names,
        ) {
            Ok(vec) => vec,
            Err(e) => {
                tracing::warn!("failed to create histogram {}: {}", name, e);
                return None;
            }
        };
        if let Err(e) = self.registry.register(Box::new(vec.clone())) {
            tracing::warn!("failed to register histogram {}: {}", name, e);
            return None;
        }
        histograms.insert(name.to_string(), vec.clone());
        Some(vec)
    }

    fn gauge(&self, name: &str) -> Option<Gauge> {
        if let Some(existing) = self.gauges.read().get(name) {
            return Some(existing.clone());
        }

        let mut gauges = self.gauges.write();
        if let Some(existing) = gauges.get(name) {
            return Some(existing.clone());
        }

        let gauge = match Gauge::new(name.to_string(), format!("{name} gauge")) {
            Ok(gauge) => gauge,
            Err(e) => {
                tracing::warn!("failed to create gauge {}: {}", name, e);
                return None;
            }
        };
        if let Err(e) = self.registry.register(Box::new(gauge.clone())) {
            tracing::warn!("failed to register gauge {}: {}", name, e);
            return None;
        }
        gauges.insert(name.to_string(), gauge.clone());
        Some(gauge)
    }
}

impl MetricsSink for PrometheusSink {
    fn increment_counter(&self, name: &str, labels: &[(&str, &str)]) {
        let names: Vec<&str> = labels.iter().map(|(k, _)| *k).collect();
        let values: Vec<&str> = labels.iter().map(|(_, v)| *v).collect();
        if let Some(vec) = self.counter(name, &names) {
            match vec.get_metric_with_label_values(&values) {
                Ok(counter) => counter.inc(),
                Err(e) => tracing::warn!("label mismatch on counter {}: {}", name, e),
            }
        }
    }

    fn observe_histogram(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        let names: Vec<&str> = labels.iter().map(|(k, _)| *k).collect();
        let values: Vec<&str> = labels.iter().map(|(_, v)| *v).collect();
        if let Some(vec) = self.histogram(name, &names) {
            match vec.get_metric_with_label_values(&values) {
                Ok(histogram) => histogram.observe(value),
                Err(e) => tracing::warn!("label mismatch on histogram {}: {}", name, e),
            }
        }
    }

    fn set_gauge(&self, name: &str, value: f64) {
        if let Some(gauge) = self.gauge(name) {
            gauge.set(value);
        }
    }
}

impl std::fmt::Debug for PrometheusSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusSink").finish_non_exhaustive()
    }
}

/// In-memory sink that accumulates observations for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    counters: Mutex<HashMap<String, f64>>,
    histograms: Mutex<HashMap<String, Vec<f64>>>,
    gauges: Mutex<HashMap<String, f64>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter, 0.0 if never incremented.
    pub fn counter_value(&self, name: &str, labels: &[(&str, &str)]) -> f64 {
        self.counters
            .lock()
            .get(&series_key(name, labels))
            .copied()
            .unwrap_or(0.0)
    }

    /// All observations recorded against a histogram series.
    pub fn histogram_values(&self, name: &str, labels: &[(&str, &str)]) -> Vec<f64> {
        self.histograms
            .lock()
            .get(&series_key(name, labels))
            .cloned()
            .unwrap_or_default()
    }

    /// Last value set on a gauge, if any.
    pub fn gauge_value(&self, name: &str) -> Option<f64> {
        self.gauges.lock().get(name).copied()
    }
}

impl MetricsSink for RecordingSink {
    fn increment_counter(&self, name: &str, labels: &[(&str, &str)]) {
        *self
            .counters
            .lock()
            .entry(series_key(name, labels))
            .or_insert(0.0) += 1.0;
    }

    fn observe_histogram(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        self.histograms
            .lock()
            .entry(series_key(name, labels))
            .or_default()
            .push(value);
    }

    fn set_gauge(&self, name: &str, value: f64) {
        self.gauges.lock().insert(name.to_string(), value);
    }
}

fn series_key(name: &str, labels: &[(&str, &str)]) -> String {
    if labels.is_empty() {
        return name.to_string();
    }
    let rendered: Vec<String> = labels.iter().map(|(k, v)| format!("{k}=\"{v}\"")).collect();
    format!("{name}{{{}}}", rendered.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_counts_per_series() {
        let sink = RecordingSink::new();

        sink.increment_counter("jobs_total", &[("outcome", "success")]);
        sink.increment_counter("jobs_total", &[("outcome", "success")]);
        sink.increment_counter("jobs_total", &[("outcome", "error")]);

        assert_eq!(sink.counter_value("jobs_total", &[("outcome", "success")]), 2.0);
        assert_eq!(sink.counter_value("jobs_total", &[("outcome", "error")]), 1.0);
        assert_eq!(sink.counter_value("jobs_total", &[("outcome", "missing")]), 0.0);
    }

    #[test]
    fn test_recording_sink_gauge_keeps_last_value() {
        let sink = RecordingSink::new();

        sink.set_gauge("queue_length", 5.0);
        sink.set_gauge("queue_length", -1.0);

        assert_eq!(sink.gauge_value("queue_length"), Some(-1.0));
        assert_eq!(sink.gauge_value("unknown"), None);
    }

    #[test]
    fn test_recording_sink_histogram_accumulates() {
        let sink = RecordingSink::new();

        sink.observe_histogram("latency", &[("path", "/health")], 0.01);
        sink.observe_histogram("latency", &[("path", "/health")], 0.02);

        assert_eq!(
            sink.histogram_values("latency", &[("path", "/health")]),
            vec![0.01, 0.02]
        );
    }

    #[test]
    fn test_prometheus_sink_registers_once() {
        let sink = PrometheusSink::new(Registry::new());

        sink.increment_counter("requests_total", &[("code", "200")]);
        sink.increment_counter("requests_total", &[("code", "200")]);
        sink.increment_counter("requests_total", &[("code", "500")]);

        let families = sink.registry().gather();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].get_name(), "requests_total");
        assert_eq!(families[0].get_metric().len(), 2);
    }

    #[test]
    fn test_prometheus_sink_gauge_set() {
        let sink = PrometheusSink::new(Registry::new());

        sink.set_gauge("queue_length", 7.0);
        sink.set_gauge("queue_length", -1.0);

        let families = sink.registry().gather();
        assert_eq!(families.len(), 1);
        let value = families[0].get_metric()[0].get_gauge().get_value();
        assert_eq!(value, -1.0);
    }

    #[test]
    fn test_prometheus_sink_label_mismatch_does_not_panic() {
        let sink = PrometheusSink::new(Registry::new());

        sink.increment_counter("requests_total", &[("code", "200")]);
        // Wrong label cardinality: dropped with a warning, no panic.
        sink.increment_counter("requests_total", &[]);

        let families = sink.registry().gather();
        assert_eq!(families[0].get_metric().len(), 1);
    }
}
