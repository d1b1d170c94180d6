// Transform metrics.
//
// Counters are plain atomics indexed by `MessageType` / `ErrorType`, so the hot
// path never takes a lock. Latency samples live behind their own mutex and
// only the recording and reading of samples touch it.
//
// Every event is also forwarded to the `metrics` facade so whichever exporter
// the process installs (Prometheus in the server) sees the same numbers.
use std::array;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

use crate::category::{ErrorType, MessageType};

/// Metrics capability the transformers and error handler report into.
pub trait TransformMetrics: Send + Sync {
    /// A message of `message_type` transformed successfully in `latency`.
    fn record_success(&self, message_type: MessageType, latency: Duration);

    /// A transform step for `message_type` failed with `error_type`.
    fn record_error(&self, message_type: MessageType, error_type: ErrorType);

    /// The error handler surfaced an error classified as `error_type`.
    fn record_handled_error(&self, error_type: ErrorType);
}

#[derive(Debug, Default)]
struct LatencyWindow {
    samples: VecDeque<Duration>,
    average: Duration,
}

impl LatencyWindow {
    fn push(&mut self, sample: Duration, capacity: usize) {
        while self.samples.len() >= capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        let total: Duration = self.samples.iter().sum();
        self.average = total / self.samples.len() as u32;
    }

    /// Approximate percentile: indexes the retained samples in arrival order.
    /// The buffer is not sorted, so this is only a cheap estimate.
    fn percentile(&self, p: f64) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let len = self.samples.len();
        let p = p.clamp(0.0, 100.0);
        let idx = ((len as f64 * p / 100.0).floor() as usize).min(len - 1);
        self.samples.get(idx).copied()
    }

    fn clear(&mut self) {
        self.samples.clear();
        self.average = Duration::ZERO;
    }
}

/// Thread-safe in-process transform metrics.
#[derive(Debug)]
pub struct MetricsCollector {
    successes: [AtomicU64; MessageType::COUNT],
    errors: [[AtomicU64; ErrorType::COUNT]; MessageType::COUNT],
    handled: [AtomicU64; ErrorType::COUNT],
    latency: Mutex<[LatencyWindow; MessageType::COUNT]>,
    sample_capacity: usize,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl MetricsCollector {
    /// `sample_capacity` latency samples are kept per message type (min 1).
    pub fn new(sample_capacity: usize) -> Self {
        Self {
            successes: array::from_fn(|_| AtomicU64::new(0)),
            errors: array::from_fn(|_| array::from_fn(|_| AtomicU64::new(0))),
            handled: array::from_fn(|_| AtomicU64::new(0)),
            latency: Mutex::new(array::from_fn(|_| LatencyWindow::default())),
            sample_capacity: sample_capacity.max(1),
        }
    }

    fn windows(&self) -> std::sync::MutexGuard<'_, [LatencyWindow; MessageType::COUNT]> {
        self.latency
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn success_count(&self, message_type: MessageType) -> u64 {
        self.successes[message_type.index()].load(Ordering::Relaxed)
    }

    pub fn error_count(&self, message_type: MessageType, error_type: ErrorType) -> u64 {
        self.errors[message_type.index()][error_type.index()].load(Ordering::Relaxed)
    }

    /// Errors of every category recorded against `message_type`.
    pub fn total_errors(&self, message_type: MessageType) -> u64 {
        self.errors[message_type.index()]
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .sum()
    }

    pub fn handled_count(&self, error_type: ErrorType) -> u64 {
        self.handled[error_type.index()].load(Ordering::Relaxed)
    }

    pub fn sample_count(&self, message_type: MessageType) -> usize {
        self.windows()[message_type.index()].samples.len()
    }

    /// Mean over the retained latency window; zero when no samples exist.
    pub fn average_latency(&self, message_type: MessageType) -> Duration {
        self.windows()[message_type.index()].average
    }

    /// Approximate `p`th percentile of the retained samples.
    ///
    /// This reads the sample at position `floor(len * p / 100)` of the
    /// *unsorted* buffer (arrival order). It is cheap and stable enough for
    /// dashboards but is not a true percentile.
    pub fn latency_percentile(&self, message_type: MessageType, p: f64) -> Option<Duration> {
        self.windows()[message_type.index()].percentile(p)
    }

    /// Clear every counter and sample buffer.
    pub fn reset(&self) {
        for counter in &self.successes {
            counter.store(0, Ordering::Relaxed);
        }
        for row in &self.errors {
            for counter in row {
                counter.store(0, Ordering::Relaxed);
            }
        }
        for counter in &self.handled {
            counter.store(0, Ordering::Relaxed);
        }
        for window in self.windows().iter_mut() {
            window.clear();
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let windows = self.windows();
        let mut message_types = BTreeMap::new();
        for message_type in MessageType::ALL {
            let window = &windows[message_type.index()];
            let errors = ErrorType::ALL
                .into_iter()
                .filter_map(|error_type| {
                    let count = self.error_count(message_type, error_type);
                    (count > 0).then(|| (error_type.as_str(), count))
                })
                .collect();
            message_types.insert(
                message_type.as_str(),
                MessageTypeSnapshot {
                    successes: self.success_count(message_type),
                    errors,
                    samples: window.samples.len(),
                    average_latency_micros: window.average.as_micros() as u64,
                    p50_latency_micros: window.percentile(50.0).map(|d| d.as_micros() as u64),
                    p95_latency_micros: window.percentile(95.0).map(|d| d.as_micros() as u64),
                    p99_latency_micros: window.percentile(99.0).map(|d| d.as_micros() as u64),
                },
            );
        }
        let handled_errors = ErrorType::ALL
            .into_iter()
            .filter_map(|error_type| {
                let count = self.handled_count(error_type);
                (count > 0).then(|| (error_type.as_str(), count))
            })
            .collect();
        MetricsSnapshot {
            message_types,
            handled_errors,
        }
    }
}

impl TransformMetrics for MetricsCollector {
    fn record_success(&self, message_type: MessageType, latency: Duration) {
        self.successes[message_type.index()].fetch_add(1, Ordering::Relaxed);
        self.windows()[message_type.index()].push(latency, self.sample_capacity);

        metrics::counter!("relay_transform_success_total", "message_type" => message_type.as_str())
            .increment(1);
        metrics::histogram!("relay_transform_latency_seconds", "message_type" => message_type.as_str())
            .record(latency.as_secs_f64());
    }

    fn record_error(&self, message_type: MessageType, error_type: ErrorType) {
        self.errors[message_type.index()][error_type.index()].fetch_add(1, Ordering::Relaxed);
        metrics::counter!(
            "relay_transform_errors_total",
            "message_type" => message_type.as_str(),
            "error_type" => error_type.as_str()
        )
        .increment(1);
    }

    fn record_handled_error(&self, error_type: ErrorType) {
        self.handled[error_type.index()].fetch_add(1, Ordering::Relaxed);
        metrics::counter!("relay_transform_handled_errors_total", "error_type" => error_type.as_str())
            .increment(1);
    }
}

/// Point-in-time copy of [`MetricsCollector`], keyed by wire names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub message_types: BTreeMap<&'static str, MessageTypeSnapshot>,
    pub handled_errors: BTreeMap<&'static str, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageTypeSnapshot {
    pub successes: u64,
    pub errors: BTreeMap<&'static str, u64>,
    pub samples: usize,
    pub average_latency_micros: u64,
    pub p50_latency_micros: Option<u64>,
    pub p95_latency_micros: Option<u64>,
    pub p99_latency_micros: Option<u64>,
}
