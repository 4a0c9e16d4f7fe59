// Metrics module - Prometheus-compatible metrics tracking
// Provides counters and latency percentiles for the gateway

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::constants::LATENCY_SAMPLE_WINDOW;

/// Histogram represents percentile statistics for latency measurements
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Histogram {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl Histogram {
    fn empty() -> Self {
        Histogram {
            p50: 0.0,
            p90: 0.0,
            p95: 0.0,
            p99: 0.0,
        }
    }
}

/// Latency samples in microseconds, oldest dropped first
struct SampleWindow {
    samples: VecDeque<u64>,
    capacity: usize,
}

impl SampleWindow {
    fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn push(&mut self, sample: u64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    fn histogram(&self) -> Histogram {
        let samples: Vec<u64> = self.samples.iter().copied().collect();
        calculate_histogram(&samples)
    }
}

/// Metrics struct tracks counters and histograms for Prometheus export
/// Thread-safe via atomic operations and mutexes
pub struct Metrics {
    // Request counters
    request_count: AtomicU64,

    // Status code counters (e.g., 200, 400, 500)
    status_counts: Mutex<HashMap<u16, u64>>,

    // HTTP method counters (GET, HEAD, ...)
    method_counts: Mutex<HashMap<String, u64>>,

    // Optimize route answers by mode (image, passthrough, ...)
    mode_counts: Mutex<HashMap<String, u64>>,

    // Engine calls that returned an error
    engine_failures: AtomicU64,

    bytes_sent: AtomicU64,

    // Whole-request and engine-only latency
    durations: Mutex<SampleWindow>,
    engine_latencies: Mutex<SampleWindow>,
}

impl Metrics {
    /// Create a new Metrics instance
    pub fn new() -> Self {
        Self::with_window(LATENCY_SAMPLE_WINDOW)
    }

    /// Create a Metrics instance keeping at most `window` latency samples
    pub fn with_window(window: usize) -> Self {
        Metrics {
            request_count: AtomicU64::new(0),
            status_counts: Mutex::new(HashMap::new()),
            method_counts: Mutex::new(HashMap::new()),
            mode_counts: Mutex::new(HashMap::new()),
            engine_failures: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            durations: Mutex::new(SampleWindow::new(window)),
            engine_latencies: Mutex::new(SampleWindow::new(window)),
        }
    }

    pub fn increment_request_count(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_status_count(&self, status_code: u16) {
        if let Ok(mut counts) = self.status_counts.lock() {
            *counts.entry(status_code).or_insert(0) += 1;
        }
    }

    pub fn increment_method_count(&self, method: &str) {
        if let Ok(mut counts) = self.method_counts.lock() {
            *counts.entry(method.to_string()).or_insert(0) += 1;
        }
    }

    pub fn increment_mode_count(&self, mode: &str) {
        if let Ok(mut counts) = self.mode_counts.lock() {
            *counts.entry(mode.to_string()).or_insert(0) += 1;
        }
    }

    pub fn add_bytes_sent(&self, bytes: u64) {
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a request duration in milliseconds
    pub fn record_duration(&self, duration_ms: f64) {
        if let Ok(mut durations) = self.durations.lock() {
            durations.push((duration_ms * 1000.0) as u64);
        }
    }

    /// Record one engine call; failed calls are counted as well as timed
    pub fn record_engine_call(&self, duration_ms: f64, failed: bool) {
        if failed {
            self.engine_failures.fetch_add(1, Ordering::Relaxed);
        }
        if let Ok(mut latencies) = self.engine_latencies.lock() {
            latencies.push((duration_ms * 1000.0) as u64);
        }
    }

    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn get_status_count(&self, status_code: u16) -> u64 {
        self.status_counts
            .lock()
            .ok()
            .and_then(|counts| counts.get(&status_code).copied())
            .unwrap_or(0)
    }

    pub fn get_method_count(&self, method: &str) -> u64 {
        self.method_counts
            .lock()
            .ok()
            .and_then(|counts| counts.get(method).copied())
            .unwrap_or(0)
    }

    pub fn get_mode_count(&self, mode: &str) -> u64 {
        self.mode_counts
            .lock()
            .ok()
            .and_then(|counts| counts.get(mode).copied())
            .unwrap_or(0)
    }

    pub fn get_engine_failures(&self) -> u64 {
        self.engine_failures.load(Ordering::Relaxed)
    }

    pub fn get_bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Calculate histogram from request duration samples
    pub fn get_duration_histogram(&self) -> Histogram {
        self.durations
            .lock()
            .map(|window| window.histogram())
            .unwrap_or_else(|_| Histogram::empty())
    }

    /// Calculate histogram from engine latency samples
    pub fn get_engine_latency_histogram(&self) -> Histogram {
        self.engine_latencies
            .lock()
            .map(|window| window.histogram())
            .unwrap_or_else(|_| Histogram::empty())
    }

    /// Export metrics in Prometheus text format
    /// Returns metrics as text/plain content for /metrics endpoint
    pub fn export_prometheus(&self) -> String {
        let mut output = String::new();

        // Request metrics
        output.push_str("# HELP http_requests_total Total number of HTTP requests received\n");
        output.push_str("# TYPE http_requests_total counter\n");
        output.push_str(&format!(
            "http_requests_total {}\n",
            self.request_count.load(Ordering::Relaxed)
        ));

        output.push_str("\n# HELP http_requests_by_status_total HTTP requests by status code\n");
        output.push_str("# TYPE http_requests_by_status_total counter\n");
        if let Ok(counts) = self.status_counts.lock() {
            for (status, count) in sorted(counts.iter()) {
                output.push_str(&format!(
                    "http_requests_by_status_total{{status=\"{}\"}} {}\n",
                    status, count
                ));
            }
        }

        output.push_str("\n# HELP http_requests_by_method_total HTTP requests by method\n");
        output.push_str("# TYPE http_requests_by_method_total counter\n");
        if let Ok(counts) = self.method_counts.lock() {
            for (method, count) in sorted(counts.iter()) {
                output.push_str(&format!(
                    "http_requests_by_method_total{{method=\"{}\"}} {}\n",
                    method, count
                ));
            }
        }

        output.push_str("\n# HELP optimize_requests_by_mode_total Optimize requests by response mode\n");
        output.push_str("# TYPE optimize_requests_by_mode_total counter\n");
        if let Ok(counts) = self.mode_counts.lock() {
            for (mode, count) in sorted(counts.iter()) {
                output.push_str(&format!(
                    "optimize_requests_by_mode_total{{mode=\"{}\"}} {}\n",
                    mode, count
                ));
            }
        }

        output.push_str("\n# HELP engine_failures_total Image engine calls that failed\n");
        output.push_str("# TYPE engine_failures_total counter\n");
        output.push_str(&format!(
            "engine_failures_total {}\n",
            self.engine_failures.load(Ordering::Relaxed)
        ));

        output.push_str("\n# HELP bytes_sent_total Total response body bytes sent to clients\n");
        output.push_str("# TYPE bytes_sent_total counter\n");
        output.push_str(&format!(
            "bytes_sent_total {}\n",
            self.get_bytes_sent()
        ));

        push_summary(
            &mut output,
            "http_request_duration_ms",
            "HTTP request duration in milliseconds",
            self.get_duration_histogram(),
        );
        push_summary(
            &mut output,
            "engine_duration_ms",
            "Image engine call duration in milliseconds",
            self.get_engine_latency_histogram(),
        );

        output
    }
}

fn push_summary(output: &mut String, name: &str, help: &str, histogram: Histogram) {
    output.push_str(&format!("\n# HELP {} {}\n", name, help));
    output.push_str(&format!("# TYPE {} summary\n", name));
    for (quantile, value) in [
        ("0.5", histogram.p50),
        ("0.9", histogram.p90),
        ("0.95", histogram.p95),
        ("0.99", histogram.p99),
    ] {
        output.push_str(&format!(
            "{}{{quantile=\"{}\"}} {:.3}\n",
            name, quantile, value
        ));
    }
}

// Stable label order in the export
fn sorted<'a, K: Ord + 'a, V: 'a>(entries: impl Iterator<Item = (&'a K, &'a V)>) -> Vec<(&'a K, &'a V)> {
    let mut entries: Vec<_> = entries.collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

fn calculate_histogram(samples: &[u64]) -> Histogram {
    if samples.is_empty() {
        return Histogram::empty();
    }

    let mut sorted: Vec<u64> = samples.to_vec();
    sorted.sort_unstable();

    let p50_idx = (sorted.len() as f64 * 0.50) as usize;
    let p90_idx = (sorted.len() as f64 * 0.90) as usize;
    let p95_idx = (sorted.len() as f64 * 0.95) as usize;
    let p99_idx = (sorted.len() as f64 * 0.99) as usize;

    // Convert from microseconds to milliseconds
    Histogram {
        p50: sorted.get(p50_idx.saturating_sub(1)).copied().unwrap_or(0) as f64 / 1000.0,
        p90: sorted.get(p90_idx.saturating_sub(1)).copied().unwrap_or(0) as f64 / 1000.0,
        p95: sorted.get(p95_idx.saturating_sub(1)).copied().unwrap_or(0) as f64 / 1000.0,
        p99: sorted.get(p99_idx.saturating_sub(1)).copied().unwrap_or(0) as f64 / 1000.0,
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
