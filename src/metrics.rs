//! Per-session prediction statistics.

use crate::error::InferenceError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Keep at most this many latency samples
const MAX_SAMPLES: usize = 10_000;

/// Counters and latencies for one interactive session
pub struct SessionMetrics {
    /// Predictions returned to the user
    pub predictions_served: AtomicU64,
    /// Requests rejected while encoding inputs
    pub encoding_failures: AtomicU64,
    /// Requests whose model call failed
    pub prediction_failures: AtomicU64,
    /// Request latencies (in microseconds)
    latencies: RwLock<Vec<u64>>,
    start_time: Instant,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            predictions_served: AtomicU64::new(0),
            encoding_failures: AtomicU64::new(0),
            prediction_failures: AtomicU64::new(0),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_success(&self, latency: Duration) {
        self.predictions_served.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.latencies.write() {
            times.push(latency.as_micros() as u64);
            if times.len() > MAX_SAMPLES {
                times.drain(0..MAX_SAMPLES / 2);
            }
        }
    }

    /// Record a failed request by error kind
    pub fn record_failure(&self, error: &InferenceError) {
        let counter = match error {
            InferenceError::Encoding(_) => &self.encoding_failures,
            InferenceError::Prediction(_) => &self.prediction_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Total requests seen, successful or not
    pub fn total_requests(&self) -> u64 {
        self.predictions_served.load(Ordering::Relaxed)
            + self.encoding_failures.load(Ordering::Relaxed)
            + self.prediction_failures.load(Ordering::Relaxed)
    }

    /// Get latency statistics
    pub fn latency_stats(&self) -> LatencyStats {
        let Ok(times) = self.latencies.read() else {
            return LatencyStats::default();
        };
        if times.is_empty() {
            return LatencyStats::default();
        }

        let mut sorted = times.clone();
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let percentile = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: percentile(0.50),
            p95_us: percentile(0.95),
            max_us: sorted[count - 1],
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let served = self.predictions_served.load(Ordering::Relaxed);
        let encoding = self.encoding_failures.load(Ordering::Relaxed);
        let prediction = self.prediction_failures.load(Ordering::Relaxed);
        let latency = self.latency_stats();

        info!(
            requests = self.total_requests(),
            served,
            encoding_failures = encoding,
            prediction_failures = prediction,
            session_secs = self.start_time.elapsed().as_secs(),
            "Session summary"
        );
        info!(
            mean_us = latency.mean_us,
            p50_us = latency.p50_us,
            p95_us = latency.p95_us,
            max_us = latency.max_us,
            "Prediction latency"
        );
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency statistics
#[derive(Debug, Default, PartialEq)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub max_us: u64,
}
