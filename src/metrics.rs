//! Prometheus-style counters for the relay.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::error::RelayError;

// Fixed histogram bucket upper bounds in ms.
const LATENCY_BUCKETS_MS: [u64; 11] = [1, 2, 5, 10, 20, 50, 100, 200, 500, 1000, 2000];

pub struct RelayMetrics {
    requests_total: AtomicU64,
    delivered_total: AtomicU64,
    // Aligned with RelayError::KINDS.
    failures: Vec<AtomicU64>,
    hist_counts: Vec<AtomicU64>,
    hist_sum_ms: AtomicU64,
    hist_count: AtomicU64,
    process_start_epoch: f64,
    process_start_instant: Instant,
}

impl Default for RelayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayMetrics {
    pub fn new() -> Self {
        let start_time = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            requests_total: AtomicU64::new(0),
            delivered_total: AtomicU64::new(0),
            failures: RelayError::KINDS.iter().map(|_| AtomicU64::new(0)).collect(),
            hist_counts: LATENCY_BUCKETS_MS.iter().map(|_| AtomicU64::new(0)).collect(),
            hist_sum_ms: AtomicU64::new(0),
            hist_count: AtomicU64::new(0),
            process_start_epoch: start_time.as_secs_f64(),
            process_start_instant: Instant::now(),
        }
    }

    pub fn record(&self, outcome: Result<(), &RelayError>, latency_ms: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        match outcome {
            Ok(()) => {
                self.delivered_total.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                if let Some(idx) = RelayError::KINDS.iter().position(|k| *k == err.kind()) {
                    self.failures[idx].fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        self.hist_sum_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.hist_count.fetch_add(1, Ordering::Relaxed);
        // find first bucket >= value
        for (idx, ub) in LATENCY_BUCKETS_MS.iter().enumerate() {
            if latency_ms <= *ub {
                self.hist_counts[idx].fetch_add(1, Ordering::Relaxed);
                break;
            }
        }
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn delivered_total(&self) -> u64 {
        self.delivered_total.load(Ordering::Relaxed)
    }

    pub fn failures_of(&self, kind: &str) -> u64 {
        RelayError::KINDS
            .iter()
            .position(|k| *k == kind)
            .map(|idx| self.failures[idx].load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Text exposition format.
    pub fn render(&self) -> String {
        let mut buf = String::new();
        writeln!(
            &mut buf,
            "# HELP feedback_requests_total Total feedback requests handled"
        )
        .ok();
        writeln!(&mut buf, "# TYPE feedback_requests_total counter").ok();
        writeln!(&mut buf, "feedback_requests_total {}", self.requests_total()).ok();
        writeln!(
            &mut buf,
            "# HELP feedback_delivered_total Submissions delivered to the webhook"
        )
        .ok();
        writeln!(&mut buf, "# TYPE feedback_delivered_total counter").ok();
        writeln!(&mut buf, "feedback_delivered_total {}", self.delivered_total()).ok();
        writeln!(
            &mut buf,
            "# HELP feedback_failures_total Failed requests by error kind\n# TYPE feedback_failures_total counter"
        )
        .ok();
        for (idx, kind) in RelayError::KINDS.iter().enumerate() {
            writeln!(
                &mut buf,
                "feedback_failures_total{{kind=\"{}\"}} {}",
                kind,
                self.failures[idx].load(Ordering::Relaxed)
            )
            .ok();
        }

        writeln!(
            &mut buf,
            "# HELP feedback_request_latency_ms Request latency histogram milliseconds"
        )
        .ok();
        writeln!(&mut buf, "# TYPE feedback_request_latency_ms histogram").ok();
        let count = self.hist_count.load(Ordering::Relaxed);
        let mut cumulative: u64 = 0;
        for (i, ub) in LATENCY_BUCKETS_MS.iter().enumerate() {
            cumulative += self.hist_counts[i].load(Ordering::Relaxed);
            writeln!(
                &mut buf,
                "feedback_request_latency_ms_bucket{{le=\"{}\"}} {}",
                ub, cumulative
            )
            .ok();
        }
        writeln!(
            &mut buf,
            "feedback_request_latency_ms_bucket{{le=\"+Inf\"}} {}",
            count
        )
        .ok();
        writeln!(
            &mut buf,
            "feedback_request_latency_ms_sum {}",
            self.hist_sum_ms.load(Ordering::Relaxed)
        )
        .ok();
        writeln!(&mut buf, "feedback_request_latency_ms_count {}", count).ok();

        writeln!(
            &mut buf,
            "# HELP feedback_build_info Build information\n# TYPE feedback_build_info gauge"
        )
        .ok();
        writeln!(
            &mut buf,
            "feedback_build_info{{version=\"{}\"}} 1",
            env!("CARGO_PKG_VERSION")
        )
        .ok();
        writeln!(
            &mut buf,
            "# HELP feedback_process_start_time_seconds Process start time (Unix epoch seconds)\n# TYPE feedback_process_start_time_seconds gauge"
        )
        .ok();
        writeln!(
            &mut buf,
            "feedback_process_start_time_seconds {}",
            self.process_start_epoch
        )
        .ok();
        writeln!(
            &mut buf,
            "# HELP feedback_process_uptime_seconds Process uptime seconds\n# TYPE feedback_process_uptime_seconds gauge"
        )
        .ok();
        writeln!(
            &mut buf,
            "feedback_process_uptime_seconds {}",
            self.process_start_instant.elapsed().as_secs_f64()
        )
        .ok();
        buf
    }
}
