//! Prometheus metrics (lock-free atomics).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub static METRICS: Metrics = Metrics::new();

/// Monotonic counter.
pub struct Counter(AtomicU64);

impl Counter {
    const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct Metrics {
    // --- Cycles ---
    pub refresh_total: Counter,
    pub refresh_errors: Counter,
    pub connect_total: Counter,
    pub connect_errors: Counter,
    pub scan_truncations: Counter,

    // --- Upstream calls ---
    pub rpc_calls: Counter,
    pub rpc_errors: Counter,
    pub indexer_errors: Counter,

    // --- Cycle latency (μs) ---
    cycle_duration_us_sum: AtomicU64,
    cycle_duration_us_max: AtomicU64,
}

impl Metrics {
    const fn new() -> Self {
        Self {
            refresh_total: Counter::new(),
            refresh_errors: Counter::new(),
            connect_total: Counter::new(),
            connect_errors: Counter::new(),
            scan_truncations: Counter::new(),
            rpc_calls: Counter::new(),
            rpc_errors: Counter::new(),
            indexer_errors: Counter::new(),
            cycle_duration_us_sum: AtomicU64::new(0),
            cycle_duration_us_max: AtomicU64::new(0),
        }
    }

    pub fn record_cycle_duration(&self, start: Instant) {
        let us = start.elapsed().as_micros() as u64;
        self.cycle_duration_us_sum.fetch_add(us, Ordering::Relaxed);
        let mut cur = self.cycle_duration_us_max.load(Ordering::Relaxed);
        while us > cur {
            match self.cycle_duration_us_max.compare_exchange_weak(
                cur,
                us,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => cur = actual,
            }
        }
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self, connected: bool) -> String {
        let cycle_sum_s =
            self.cycle_duration_us_sum.load(Ordering::Relaxed) as f64 / 1_000_000.0;
        let cycle_max_s =
            self.cycle_duration_us_max.swap(0, Ordering::Relaxed) as f64 / 1_000_000.0;

        format!(
            "\
# HELP aggregator_refresh_total Refresh cycles started.\n\
# TYPE aggregator_refresh_total counter\n\
aggregator_refresh_total {}\n\
# HELP aggregator_refresh_errors_total Refresh steps that failed.\n\
# TYPE aggregator_refresh_errors_total counter\n\
aggregator_refresh_errors_total {}\n\
# HELP aggregator_connect_total Wallet connect attempts.\n\
# TYPE aggregator_connect_total counter\n\
aggregator_connect_total {}\n\
# HELP aggregator_connect_errors_total Failed wallet connect attempts.\n\
# TYPE aggregator_connect_errors_total counter\n\
aggregator_connect_errors_total {}\n\
# HELP aggregator_scan_truncations_total Activity scans cut off at the cap.\n\
# TYPE aggregator_scan_truncations_total counter\n\
aggregator_scan_truncations_total {}\n\
# HELP aggregator_rpc_calls_total Contract view calls issued.\n\
# TYPE aggregator_rpc_calls_total counter\n\
aggregator_rpc_calls_total {}\n\
# HELP aggregator_rpc_errors_total Contract view calls that failed.\n\
# TYPE aggregator_rpc_errors_total counter\n\
aggregator_rpc_errors_total {}\n\
# HELP aggregator_indexer_errors_total Indexing service calls that failed.\n\
# TYPE aggregator_indexer_errors_total counter\n\
aggregator_indexer_errors_total {}\n\
# HELP aggregator_cycle_duration_seconds_sum Total refresh cycle time.\n\
# TYPE aggregator_cycle_duration_seconds_sum counter\n\
aggregator_cycle_duration_seconds_sum {cycle_sum_s:.6}\n\
# HELP aggregator_cycle_duration_seconds_max Max cycle time since last scrape.\n\
# TYPE aggregator_cycle_duration_seconds_max gauge\n\
aggregator_cycle_duration_seconds_max {cycle_max_s:.6}\n\
# HELP aggregator_session_connected Whether a wallet session is live.\n\
# TYPE aggregator_session_connected gauge\n\
aggregator_session_connected {}\n",
            self.refresh_total.get(),
            self.refresh_errors.get(),
            self.connect_total.get(),
            self.connect_errors.get(),
            self.scan_truncations.get(),
            self.rpc_calls.get(),
            self.rpc_errors.get(),
            self.indexer_errors.get(),
            if connected { 1 } else { 0 },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_bump() {
        let c = Counter::new();
        c.bump();
        c.bump();
        assert_eq!(c.get(), 2);
    }

    #[test]
    fn test_render_mentions_every_series() {
        let m = Metrics::new();
        let body = m.render(true);
        for series in [
            "aggregator_refresh_total",
            "aggregator_rpc_errors_total",
            "aggregator_indexer_errors_total",
            "aggregator_session_connected 1",
        ] {
            assert!(body.contains(series), "missing {series}");
        }
    }
}
