use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::domain::Verdict;
use crate::engine::EngineError;

/// Metrics registry for the application.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Total decision requests processed
    pub decisions_total: AtomicU64,

    /// Failed decision requests by kind
    pub errors_engine: AtomicU64,
    pub errors_timeout: AtomicU64,
    pub errors_undefined: AtomicU64,
    pub errors_unavailable: AtomicU64,

    /// Enforcement outcomes (only counted when enforcement is on)
    pub enforced_allow: AtomicU64,
    pub enforced_deny: AtomicU64,

    /// Decision latency buckets (microseconds)
    pub latency_under_1ms: AtomicU64,
    pub latency_1_5ms: AtomicU64,
    pub latency_5_10ms: AtomicU64,
    pub latency_10_50ms: AtomicU64,
    pub latency_50_100ms: AtomicU64,
    pub latency_over_100ms: AtomicU64,

    /// Sum of all recorded latencies (microseconds)
    pub latency_sum_micros: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry.
    pub fn new() -> Self {
        MetricsRegistry::default()
    }

    /// Record a successful decision.
    pub fn record_decision(&self) {
        self.decisions_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed decision.
    pub fn record_error(&self, error: &EngineError) {
        self.decisions_total.fetch_add(1, Ordering::Relaxed);

        let counter = match error {
            EngineError::Timeout(_) => &self.errors_timeout,
            EngineError::Undefined(_) => &self.errors_undefined,
            EngineError::Closed => &self.errors_unavailable,
            _ => &self.errors_engine,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an enforcement outcome.
    pub fn record_verdict(&self, verdict: Verdict) {
        if verdict.is_allowed() {
            self.enforced_allow.fetch_add(1, Ordering::Relaxed);
        } else {
            self.enforced_deny.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record decision latency.
    pub fn record_latency(&self, start: Instant) {
        self.record_latency_micros(start.elapsed().as_micros() as u64);
    }

    /// Record a latency given in microseconds.
    pub fn record_latency_micros(&self, micros: u64) {
        self.latency_sum_micros.fetch_add(micros, Ordering::Relaxed);

        if micros < 1000 {
            self.latency_under_1ms.fetch_add(1, Ordering::Relaxed);
        } else if micros < 5000 {
            self.latency_1_5ms.fetch_add(1, Ordering::Relaxed);
        } else if micros < 10000 {
            self.latency_5_10ms.fetch_add(1, Ordering::Relaxed);
        } else if micros < 50000 {
            self.latency_10_50ms.fetch_add(1, Ordering::Relaxed);
        } else if micros < 100000 {
            self.latency_50_100ms.fetch_add(1, Ordering::Relaxed);
        } else {
            self.latency_over_100ms.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self, uptime_secs: u64) -> String {
        // Buckets are stored per range; Prometheus expects running totals.
        let ranges = [
            self.latency_under_1ms.load(Ordering::Relaxed),
            self.latency_1_5ms.load(Ordering::Relaxed),
            self.latency_5_10ms.load(Ordering::Relaxed),
            self.latency_10_50ms.load(Ordering::Relaxed),
            self.latency_50_100ms.load(Ordering::Relaxed),
            self.latency_over_100ms.load(Ordering::Relaxed),
        ];
        let mut cumulative = [0u64; 6];
        let mut running = 0;
        for (slot, count) in cumulative.iter_mut().zip(ranges) {
            running += count;
            *slot = running;
        }
        let sum_secs = self.latency_sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0;

        format!(
            r#"# HELP policy_front_uptime_seconds Application uptime in seconds
# TYPE policy_front_uptime_seconds gauge
policy_front_uptime_seconds {}

# HELP policy_front_decisions_total Total number of decision requests
# TYPE policy_front_decisions_total counter
policy_front_decisions_total {}

# HELP policy_front_decision_errors Failed decision requests by kind
# TYPE policy_front_decision_errors counter
policy_front_decision_errors{{kind="engine"}} {}
policy_front_decision_errors{{kind="timeout"}} {}
policy_front_decision_errors{{kind="undefined"}} {}
policy_front_decision_errors{{kind="unavailable"}} {}

# HELP policy_front_enforced Enforcement outcomes
# TYPE policy_front_enforced counter
policy_front_enforced{{outcome="allow"}} {}
policy_front_enforced{{outcome="deny"}} {}

# HELP policy_front_decision_latency_seconds Decision latency histogram
# TYPE policy_front_decision_latency_seconds histogram
policy_front_decision_latency_seconds_bucket{{le="0.001"}} {}
policy_front_decision_latency_seconds_bucket{{le="0.005"}} {}
policy_front_decision_latency_seconds_bucket{{le="0.01"}} {}
policy_front_decision_latency_seconds_bucket{{le="0.05"}} {}
policy_front_decision_latency_seconds_bucket{{le="0.1"}} {}
policy_front_decision_latency_seconds_bucket{{le="+Inf"}} {}
policy_front_decision_latency_seconds_sum {}
policy_front_decision_latency_seconds_count {}
"#,
            uptime_secs,
            self.decisions_total.load(Ordering::Relaxed),
            self.errors_engine.load(Ordering::Relaxed),
            self.errors_timeout.load(Ordering::Relaxed),
            self.errors_undefined.load(Ordering::Relaxed),
            self.errors_unavailable.load(Ordering::Relaxed),
            self.enforced_allow.load(Ordering::Relaxed),
            self.enforced_deny.load(Ordering::Relaxed),
            cumulative[0],
            cumulative[1],
            cumulative[2],
            cumulative[3],
            cumulative[4],
            cumulative[5],
            sum_secs,
            cumulative[5],
        )
    }
}

/// Guard for timing operations.
pub struct TimingGuard<'a> {
    registry: &'a MetricsRegistry,
    start: Instant,
}

impl<'a> TimingGuard<'a> {
    pub fn new(registry: &'a MetricsRegistry) -> Self {
        TimingGuard {
            registry,
            start: Instant::now(),
        }
    }

    pub fn start(&self) -> Instant {
        self.start
    }
}

impl<'a> Drop for TimingGuard<'a> {
    fn drop(&mut self) {
        self.registry.record_latency(self.start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_record_errors_by_kind() {
        let metrics = MetricsRegistry::new();

        metrics.record_decision();
        metrics.record_error(&EngineError::Timeout(Duration::from_millis(5)));
        metrics.record_error(&EngineError::Query("down".to_string()));
        metrics.record_error(&EngineError::Closed);

        assert_eq!(metrics.decisions_total.load(Ordering::Relaxed), 4);
        assert_eq!(metrics.errors_timeout.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.errors_engine.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.errors_unavailable.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_timing_guard_records_latency() {
        let metrics = MetricsRegistry::new();
        {
            let _guard = TimingGuard::new(&metrics);
        }

        let recorded = metrics.latency_under_1ms.load(Ordering::Relaxed)
            + metrics.latency_1_5ms.load(Ordering::Relaxed)
            + metrics.latency_5_10ms.load(Ordering::Relaxed)
            + metrics.latency_10_50ms.load(Ordering::Relaxed)
            + metrics.latency_50_100ms.load(Ordering::Relaxed)
            + metrics.latency_over_100ms.load(Ordering::Relaxed);
        assert_eq!(recorded, 1);
    }

    #[test]
    fn test_latency_buckets_are_cumulative() {
        let metrics = MetricsRegistry::new();
        metrics.record_latency_micros(500);
        metrics.record_latency_micros(3_000);
        metrics.record_latency_micros(3_500);
        metrics.record_latency_micros(250_000);

        let output = metrics.to_prometheus(0);

        assert!(output.contains("# TYPE policy_front_decision_latency_seconds histogram"));
        assert!(output.contains("policy_front_decision_latency_seconds_bucket{le=\"0.001\"} 1"));
        assert!(output.contains("policy_front_decision_latency_seconds_bucket{le=\"0.005\"} 3"));
        assert!(output.contains("policy_front_decision_latency_seconds_bucket{le=\"0.1\"} 3"));
        assert!(output.contains("policy_front_decision_latency_seconds_bucket{le=\"+Inf\"} 4"));
        assert!(output.contains("policy_front_decision_latency_seconds_count 4"));
        assert!(output.contains("policy_front_decision_latency_seconds_sum 0.257"));
        assert!(output.contains("# TYPE policy_front_uptime_seconds gauge"));
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = MetricsRegistry::new();
        metrics.record_decision();
        metrics.record_verdict(Verdict::Deny);

        let output = metrics.to_prometheus(7);

        assert!(output.contains("policy_front_uptime_seconds 7"));
        assert!(output.contains("policy_front_decisions_total 1"));
        assert!(output.contains("policy_front_enforced{outcome=\"deny\"} 1"));
    }
}
