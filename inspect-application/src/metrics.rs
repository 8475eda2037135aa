use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::dtos::{OutcomeStats, Rate, RequestStats, Uptime};

/// Counters and the per-second request window. Recording never blocks
/// dispatch; the window is only touched by the sampler and by readers.
#[derive(Debug)]
pub struct Metrics {
    started_at: Instant,
    success: AtomicU64,
    cached: AtomicU64,
    failed: AtomicU64,
    current_requests: AtomicU64,
    window: Mutex<VecDeque<u64>>,
    window_size: usize,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new(60)
    }
}

impl Metrics {
    pub fn new(window_size: usize) -> Self {
        Self {
            started_at: Instant::now(),
            success: AtomicU64::new(0),
            cached: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            current_requests: AtomicU64::new(0),
            window: Mutex::new(VecDeque::with_capacity(window_size)),
            window_size: window_size.max(1),
        }
    }

    pub fn record_request(&self) {
        self.current_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cached(&self) {
        self.cached.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failures(&self, count: usize) {
        self.failed.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn success_count(&self) -> u64 {
        self.success.load(Ordering::Relaxed)
    }

    pub fn cached_count(&self) -> u64 {
        self.cached.load(Ordering::Relaxed)
    }

    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Moves the running request count into the window and resets it.
    pub async fn sample_tick(&self) {
        let count = self.current_requests.swap(0, Ordering::Relaxed);
        let mut window = self.window.lock().await;
        window.push_back(count);
        while window.len() > self.window_size {
            window.pop_front();
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn uptime_breakdown(&self) -> Uptime {
        let total = self.uptime().as_secs();
        let days = total / 86_400;
        let hours = (total % 86_400) / 3_600;
        let minutes = (total % 3_600) / 60;
        let seconds = total % 60;
        Uptime {
            days,
            hours,
            minutes,
            seconds,
            formatted: format!("{days}d {hours}h {minutes}m {seconds}s"),
        }
    }

    pub fn outcomes(&self) -> OutcomeStats {
        let success = self.success_count();
        let cached = self.cached_count();
        let failed = self.failed_count();
        let total = success + cached + failed;
        OutcomeStats {
            success: Rate::of(success, total),
            cached: Rate::of(cached, total),
            failed: Rate::of(failed, total),
            total,
        }
    }

    pub async fn requests(&self) -> RequestStats {
        let history: Vec<u64> = self.window.lock().await.iter().copied().collect();
        let average = if history.is_empty() {
            0.0
        } else {
            history.iter().sum::<u64>() as f64 / history.len() as f64
        };
        RequestStats {
            history,
            current: self.current_requests.load(Ordering::Relaxed),
            average: format!("{average:.2}"),
        }
    }

    pub fn render_prometheus(&self, gauges: &EngineGauges) -> String {
        format!(
            "# TYPE inspect_success_total counter\n\
inspect_success_total {}\n\
# TYPE inspect_cached_total counter\n\
inspect_cached_total {}\n\
# TYPE inspect_failed_total counter\n\
inspect_failed_total {}\n\
# TYPE inspect_queue_current gauge\n\
inspect_queue_current {}\n\
# TYPE inspect_queue_max gauge\n\
inspect_queue_max {}\n\
# TYPE inspect_bots_ready gauge\n\
inspect_bots_ready {}\n\
# TYPE inspect_bots_total gauge\n\
inspect_bots_total {}\n\
# TYPE inspect_uptime_seconds gauge\n\
inspect_uptime_seconds {}\n",
            self.success_count(),
            self.cached_count(),
            self.failed_count(),
            gauges.queue_current,
            gauges.queue_max,
            gauges.bots_ready,
            gauges.bots_total,
            self.uptime().as_secs()
        )
    }
}

/// Point-in-time values owned by other components, rendered next to the
/// counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineGauges {
    pub queue_current: usize,
    pub queue_max: usize,
    pub bots_ready: usize,
    pub bots_total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn window_keeps_last_samples_only() {
        let metrics = Metrics::new(3);
        for count in 1..=5u64 {
            for _ in 0..count {
                metrics.record_request();
            }
            metrics.sample_tick().await;
        }
        let requests = metrics.requests().await;
        assert_eq!(requests.history, vec![3, 4, 5]);
        assert_eq!(requests.current, 0);
        assert_eq!(requests.average, "4.00");
    }

    #[test]
    fn outcome_rates_handle_empty_totals() {
        let metrics = Metrics::default();
        let outcomes = metrics.outcomes();
        assert_eq!(outcomes.total, 0);
        assert_eq!(outcomes.success.rate, "0.00%");

        metrics.record_success();
        metrics.record_success();
        metrics.record_cached();
        metrics.record_failure();
        let outcomes = metrics.outcomes();
        assert_eq!(outcomes.total, 4);
        assert_eq!(outcomes.success.rate, "50.00%");
        assert_eq!(outcomes.failed.count, 1);
    }

    #[test]
    fn prometheus_text_contains_counters_and_gauges() {
        let metrics = Metrics::default();
        metrics.record_failure();
        let text = metrics.render_prometheus(&EngineGauges {
            queue_current: 2,
            queue_max: 100,
            bots_ready: 1,
            bots_total: 4,
        });
        assert!(text.contains("inspect_failed_total 1\n"));
        assert!(text.contains("inspect_queue_max 100\n"));
        assert!(text.contains("inspect_bots_total 4\n"));
    }
}
