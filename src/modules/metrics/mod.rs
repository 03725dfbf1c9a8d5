//! Metrics collection utilities.
//!
//! Aggregates detection verdicts and per-strategy delivery statistics with
//! average attempt latency for observability.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::events::AttemptResult;

/// Engine-wide counters.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalStats {
    pub started_at: DateTime<Utc>,
    pub detections: u64,
    pub suppressed_detections: u64,
    pub fallback_renders: u64,
    pub queued_slots: u64,
}

impl Default for GlobalStats {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            detections: 0,
            suppressed_detections: 0,
            fallback_renders: 0,
            queued_slots: 0,
        }
    }
}

/// Strategy-scoped statistics snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyStats {
    pub strategy: String,
    pub attempts: u64,
    pub successes: u64,
    pub empty_renders: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub average_latency: Option<Duration>,
}

impl StrategyStats {
    fn from_accumulator(strategy: &str, acc: &StrategyAccumulator) -> Self {
        Self {
            strategy: strategy.to_string(),
            attempts: acc.attempts,
            successes: acc.successes,
            empty_renders: acc.empty_renders,
            failures: acc.failures,
            timeouts: acc.timeouts,
            average_latency: acc.average_latency,
        }
    }

    pub fn success_rate(&self) -> f32 {
        if self.attempts == 0 {
            0.0
        } else {
            self.successes as f32 / self.attempts as f32
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub global: GlobalStats,
    pub strategies: Vec<StrategyStats>,
}

#[derive(Debug, Default)]
struct StrategyAccumulator {
    attempts: u64,
    successes: u64,
    empty_renders: u64,
    failures: u64,
    timeouts: u64,
    average_latency: Option<Duration>,
}

impl StrategyAccumulator {
    fn record(&mut self, result: AttemptResult, latency: Duration) {
        self.attempts += 1;
        match result {
            AttemptResult::Rendered => self.successes += 1,
            AttemptResult::NotRendered => self.empty_renders += 1,
            AttemptResult::Failed => self.failures += 1,
            AttemptResult::TimedOut => self.timeouts += 1,
        }

        self.average_latency = Some(match self.average_latency {
            Some(avg) => {
                Duration::from_secs_f64(avg.as_secs_f64() * 0.9 + latency.as_secs_f64() * 0.1)
            }
            None => latency,
        });
    }
}

#[derive(Debug, Default)]
struct MetricsState {
    global: GlobalStats,
    strategies: HashMap<String, StrategyAccumulator>,
}

/// Thread-safe metrics collector shared by the detector and orchestrator.
#[derive(Clone, Debug, Default)]
pub struct DeliveryMetrics {
    inner: Arc<Mutex<MetricsState>>,
}

impl DeliveryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_detection(&self, suppressed: bool) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.global.detections += 1;
        if suppressed {
            guard.global.suppressed_detections += 1;
        }
    }

    pub fn record_attempt(&self, strategy: &str, result: AttemptResult, latency: Duration) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard
            .strategies
            .entry(strategy.to_string())
            .or_default()
            .record(result, latency);
    }

    pub fn record_fallback(&self) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.global.fallback_renders += 1;
    }

    pub fn record_queued(&self) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.global.queued_slots += 1;
    }

    /// Strategies are listed by name for stable output.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let mut strategies: Vec<_> = guard
            .strategies
            .iter()
            .map(|(name, acc)| StrategyStats::from_accumulator(name, acc))
            .collect();
        strategies.sort_by(|a, b| a.strategy.cmp(&b.strategy));
        MetricsSnapshot {
            global: guard.global.clone(),
            strategies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_attempt_outcomes() {
        let metrics = DeliveryMetrics::new();
        metrics.record_attempt("closed_shadow", AttemptResult::Failed, Duration::from_millis(5));
        metrics.record_attempt("closed_shadow", AttemptResult::TimedOut, Duration::from_millis(50));
        metrics.record_attempt("closed_shadow", AttemptResult::Rendered, Duration::from_millis(8));
        metrics.record_fallback();
        metrics.record_detection(true);

        let snapshot = metrics.snapshot();
        let stats = &snapshot.strategies[0];
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.timeouts, 1);
        assert_eq!(stats.successes, 1);
        assert_eq!(snapshot.global.fallback_renders, 1);
        assert_eq!(snapshot.global.suppressed_detections, 1);
        assert!(serde_json::to_string(&snapshot).is_ok());
    }
}
