//! Event system for the detection and delivery engine.
//!
//! Provides hooks for metrics, logging, and custom reactions around probe
//! votes and strategy attempts.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use super::metrics::DeliveryMetrics;

/// One probe finished its vote.
#[derive(Debug, Clone)]
pub struct ProbeEvent {
    pub probe: String,
    pub suppressed: bool,
    pub elapsed: Duration,
    pub timestamp: DateTime<Utc>,
}

/// The detector settled on a verdict.
#[derive(Debug, Clone)]
pub struct DetectionEvent {
    pub suppressed: bool,
    pub suppressed_votes: usize,
    pub total_probes: usize,
    pub timestamp: DateTime<Utc>,
}

/// Result of one strategy attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptResult {
    Rendered,
    NotRendered,
    Failed,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct StrategyEvent {
    pub zone: String,
    pub strategy: String,
    pub tier: u8,
    pub result: AttemptResult,
    pub detail: Option<String>,
    pub elapsed: Duration,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FallbackEvent {
    pub zone: String,
    pub attempts: usize,
    pub budget_exhausted: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct QueueEvent {
    pub zone: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum EngineEvent {
    ProbeCompleted(ProbeEvent),
    DetectionCompleted(DetectionEvent),
    StrategyAttempted(StrategyEvent),
    FallbackRendered(FallbackEvent),
    SlotQueued(QueueEvent),
}

/// Trait implemented by event handlers.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &EngineEvent);
}

/// Dispatcher that broadcasts events to registered handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn dispatch(&self, event: EngineEvent) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }
}

/// Logs events using the `log` crate.
#[derive(Debug)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &EngineEvent) {
        match event {
            EngineEvent::ProbeCompleted(probe) => {
                log::debug!(
                    "probe {} voted suppressed={} ({:.3}s)",
                    probe.probe,
                    probe.suppressed,
                    probe.elapsed.as_secs_f64()
                );
            }
            EngineEvent::DetectionCompleted(detection) => {
                log::info!(
                    "detection verdict suppressed={} ({}/{} probes)",
                    detection.suppressed,
                    detection.suppressed_votes,
                    detection.total_probes
                );
            }
            EngineEvent::StrategyAttempted(attempt) => match attempt.result {
                AttemptResult::Rendered => log::info!(
                    "zone {} rendered by {} (tier {})",
                    attempt.zone,
                    attempt.strategy,
                    attempt.tier
                ),
                AttemptResult::NotRendered => log::debug!(
                    "zone {}: {} produced no visible content",
                    attempt.zone,
                    attempt.strategy
                ),
                AttemptResult::Failed | AttemptResult::TimedOut => log::warn!(
                    "zone {}: {} {:?} {}",
                    attempt.zone,
                    attempt.strategy,
                    attempt.result,
                    attempt.detail.as_deref().unwrap_or("")
                ),
            },
            EngineEvent::FallbackRendered(fallback) => {
                log::warn!(
                    "zone {} fell back after {} attempts (budget exhausted: {})",
                    fallback.zone,
                    fallback.attempts,
                    fallback.budget_exhausted
                );
            }
            EngineEvent::SlotQueued(queued) => {
                log::debug!("zone {} queued for regular serving", queued.zone);
            }
        }
    }
}

/// Metrics handler that feeds the delivery metrics collector.
#[derive(Clone, Debug)]
pub struct MetricsHandler {
    metrics: DeliveryMetrics,
}

impl MetricsHandler {
    pub fn new(metrics: DeliveryMetrics) -> Self {
        Self { metrics }
    }
}

impl EventHandler for MetricsHandler {
    fn handle(&self, event: &EngineEvent) {
        match event {
            EngineEvent::DetectionCompleted(detection) => {
                self.metrics.record_detection(detection.suppressed);
            }
            EngineEvent::StrategyAttempted(attempt) => {
                self.metrics
                    .record_attempt(&attempt.strategy, attempt.result, attempt.elapsed);
            }
            EngineEvent::FallbackRendered(_) => self.metrics.record_fallback(),
            EngineEvent::SlotQueued(_) => self.metrics.record_queued(),
            EngineEvent::ProbeCompleted(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingHandler(std::sync::Mutex<usize>);

    impl EventHandler for CountingHandler {
        fn handle(&self, _event: &EngineEvent) {
            *self.0.lock().unwrap() += 1;
        }
    }

    #[test]
    fn dispatches_to_handlers() {
        let mut dispatcher = EventDispatcher::new();
        let counter = Arc::new(CountingHandler(std::sync::Mutex::new(0)));
        dispatcher.register_handler(counter.clone());
        dispatcher.register_handler(Arc::new(LoggingHandler));
        dispatcher.dispatch(EngineEvent::SlotQueued(QueueEvent {
            zone: "zone-1".into(),
            timestamp: Utc::now(),
        }));
        assert_eq!(*counter.0.lock().unwrap(), 1);
    }

    #[test]
    fn metrics_handler_counts_attempts() {
        let metrics = DeliveryMetrics::new();
        let handler = MetricsHandler::new(metrics.clone());
        handler.handle(&EngineEvent::StrategyAttempted(StrategyEvent {
            zone: "zone-1".into(),
            strategy: "native_card".into(),
            tier: 1,
            result: AttemptResult::Rendered,
            detail: None,
            elapsed: Duration::from_millis(12),
            timestamp: Utc::now(),
        }));
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.strategies[0].successes, 1);
    }
}
