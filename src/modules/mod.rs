//! Cross-cutting services module
//!
//! Event dispatching, delivery metrics and jittered timing shared by the
//! detection and delivery layers.

pub mod events;
pub mod metrics;
pub mod timing;

// Re-export commonly used types
pub use events::{
    AttemptResult, DetectionEvent, EngineEvent, EventDispatcher, EventHandler, FallbackEvent,
    LoggingHandler, MetricsHandler, ProbeEvent, QueueEvent, StrategyEvent,
};
pub use metrics::{DeliveryMetrics, GlobalStats, MetricsSnapshot, StrategyStats};
pub use timing::{JitteredDelay, random_between};
