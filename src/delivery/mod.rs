//! Sponsored-content delivery: strategies, the orchestrator that chains
//! them, the terminal fallback and the regular serving queue.

pub mod fallback;
pub mod orchestrator;
pub mod serve_queue;
pub mod strategies;

use std::fmt;

pub use fallback::FallbackRenderer;
pub use orchestrator::{AttemptRecord, BypassOrchestrator, DeliveryOutcome, RenderedBy};
pub use serve_queue::{InMemoryServeQueue, ServeQueue, ServeRequest, ServeTarget};
pub use strategies::{
    DeliveryContext, PriorityTier, Strategy, StrategyError, StrategyOutcome, default_strategies,
};

/// Identifier of one sponsored-content slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZoneId(String);

impl ZoneId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ZoneId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ZoneId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
