//! # sponsor-shield
//!
//! Detects whether a page's sponsored content is being suppressed by a
//! content blocker and, if so, still delivers it through a prioritized
//! chain of rendering strategies that ends in an unconditional fallback.
//!
//! The engine talks to the page only through the [`RenderHost`] and
//! [`ProbeTransport`] capability traits. [`SimulatedHost`] implements both
//! in memory, with a configurable [`BlockerProfile`].
//!
//! ## Features
//!
//! - Four independent probes (bait elements, blocker signatures, network
//!   reachability, inline script execution) aggregated by majority vote
//! - One memoized verdict per engine, fail-closed on any probe error
//! - Ten delivery strategies in four priority tiers plus a fallback
//! - Per-strategy timeouts and global detection and delivery budgets
//! - Event hooks and delivery metrics
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sponsor_shield::{BlockerProfile, ElementSpec, RenderHost, ShieldEngine, SimulatedHost};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let host = Arc::new(SimulatedHost::new(BlockerProfile::typical()));
//!     let slot = host.create_visual_element(host.body(), &ElementSpec::new("div"))?;
//!     let engine = ShieldEngine::new(host)?;
//!
//!     if engine.detect_ad_blocker().await {
//!         let outcome = engine.bypass_ad_blocker("zone-1", slot).await;
//!         println!("rendered by {:?}", outcome.rendered_by);
//!     }
//!     Ok(())
//! }
//! ```

mod engine;

pub mod config;
pub mod delivery;
pub mod detection;
pub mod external_deps;
pub mod host;
pub mod modules;

pub use crate::engine::{EngineError, EngineResult, ShieldEngine, ShieldEngineBuilder, SlotOutcome};

pub use crate::config::{
    ConfigError,
    CreativeConfig,
    DeliveryConfig,
    DeliverySettings,
    EngineConfig,
    EngineConfigBuilder,
    FeatureFlags,
    ProbeConfig,
    TimingConfig,
};

pub use crate::delivery::{
    AttemptRecord,
    BypassOrchestrator,
    DeliveryContext,
    DeliveryOutcome,
    FallbackRenderer,
    InMemoryServeQueue,
    PriorityTier,
    RenderedBy,
    ServeQueue,
    ServeRequest,
    Strategy,
    StrategyError,
    StrategyOutcome,
    ZoneId,
};

pub use crate::detection::{DetectionVerdict, Detector, Probe};

pub use crate::external_deps::interpreters::{
    BoaScriptRuntime,
    InterpreterError,
    InterpreterResult,
    ScriptRuntime,
};

pub use crate::host::{
    BlockerProfile,
    ElementSpec,
    HostError,
    Measurement,
    NodeId,
    ProbeTransport,
    RenderHost,
    ReqwestProbeTransport,
    SimulatedHost,
    TransportError,
};

pub use crate::modules::{
    AttemptResult,
    DeliveryMetrics,
    EngineEvent,
    EventDispatcher,
    EventHandler,
    LoggingHandler,
    MetricsHandler,
    MetricsSnapshot,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
