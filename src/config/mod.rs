//! Settings and configuration module
//!
//! Provides unified configuration with:
//! - Builder pattern
//! - JSON loading
//! - Feature flags for individual probes
//! - Explicit detection and delivery time budgets

pub mod config;

pub use config::{
    ConfigError, CreativeConfig, DeliveryConfig, DeliverySettings, EngineConfig,
    EngineConfigBuilder, FeatureFlags, ProbeConfig, TimingConfig,
};
