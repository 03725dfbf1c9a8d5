//! Bypass orchestration.
//!
//! Strategies run one at a time against the same container, lowest tier
//! first and registration order within a tier. An attempt counts only when
//! the strategy reports a render and the container really holds a rendered
//! child; anything else clears the container and moves on. When the chain
//! or the delivery budget runs out, the fallback renders.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio::time::{Instant, timeout};

use super::ZoneId;
use super::fallback::FallbackRenderer;
use super::strategies::{DeliveryContext, Strategy, StrategyOutcome, default_strategies};
use crate::config::{ConfigError, DeliverySettings, EngineConfig};
use crate::host::{NodeId, RenderHost};
use crate::modules::events::{
    AttemptResult, EngineEvent, EventDispatcher, FallbackEvent, StrategyEvent,
};

/// Who filled the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderedBy {
    Strategy(&'static str),
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptRecord {
    pub strategy: &'static str,
    pub result: AttemptResult,
}

/// Report of one `deliver` run. Delivery itself never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub rendered_by: RenderedBy,
    pub attempts: Vec<AttemptRecord>,
    pub budget_exhausted: bool,
}

impl DeliveryOutcome {
    pub fn used_fallback(&self) -> bool {
        self.rendered_by == RenderedBy::Fallback
    }
}

pub struct BypassOrchestrator {
    host: Arc<dyn RenderHost>,
    settings: DeliverySettings,
    strategies: Vec<Arc<dyn Strategy>>,
    fallback: FallbackRenderer,
    strategy_timeout: Duration,
    delivery_budget: Duration,
    events: Arc<EventDispatcher>,
}

impl BypassOrchestrator {
    /// Orchestrator with no strategies; every delivery goes to the fallback
    /// until some are registered.
    pub fn new(host: Arc<dyn RenderHost>, settings: DeliverySettings) -> Self {
        Self {
            host,
            settings,
            strategies: Vec::new(),
            fallback: FallbackRenderer::new(),
            strategy_timeout: Duration::from_secs(3),
            delivery_budget: Duration::from_secs(10),
            events: Arc::new(EventDispatcher::new()),
        }
    }

    /// Built-in strategies minus the ones disabled in `config`.
    pub fn from_config(
        config: &EngineConfig,
        host: Arc<dyn RenderHost>,
    ) -> Result<Self, ConfigError> {
        let mut orchestrator = Self::new(host, config.delivery_settings()?)
            .with_strategy_timeout(config.timing.strategy_timeout())
            .with_delivery_budget(config.timing.delivery_budget());

        let disabled = &config.delivery.disabled_strategies;
        for strategy in default_strategies() {
            if disabled.iter().any(|name| name == strategy.name()) {
                log::debug!("strategy {} disabled by configuration", strategy.name());
                continue;
            }
            orchestrator.register(strategy);
        }
        Ok(orchestrator)
    }

    pub fn with_strategy_timeout(mut self, limit: Duration) -> Self {
        self.strategy_timeout = limit;
        self
    }

    pub fn with_delivery_budget(mut self, budget: Duration) -> Self {
        self.delivery_budget = budget;
        self
    }

    pub fn with_events(mut self, events: Arc<EventDispatcher>) -> Self {
        self.events = events;
        self
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.register(strategy);
        self
    }

    /// Adds a strategy; the sort is stable, so equal tiers keep
    /// registration order.
    pub fn register(&mut self, strategy: Arc<dyn Strategy>) {
        self.strategies.push(strategy);
        self.strategies.sort_by_key(|strategy| strategy.tier());
    }

    /// Names in the order they will be attempted.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|strategy| strategy.name()).collect()
    }

    pub fn settings(&self) -> &DeliverySettings {
        &self.settings
    }

    pub async fn deliver(&self, zone: &ZoneId, container: NodeId) -> DeliveryOutcome {
        let delivery_started = Instant::now();
        let mut attempts = Vec::with_capacity(self.strategies.len());
        let mut budget_exhausted = false;

        for strategy in &self.strategies {
            let spent = delivery_started.elapsed();
            if spent >= self.delivery_budget {
                budget_exhausted = true;
                break;
            }
            let limit = self.strategy_timeout.min(self.delivery_budget - spent);

            let ctx = DeliveryContext {
                zone,
                container,
                host: self.host.as_ref(),
                settings: &self.settings,
            };
            let started = Instant::now();
            let attempt = AssertUnwindSafe(strategy.execute(&ctx)).catch_unwind();
            let (result, detail) = match timeout(limit, attempt).await {
                Ok(Ok(Ok(StrategyOutcome::Rendered))) if self.container_rendered(container) => {
                    (AttemptResult::Rendered, None)
                }
                Ok(Ok(Ok(StrategyOutcome::Rendered))) => (
                    AttemptResult::NotRendered,
                    Some("reported a render but the container shows nothing".to_string()),
                ),
                Ok(Ok(Ok(StrategyOutcome::NotRendered))) => (AttemptResult::NotRendered, None),
                Ok(Ok(Err(err))) => (AttemptResult::Failed, Some(err.to_string())),
                Ok(Err(payload)) => (
                    AttemptResult::Failed,
                    Some(format!("panicked: {}", panic_message(payload.as_ref()))),
                ),
                Err(_) => (
                    AttemptResult::TimedOut,
                    Some(format!("no result within {:?}", limit)),
                ),
            };

            self.events
                .dispatch(EngineEvent::StrategyAttempted(StrategyEvent {
                    zone: zone.to_string(),
                    strategy: strategy.name().to_string(),
                    tier: strategy.tier().as_u8(),
                    result,
                    detail,
                    elapsed: started.elapsed(),
                    timestamp: Utc::now(),
                }));
            attempts.push(AttemptRecord {
                strategy: strategy.name(),
                result,
            });

            if result == AttemptResult::Rendered {
                return DeliveryOutcome {
                    rendered_by: RenderedBy::Strategy(strategy.name()),
                    attempts,
                    budget_exhausted,
                };
            }
            self.reset_container(container);
        }

        self.fallback
            .render(self.host.as_ref(), zone, container, &self.settings);
        self.events
            .dispatch(EngineEvent::FallbackRendered(FallbackEvent {
                zone: zone.to_string(),
                attempts: attempts.len(),
                budget_exhausted,
                timestamp: Utc::now(),
            }));

        DeliveryOutcome {
            rendered_by: RenderedBy::Fallback,
            attempts,
            budget_exhausted,
        }
    }

    fn container_rendered(&self, container: NodeId) -> bool {
        match self.host.children(container) {
            Ok(children) => children.into_iter().any(|child| {
                self.host
                    .measure(child)
                    .map(|measurement| {
                        measurement.is_rendered_within(self.settings.offscreen_threshold)
                    })
                    .unwrap_or(false)
            }),
            Err(err) => {
                log::debug!("container {} cannot be inspected: {}", container, err);
                false
            }
        }
    }

    fn reset_container(&self, container: NodeId) {
        if let Err(err) = self.host.clear_children(container) {
            log::debug!("container {} could not be cleared: {}", container, err);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
