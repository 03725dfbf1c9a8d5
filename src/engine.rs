//! High level engine.
//!
//! Wires the detector, the bypass orchestrator and the event/metrics
//! subsystems together behind the two calls a page makes: "is sponsored
//! content being suppressed?" and "deliver it into this container anyway".

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::config::{ConfigError, EngineConfig};
use crate::delivery::strategies::Strategy;
use crate::delivery::{BypassOrchestrator, DeliveryOutcome, ServeQueue, ServeRequest, ZoneId};
use crate::detection::{DetectionVerdict, Detector, Probe};
use crate::host::{NodeId, ProbeTransport, RenderHost, ReqwestProbeTransport, TransportError};
use crate::modules::events::{
	EngineEvent, EventDispatcher, EventHandler, LoggingHandler, MetricsHandler, QueueEvent,
};
use crate::modules::metrics::{DeliveryMetrics, MetricsSnapshot};

/// Result alias used when assembling an engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised while building an engine. Running one never fails.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("configuration error: {0}")]
	Config(#[from] ConfigError),
	#[error("probe transport unavailable: {0}")]
	Transport(#[from] TransportError),
	#[error("no render host configured")]
	MissingHost,
}

/// What `render_slot` did with a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotOutcome {
	/// Nothing is suppressed; a regular serving request was queued.
	Queued,
	/// Suppression detected; content went through the bypass chain.
	Delivered(DeliveryOutcome),
}

/// Builder for [`ShieldEngine`].
pub struct ShieldEngineBuilder {
	config: EngineConfig,
	host: Option<Arc<dyn RenderHost>>,
	transport: Option<Arc<dyn ProbeTransport>>,
	handlers: Vec<Arc<dyn EventHandler>>,
	probes: Vec<Arc<dyn Probe>>,
	strategies: Vec<Arc<dyn Strategy>>,
	builtin_probes: bool,
	builtin_strategies: bool,
	logging: bool,
}

impl ShieldEngineBuilder {
	pub fn new() -> Self {
		Self {
			config: EngineConfig::default(),
			host: None,
			transport: None,
			handlers: Vec::new(),
			probes: Vec::new(),
			strategies: Vec::new(),
			builtin_probes: true,
			builtin_strategies: true,
			logging: true,
		}
	}

	pub fn with_config(mut self, config: EngineConfig) -> Self {
		self.config = config;
		self
	}

	pub fn with_host(mut self, host: Arc<dyn RenderHost>) -> Self {
		self.host = Some(host);
		self
	}

	/// Transport for the network probe; a reqwest client is used otherwise.
	pub fn with_transport(mut self, transport: Arc<dyn ProbeTransport>) -> Self {
		self.transport = Some(transport);
		self
	}

	pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
		self.handlers.push(handler);
		self
	}

	/// Additional probe, registered after the built-in ones.
	pub fn with_probe(mut self, probe: Arc<dyn Probe>) -> Self {
		self.probes.push(probe);
		self
	}

	/// Additional strategy, ordered among the built-in ones by its tier.
	pub fn with_strategy(mut self, strategy: Arc<dyn Strategy>) -> Self {
		self.strategies.push(strategy);
		self
	}

	/// Only the probes passed through [`Self::with_probe`] vote.
	pub fn without_builtin_probes(mut self) -> Self {
		self.builtin_probes = false;
		self
	}

	/// Only the strategies passed through [`Self::with_strategy`] run.
	pub fn without_builtin_strategies(mut self) -> Self {
		self.builtin_strategies = false;
		self
	}

	pub fn disable_logging(mut self) -> Self {
		self.logging = false;
		self
	}

	pub fn build(self) -> EngineResult<ShieldEngine> {
		self.config.validate()?;
		let host = self.host.ok_or(EngineError::MissingHost)?;
		let transport = match self.transport {
			Some(transport) => transport,
			None => Arc::new(ReqwestProbeTransport::with_timeout(
				self.config.timing.network_timeout(),
			)?),
		};

		let metrics = DeliveryMetrics::new();
		let mut dispatcher = EventDispatcher::new();
		if self.logging {
			dispatcher.register_handler(Arc::new(LoggingHandler));
		}
		dispatcher.register_handler(Arc::new(MetricsHandler::new(metrics.clone())));
		for handler in self.handlers {
			dispatcher.register_handler(handler);
		}
		let events = Arc::new(dispatcher);

		let mut detector = if self.builtin_probes {
			Detector::from_config(&self.config, Arc::clone(&host), transport)?
		} else {
			Detector::new(self.config.timing.detection_budget())
		};
		for probe in self.probes {
			detector.register_probe(probe);
		}
		let detector = detector.with_events(Arc::clone(&events));

		let mut orchestrator = if self.builtin_strategies {
			BypassOrchestrator::from_config(&self.config, Arc::clone(&host))?
		} else {
			BypassOrchestrator::new(Arc::clone(&host), self.config.delivery_settings()?)
				.with_strategy_timeout(self.config.timing.strategy_timeout())
				.with_delivery_budget(self.config.timing.delivery_budget())
		};
		for strategy in self.strategies {
			orchestrator.register(strategy);
		}
		let orchestrator = orchestrator.with_events(Arc::clone(&events));

		log::debug!(
			"engine ready: probes {:?}, strategies {:?}",
			detector.probe_names(),
			orchestrator.strategy_names()
		);

		Ok(ShieldEngine {
			config: self.config,
			host,
			detector,
			orchestrator,
			events,
			metrics,
		})
	}
}

impl Default for ShieldEngineBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Detection and delivery-resilience engine for one page.
pub struct ShieldEngine {
	config: EngineConfig,
	host: Arc<dyn RenderHost>,
	detector: Detector,
	orchestrator: BypassOrchestrator,
	events: Arc<EventDispatcher>,
	metrics: DeliveryMetrics,
}

impl ShieldEngine {
	/// Engine with default configuration and a reqwest transport.
	pub fn new(host: Arc<dyn RenderHost>) -> EngineResult<Self> {
		Self::builder().with_host(host).build()
	}

	pub fn builder() -> ShieldEngineBuilder {
		ShieldEngineBuilder::new()
	}

	/// Whether sponsored content is being suppressed. Probes run on the
	/// first call only; later calls return the same answer.
	pub async fn detect_ad_blocker(&self) -> bool {
		self.detector.detect().await
	}

	pub async fn detection_verdict(&self) -> DetectionVerdict {
		self.detector.verdict().await
	}

	/// Delivers the zone's content into `container`. Always leaves the
	/// container with rendered content, through the fallback if need be.
	pub async fn bypass_ad_blocker(
		&self,
		zone: impl Into<ZoneId>,
		container: NodeId,
	) -> DeliveryOutcome {
		let zone = zone.into();
		self.orchestrator.deliver(&zone, container).await
	}

	/// Full slot flow: queue a regular serving request when nothing is
	/// suppressed, otherwise deliver through the bypass chain.
	pub async fn render_slot(
		&self,
		zone: impl Into<ZoneId>,
		container: NodeId,
		queue: &dyn ServeQueue,
	) -> SlotOutcome {
		let zone = zone.into();
		if !self.detect_ad_blocker().await {
			queue.push(ServeRequest::for_zone(&zone));
			self.events.dispatch(EngineEvent::SlotQueued(QueueEvent {
				zone: zone.to_string(),
				timestamp: Utc::now(),
			}));
			return SlotOutcome::Queued;
		}
		SlotOutcome::Delivered(self.orchestrator.deliver(&zone, container).await)
	}

	pub fn metrics(&self) -> MetricsSnapshot {
		self.metrics.snapshot()
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	pub fn host(&self) -> &Arc<dyn RenderHost> {
		&self.host
	}

	pub fn strategy_names(&self) -> Vec<&'static str> {
		self.orchestrator.strategy_names()
	}
}
