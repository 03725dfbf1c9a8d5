//! Detection aggregator.
//!
//! Runs every registered probe concurrently under one detection budget and
//! folds their votes into a single verdict. The verdict is computed once per
//! detector and reused by later callers, including ones that ask while the
//! first cycle is still running.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout};

use super::probes::{BaitElementProbe, NetworkProbe, Probe, ScriptExecutionProbe, SignatureProbe};
use crate::config::{ConfigError, EngineConfig};
use crate::host::{ProbeTransport, RenderHost};
use crate::modules::events::{DetectionEvent, EngineEvent, EventDispatcher, ProbeEvent};

/// Aggregated outcome of one detection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionVerdict {
    pub suppressed: bool,
    pub suppressed_votes: usize,
    pub total_probes: usize,
}

/// Majority rule: suppressed when at least half of the probes say so.
/// With no probes at all there is nothing to trust, so the answer is yes.
pub fn majority_suppressed(votes: usize, total: usize) -> bool {
    votes >= total.div_ceil(2)
}

pub struct Detector {
    probes: Vec<Arc<dyn Probe>>,
    budget: Duration,
    events: Arc<EventDispatcher>,
    verdict: OnceCell<DetectionVerdict>,
}

impl Detector {
    pub fn new(budget: Duration) -> Self {
        Self {
            probes: Vec::new(),
            budget,
            events: Arc::new(EventDispatcher::new()),
            verdict: OnceCell::new(),
        }
    }

    /// Detector with the built-in probes enabled by `config.features`.
    pub fn from_config(
        config: &EngineConfig,
        host: Arc<dyn RenderHost>,
        transport: Arc<dyn ProbeTransport>,
    ) -> Result<Self, ConfigError> {
        let mut detector = Self::new(config.timing.detection_budget());
        let features = config.features;

        if features.bait_probe {
            detector.register_probe(Arc::new(BaitElementProbe::new(
                Arc::clone(&host),
                &config.probes,
                &config.timing,
            )));
        }
        if features.signature_probe {
            detector.register_probe(Arc::new(SignatureProbe::new(
                Arc::clone(&host),
                &config.probes,
            )));
        }
        if features.network_probe {
            detector.register_probe(Arc::new(NetworkProbe::new(
                transport,
                config.network_endpoints()?,
                config.timing.network_timeout(),
                config.probes.network_failure_ratio,
            )));
        }
        if features.script_probe {
            detector.register_probe(Arc::new(ScriptExecutionProbe::new(
                host,
                config.timing.script_timeout(),
            )));
        }

        Ok(detector)
    }

    pub fn with_probe(mut self, probe: Arc<dyn Probe>) -> Self {
        self.register_probe(probe);
        self
    }

    pub fn with_events(mut self, events: Arc<EventDispatcher>) -> Self {
        self.events = events;
        self
    }

    pub fn register_probe(&mut self, probe: Arc<dyn Probe>) {
        self.probes.push(probe);
    }

    pub fn probe_names(&self) -> Vec<&'static str> {
        self.probes.iter().map(|probe| probe.name()).collect()
    }

    /// Whether sponsored content is being suppressed.
    pub async fn detect(&self) -> bool {
        self.verdict().await.suppressed
    }

    /// Full verdict; concurrent first callers share a single cycle.
    pub async fn verdict(&self) -> DetectionVerdict {
        *self.verdict.get_or_init(|| self.run_cycle()).await
    }

    /// Verdict of a finished cycle, if one has completed.
    pub fn cached(&self) -> Option<DetectionVerdict> {
        self.verdict.get().copied()
    }

    async fn run_cycle(&self) -> DetectionVerdict {
        if self.probes.is_empty() {
            log::warn!("no probes registered, reporting suppression");
        }
        let mut votes = JoinSet::new();
        for probe in &self.probes {
            let probe = Arc::clone(probe);
            let budget = self.budget;
            votes.spawn(async move {
                let started = Instant::now();
                let name = probe.name();
                let suppressed = match timeout(budget, probe.run()).await {
                    Ok(vote) => vote,
                    Err(_) => {
                        log::debug!("probe {} exceeded the detection budget", name);
                        true
                    }
                };
                (name, suppressed, started.elapsed())
            });
        }

        let total_probes = self.probes.len();
        let mut suppressed_votes = 0usize;
        while let Some(joined) = votes.join_next().await {
            match joined {
                Ok((probe, suppressed, elapsed)) => {
                    if suppressed {
                        suppressed_votes += 1;
                    }
                    self.events.dispatch(EngineEvent::ProbeCompleted(ProbeEvent {
                        probe: probe.to_string(),
                        suppressed,
                        elapsed,
                        timestamp: Utc::now(),
                    }));
                }
                Err(err) => {
                    log::warn!("probe task aborted: {}", err);
                    suppressed_votes += 1;
                }
            }
        }

        let verdict = DetectionVerdict {
            suppressed: majority_suppressed(suppressed_votes, total_probes),
            suppressed_votes,
            total_probes,
        };
        self.events
            .dispatch(EngineEvent::DetectionCompleted(DetectionEvent {
                suppressed: verdict.suppressed,
                suppressed_votes,
                total_probes,
                timestamp: Utc::now(),
            }));
        verdict
    }
}
