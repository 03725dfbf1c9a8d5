use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::host::OFFSCREEN_THRESHOLD_PX;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid url for {field}: {source}")]
    InvalidUrl {
        field: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Every delay, timeout and budget used by probes, strategies and the
/// orchestrator. Values are milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Ceiling for a whole detection cycle; a probe still running when it
    /// expires votes "suppressed".
    pub detection_budget_ms: u64,
    pub bait_base_delay_ms: u64,
    pub bait_stagger_ms: u64,
    pub bait_jitter_ms: u64,
    pub network_timeout_ms: u64,
    pub script_timeout_ms: u64,
    /// Ceiling for the strategy chain; once spent, the fallback renders.
    pub delivery_budget_ms: u64,
    pub strategy_timeout_ms: u64,
    pub click_stagger_ms: u64,
    pub loader_delay_min_ms: u64,
    pub loader_delay_max_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            detection_budget_ms: 5_000,
            bait_base_delay_ms: 100,
            bait_stagger_ms: 50,
            bait_jitter_ms: 40,
            network_timeout_ms: 2_000,
            script_timeout_ms: 1_000,
            delivery_budget_ms: 10_000,
            strategy_timeout_ms: 3_000,
            click_stagger_ms: 150,
            loader_delay_min_ms: 100,
            loader_delay_max_ms: 400,
        }
    }
}

impl TimingConfig {
    /// No artificial delays; budgets and timeouts keep their defaults.
    pub fn immediate() -> Self {
        Self {
            bait_base_delay_ms: 0,
            bait_stagger_ms: 0,
            bait_jitter_ms: 0,
            click_stagger_ms: 0,
            loader_delay_min_ms: 0,
            loader_delay_max_ms: 0,
            ..Self::default()
        }
    }

    pub fn detection_budget(&self) -> Duration {
        Duration::from_millis(self.detection_budget_ms)
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_millis(self.network_timeout_ms)
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_millis(self.script_timeout_ms)
    }

    pub fn delivery_budget(&self) -> Duration {
        Duration::from_millis(self.delivery_budget_ms)
    }

    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_millis(self.strategy_timeout_ms)
    }

    /// Latest moment, in milliseconds, at which the last of `count` bait
    /// decoys can be inspected.
    pub fn bait_worst_case_ms(&self, count: usize) -> u64 {
        let steps = u64::try_from(count.saturating_sub(1)).unwrap_or(u64::MAX);
        self.bait_base_delay_ms
            .saturating_add(self.bait_stagger_ms.saturating_mul(steps))
            .saturating_add(self.bait_jitter_ms)
    }
}

/// Thresholds and inputs for the four probes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub bait_count: usize,
    /// Tampered decoys needed before the bait probe votes "suppressed".
    pub bait_threshold: usize,
    pub bait_size_px: f32,
    pub near_zero_px: f32,
    pub offscreen_threshold_px: f32,
    pub network_endpoints: Vec<String>,
    /// Share of failed endpoints at which the network probe votes "suppressed".
    pub network_failure_ratio: f32,
    pub blocker_signatures: Vec<String>,
    pub stripping_environments: Vec<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            bait_count: 4,
            bait_threshold: 2,
            bait_size_px: 10.0,
            near_zero_px: 1.0,
            offscreen_threshold_px: OFFSCREEN_THRESHOLD_PX,
            network_endpoints: vec![
                "https://pagead2.googlesyndication.com/pagead/js/adsbygoogle.js".into(),
                "https://googleads.g.doubleclick.net/pagead/id".into(),
                "https://www.google-analytics.com/analytics.js".into(),
                "https://static.ads-twitter.com/uwt.js".into(),
            ],
            network_failure_ratio: 0.5,
            blocker_signatures: [
                "adblock", "ublock", "adguard", "abp-", "ghostery", "privacy-badger", "adblocker",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            stripping_environments: ["Brave", "DuckDuckGo", "Focus/"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Copy shown by the rendering strategies; the served creative itself stays
/// opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreativeConfig {
    pub headline: String,
    pub body: String,
    pub call_to_action: String,
    pub advertiser: String,
    pub label: String,
}

impl Default for CreativeConfig {
    fn default() -> Self {
        Self {
            headline: "Discover something new today".into(),
            body: "Hand-picked picks from our partners, updated daily.".into(),
            call_to_action: "Learn more".into(),
            advertiser: "Partner".into(),
            label: "Advertisement".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub serve_endpoint: String,
    pub click_endpoint: String,
    /// Origin of the embedding page; first-party loaders are served from it.
    pub page_origin: String,
    pub creative: CreativeConfig,
    /// Strategy names that must never be attempted.
    pub disabled_strategies: Vec<String>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            serve_endpoint: "https://serve.adnet.example/v1/serve".into(),
            click_endpoint: "https://links.example.net/v1/r".into(),
            page_origin: "https://www.example.com".into(),
            creative: CreativeConfig::default(),
            disabled_strategies: Vec::new(),
        }
    }
}

/// Enable switches for each probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub bait_probe: bool,
    pub signature_probe: bool,
    pub network_probe: bool,
    pub script_probe: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            bait_probe: true,
            signature_probe: true,
            network_probe: true,
            script_probe: true,
        }
    }
}

/// Root configuration for the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub timing: TimingConfig,
    pub probes: ProbeConfig,
    pub delivery: DeliveryConfig,
    pub features: FeatureFlags,
}

/// Validated, URL-parsed view of the delivery settings handed to strategies.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliverySettings {
    pub serve_endpoint: Url,
    pub click_endpoint: Url,
    pub page_origin: Url,
    pub creative: CreativeConfig,
    pub click_stagger: Duration,
    pub loader_delay: (Duration, Duration),
    /// Content pushed further than this from its slot does not count as rendered.
    pub offscreen_threshold: f32,
}

impl DeliverySettings {
    /// Click-tracking URL for a zone.
    pub fn click_url(&self, zone: &str) -> Url {
        let mut url = self.click_endpoint.clone();
        url.query_pairs_mut().append_pair("zone", zone);
        url
    }
}

impl Default for DeliverySettings {
    fn default() -> Self {
        // Built from the default config, whose URLs are known to parse.
        EngineConfig::default()
            .delivery_settings()
            .unwrap_or_else(|err| panic!("default delivery settings are invalid: {err}"))
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let probes = &self.probes;
        if probes.bait_count == 0 {
            return Err(ConfigError::Invalid("bait_count must be at least 1".into()));
        }
        if probes.bait_threshold == 0 || probes.bait_threshold > probes.bait_count {
            return Err(ConfigError::Invalid(format!(
                "bait_threshold must be within 1..={}",
                probes.bait_count
            )));
        }
        if !(probes.network_failure_ratio > 0.0 && probes.network_failure_ratio <= 1.0) {
            return Err(ConfigError::Invalid(
                "network_failure_ratio must be within (0, 1]".into(),
            ));
        }
        if self.features.network_probe && probes.network_endpoints.is_empty() {
            return Err(ConfigError::Invalid(
                "network probe enabled without endpoints".into(),
            ));
        }
        let features = self.features;
        if !(features.bait_probe
            || features.signature_probe
            || features.network_probe
            || features.script_probe)
        {
            return Err(ConfigError::Invalid("every probe is disabled".into()));
        }

        let timing = &self.timing;
        for (name, value) in [
            ("detection_budget_ms", timing.detection_budget_ms),
            ("delivery_budget_ms", timing.delivery_budget_ms),
            ("strategy_timeout_ms", timing.strategy_timeout_ms),
            ("network_timeout_ms", timing.network_timeout_ms),
            ("script_timeout_ms", timing.script_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }
        let budget = timing.detection_budget_ms;
        let probe_waits = [
            (
                features.bait_probe,
                "bait inspection delay",
                timing.bait_worst_case_ms(probes.bait_count),
            ),
            (features.network_probe, "network_timeout_ms", timing.network_timeout_ms),
            (features.script_probe, "script_timeout_ms", timing.script_timeout_ms),
        ];
        for (enabled, name, wait) in probe_waits {
            if enabled && wait >= budget {
                return Err(ConfigError::Invalid(format!(
                    "{name} ({wait}ms) does not fit in detection_budget_ms ({budget}ms)"
                )));
            }
        }
        if timing.loader_delay_min_ms > timing.loader_delay_max_ms {
            return Err(ConfigError::Invalid(
                "loader_delay_min_ms exceeds loader_delay_max_ms".into(),
            ));
        }

        self.network_endpoints()?;
        self.delivery_settings()?;
        Ok(())
    }

    pub fn network_endpoints(&self) -> Result<Vec<Url>, ConfigError> {
        self.probes
            .network_endpoints
            .iter()
            .enumerate()
            .map(|(index, raw)| parse_url(&format!("probes.network_endpoints[{index}]"), raw))
            .collect()
    }

    pub fn delivery_settings(&self) -> Result<DeliverySettings, ConfigError> {
        let delivery = &self.delivery;
        Ok(DeliverySettings {
            serve_endpoint: parse_url("delivery.serve_endpoint", &delivery.serve_endpoint)?,
            click_endpoint: parse_url("delivery.click_endpoint", &delivery.click_endpoint)?,
            page_origin: parse_url("delivery.page_origin", &delivery.page_origin)?,
            creative: delivery.creative.clone(),
            click_stagger: Duration::from_millis(self.timing.click_stagger_ms),
            loader_delay: (
                Duration::from_millis(self.timing.loader_delay_min_ms),
                Duration::from_millis(self.timing.loader_delay_max_ms),
            ),
            offscreen_threshold: self.probes.offscreen_threshold_px,
        })
    }
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
        field: field.to_string(),
        source,
    })
}

/// Fluent builder for [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.config.timing = timing;
        self
    }

    pub fn with_probe_config(mut self, probes: ProbeConfig) -> Self {
        self.config.probes = probes;
        self
    }

    pub fn with_delivery_config(mut self, delivery: DeliveryConfig) -> Self {
        self.config.delivery = delivery;
        self
    }

    pub fn with_network_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.probes.network_endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_creative(mut self, creative: CreativeConfig) -> Self {
        self.config.delivery.creative = creative;
        self
    }

    pub fn with_detection_budget(mut self, budget: Duration) -> Self {
        self.config.timing.detection_budget_ms =
            u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_delivery_budget(mut self, budget: Duration) -> Self {
        self.config.timing.delivery_budget_ms =
            u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn disable_strategy(mut self, name: impl Into<String>) -> Self {
        self.config.delivery.disabled_strategies.push(name.into());
        self
    }

    pub fn disable_bait_probe(mut self) -> Self {
        self.config.features.bait_probe = false;
        self
    }

    pub fn disable_signature_probe(mut self) -> Self {
        self.config.features.signature_probe = false;
        self
    }

    pub fn disable_network_probe(mut self) -> Self {
        self.config.features.network_probe = false;
        self
    }

    pub fn disable_script_probe(mut self) -> Self {
        self.config.features.script_probe = false;
        self
    }

    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
