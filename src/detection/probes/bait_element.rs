//! Decoy-element probe.
//!
//! Plants elements named like conventional ad markup just outside the
//! viewport, waits a staggered, jittered delay per decoy and then checks
//! whether a cosmetic filter tampered with them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::time::{Instant, sleep_until};

use super::Probe;
use crate::config::{ProbeConfig, TimingConfig};
use crate::host::{
    Display, ElementSpec, Measurement, NodeId, Position, RenderHost, Style, Visibility,
};
use crate::modules::timing::JitteredDelay;

/// (class, id prefix) pairs lifted from common filter-list targets.
const BAIT_NAMES: &[(&str, &str)] = &[
    ("adsbox", "ad-banner"),
    ("ad-slot", "textads"),
    ("pub_300x250", "banner-ad"),
    ("sponsored-links", "ads"),
    ("advertisement", "adbanner"),
];

pub struct BaitElementProbe {
    host: Arc<dyn RenderHost>,
    count: usize,
    threshold: usize,
    size: f32,
    near_zero: f32,
    offscreen_threshold: f32,
    delay: JitteredDelay,
}

impl BaitElementProbe {
    pub fn new(host: Arc<dyn RenderHost>, probes: &ProbeConfig, timing: &TimingConfig) -> Self {
        let delay = JitteredDelay::new(Duration::from_millis(timing.bait_base_delay_ms))
            .with_stagger(Duration::from_millis(timing.bait_stagger_ms))
            .with_jitter(Duration::from_millis(timing.bait_jitter_ms));

        Self {
            host,
            count: probes.bait_count,
            threshold: probes.bait_threshold,
            size: probes.bait_size_px,
            near_zero: probes.near_zero_px,
            offscreen_threshold: probes.offscreen_threshold_px,
            delay,
        }
    }

    fn decoy_spec(&self, index: usize) -> ElementSpec {
        let (class, id_prefix) = BAIT_NAMES[index % BAIT_NAMES.len()];
        let suffix: u32 = rand::thread_rng().gen_range(1_000..10_000);
        let offset = -(self.size + 2.0);

        ElementSpec::new("div")
            .with_id(format!("{id_prefix}-{suffix}"))
            .with_class(class)
            .with_class("ad-unit")
            .with_style(Style {
                position: Position::Absolute,
                left: offset,
                top: offset,
                ..Style::sized(self.size, self.size)
            })
            .with_text("\u{a0}")
    }

    fn is_tampered(&self, measurement: &Measurement) -> bool {
        !measurement.attached
            || measurement.display == Display::None
            || measurement.visibility == Visibility::Hidden
            || measurement.opacity <= 0.0
            || measurement.width <= self.near_zero
            || measurement.height <= self.near_zero
            || measurement.is_offscreen(self.offscreen_threshold)
    }

    fn inspect(&self, node: NodeId) -> bool {
        match self.host.measure(node) {
            Ok(measurement) => self.is_tampered(&measurement),
            Err(err) => {
                log::debug!("bait {} could not be measured: {}", node, err);
                true
            }
        }
    }
}

#[async_trait]
impl Probe for BaitElementProbe {
    fn name(&self) -> &'static str {
        "bait_element"
    }

    async fn run(&self) -> bool {
        let started = Instant::now();
        let body = self.host.body();
        let mut tampered = 0usize;
        let mut planted = Vec::with_capacity(self.count);

        for index in 0..self.count {
            match self.host.create_visual_element(body, &self.decoy_spec(index)) {
                Ok(node) => planted.push((index, node)),
                Err(err) => {
                    log::debug!("bait {} rejected by host: {}", index, err);
                    tampered += 1;
                }
            }
        }

        for (index, node) in planted {
            sleep_until(started + self.delay.for_step(index)).await;
            if self.inspect(node) {
                tampered += 1;
            }
            if let Err(err) = self.host.remove(node) {
                log::debug!("bait {} cleanup failed: {}", node, err);
            }
        }

        log::debug!("bait probe: {}/{} decoys tampered", tampered, self.count);
        tampered >= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::test_support::FaultyHost;
    use crate::host::{BlockerProfile, CosmeticAction, CosmeticRule, SimulatedHost};

    fn probe(host: Arc<dyn RenderHost>) -> BaitElementProbe {
        BaitElementProbe::new(host, &ProbeConfig::default(), &TimingConfig::immediate())
    }

    #[tokio::test]
    async fn untouched_decoys_vote_clear() {
        let host = Arc::new(SimulatedHost::new(BlockerProfile::none()));
        assert!(!probe(host.clone()).run().await);
        // decoys are cleaned up afterwards
        assert!(host.children(host.body()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn hidden_decoys_vote_suppressed() {
        let host = Arc::new(SimulatedHost::new(BlockerProfile::typical()));
        assert!(probe(host).run().await);
    }

    #[tokio::test]
    async fn displaced_decoys_vote_suppressed() {
        let profile = BlockerProfile::none().with_rule(
            CosmeticRule::new(r"^ad-unit$", CosmeticAction::Displace).unwrap(),
        );
        let host = Arc::new(SimulatedHost::new(profile));
        assert!(probe(host).run().await);
    }

    #[tokio::test]
    async fn single_tampered_decoy_is_not_enough() {
        let profile = BlockerProfile::none().with_rule(
            CosmeticRule::new(r"^adsbox$", CosmeticAction::Transparent).unwrap(),
        );
        let host = Arc::new(SimulatedHost::new(profile));
        assert!(!probe(host).run().await);
    }

    #[tokio::test]
    async fn unmeasurable_decoys_vote_suppressed() {
        let host = FaultyHost::new(SimulatedHost::new(BlockerProfile::none())).failing_measure();
        let host = Arc::new(host);
        assert!(probe(host.clone()).run().await);
        assert!(host.children(host.body()).unwrap().is_empty());
    }
}
