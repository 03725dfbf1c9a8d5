use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sponsor_shield::host::{CosmeticAction, CosmeticRule};
use sponsor_shield::{
    AttemptResult, BlockerProfile, DeliveryContext, ElementSpec, EngineConfig, InMemoryServeQueue,
    NodeId, PriorityTier, Probe, RenderHost, RenderedBy, ServeRequest, ShieldEngine,
    SimulatedHost, SlotOutcome, Strategy, StrategyError, StrategyOutcome, TimingConfig, ZoneId,
};

struct VoteProbe {
    vote: bool,
    runs: Arc<AtomicUsize>,
}

#[async_trait]
impl Probe for VoteProbe {
    fn name(&self) -> &'static str {
        "vote"
    }

    async fn run(&self) -> bool {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.vote
    }
}

/// Strategy that either renders a labelled block or raises.
struct Scripted {
    label: &'static str,
    tier: PriorityTier,
    succeeds: bool,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl Strategy for Scripted {
    fn name(&self) -> &'static str {
        self.label
    }

    fn tier(&self) -> PriorityTier {
        self.tier
    }

    async fn execute(&self, ctx: &DeliveryContext<'_>) -> Result<StrategyOutcome, StrategyError> {
        self.calls.lock().unwrap().push(self.label);
        let node = ctx
            .host
            .create_visual_element(ctx.container, &ElementSpec::new("div").with_text(self.label))?;
        if self.succeeds {
            Ok(StrategyOutcome::Rendered)
        } else {
            ctx.host.remove(node)?;
            Err(StrategyError::Other(format!("{} raised", self.label)))
        }
    }
}

struct Exploding;

#[async_trait]
impl Strategy for Exploding {
    fn name(&self) -> &'static str {
        "exploding"
    }

    fn tier(&self) -> PriorityTier {
        PriorityTier::Native
    }

    async fn execute(&self, _ctx: &DeliveryContext<'_>) -> Result<StrategyOutcome, StrategyError> {
        panic!("strategy blew up")
    }
}

const LABELS: [&str; 10] = ["s1", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10"];

fn immediate_config() -> EngineConfig {
    EngineConfig::builder()
        .with_timing(TimingConfig::immediate())
        .build()
        .unwrap()
}

fn page(profile: BlockerProfile) -> (Arc<SimulatedHost>, NodeId) {
    let host = Arc::new(SimulatedHost::new(profile));
    let container = host
        .create_visual_element(host.body(), &ElementSpec::new("div").with_id("slot"))
        .unwrap();
    (host, container)
}

fn voting_engine(votes: &[bool], runs: &Arc<AtomicUsize>) -> ShieldEngine {
    let (host, _) = page(BlockerProfile::none());
    let mut builder = ShieldEngine::builder()
        .with_config(immediate_config())
        .with_host(host.clone())
        .with_transport(host)
        .without_builtin_probes();
    for vote in votes {
        builder = builder.with_probe(Arc::new(VoteProbe {
            vote: *vote,
            runs: Arc::clone(runs),
        }));
    }
    builder.build().unwrap()
}

fn scripted_engine(
    host: Arc<SimulatedHost>,
    succeeding: &[usize],
    calls: &Arc<Mutex<Vec<&'static str>>>,
) -> ShieldEngine {
    let mut builder = ShieldEngine::builder()
        .with_config(immediate_config())
        .with_host(host.clone())
        .with_transport(host)
        .without_builtin_strategies();
    for (index, label) in LABELS.into_iter().enumerate() {
        builder = builder.with_strategy(Arc::new(Scripted {
            label,
            tier: PriorityTier::Native,
            succeeds: succeeding.contains(&(index + 1)),
            calls: Arc::clone(calls),
        }));
    }
    builder.build().unwrap()
}

#[tokio::test]
async fn three_of_four_probes_means_suppressed() {
    let runs = Arc::new(AtomicUsize::new(0));
    let engine = voting_engine(&[true, true, true, false], &runs);
    assert!(engine.detect_ad_blocker().await);
}

#[tokio::test]
async fn one_of_four_probes_means_clear() {
    let runs = Arc::new(AtomicUsize::new(0));
    let engine = voting_engine(&[false, true, false, false], &runs);
    assert!(!engine.detect_ad_blocker().await);
}

#[tokio::test]
async fn detection_runs_probes_once() {
    let runs = Arc::new(AtomicUsize::new(0));
    let engine = voting_engine(&[true, false, true, false], &runs);

    let first = engine.detect_ad_blocker().await;
    let second = engine.detect_ad_blocker().await;

    assert_eq!(first, second);
    assert_eq!(runs.load(Ordering::SeqCst), 4);
    assert_eq!(engine.metrics().global.detections, 1);
}

#[tokio::test]
async fn fifth_strategy_wins_after_four_failures() {
    let (host, container) = page(BlockerProfile::none());
    let calls = Arc::default();
    let engine = scripted_engine(host.clone(), &[5, 6, 7], &calls);

    let outcome = engine.bypass_ad_blocker("zone-5", container).await;

    assert_eq!(outcome.rendered_by, RenderedBy::Strategy("s5"));
    assert_eq!(*calls.lock().unwrap(), vec!["s1", "s2", "s3", "s4", "s5"]);
    let failures = outcome
        .attempts
        .iter()
        .filter(|attempt| attempt.result == AttemptResult::Failed)
        .count();
    assert_eq!(failures, 4);

    let children = host.children(container).unwrap();
    assert_eq!(children.len(), 1);
    assert!(host.measure(children[0]).unwrap().is_rendered());
    assert_eq!(host.text_content(children[0]), "s5");
}

#[tokio::test]
async fn total_failure_falls_back_to_one_block() {
    let (host, container) = page(BlockerProfile::none());
    let calls = Arc::default();
    let engine = scripted_engine(host.clone(), &[], &calls);

    let outcome = engine.bypass_ad_blocker("zone-5", container).await;

    assert!(outcome.used_fallback());
    assert_eq!(outcome.attempts.len(), 10);
    assert_eq!(calls.lock().unwrap().len(), 10);

    let children = host.children(container).unwrap();
    assert_eq!(children.len(), 1);
    assert!(host.measure(children[0]).unwrap().is_rendered());
    assert_eq!(engine.metrics().global.fallback_renders, 1);
}

#[tokio::test]
async fn lower_tiers_run_first_regardless_of_registration() {
    let (host, container) = page(BlockerProfile::none());
    let calls: Arc<Mutex<Vec<&'static str>>> = Arc::default();
    let scripted = |label, tier| {
        Arc::new(Scripted {
            label,
            tier,
            succeeds: false,
            calls: Arc::clone(&calls),
        })
    };
    let engine = ShieldEngine::builder()
        .with_config(immediate_config())
        .with_host(host.clone())
        .with_transport(host.clone())
        .without_builtin_strategies()
        .with_strategy(scripted("minimal", PriorityTier::Minimal))
        .with_strategy(scripted("synthetic", PriorityTier::Synthetic))
        .with_strategy(scripted("native-a", PriorityTier::Native))
        .with_strategy(scripted("indirect", PriorityTier::Indirect))
        .with_strategy(scripted("native-b", PriorityTier::Native))
        .build()
        .unwrap();

    engine.bypass_ad_blocker("zone-1", container).await;

    assert_eq!(
        *calls.lock().unwrap(),
        vec!["native-a", "native-b", "indirect", "synthetic", "minimal"]
    );
}

#[tokio::test]
async fn unblocked_page_queues_a_serve_request() {
    let (host, container) = page(BlockerProfile::none());
    let engine = ShieldEngine::builder()
        .with_config(immediate_config())
        .with_host(host.clone())
        .with_transport(host.clone())
        .build()
        .unwrap();
    let queue = InMemoryServeQueue::new();

    assert_eq!(
        engine.render_slot("4521", container, &queue).await,
        SlotOutcome::Queued
    );
    let queued = queue.drain();
    assert_eq!(queued, vec![ServeRequest::for_zone(&ZoneId::from("4521"))]);
    assert_eq!(queued[0].to_json().unwrap(), r#"{"serve":{"zoneid":"4521"}}"#);
}

#[tokio::test]
async fn aggressive_blocker_is_detected_and_bypassed() {
    let (host, container) = page(BlockerProfile::aggressive());
    let engine = ShieldEngine::builder()
        .with_config(immediate_config())
        .with_host(host.clone())
        .with_transport(host.clone())
        .build()
        .unwrap();

    let verdict = engine.detection_verdict().await;
    assert!(verdict.suppressed);
    assert_eq!(verdict.suppressed_votes, 4);

    let outcome = engine.bypass_ad_blocker("zone-9", container).await;
    assert_eq!(outcome.rendered_by, RenderedBy::Strategy("native_card"));
    let card = host.children(container).unwrap()[0];
    assert!(host.click(card).is_some());
}

#[tokio::test]
async fn blocked_loader_gives_way_to_first_party_loader() {
    let (host, container) = page(BlockerProfile::typical());
    let config = EngineConfig::builder()
        .with_timing(TimingConfig::immediate())
        .disable_strategy("native_card")
        .disable_strategy("recommendation_feed")
        .disable_strategy("themed_banner")
        .build()
        .unwrap();
    let engine = ShieldEngine::builder()
        .with_config(config)
        .with_host(host.clone())
        .with_transport(host.clone())
        .build()
        .unwrap();

    let outcome = engine.bypass_ad_blocker("zone-2", container).await;

    assert_eq!(outcome.rendered_by, RenderedBy::Strategy("first_party_loader"));
    assert_eq!(outcome.attempts[0].strategy, "deferred_loader");
    assert_eq!(outcome.attempts[0].result, AttemptResult::Failed);
    assert_eq!(host.children(container).unwrap().len(), 1);
}

#[tokio::test]
async fn collapsed_frame_ends_in_fallback() {
    let (host, container) = page(BlockerProfile::aggressive());
    let mut builder = EngineConfig::builder().with_timing(TimingConfig::immediate());
    for name in [
        "native_card",
        "recommendation_feed",
        "themed_banner",
        "deferred_loader",
        "first_party_loader",
        "closed_shadow",
        "canvas_image",
        "video_overlay",
        "text_label",
    ] {
        builder = builder.disable_strategy(name);
    }
    let engine = ShieldEngine::builder()
        .with_config(builder.build().unwrap())
        .with_host(host.clone())
        .with_transport(host.clone())
        .build()
        .unwrap();

    let outcome = engine.bypass_ad_blocker("zone-3", container).await;

    assert!(outcome.used_fallback());
    assert_eq!(outcome.attempts[0].result, AttemptResult::NotRendered);
    let children = host.children(container).unwrap();
    assert_eq!(children.len(), 1);
    assert!(host.measure(children[0]).unwrap().is_rendered());
    assert!(host.click(children[0]).is_some());
}

#[tokio::test]
async fn page_seeded_from_markup() {
    let html = r#"
        <html><body>
            <main id="catalogue"><h1>Latest videos</h1></main>
            <aside id="content-slot"></aside>
            <div class="adsbox">promo</div>
        </body></html>
    "#;
    let host = Arc::new(SimulatedHost::from_html(html, BlockerProfile::typical()));
    let container = host.find_by_id("content-slot").unwrap();
    let engine = ShieldEngine::builder()
        .with_config(immediate_config())
        .with_host(host.clone())
        .with_transport(host.clone())
        .build()
        .unwrap();
    let queue = InMemoryServeQueue::new();

    let SlotOutcome::Delivered(outcome) = engine.render_slot("88", container, &queue).await else {
        panic!("list blocker should be detected");
    };

    assert!(!outcome.used_fallback());
    assert!(queue.is_empty());
    assert_eq!(host.children(container).unwrap().len(), 1);
}

#[tokio::test]
async fn off_screen_content_falls_through_to_fallback() {
    let profile = BlockerProfile::none().with_rule(
        CosmeticRule::new(
            r"^(tile|panel|card|story|note|block|feature|item|pick|spot|brief|entry)-\d+$",
            CosmeticAction::Displace,
        )
        .unwrap(),
    );
    let (host, container) = page(profile);
    let engine = ShieldEngine::builder()
        .with_config(immediate_config())
        .with_host(host.clone())
        .with_transport(host.clone())
        .build()
        .unwrap();

    let outcome = engine.bypass_ad_blocker("zone-4", container).await;

    assert!(outcome.used_fallback());
    assert_eq!(outcome.attempts.len(), 10);
    assert!(
        outcome
            .attempts
            .iter()
            .all(|attempt| attempt.result != AttemptResult::Rendered)
    );
    assert_eq!(engine.metrics().global.fallback_renders, 1);
}

#[tokio::test]
async fn panicking_caller_strategy_does_not_escape_delivery() {
    let (host, container) = page(BlockerProfile::none());
    let engine = ShieldEngine::builder()
        .with_config(immediate_config())
        .with_host(host.clone())
        .with_transport(host.clone())
        .without_builtin_strategies()
        .with_strategy(Arc::new(Exploding))
        .build()
        .unwrap();

    let delivery = tokio::spawn(async move { engine.bypass_ad_blocker("zone-6", container).await });
    let outcome = delivery.await.expect("delivery task completed");

    assert!(outcome.used_fallback());
    assert_eq!(outcome.attempts[0].result, AttemptResult::Failed);
    let children = host.children(container).unwrap();
    assert_eq!(children.len(), 1);
    assert!(host.measure(children[0]).unwrap().is_rendered());
}
