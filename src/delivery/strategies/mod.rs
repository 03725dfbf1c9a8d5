//! Delivery strategy registry.
//!
//! Each submodule renders the creative into the caller's container with one
//! technique. Strategies are stateless; the orchestrator decides the order
//! and verifies the result.

pub mod canvas_image;
pub mod closed_shadow;
pub mod deferred_loader;
pub mod first_party_loader;
pub mod isolated_frame;
pub mod native_card;
pub mod recommendation_feed;
pub mod text_label;
pub mod themed_banner;
pub mod video_overlay;

pub use canvas_image::CanvasImage;
pub use closed_shadow::ClosedShadow;
pub use deferred_loader::DeferredLoader;
pub use first_party_loader::FirstPartyLoader;
pub use isolated_frame::IsolatedFrame;
pub use native_card::NativeCard;
pub use recommendation_feed::RecommendationFeed;
pub use text_label::TextLabel;
pub use themed_banner::ThemedBanner;
pub use video_overlay::VideoOverlay;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;

use super::ZoneId;
use crate::config::DeliverySettings;
use crate::host::{
    ClickAction, ClickDispatch, ClickMethod, ElementSpec, HostError, NodeId, RenderHost, Style,
};

/// Lower tiers are tried first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PriorityTier {
    /// Structured content built from generic layout primitives.
    Native = 1,
    /// Script injection, sub-documents and encapsulated sub-trees.
    Indirect = 2,
    /// Generated imagery and media-player chrome.
    Synthetic = 3,
    /// Plain text.
    Minimal = 4,
}

impl PriorityTier {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tier {}", self.as_u8())
    }
}

/// What a strategy believes it achieved. The orchestrator double-checks
/// `Rendered` against the container before accepting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyOutcome {
    Rendered,
    NotRendered,
}

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("host rejected the attempt: {0}")]
    Host(#[from] HostError),
    #[error("{0} is unavailable in this environment")]
    Unavailable(&'static str),
    #[error("{0}")]
    Other(String),
}

/// Everything a strategy may touch during one attempt.
pub struct DeliveryContext<'a> {
    pub zone: &'a ZoneId,
    pub container: NodeId,
    pub host: &'a dyn RenderHost,
    pub settings: &'a DeliverySettings,
}

#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn tier(&self) -> PriorityTier;

    async fn execute(&self, ctx: &DeliveryContext<'_>) -> Result<StrategyOutcome, StrategyError>;
}

/// Built-in strategies in registration order.
pub fn default_strategies() -> Vec<Arc<dyn Strategy>> {
    vec![
        Arc::new(NativeCard),
        Arc::new(RecommendationFeed),
        Arc::new(ThemedBanner),
        Arc::new(DeferredLoader),
        Arc::new(FirstPartyLoader),
        Arc::new(IsolatedFrame),
        Arc::new(ClosedShadow),
        Arc::new(CanvasImage),
        Arc::new(VideoOverlay),
        Arc::new(TextLabel),
    ]
}

/// Words no cosmetic filter list targets.
const NEUTRAL_WORDS: &[&str] = &[
    "tile", "panel", "card", "story", "note", "block", "feature", "item", "pick", "spot",
    "brief", "entry",
];

/// Random class or id such as `story-48213`.
pub fn neutral_name() -> String {
    let mut rng = rand::thread_rng();
    let word = NEUTRAL_WORDS[rng.gen_range(0..NEUTRAL_WORDS.len())];
    format!("{}-{}", word, rng.gen_range(10_000..100_000))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub background: &'static str,
    pub foreground: &'static str,
    pub accent: &'static str,
}

const THEMES: &[Theme] = &[
    Theme {
        background: "#ffffff",
        foreground: "#1f2933",
        accent: "#2563eb",
    },
    Theme {
        background: "#f8fafc",
        foreground: "#0f172a",
        accent: "#0d9488",
    },
    Theme {
        background: "#111827",
        foreground: "#f9fafb",
        accent: "#f59e0b",
    },
    Theme {
        background: "#fdf2f8",
        foreground: "#3f3f46",
        accent: "#db2777",
    },
];

/// A theme picked at random so consecutive renders do not look alike.
pub fn pick_theme() -> Theme {
    THEMES[rand::thread_rng().gen_range(0..THEMES.len())]
}

/// Click-through dispatched three ways, each later than the previous, so
/// that at least one survives interference with the others.
pub fn staggered_click(settings: &DeliverySettings, zone: &ZoneId) -> ClickAction {
    let stagger = settings.click_stagger;
    ClickAction {
        target: settings.click_url(zone.as_str()),
        dispatches: vec![
            ClickDispatch {
                method: ClickMethod::Navigate,
                delay: Duration::ZERO,
            },
            ClickDispatch {
                method: ClickMethod::SyntheticAnchor,
                delay: stagger,
            },
            ClickDispatch {
                method: ClickMethod::OpenWindow,
                delay: stagger * 2,
            },
        ],
    }
}

/// Plain anchor pointing at the zone's click-through URL.
pub fn click_link(ctx: &DeliveryContext<'_>, text: &str) -> ElementSpec {
    ElementSpec::new("a")
        .with_attribute("href", ctx.settings.click_url(ctx.zone.as_str()).as_str())
        .with_attribute("rel", "noopener")
        .with_text(text)
}

/// Creative markup shared by the loader strategies once their script is in.
pub fn slot_markup(ctx: &DeliveryContext<'_>, theme: Theme) -> ElementSpec {
    let creative = &ctx.settings.creative;
    ElementSpec::new("div")
        .with_class(neutral_name())
        .with_style(
            Style::default()
                .with_background(theme.background)
                .with_color(theme.foreground)
                .with_property("padding", "12px"),
        )
        .with_child(ElementSpec::new("strong").with_text(creative.headline.as_str()))
        .with_child(ElementSpec::new("p").with_text(creative.body.as_str()))
        .with_child(click_link(ctx, &creative.call_to_action))
        .with_click(staggered_click(ctx.settings, ctx.zone))
}

/// Hex form of a string, used to keep zone ids out of request URLs.
pub fn hex_encode(raw: &str) -> String {
    raw.bytes().map(|byte| format!("{byte:02x}")).collect()
}

/// Self-check a strategy runs on the node it inserted.
pub fn confirm_rendered(
    ctx: &DeliveryContext<'_>,
    node: NodeId,
) -> Result<StrategyOutcome, StrategyError> {
    if ctx
        .host
        .measure(node)?
        .is_rendered_within(ctx.settings.offscreen_threshold)
    {
        Ok(StrategyOutcome::Rendered)
    } else {
        Ok(StrategyOutcome::NotRendered)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::host::{BlockerProfile, SimulatedHost};

    pub struct Harness {
        pub host: SimulatedHost,
        pub container: NodeId,
        pub settings: DeliverySettings,
        pub zone: ZoneId,
    }

    impl Harness {
        pub fn new(profile: BlockerProfile) -> Self {
            let host = SimulatedHost::new(profile);
            let container = host
                .create_visual_element(host.body(), &ElementSpec::new("div").with_id("slot"))
                .unwrap();
            let mut settings = DeliverySettings::default();
            settings.click_stagger = Duration::ZERO;
            settings.loader_delay = (Duration::ZERO, Duration::ZERO);
            Self {
                host,
                container,
                settings,
                zone: ZoneId::from("zone-7"),
            }
        }

        pub fn context(&self) -> DeliveryContext<'_> {
            DeliveryContext {
                zone: &self.zone,
                container: self.container,
                host: &self.host,
                settings: &self.settings,
            }
        }

        pub async fn run(&self, strategy: &dyn Strategy) -> Result<StrategyOutcome, StrategyError> {
            strategy.execute(&self.context()).await
        }
    }
}
