//! Host capability interface.
//!
//! Probes and strategies never talk to a rendering environment directly. They
//! go through [`RenderHost`] for element creation, measurement and script
//! injection, and through [`ProbeTransport`] for reachability checks. The
//! crate ships an in-memory [`SimulatedHost`] (both traits) and a
//! reqwest-backed [`ReqwestProbeTransport`].

pub mod document;
pub mod simulated;
pub mod transport;

pub use simulated::{
    BlockerProfile, CosmeticAction, CosmeticRule, ElementSnapshot, Navigation, SimulatedHost,
};
pub use transport::ReqwestProbeTransport;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use thiserror::Error;
use url::Url;

/// Opaque handle to an element owned by a [`RenderHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Display {
    #[default]
    Block,
    Inline,
    Flex,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
}

/// Inline style applied to a created element.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub display: Display,
    pub visibility: Visibility,
    pub opacity: f32,
    pub position: Position,
    pub left: f32,
    pub top: f32,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub background: Option<String>,
    pub color: Option<String>,
    pub extra: Vec<(String, String)>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            display: Display::Block,
            visibility: Visibility::Visible,
            opacity: 1.0,
            position: Position::Static,
            left: 0.0,
            top: 0.0,
            width: None,
            height: None,
            background: None,
            color: None,
            extra: Vec::new(),
        }
    }
}

impl Style {
    pub fn sized(width: f32, height: f32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    pub fn with_background(mut self, value: impl Into<String>) -> Self {
        self.background = Some(value.into());
        self
    }

    pub fn with_color(mut self, value: impl Into<String>) -> Self {
        self.color = Some(value.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((name.into(), value.into()));
        self
    }
}

/// Shadow root attached to an element; its children live inside the root.
/// Filters and page inspection see through `Open` roots but not `Closed` ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowMode {
    Open,
    Closed,
}

/// Mechanisms used to turn a click into a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClickMethod {
    /// Assign the top-level location.
    Navigate,
    /// Create a detached anchor and dispatch a synthetic click on it.
    SyntheticAnchor,
    /// Open the target in a new window.
    OpenWindow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClickDispatch {
    pub method: ClickMethod,
    pub delay: Duration,
}

/// Click-through handler: every dispatch is attempted, staggered by its delay.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickAction {
    pub target: Url,
    pub dispatches: Vec<ClickDispatch>,
}

/// Declarative description of an element tree to create.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSpec {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub style: Style,
    pub text: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<ElementSpec>,
    pub shadow: Option<ShadowMode>,
    pub click: Option<ClickAction>,
}

impl ElementSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            classes: Vec::new(),
            style: Style::default(),
            text: None,
            attributes: BTreeMap::new(),
            children: Vec::new(),
            shadow: None,
            click: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = ElementSpec>,
    {
        self.children.extend(children);
        self
    }

    pub fn with_shadow(mut self, mode: ShadowMode) -> Self {
        self.shadow = Some(mode);
        self
    }

    pub fn with_click(mut self, action: ClickAction) -> Self {
        self.click = Some(action);
        self
    }
}

/// Offset past which an element counts as pushed out of the page.
pub const OFFSCREEN_THRESHOLD_PX: f32 = 5_000.0;

/// Rendered geometry and effective styling of an element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub width: f32,
    pub height: f32,
    pub display: Display,
    pub visibility: Visibility,
    pub opacity: f32,
    pub left: f32,
    pub top: f32,
    pub attached: bool,
}

impl Measurement {
    /// True when the element occupies visible, non-empty space in the page.
    pub fn is_rendered(&self) -> bool {
        self.is_rendered_within(OFFSCREEN_THRESHOLD_PX)
    }

    /// Like [`Self::is_rendered`], with a caller-chosen off-screen threshold.
    pub fn is_rendered_within(&self, offscreen_threshold: f32) -> bool {
        self.attached
            && self.display != Display::None
            && self.visibility == Visibility::Visible
            && self.opacity > 0.0
            && self.width > 0.0
            && self.height > 0.0
            && !self.is_offscreen(offscreen_threshold)
    }

    pub fn is_offscreen(&self, threshold: f32) -> bool {
        self.left.abs() > threshold || self.top.abs() > threshold
    }
}

/// Browser environment hints exposed by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostInfo {
    pub user_agent: String,
    pub brands: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptSource {
    /// Script body delivered as a `data:` URI, no network round trip.
    DataUri(String),
    Remote(Url),
}

impl ScriptSource {
    pub fn inline(body: &str) -> Self {
        ScriptSource::DataUri(format!("data:text/javascript;charset=utf-8,{body}"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptInjection {
    pub parent: NodeId,
    pub source: ScriptSource,
    pub attributes: BTreeMap<String, String>,
}

impl ScriptInjection {
    pub fn new(parent: NodeId, source: ScriptSource) -> Self {
        Self {
            parent,
            source,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Offscreen drawing request; the host rasterizes it and returns a data URI.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSpec {
    pub width: u32,
    pub height: u32,
    pub background: String,
    pub foreground: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("node {0} is detached from the document")]
    Detached(NodeId),
    #[error("script load failed: {0}")]
    ScriptBlocked(String),
    #[error("capability unavailable: {0}")]
    Unsupported(&'static str),
    #[error("host failure: {0}")]
    Other(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Rendering capabilities required by probes and strategies.
#[async_trait]
pub trait RenderHost: Send + Sync {
    fn body(&self) -> NodeId;

    fn head(&self) -> NodeId;

    /// Build the element tree described by `spec` and attach it under `parent`.
    fn create_visual_element(&self, parent: NodeId, spec: &ElementSpec) -> HostResult<NodeId>;

    fn measure(&self, node: NodeId) -> HostResult<Measurement>;

    fn remove(&self, node: NodeId) -> HostResult<()>;

    /// Children still present in the rendering tree.
    fn children(&self, node: NodeId) -> HostResult<Vec<NodeId>>;

    fn clear_children(&self, node: NodeId) -> HostResult<()>;

    /// Class and id tokens of elements visible to outside inspection.
    fn page_tokens(&self) -> HostResult<Vec<String>>;

    fn environment(&self) -> HostInfo;

    /// Insert a script element; resolves once its load or error callback fires.
    async fn inject_script(&self, injection: ScriptInjection) -> HostResult<()>;

    fn read_marker(&self, key: &str) -> Option<String>;

    fn draw_surface(&self, surface: &SurfaceSpec) -> HostResult<String>;
}

/// Minimal response returned by a reachability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: StatusCode,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request blocked: {0}")]
    Blocked(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("http transport error: {0}")]
    Transport(String),
}

/// Network capability used to check whether an endpoint is reachable.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    async fn issue_probe_request(&self, url: &Url) -> Result<ProbeResponse, TransportError>;
}
