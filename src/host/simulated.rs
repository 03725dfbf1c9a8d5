//! In-memory rendering host.
//!
//! `SimulatedHost` keeps an element arena and applies a [`BlockerProfile`]
//! lazily whenever something is measured or inspected, the way a content
//! blocker's cosmetic filters and request rules would act on a live page.
//! It implements both [`RenderHost`] and [`ProbeTransport`], so detection and
//! delivery can be exercised end to end without a browser.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use http::StatusCode;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use url::Url;

use super::{
    ClickAction, ClickMethod, Display, ElementSpec, HostError, HostInfo, HostResult, Measurement,
    NodeId, ProbeResponse, ProbeTransport, RenderHost, ScriptInjection, ScriptSource, ShadowMode,
    Style, SurfaceSpec, TransportError, Visibility,
};
use crate::external_deps::interpreters::{BoaScriptRuntime, ScriptRuntime};

const DISPLACED_OFFSET: f32 = -99_999.0;
const TEXT_CHAR_WIDTH: f32 = 7.0;
const TEXT_LINE_HEIGHT: f32 = 18.0;

const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// How a cosmetic filter neutralises a matching element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CosmeticAction {
    /// `display: none`
    Hide,
    /// Zero width and height.
    Collapse,
    /// Detached from the rendering tree.
    Remove,
    /// `opacity: 0`
    Transparent,
    /// Pushed far off-screen.
    Displace,
}

/// Element-hiding rule matched against class and id tokens.
#[derive(Debug, Clone)]
pub struct CosmeticRule {
    pub pattern: Regex,
    pub action: CosmeticAction,
}

impl CosmeticRule {
    pub fn new(pattern: &str, action: CosmeticAction) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self { pattern, action })
    }

    fn matches(&self, tokens: impl Iterator<Item = impl AsRef<str>>) -> bool {
        tokens.into_iter().any(|token| self.pattern.is_match(token.as_ref()))
    }
}

/// Behaviour of the simulated content blocker.
#[derive(Debug, Clone)]
pub struct BlockerProfile {
    pub cosmetic_rules: Vec<CosmeticRule>,
    pub blocked_hosts: Vec<String>,
    pub blocked_url_patterns: Vec<Regex>,
    pub block_inline_scripts: bool,
    pub collapse_frames: bool,
    pub suppressed_click_methods: Vec<ClickMethod>,
    pub canvas_available: bool,
    pub shadow_dom_supported: bool,
    /// Ids of elements the blocker itself leaves in the page.
    pub footprint_ids: Vec<String>,
    pub user_agent: String,
    pub brands: Vec<String>,
}

const AD_TOKEN_PATTERN: &str =
    r"^(ad|ads|adsbox|adbanner|textads|banner[-_]?ads?|pub_\d+x\d+|sponsor(ed)?[-_].*)$|(^|[-_])(ad|ads|advert\w*)([-_]|$)";

static AD_URL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"[/_.\-]ads?[/_.\-?=]",
        r"adsbygoogle",
        r"pagead",
        r"[?&]zoneid=",
        r"/banners?/",
    ]
    .iter()
    .map(|pattern| build_regex(pattern))
    .collect()
});

const AD_HOSTS: &[&str] = &[
    "doubleclick.net",
    "googlesyndication.com",
    "google-analytics.com",
    "googletagservices.com",
    "ads-twitter.com",
    "adservice.google.com",
    "adnet.example",
];

impl BlockerProfile {
    /// No blocker installed.
    pub fn none() -> Self {
        Self {
            cosmetic_rules: Vec::new(),
            blocked_hosts: Vec::new(),
            blocked_url_patterns: Vec::new(),
            block_inline_scripts: false,
            collapse_frames: false,
            suppressed_click_methods: Vec::new(),
            canvas_available: true,
            shadow_dom_supported: true,
            footprint_ids: Vec::new(),
            user_agent: CHROME_UA.into(),
            brands: vec!["Google Chrome".into(), "Chromium".into()],
        }
    }

    /// A list-based blocker with default filter lists.
    pub fn typical() -> Self {
        Self {
            cosmetic_rules: vec![CosmeticRule {
                pattern: build_regex(AD_TOKEN_PATTERN),
                action: CosmeticAction::Hide,
            }],
            blocked_hosts: AD_HOSTS.iter().map(|host| host.to_string()).collect(),
            blocked_url_patterns: AD_URL_PATTERNS.clone(),
            ..Self::none()
        }
    }

    /// A hardened setup: element removal, no inline scripts, collapsed frames,
    /// popup blocking and a visible blocker footprint.
    pub fn aggressive() -> Self {
        let mut profile = Self::typical();
        profile.cosmetic_rules = vec![CosmeticRule {
            pattern: build_regex(AD_TOKEN_PATTERN),
            action: CosmeticAction::Remove,
        }];
        profile.block_inline_scripts = true;
        profile.collapse_frames = true;
        profile.suppressed_click_methods = vec![ClickMethod::OpenWindow];
        profile.footprint_ids = vec!["ublock-origin-element-picker".into()];
        profile
    }

    pub fn with_rule(mut self, rule: CosmeticRule) -> Self {
        self.cosmetic_rules.push(rule);
        self
    }

    pub fn with_blocked_host(mut self, host: impl Into<String>) -> Self {
        self.blocked_hosts.push(host.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brands.push(brand.into());
        self
    }

    /// Whether a request to `url` would be cancelled by the blocker.
    pub fn blocks_url(&self, url: &Url) -> bool {
        let host_blocked = url.host_str().is_some_and(|host| {
            let host = host.to_ascii_lowercase();
            self.blocked_hosts
                .iter()
                .any(|blocked| host == *blocked || host.ends_with(&format!(".{blocked}")))
        });
        host_blocked
            || self
                .blocked_url_patterns
                .iter()
                .any(|pattern| pattern.is_match(url.as_str()))
    }
}

impl Default for BlockerProfile {
    fn default() -> Self {
        Self::none()
    }
}

/// Read-only copy of an element, for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSnapshot {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub text: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub shadow: Option<ShadowMode>,
    pub has_click_action: bool,
}

/// Navigation that survived click interference.
#[derive(Debug, Clone, PartialEq)]
pub struct Navigation {
    pub method: ClickMethod,
    pub url: Url,
}

#[derive(Debug)]
struct SimNode {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    style: Style,
    text: Option<String>,
    attributes: BTreeMap<String, String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    shadow: Option<ShadowMode>,
    click: Option<ClickAction>,
}

impl SimNode {
    fn from_spec(spec: &ElementSpec, parent: Option<NodeId>) -> Self {
        Self {
            tag: spec.tag.to_ascii_lowercase(),
            id: spec.id.clone(),
            classes: spec.classes.clone(),
            style: spec.style.clone(),
            text: spec.text.clone(),
            attributes: spec.attributes.clone(),
            children: Vec::new(),
            parent,
            shadow: spec.shadow,
            click: spec.click.clone(),
        }
    }

    fn tokens(&self) -> impl Iterator<Item = &str> {
        self.id.iter().map(String::as_str).chain(self.classes.iter().map(String::as_str))
    }
}

#[derive(Debug, Default)]
struct Arena {
    nodes: HashMap<NodeId, SimNode>,
    next_id: u64,
    markers: HashMap<String, String>,
    requests: Vec<Url>,
    navigations: Vec<Navigation>,
}

impl Arena {
    fn allocate(&mut self) -> NodeId {
        self.next_id += 1;
        NodeId::new(self.next_id)
    }

    fn node(&self, id: NodeId) -> HostResult<&SimNode> {
        self.nodes.get(&id).ok_or(HostError::UnknownNode(id))
    }

    fn insert(&mut self, parent: NodeId, spec: &ElementSpec) -> NodeId {
        let id = self.allocate();
        self.nodes.insert(id, SimNode::from_spec(spec, Some(parent)));
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(id);
        }
        for child in &spec.children {
            self.insert(id, child);
        }
        id
    }

    fn delete_subtree(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.remove(&id) {
            for child in node.children {
                self.delete_subtree(child);
            }
        }
    }

    /// Self first, document root last.
    fn chain(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.nodes.get(&current).and_then(|node| node.parent) {
            chain.push(parent);
            current = parent;
        }
        chain
    }
}

/// Simulated page plus blocker; see the module docs.
pub struct SimulatedHost {
    profile: BlockerProfile,
    runtime: Arc<dyn ScriptRuntime>,
    state: Mutex<Arena>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
}

impl SimulatedHost {
    pub fn new(profile: BlockerProfile) -> Self {
        Self::with_runtime(profile, Arc::new(BoaScriptRuntime::new()))
    }

    pub fn with_runtime(profile: BlockerProfile, runtime: Arc<dyn ScriptRuntime>) -> Self {
        let mut arena = Arena::default();
        let root = arena.allocate();
        arena.nodes.insert(root, SimNode::from_spec(&ElementSpec::new("html"), None));
        let head = arena.insert(root, &ElementSpec::new("head"));
        let body = arena.insert(
            root,
            &ElementSpec::new("body").with_style(Style {
                width: Some(1280.0),
                ..Style::default()
            }),
        );

        for footprint in &profile.footprint_ids {
            arena.insert(
                body,
                &ElementSpec::new("div")
                    .with_id(footprint.clone())
                    .with_style(Style::sized(0.0, 0.0)),
            );
        }

        Self {
            profile,
            runtime,
            state: Mutex::new(arena),
            root,
            head,
            body,
        }
    }

    pub fn profile(&self) -> &BlockerProfile {
        &self.profile
    }

    fn lock(&self) -> HostResult<MutexGuard<'_, Arena>> {
        self.state
            .lock()
            .map_err(|_| HostError::Other("simulated host state poisoned".into()))
    }

    /// Copy of an element's declared attributes.
    pub fn snapshot(&self, node: NodeId) -> Option<ElementSnapshot> {
        let arena = self.lock().ok()?;
        let node = arena.nodes.get(&node)?;
        Some(ElementSnapshot {
            tag: node.tag.clone(),
            id: node.id.clone(),
            classes: node.classes.clone(),
            text: node.text.clone(),
            attributes: node.attributes.clone(),
            shadow: node.shadow,
            has_click_action: node.click.is_some(),
        })
    }

    /// First element whose id is `id`, in document order.
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        let arena = self.lock().ok()?;
        let mut pending = vec![self.root];
        while let Some(current) = pending.pop() {
            let Some(node) = arena.nodes.get(&current) else {
                continue;
            };
            if node.id.as_deref() == Some(id) {
                return Some(current);
            }
            pending.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// All text in the subtree, including shadow content, in document order.
    pub fn text_content(&self, node: NodeId) -> String {
        let Ok(arena) = self.lock() else {
            return String::new();
        };
        let mut parts = Vec::new();
        collect_text(&arena, node, &mut parts);
        parts.join(" ")
    }

    /// Every URL the page tried to fetch, in order.
    pub fn requests(&self) -> Vec<Url> {
        self.lock().map(|arena| arena.requests.clone()).unwrap_or_default()
    }

    pub fn navigations(&self) -> Vec<Navigation> {
        self.lock().map(|arena| arena.navigations.clone()).unwrap_or_default()
    }

    /// Simulate a user click; returns the navigation that got through, if any.
    pub fn click(&self, node: NodeId) -> Option<Url> {
        if !self.measure(node).ok()?.is_rendered() {
            return None;
        }

        let mut arena = self.lock().ok()?;
        let action = arena
            .chain(node)
            .into_iter()
            .find_map(|id| arena.nodes.get(&id).and_then(|n| n.click.clone()))?;

        let mut dispatches = action.dispatches.clone();
        dispatches.sort_by_key(|dispatch| dispatch.delay);

        let survivor = dispatches.into_iter().find(|dispatch| {
            !self.profile.suppressed_click_methods.contains(&dispatch.method)
                && !self.profile.blocks_url(&action.target)
        })?;

        arena.navigations.push(Navigation {
            method: survivor.method,
            url: action.target.clone(),
        });
        Some(action.target)
    }

    /// Hangs off the document root with no removed element on the way up.
    fn is_attached(&self, arena: &Arena, id: NodeId) -> bool {
        let chain = arena.chain(id);
        chain.last() == Some(&self.root)
            && !chain
                .iter()
                .any(|member| self.action_for(arena, *member) == Some(CosmeticAction::Remove))
    }

    /// Cosmetic effect applied to `id`, honouring closed shadow boundaries.
    fn action_for(&self, arena: &Arena, id: NodeId) -> Option<CosmeticAction> {
        let chain = arena.chain(id);
        let mut closed_seen = false;
        let mut effect = None;

        for ancestor in chain.iter().rev() {
            let Some(node) = arena.nodes.get(ancestor) else {
                continue;
            };
            if *ancestor == id && !closed_seen {
                if self.profile.collapse_frames && node.tag == "iframe" {
                    effect = Some(CosmeticAction::Collapse);
                }
                if let Some(rule) = self
                    .profile
                    .cosmetic_rules
                    .iter()
                    .find(|rule| rule.matches(node.tokens()))
                {
                    effect = Some(rule.action);
                }
            }
            if node.shadow == Some(ShadowMode::Closed) {
                closed_seen = true;
            }
        }

        effect
    }

    fn measure_locked(&self, arena: &Arena, id: NodeId) -> HostResult<Measurement> {
        let node = arena.node(id)?;
        let chain = arena.chain(id);
        let attached = self.is_attached(arena, id);

        let actions: Vec<Option<CosmeticAction>> =
            chain.iter().map(|member| self.action_for(arena, *member)).collect();
        let own_action = actions.first().copied().flatten();

        let mut ancestor_hidden = false;
        let mut visibility = node.style.visibility;
        let mut opacity = 1.0_f32;
        let mut displaced = false;

        for (member, action) in chain.iter().zip(actions.iter()) {
            let Some(member_node) = arena.nodes.get(member) else {
                continue;
            };
            if *member != id
                && (member_node.style.display == Display::None
                    || matches!(action, Some(CosmeticAction::Hide | CosmeticAction::Collapse)))
            {
                ancestor_hidden = true;
            }
            if member_node.style.visibility == Visibility::Hidden {
                visibility = Visibility::Hidden;
            }
            opacity *= member_node.style.opacity;
            match action {
                Some(CosmeticAction::Transparent) => opacity = 0.0,
                Some(CosmeticAction::Displace) => displaced = true,
                _ => {}
            }
        }

        let display = if own_action == Some(CosmeticAction::Hide) {
            Display::None
        } else {
            node.style.display
        };

        let collapsed = own_action == Some(CosmeticAction::Collapse);
        let (width, height) = if !attached || ancestor_hidden || collapsed || display == Display::None
        {
            (0.0, 0.0)
        } else {
            self.intrinsic_size(arena, id)
        };

        let (left, top) = if displaced {
            (DISPLACED_OFFSET, DISPLACED_OFFSET)
        } else {
            (node.style.left, node.style.top)
        };

        Ok(Measurement {
            width,
            height,
            display,
            visibility,
            opacity,
            left,
            top,
            attached,
        })
    }

    fn intrinsic_size(&self, arena: &Arena, id: NodeId) -> (f32, f32) {
        let Some(node) = arena.nodes.get(&id) else {
            return (0.0, 0.0);
        };
        if node.tag == "script" {
            return (0.0, 0.0);
        }

        let mut width = 0.0_f32;
        let mut height = 0.0_f32;

        if let Some(text) = node.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            width = text.chars().count() as f32 * TEXT_CHAR_WIDTH;
            height = TEXT_LINE_HEIGHT;
        }

        let horizontal = node.style.display == Display::Flex;
        for child in &node.children {
            let Some(child_node) = arena.nodes.get(child) else {
                continue;
            };
            if child_node.style.display == Display::None
                || matches!(
                    self.action_for(arena, *child),
                    Some(CosmeticAction::Hide | CosmeticAction::Collapse | CosmeticAction::Remove)
                )
            {
                continue;
            }
            let (child_width, child_height) = self.intrinsic_size(arena, *child);
            if horizontal {
                width += child_width;
                height = height.max(child_height);
            } else {
                width = width.max(child_width);
                height += child_height;
            }
        }

        if node.tag == "img" || node.tag == "iframe" {
            width = width.max(attribute_px(node, "width"));
            height = height.max(attribute_px(node, "height"));
        }

        (
            node.style.width.unwrap_or(width),
            node.style.height.unwrap_or(height),
        )
    }

    fn collect_tokens(&self, arena: &Arena, id: NodeId, tokens: &mut Vec<String>) {
        let Some(node) = arena.nodes.get(&id) else {
            return;
        };
        if self.action_for(arena, id) == Some(CosmeticAction::Remove) {
            return;
        }
        tokens.extend(node.tokens().map(str::to_string));
        if node.shadow == Some(ShadowMode::Closed) {
            return;
        }
        for child in &node.children {
            self.collect_tokens(arena, *child, tokens);
        }
    }

    fn record_request(&self, url: &Url) -> HostResult<()> {
        self.lock()?.requests.push(url.clone());
        Ok(())
    }
}

fn attribute_px(node: &SimNode, name: &str) -> f32 {
    node.attributes
        .get(name)
        .and_then(|value| value.trim_end_matches("px").parse::<f32>().ok())
        .unwrap_or(0.0)
}

fn collect_text(arena: &Arena, id: NodeId, parts: &mut Vec<String>) {
    let Some(node) = arena.nodes.get(&id) else {
        return;
    };
    if let Some(text) = node.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        parts.push(text.to_string());
    }
    for child in &node.children {
        collect_text(arena, *child, parts);
    }
}

fn build_regex(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|err| panic!("invalid blocker regex `{}`: {}", pattern, err))
}

fn encode_svg(svg: &str) -> String {
    svg.replace('%', "%25")
        .replace('#', "%23")
        .replace('<', "%3C")
        .replace('>', "%3E")
        .replace('"', "'")
}

#[async_trait]
impl RenderHost for SimulatedHost {
    fn body(&self) -> NodeId {
        self.body
    }

    fn head(&self) -> NodeId {
        self.head
    }

    fn create_visual_element(&self, parent: NodeId, spec: &ElementSpec) -> HostResult<NodeId> {
        if spec.shadow.is_some() && !self.profile.shadow_dom_supported {
            return Err(HostError::Unsupported("shadow root"));
        }
        let mut arena = self.lock()?;
        arena.node(parent)?;
        if !self.is_attached(&arena, parent) {
            return Err(HostError::Detached(parent));
        }
        Ok(arena.insert(parent, spec))
    }

    fn measure(&self, node: NodeId) -> HostResult<Measurement> {
        let arena = self.lock()?;
        self.measure_locked(&arena, node)
    }

    fn remove(&self, node: NodeId) -> HostResult<()> {
        let mut arena = self.lock()?;
        let parent = arena.node(node)?.parent;
        if let Some(parent) = parent
            && let Some(parent_node) = arena.nodes.get_mut(&parent)
        {
            parent_node.children.retain(|child| *child != node);
        }
        arena.delete_subtree(node);
        Ok(())
    }

    fn children(&self, node: NodeId) -> HostResult<Vec<NodeId>> {
        let arena = self.lock()?;
        let children = arena.node(node)?.children.clone();
        Ok(children
            .into_iter()
            .filter(|child| self.action_for(&arena, *child) != Some(CosmeticAction::Remove))
            .collect())
    }

    fn clear_children(&self, node: NodeId) -> HostResult<()> {
        let mut arena = self.lock()?;
        let parent = arena.nodes.get_mut(&node).ok_or(HostError::UnknownNode(node))?;
        let children = std::mem::take(&mut parent.children);
        for child in children {
            arena.delete_subtree(child);
        }
        Ok(())
    }

    fn page_tokens(&self) -> HostResult<Vec<String>> {
        let arena = self.lock()?;
        let mut tokens = Vec::new();
        self.collect_tokens(&arena, self.root, &mut tokens);
        Ok(tokens)
    }

    fn environment(&self) -> HostInfo {
        HostInfo {
            user_agent: self.profile.user_agent.clone(),
            brands: self.profile.brands.clone(),
        }
    }

    async fn inject_script(&self, injection: ScriptInjection) -> HostResult<()> {
        tokio::task::yield_now().await;

        let src = match &injection.source {
            ScriptSource::Remote(url) => {
                self.record_request(url)?;
                if self.profile.blocks_url(url) {
                    return Err(HostError::ScriptBlocked(url.to_string()));
                }
                url.to_string()
            }
            ScriptSource::DataUri(uri) => {
                if self.profile.block_inline_scripts {
                    return Err(HostError::ScriptBlocked("inline data uri".into()));
                }
                let body = uri.split_once(',').map(|(_, body)| body).unwrap_or_default();
                let globals = self
                    .runtime
                    .run(body)
                    .map_err(|err| HostError::ScriptBlocked(err.to_string()))?;
                self.lock()?.markers.extend(globals);
                "data:".to_string()
            }
        };

        let mut spec = ElementSpec::new("script").with_attribute("src", src);
        for (name, value) in &injection.attributes {
            spec = spec.with_attribute(name.clone(), value.clone());
        }

        let mut arena = self.lock()?;
        arena.node(injection.parent)?;
        arena.insert(injection.parent, &spec);
        Ok(())
    }

    fn read_marker(&self, key: &str) -> Option<String> {
        self.lock().ok()?.markers.get(key).cloned()
    }

    fn draw_surface(&self, surface: &SurfaceSpec) -> HostResult<String> {
        if !self.profile.canvas_available {
            return Err(HostError::Unsupported("offscreen canvas"));
        }

        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}"><rect width="100%" height="100%" fill="{bg}"/>"#,
            w = surface.width,
            h = surface.height,
            bg = html_escape::encode_double_quoted_attribute(&surface.background),
        );
        for (index, line) in surface.lines.iter().enumerate() {
            svg.push_str(&format!(
                r#"<text x="16" y="{y}" fill="{fg}" font-family="sans-serif" font-size="16">{text}</text>"#,
                y = 28 + index * 24,
                fg = html_escape::encode_double_quoted_attribute(&surface.foreground),
                text = html_escape::encode_text(line),
            ));
        }
        svg.push_str("</svg>");

        Ok(format!("data:image/svg+xml;charset=utf-8,{}", encode_svg(&svg)))
    }
}

#[async_trait]
impl ProbeTransport for SimulatedHost {
    async fn issue_probe_request(&self, url: &Url) -> Result<ProbeResponse, TransportError> {
        tokio::task::yield_now().await;
        self.record_request(url)
            .map_err(|err| TransportError::Transport(err.to_string()))?;

        if self.profile.blocks_url(url) {
            return Err(TransportError::Blocked(url.to_string()));
        }
        Ok(ProbeResponse {
            status: StatusCode::OK,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ClickDispatch, Position};

    fn bait() -> ElementSpec {
        ElementSpec::new("div")
            .with_class("adsbox")
            .with_style(Style {
                position: Position::Absolute,
                left: -50.0,
                ..Style::sized(10.0, 10.0)
            })
    }

    #[test]
    fn typical_profile_hides_ad_named_elements() {
        let host = SimulatedHost::new(BlockerProfile::typical());
        let node = host.create_visual_element(host.body(), &bait()).unwrap();
        let measurement = host.measure(node).unwrap();
        assert_eq!(measurement.display, Display::None);
        assert_eq!(measurement.width, 0.0);
    }

    #[test]
    fn neutral_names_are_untouched() {
        let host = SimulatedHost::new(BlockerProfile::aggressive());
        let spec = ElementSpec::new("div")
            .with_class("tile-40213")
            .with_text("Hello there");
        let node = host.create_visual_element(host.body(), &spec).unwrap();
        assert!(host.measure(node).unwrap().is_rendered());
    }

    #[test]
    fn aggressive_profile_removes_elements() {
        let host = SimulatedHost::new(BlockerProfile::aggressive());
        let node = host.create_visual_element(host.body(), &bait()).unwrap();
        assert!(!host.measure(node).unwrap().attached);
        assert!(!host.children(host.body()).unwrap().contains(&node));
    }

    #[test]
    fn closed_shadow_content_escapes_cosmetic_rules() {
        let host = SimulatedHost::new(BlockerProfile::typical());
        let spec = ElementSpec::new("div")
            .with_class("panel-22817")
            .with_shadow(ShadowMode::Closed)
            .with_child(ElementSpec::new("div").with_class("ad-banner").with_text("Visible anyway"));
        let node = host.create_visual_element(host.body(), &spec).unwrap();
        assert!(host.measure(node).unwrap().is_rendered());
        assert!(!host.page_tokens().unwrap().iter().any(|token| token == "ad-banner"));
    }

    #[test]
    fn open_shadow_content_stays_filterable() {
        let host = SimulatedHost::new(BlockerProfile::typical());
        let spec = ElementSpec::new("div")
            .with_class("panel-22817")
            .with_shadow(ShadowMode::Open)
            .with_child(ElementSpec::new("div").with_class("ad-banner").with_text("Filtered"));
        let node = host.create_visual_element(host.body(), &spec).unwrap();
        let inner = host.children(node).unwrap()[0];
        assert!(!host.measure(inner).unwrap().is_rendered());
        assert!(host.page_tokens().unwrap().iter().any(|token| token == "ad-banner"));
    }

    #[test]
    fn removed_parent_rejects_new_children() {
        let host = SimulatedHost::new(BlockerProfile::aggressive());
        let removed = host.create_visual_element(host.body(), &bait()).unwrap();
        let result = host.create_visual_element(removed, &ElementSpec::new("span").with_text("late"));
        assert!(matches!(result, Err(HostError::Detached(node)) if node == removed));
    }

    #[test]
    fn blocks_requests_to_listed_hosts() {
        let profile = BlockerProfile::typical();
        assert!(profile.blocks_url(&Url::parse("https://pagead2.googlesyndication.com/x.js").unwrap()));
        assert!(profile.blocks_url(&Url::parse("https://cdn.example.com/ads/loader.js").unwrap()));
        assert!(!profile.blocks_url(&Url::parse("https://cdn.example.com/lib/app.js").unwrap()));
    }

    #[tokio::test]
    async fn inline_scripts_write_markers() {
        let host = SimulatedHost::new(BlockerProfile::none());
        host.inject_script(ScriptInjection::new(
            host.head(),
            ScriptSource::inline(r#"window["__mark"] = "1";"#),
        ))
        .await
        .unwrap();
        assert_eq!(host.read_marker("__mark").as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn aggressive_profile_blocks_inline_scripts() {
        let host = SimulatedHost::new(BlockerProfile::aggressive());
        let result = host
            .inject_script(ScriptInjection::new(
                host.head(),
                ScriptSource::inline(r#"window["__mark"] = "1";"#),
            ))
            .await;
        assert!(matches!(result, Err(HostError::ScriptBlocked(_))));
        assert!(host.read_marker("__mark").is_none());
    }

    #[test]
    fn popup_suppression_falls_through_to_next_dispatch() {
        let host = SimulatedHost::new(BlockerProfile::aggressive());
        let target = Url::parse("https://landing.example.org/offer").unwrap();
        let action = ClickAction {
            target: target.clone(),
            dispatches: vec![
                ClickDispatch {
                    method: ClickMethod::OpenWindow,
                    delay: std::time::Duration::ZERO,
                },
                ClickDispatch {
                    method: ClickMethod::SyntheticAnchor,
                    delay: std::time::Duration::from_millis(150),
                },
            ],
        };
        let node = host
            .create_visual_element(
                host.body(),
                &ElementSpec::new("div").with_text("Open offer").with_click(action),
            )
            .unwrap();

        assert_eq!(host.click(node), Some(target));
        assert_eq!(host.navigations()[0].method, ClickMethod::SyntheticAnchor);
    }
}
