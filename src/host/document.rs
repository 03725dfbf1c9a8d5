//! Seeds a [`SimulatedHost`] page from HTML markup.
//!
//! Useful for reproducing a real page (including the markup a blocker leaves
//! behind) before running detection against it.

use std::sync::Arc;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

use super::simulated::{BlockerProfile, SimulatedHost};
use super::{Display, ElementSpec, RenderHost, Style, Visibility};
use crate::external_deps::interpreters::ScriptRuntime;

static BODY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body").expect("static body selector"));

impl SimulatedHost {
    /// Build a host whose `<body>` mirrors the body of `html`.
    pub fn from_html(html: &str, profile: BlockerProfile) -> Self {
        let host = SimulatedHost::new(profile);
        populate(&host, html);
        host
    }

    pub fn from_html_with_runtime(
        html: &str,
        profile: BlockerProfile,
        runtime: Arc<dyn ScriptRuntime>,
    ) -> Self {
        let host = SimulatedHost::with_runtime(profile, runtime);
        populate(&host, html);
        host
    }
}

fn populate(host: &SimulatedHost, html: &str) {
    let document = Html::parse_document(html);
    let Some(body) = document.select(&BODY_SELECTOR).next() else {
        return;
    };

    for child in body.children().filter_map(ElementRef::wrap) {
        let spec = element_to_spec(child);
        if let Err(err) = host.create_visual_element(host.body(), &spec) {
            log::debug!("skipping <{}> while seeding page: {}", spec.tag, err);
        }
    }
}

fn element_to_spec(element: ElementRef<'_>) -> ElementSpec {
    let value = element.value();
    let mut spec = ElementSpec::new(value.name());

    if let Some(id) = value.id() {
        spec = spec.with_id(id);
    }
    for class in value.classes() {
        spec = spec.with_class(class);
    }
    if let Some(style) = value.attr("style") {
        spec = spec.with_style(parse_inline_style(style));
    }
    for (name, attr) in value.attrs() {
        if !matches!(name, "id" | "class" | "style") {
            spec = spec.with_attribute(name, attr);
        }
    }

    let text: Vec<&str> = element
        .children()
        .filter_map(|node| match node.value() {
            Node::Text(text) => Some(text.trim()),
            _ => None,
        })
        .filter(|text| !text.is_empty())
        .collect();
    if !text.is_empty() {
        spec = spec.with_text(text.join(" "));
    }

    spec.with_children(element.children().filter_map(ElementRef::wrap).map(element_to_spec))
}

fn parse_inline_style(style: &str) -> Style {
    let mut parsed = Style::default();
    for declaration in style.split(';') {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match property.trim().to_ascii_lowercase().as_str() {
            "display" if value == "none" => parsed.display = Display::None,
            "display" if value == "flex" => parsed.display = Display::Flex,
            "display" if value == "inline" => parsed.display = Display::Inline,
            "visibility" if value == "hidden" => parsed.visibility = Visibility::Hidden,
            "opacity" => parsed.opacity = value.parse().unwrap_or(1.0),
            "width" => parsed.width = parse_px(value),
            "height" => parsed.height = parse_px(value),
            "background" | "background-color" => parsed.background = Some(value.to_string()),
            "color" => parsed.color = Some(value.to_string()),
            other => parsed.extra.push((other.to_string(), value.to_string())),
        }
    }
    parsed
}

fn parse_px(value: &str) -> Option<f32> {
    value.trim_end_matches("px").trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirrors_body_markup() {
        let html = r#"
            <html><body>
                <div id="app" class="shell"><p>Catalogue</p></div>
                <div class="adblock-warning" style="display:none">Please disable</div>
            </body></html>
        "#;
        let host = SimulatedHost::from_html(html, BlockerProfile::none());
        let tokens = host.page_tokens().unwrap();
        assert!(tokens.iter().any(|token| token == "app"));
        assert!(tokens.iter().any(|token| token == "adblock-warning"));

        let children = host.children(host.body()).unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(host.measure(children[1]).unwrap().display, Display::None);
        assert_eq!(host.text_content(children[0]), "Catalogue");
    }
}
