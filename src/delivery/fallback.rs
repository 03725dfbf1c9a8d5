//! Terminal renderer used once every strategy has failed.
//!
//! Inline block with neutral names and a click-through; no requests, no
//! scripts, no shadow roots or frames. It needs nothing from the host
//! beyond creating plain elements.

use std::time::Duration;

use super::ZoneId;
use super::strategies::neutral_name;
use crate::config::DeliverySettings;
use crate::host::{
    ClickAction, ClickDispatch, ClickMethod, ElementSpec, NodeId, RenderHost, Style,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackRenderer;

impl FallbackRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Inserts the block into `container`. A host refusing even a plain
    /// element gets one bare-text retry before the failure is logged.
    pub fn render(
        &self,
        host: &dyn RenderHost,
        zone: &ZoneId,
        container: NodeId,
        settings: &DeliverySettings,
    ) -> Option<NodeId> {
        match host.create_visual_element(container, &Self::block(zone, settings)) {
            Ok(node) => Some(node),
            Err(err) => {
                log::warn!("fallback block rejected for zone {}: {}", zone, err);
                let bare = ElementSpec::new("div").with_text(settings.creative.headline.as_str());
                host.create_visual_element(container, &bare)
                    .map_err(|err| {
                        log::error!("fallback could not reach container {}: {}", container, err)
                    })
                    .ok()
            }
        }
    }

    fn block(zone: &ZoneId, settings: &DeliverySettings) -> ElementSpec {
        let creative = &settings.creative;
        let target = settings.click_url(zone.as_str());
        let click = ClickAction {
            target: target.clone(),
            dispatches: vec![
                ClickDispatch {
                    method: ClickMethod::Navigate,
                    delay: Duration::ZERO,
                },
                ClickDispatch {
                    method: ClickMethod::SyntheticAnchor,
                    delay: settings.click_stagger,
                },
            ],
        };

        ElementSpec::new("div")
            .with_class(neutral_name())
            .with_style(
                Style::default()
                    .with_property("border", "1px solid #d1d5db")
                    .with_property("padding", "8px"),
            )
            .with_child(ElementSpec::new("span").with_text(creative.headline.as_str()))
            .with_child(
                ElementSpec::new("a")
                    .with_attribute("href", target.as_str())
                    .with_text(creative.call_to_action.as_str()),
            )
            .with_click(click)
    }
}
