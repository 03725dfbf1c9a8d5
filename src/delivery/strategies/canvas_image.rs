//! Creative drawn on an offscreen surface and embedded as a data-URI image.
//! Nothing is fetched, so request rules have nothing to cancel.

use async_trait::async_trait;

use super::{
    DeliveryContext, PriorityTier, Strategy, StrategyError, StrategyOutcome, confirm_rendered,
    neutral_name, pick_theme, staggered_click,
};
use crate::host::{ElementSpec, HostError, SurfaceSpec};

const SURFACE_WIDTH: u32 = 300;
const SURFACE_HEIGHT: u32 = 100;

#[derive(Debug, Default, Clone, Copy)]
pub struct CanvasImage;

#[async_trait]
impl Strategy for CanvasImage {
    fn name(&self) -> &'static str {
        "canvas_image"
    }

    fn tier(&self) -> PriorityTier {
        PriorityTier::Synthetic
    }

    async fn execute(&self, ctx: &DeliveryContext<'_>) -> Result<StrategyOutcome, StrategyError> {
        let theme = pick_theme();
        let creative = &ctx.settings.creative;
        let surface = SurfaceSpec {
            width: SURFACE_WIDTH,
            height: SURFACE_HEIGHT,
            background: theme.background.into(),
            foreground: theme.foreground.into(),
            lines: vec![creative.headline.clone(), creative.call_to_action.clone()],
        };

        let image_uri = match ctx.host.draw_surface(&surface) {
            Ok(uri) => uri,
            Err(HostError::Unsupported(feature)) => return Err(StrategyError::Unavailable(feature)),
            Err(err) => return Err(err.into()),
        };

        let image = ElementSpec::new("img")
            .with_class(neutral_name())
            .with_attribute("src", image_uri)
            .with_attribute("alt", creative.headline.as_str())
            .with_attribute("width", SURFACE_WIDTH.to_string())
            .with_attribute("height", SURFACE_HEIGHT.to_string())
            .with_click(staggered_click(ctx.settings, ctx.zone));

        let node = ctx.host.create_visual_element(ctx.container, &image)?;
        confirm_rendered(ctx, node)
    }
}
