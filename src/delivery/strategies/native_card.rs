//! Article-style card assembled from generic layout primitives.

use async_trait::async_trait;

use super::{
    DeliveryContext, PriorityTier, Strategy, StrategyError, StrategyOutcome, click_link,
    confirm_rendered, neutral_name, pick_theme, staggered_click,
};
use crate::host::{ElementSpec, Style};

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeCard;

#[async_trait]
impl Strategy for NativeCard {
    fn name(&self) -> &'static str {
        "native_card"
    }

    fn tier(&self) -> PriorityTier {
        PriorityTier::Native
    }

    async fn execute(&self, ctx: &DeliveryContext<'_>) -> Result<StrategyOutcome, StrategyError> {
        let theme = pick_theme();
        let creative = &ctx.settings.creative;

        let card = ElementSpec::new("article")
            .with_class(neutral_name())
            .with_style(
                Style::default()
                    .with_background(theme.background)
                    .with_color(theme.foreground)
                    .with_property("border-radius", "8px")
                    .with_property("padding", "16px"),
            )
            .with_child(
                ElementSpec::new("header")
                    .with_class(neutral_name())
                    .with_text(creative.headline.as_str()),
            )
            .with_child(ElementSpec::new("p").with_text(creative.body.as_str()))
            .with_child(
                click_link(ctx, &creative.call_to_action)
                    .with_style(Style::default().with_color(theme.accent)),
            )
            .with_child(ElementSpec::new("small").with_text(creative.advertiser.as_str()))
            .with_click(staggered_click(ctx.settings, ctx.zone));

        let node = ctx.host.create_visual_element(ctx.container, &card)?;
        confirm_rendered(ctx, node)
    }
}
