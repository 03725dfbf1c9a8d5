//! "Recommended for you" list with the creative as one of its entries.

use async_trait::async_trait;

use super::{
    DeliveryContext, PriorityTier, Strategy, StrategyError, StrategyOutcome, click_link,
    confirm_rendered, neutral_name, pick_theme, staggered_click,
};
use crate::host::{ElementSpec, Style};

#[derive(Debug, Default, Clone, Copy)]
pub struct RecommendationFeed;

#[async_trait]
impl Strategy for RecommendationFeed {
    fn name(&self) -> &'static str {
        "recommendation_feed"
    }

    fn tier(&self) -> PriorityTier {
        PriorityTier::Native
    }

    async fn execute(&self, ctx: &DeliveryContext<'_>) -> Result<StrategyOutcome, StrategyError> {
        let theme = pick_theme();
        let creative = &ctx.settings.creative;

        let entry = ElementSpec::new("li")
            .with_class(neutral_name())
            .with_child(click_link(ctx, &creative.headline))
            .with_child(
                ElementSpec::new("span")
                    .with_text(format!("{} · {}", creative.advertiser, creative.body)),
            )
            .with_click(staggered_click(ctx.settings, ctx.zone));

        let feed = ElementSpec::new("section")
            .with_class(neutral_name())
            .with_style(
                Style::default()
                    .with_background(theme.background)
                    .with_color(theme.foreground),
            )
            .with_child(ElementSpec::new("h3").with_text("Recommended for you"))
            .with_child(ElementSpec::new("ul").with_child(entry));

        let node = ctx.host.create_visual_element(ctx.container, &feed)?;
        confirm_rendered(ctx, node)
    }
}
