//! Horizontal gradient strip in a randomly picked theme.

use async_trait::async_trait;

use super::{
    DeliveryContext, PriorityTier, Strategy, StrategyError, StrategyOutcome, confirm_rendered,
    neutral_name, pick_theme, staggered_click,
};
use crate::host::{Display, ElementSpec, Style};

#[derive(Debug, Default, Clone, Copy)]
pub struct ThemedBanner;

#[async_trait]
impl Strategy for ThemedBanner {
    fn name(&self) -> &'static str {
        "themed_banner"
    }

    fn tier(&self) -> PriorityTier {
        PriorityTier::Native
    }

    async fn execute(&self, ctx: &DeliveryContext<'_>) -> Result<StrategyOutcome, StrategyError> {
        let theme = pick_theme();
        let creative = &ctx.settings.creative;

        let strip = ElementSpec::new("div")
            .with_class(neutral_name())
            .with_style(
                Style {
                    display: Display::Flex,
                    ..Style::default()
                }
                .with_background(format!(
                    "linear-gradient(90deg, {}, {})",
                    theme.background, theme.accent
                ))
                .with_color(theme.foreground)
                .with_property("align-items", "center")
                .with_property("padding", "12px 20px"),
            )
            .with_child(ElementSpec::new("span").with_text(creative.headline.as_str()))
            .with_child(
                ElementSpec::new("span")
                    .with_class(neutral_name())
                    .with_style(
                        Style::default()
                            .with_background(theme.accent)
                            .with_property("margin-left", "auto")
                            .with_property("border-radius", "4px"),
                    )
                    .with_text(creative.call_to_action.as_str()),
            )
            .with_click(staggered_click(ctx.settings, ctx.zone));

        let node = ctx.host.create_visual_element(ctx.container, &strip)?;
        confirm_rendered(ctx, node)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;
    use crate::host::{BlockerProfile, RenderHost};

    #[tokio::test]
    async fn lays_copy_out_horizontally() {
        let harness = Harness::new(BlockerProfile::none());
        assert_eq!(harness.run(&ThemedBanner).await.unwrap(), StrategyOutcome::Rendered);
        let strip = harness.host.children(harness.container).unwrap()[0];
        let measurement = harness.host.measure(strip).unwrap();
        assert_eq!(measurement.height, 18.0);
    }
}
