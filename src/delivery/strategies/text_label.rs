//! Last tier: a visible label plus a plain link.

use async_trait::async_trait;

use super::{
    DeliveryContext, PriorityTier, Strategy, StrategyError, StrategyOutcome, click_link,
    confirm_rendered, neutral_name,
};
use crate::host::{ElementSpec, Style};

#[derive(Debug, Default, Clone, Copy)]
pub struct TextLabel;

#[async_trait]
impl Strategy for TextLabel {
    fn name(&self) -> &'static str {
        "text_label"
    }

    fn tier(&self) -> PriorityTier {
        PriorityTier::Minimal
    }

    async fn execute(&self, ctx: &DeliveryContext<'_>) -> Result<StrategyOutcome, StrategyError> {
        let creative = &ctx.settings.creative;
        let block = ElementSpec::new("p")
            .with_class(neutral_name())
            .with_child(
                ElementSpec::new("small")
                    .with_style(Style::default().with_color("#6b7280"))
                    .with_text(creative.label.as_str()),
            )
            .with_child(click_link(
                ctx,
                &format!("{}: {}", creative.advertiser, creative.headline),
            ));

        let node = ctx.host.create_visual_element(ctx.container, &block)?;
        confirm_rendered(ctx, node)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;
    use crate::host::BlockerProfile;

    #[tokio::test]
    async fn shows_label_and_link() {
        let harness = Harness::new(BlockerProfile::aggressive());
        assert_eq!(harness.run(&TextLabel).await.unwrap(), StrategyOutcome::Rendered);
        let text = harness.host.text_content(harness.container);
        assert!(text.starts_with("Advertisement"));
    }
}
