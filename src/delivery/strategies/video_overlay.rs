//! Overlay dressed as native media-player chrome: play glyph, progress bar
//! and a skip countdown.

use async_trait::async_trait;

use super::{
    DeliveryContext, PriorityTier, Strategy, StrategyError, StrategyOutcome, confirm_rendered,
    neutral_name, pick_theme, staggered_click,
};
use crate::host::{Display, ElementSpec, Position, Style};

const PLAYER_WIDTH: f32 = 320.0;
const PLAYER_HEIGHT: f32 = 180.0;
const SKIP_AFTER_SECS: u32 = 5;

#[derive(Debug, Default, Clone, Copy)]
pub struct VideoOverlay;

#[async_trait]
impl Strategy for VideoOverlay {
    fn name(&self) -> &'static str {
        "video_overlay"
    }

    fn tier(&self) -> PriorityTier {
        PriorityTier::Synthetic
    }

    async fn execute(&self, ctx: &DeliveryContext<'_>) -> Result<StrategyOutcome, StrategyError> {
        let theme = pick_theme();
        let creative = &ctx.settings.creative;

        let controls = ElementSpec::new("div")
            .with_class(neutral_name())
            .with_style(Style {
                display: Display::Flex,
                ..Style::default()
            })
            .with_child(ElementSpec::new("span").with_text("\u{25b6}"))
            .with_child(ElementSpec::new("div").with_style(
                Style::sized(PLAYER_WIDTH - 120.0, 4.0).with_background(theme.accent),
            ))
            .with_child(
                ElementSpec::new("span").with_text(format!("Skip in {SKIP_AFTER_SECS}")),
            );

        let player = ElementSpec::new("div")
            .with_class(neutral_name())
            .with_style(
                Style {
                    position: Position::Relative,
                    ..Style::sized(PLAYER_WIDTH, PLAYER_HEIGHT)
                }
                .with_background("#000000")
                .with_color("#ffffff"),
            )
            .with_child(ElementSpec::new("p").with_text(creative.headline.as_str()))
            .with_child(controls)
            .with_click(staggered_click(ctx.settings, ctx.zone));

        let node = ctx.host.create_visual_element(ctx.container, &player)?;
        confirm_rendered(ctx, node)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;
    use crate::host::{BlockerProfile, RenderHost};

    #[tokio::test]
    async fn renders_player_frame() {
        let harness = Harness::new(BlockerProfile::typical());
        assert_eq!(harness.run(&VideoOverlay).await.unwrap(), StrategyOutcome::Rendered);
        let player = harness.host.children(harness.container).unwrap()[0];
        let measurement = harness.host.measure(player).unwrap();
        assert_eq!((measurement.width, measurement.height), (PLAYER_WIDTH, PLAYER_HEIGHT));
        assert!(harness.host.text_content(player).contains("Skip in 5"));
    }
}
