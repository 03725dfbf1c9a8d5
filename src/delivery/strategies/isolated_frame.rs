//! Sandboxed frame whose sub-document is inlined through `srcdoc`.

use async_trait::async_trait;
use html_escape::encode_text;

use super::{
    DeliveryContext, PriorityTier, Strategy, StrategyError, StrategyOutcome, Theme,
    confirm_rendered, neutral_name, pick_theme,
};
use crate::host::{ElementSpec, Style};

const FRAME_WIDTH: u32 = 300;
const FRAME_HEIGHT: u32 = 120;

#[derive(Debug, Default, Clone, Copy)]
pub struct IsolatedFrame;

impl IsolatedFrame {
    fn sub_document(ctx: &DeliveryContext<'_>, theme: Theme) -> String {
        let creative = &ctx.settings.creative;
        let target = ctx.settings.click_url(ctx.zone.as_str());
        format!(
            concat!(
                "<!doctype html><html><body style=\"margin:0;background:{bg};color:{fg};",
                "font-family:sans-serif\"><a href=\"{href}\" target=\"_top\" ",
                "style=\"color:{accent}\"><strong>{headline}</strong></a><p>{body}</p>",
                "</body></html>"
            ),
            bg = theme.background,
            fg = theme.foreground,
            accent = theme.accent,
            href = html_escape::encode_double_quoted_attribute(target.as_str()),
            headline = encode_text(&creative.headline),
            body = encode_text(&creative.body),
        )
    }
}

#[async_trait]
impl Strategy for IsolatedFrame {
    fn name(&self) -> &'static str {
        "isolated_frame"
    }

    fn tier(&self) -> PriorityTier {
        PriorityTier::Indirect
    }

    async fn execute(&self, ctx: &DeliveryContext<'_>) -> Result<StrategyOutcome, StrategyError> {
        let frame = ElementSpec::new("iframe")
            .with_id(neutral_name())
            .with_attribute("srcdoc", Self::sub_document(ctx, pick_theme()))
            .with_attribute(
                "sandbox",
                "allow-popups allow-popups-to-escape-sandbox allow-top-navigation-by-user-activation",
            )
            .with_attribute("width", FRAME_WIDTH.to_string())
            .with_attribute("height", FRAME_HEIGHT.to_string())
            .with_attribute("scrolling", "no")
            .with_style(Style::default().with_property("border", "0"));

        let node = ctx.host.create_visual_element(ctx.container, &frame)?;
        confirm_rendered(ctx, node)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;
    use crate::config::DeliverySettings;
    use crate::host::{BlockerProfile, RenderHost};

    #[test]
    fn escapes_creative_copy() {
        let harness = Harness::new(BlockerProfile::none());
        let mut settings = DeliverySettings::default();
        settings.creative.headline = "<script>alert(1)</script>".into();
        let ctx = DeliveryContext {
            settings: &settings,
            ..harness.context()
        };
        let doc = IsolatedFrame::sub_document(&ctx, pick_theme());
        assert!(!doc.contains("<script>"));
        assert!(doc.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn frame_renders_at_declared_size() {
        let harness = Harness::new(BlockerProfile::typical());
        assert_eq!(harness.run(&IsolatedFrame).await.unwrap(), StrategyOutcome::Rendered);
        let frame = harness.host.children(harness.container).unwrap()[0];
        let measurement = harness.host.measure(frame).unwrap();
        assert_eq!((measurement.width, measurement.height), (300.0, 120.0));
    }

    #[tokio::test]
    async fn collapsed_frames_do_not_count() {
        let harness = Harness::new(BlockerProfile::aggressive());
        assert_eq!(
            harness.run(&IsolatedFrame).await.unwrap(),
            StrategyOutcome::NotRendered
        );
    }
}
