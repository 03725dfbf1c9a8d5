//! Creative encapsulated in a closed shadow root, out of reach of
//! selector-based inspection from the page.

use async_trait::async_trait;

use super::{
    DeliveryContext, PriorityTier, Strategy, StrategyError, StrategyOutcome, confirm_rendered,
    neutral_name, pick_theme, slot_markup,
};
use crate::host::{ElementSpec, HostError, ShadowMode};

#[derive(Debug, Default, Clone, Copy)]
pub struct ClosedShadow;

#[async_trait]
impl Strategy for ClosedShadow {
    fn name(&self) -> &'static str {
        "closed_shadow"
    }

    fn tier(&self) -> PriorityTier {
        PriorityTier::Indirect
    }

    async fn execute(&self, ctx: &DeliveryContext<'_>) -> Result<StrategyOutcome, StrategyError> {
        let shell = ElementSpec::new("div")
            .with_class(neutral_name())
            .with_shadow(ShadowMode::Closed)
            .with_child(slot_markup(ctx, pick_theme()));

        let node = match ctx.host.create_visual_element(ctx.container, &shell) {
            Ok(node) => node,
            Err(HostError::Unsupported(feature)) => {
                return Err(StrategyError::Unavailable(feature));
            }
            Err(err) => return Err(err.into()),
        };
        confirm_rendered(ctx, node)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;
    use crate::host::{BlockerProfile, RenderHost};

    #[tokio::test]
    async fn inner_markup_is_invisible_to_the_page() {
        let harness = Harness::new(BlockerProfile::none());
        assert_eq!(harness.run(&ClosedShadow).await.unwrap(), StrategyOutcome::Rendered);
        let tokens = harness.host.page_tokens().unwrap();
        // container id and shell class; the slot markup stays behind the boundary
        assert_eq!(tokens.len(), 2);
    }

    #[tokio::test]
    async fn renders_under_list_filtering() {
        let harness = Harness::new(BlockerProfile::typical());
        assert_eq!(harness.run(&ClosedShadow).await.unwrap(), StrategyOutcome::Rendered);
    }

    #[tokio::test]
    async fn unsupported_shadow_roots_are_reported() {
        let mut profile = BlockerProfile::none();
        profile.shadow_dom_supported = false;
        let harness = Harness::new(profile);
        let err = harness.run(&ClosedShadow).await.unwrap_err();
        assert!(matches!(err, StrategyError::Unavailable(_)));
    }
}
