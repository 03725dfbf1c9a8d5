//! Delayed remote loader.
//!
//! Waits a random delay, then injects the serving script under the
//! document head rather than the caller's container, with the zone hidden
//! in a hex-encoded query. Once the script is in, the slot markup goes in.

use async_trait::async_trait;
use rand::Rng;
use url::Url;

use super::{
    DeliveryContext, PriorityTier, Strategy, StrategyError, StrategyOutcome, confirm_rendered,
    hex_encode, pick_theme, slot_markup,
};
use crate::delivery::ZoneId;
use crate::host::{ScriptInjection, ScriptSource};
use crate::modules::timing::random_between;

#[derive(Debug, Default, Clone, Copy)]
pub struct DeferredLoader;

impl DeferredLoader {
    fn loader_url(serve_endpoint: &Url, zone: &ZoneId) -> Url {
        let nonce: u32 = rand::thread_rng().r#gen();
        let mut url = serve_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("k", &hex_encode(zone.as_str()))
            .append_pair("r", &format!("{nonce:08x}"));
        url
    }
}

#[async_trait]
impl Strategy for DeferredLoader {
    fn name(&self) -> &'static str {
        "deferred_loader"
    }

    fn tier(&self) -> PriorityTier {
        PriorityTier::Indirect
    }

    async fn execute(&self, ctx: &DeliveryContext<'_>) -> Result<StrategyOutcome, StrategyError> {
        let (min_delay, max_delay) = ctx.settings.loader_delay;
        tokio::time::sleep(random_between(min_delay, max_delay)).await;

        let url = Self::loader_url(&ctx.settings.serve_endpoint, ctx.zone);
        let injection = ScriptInjection::new(ctx.host.head(), ScriptSource::Remote(url))
            .with_attribute("async", "");
        ctx.host.inject_script(injection).await?;

        let node = ctx
            .host
            .create_visual_element(ctx.container, &slot_markup(ctx, pick_theme()))?;
        confirm_rendered(ctx, node)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::*;
    use crate::host::{BlockerProfile, HostError, RenderHost};

    #[test]
    fn zone_never_appears_in_clear() {
        let url = DeferredLoader::loader_url(
            &Url::parse("https://cdn.test/v1/s").unwrap(),
            &ZoneId::from("zone-7"),
        );
        assert!(!url.as_str().contains("zone-7"));
        assert!(url.as_str().contains("k=7a6f6e652d37"));
    }

    #[tokio::test]
    async fn loads_under_head_when_unblocked() {
        let harness = Harness::new(BlockerProfile::none());
        assert_eq!(harness.run(&DeferredLoader).await.unwrap(), StrategyOutcome::Rendered);
        assert_eq!(harness.host.children(harness.host.head()).unwrap().len(), 1);
        assert_eq!(harness.host.requests().len(), 1);
    }

    #[tokio::test]
    async fn blocked_serving_host_is_an_error() {
        let harness = Harness::new(BlockerProfile::typical());
        let err = harness.run(&DeferredLoader).await.unwrap_err();
        assert!(matches!(err, StrategyError::Host(HostError::ScriptBlocked(_))));
        assert!(harness.host.children(harness.container).unwrap().is_empty());
    }
}
