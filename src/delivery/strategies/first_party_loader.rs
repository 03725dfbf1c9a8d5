//! Loader served from a randomized path on the page's own origin, where
//! host-based request rules do not apply.

use async_trait::async_trait;
use rand::Rng;
use url::Url;

use super::{
    DeliveryContext, PriorityTier, Strategy, StrategyError, StrategyOutcome, confirm_rendered,
    hex_encode, neutral_name, pick_theme, slot_markup,
};
use crate::delivery::ZoneId;
use crate::host::{ScriptInjection, ScriptSource};
use crate::modules::timing::random_between;

#[derive(Debug, Default, Clone, Copy)]
pub struct FirstPartyLoader;

impl FirstPartyLoader {
    fn loader_url(page_origin: &Url, zone: &ZoneId) -> Result<Url, StrategyError> {
        let nonce: u32 = rand::thread_rng().r#gen();
        let path = format!("/assets/{}/{}.js", neutral_name(), nonce % 10_000);
        let mut url = page_origin
            .join(&path)
            .map_err(|err| StrategyError::Other(format!("loader path: {err}")))?;
        url.query_pairs_mut().append_pair("v", &hex_encode(zone.as_str()));
        Ok(url)
    }
}

#[async_trait]
impl Strategy for FirstPartyLoader {
    fn name(&self) -> &'static str {
        "first_party_loader"
    }

    fn tier(&self) -> PriorityTier {
        PriorityTier::Indirect
    }

    async fn execute(&self, ctx: &DeliveryContext<'_>) -> Result<StrategyOutcome, StrategyError> {
        let (min_delay, max_delay) = ctx.settings.loader_delay;
        tokio::time::sleep(random_between(min_delay, max_delay)).await;

        let url = Self::loader_url(&ctx.settings.page_origin, ctx.zone)?;
        let injection = ScriptInjection::new(ctx.host.head(), ScriptSource::Remote(url));
        ctx.host.inject_script(injection).await?;

        let node = ctx
            .host
            .create_visual_element(ctx.container, &slot_markup(ctx, pick_theme()))?;
        confirm_rendered(ctx, node)
    }
}
