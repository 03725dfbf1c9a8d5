//! Inline-script probe.
//!
//! Injects an inline script that writes a randomly named global, then
//! checks whether the marker appeared within the script timeout.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::time::timeout;

use super::Probe;
use crate::host::{RenderHost, ScriptInjection, ScriptSource};

pub struct ScriptExecutionProbe {
    host: Arc<dyn RenderHost>,
    script_timeout: Duration,
}

impl ScriptExecutionProbe {
    pub fn new(host: Arc<dyn RenderHost>, script_timeout: Duration) -> Self {
        Self {
            host,
            script_timeout,
        }
    }

    fn marker_key() -> String {
        let mut rng = rand::thread_rng();
        format!("__m{:08x}", rng.r#gen::<u32>())
    }
}

#[async_trait]
impl Probe for ScriptExecutionProbe {
    fn name(&self) -> &'static str {
        "script_execution"
    }

    async fn run(&self) -> bool {
        let key = Self::marker_key();
        let snippet = format!(
            r#"(function(w){{w["{key}"]="1";}})(typeof window!=="undefined"?window:globalThis);"#
        );
        let injection = ScriptInjection::new(self.host.head(), ScriptSource::inline(&snippet));

        match timeout(self.script_timeout, self.host.inject_script(injection)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log::debug!("marker script rejected: {}", err),
            Err(_) => log::debug!("marker script timed out"),
        }

        self.host.read_marker(&key).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{BlockerProfile, SimulatedHost};

    #[tokio::test]
    async fn executed_script_votes_clear() {
        let host = Arc::new(SimulatedHost::new(BlockerProfile::typical()));
        let probe = ScriptExecutionProbe::new(host, Duration::from_secs(1));
        assert!(!probe.run().await);
    }

    #[tokio::test]
    async fn blocked_inline_script_votes_suppressed() {
        let host = Arc::new(SimulatedHost::new(BlockerProfile::aggressive()));
        let probe = ScriptExecutionProbe::new(host, Duration::from_secs(1));
        assert!(probe.run().await);
    }
}
