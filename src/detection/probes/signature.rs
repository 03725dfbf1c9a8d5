//! Blocker-signature probe.
//!
//! Two cheap checks: class and id tokens left in the page by a blocking
//! extension, and user-agent or brand markers of browsers that strip
//! sponsored content natively.

use std::sync::Arc;

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};

use super::Probe;
use crate::config::ProbeConfig;
use crate::host::RenderHost;

pub struct SignatureProbe {
    host: Arc<dyn RenderHost>,
    /// `None` when the configured signatures do not form a valid pattern.
    signatures: Option<Regex>,
    environments: Vec<String>,
}

impl SignatureProbe {
    pub fn new(host: Arc<dyn RenderHost>, probes: &ProbeConfig) -> Self {
        let signatures = if probes.blocker_signatures.is_empty() {
            None
        } else {
            let alternation = probes
                .blocker_signatures
                .iter()
                .map(|signature| regex::escape(signature))
                .collect::<Vec<_>>()
                .join("|");
            RegexBuilder::new(&alternation)
                .case_insensitive(true)
                .build()
                .map_err(|err| log::warn!("blocker signatures rejected: {}", err))
                .ok()
        };

        Self {
            host,
            signatures,
            environments: probes.stripping_environments.clone(),
        }
    }

    fn page_has_signature(&self) -> bool {
        let Some(signatures) = &self.signatures else {
            return false;
        };
        match self.host.page_tokens() {
            Ok(tokens) => tokens.iter().any(|token| signatures.is_match(token)),
            Err(err) => {
                log::debug!("page tokens unavailable: {}", err);
                true
            }
        }
    }

    fn stripping_environment(&self) -> bool {
        let info = self.host.environment();
        self.environments.iter().any(|marker| {
            info.user_agent.contains(marker.as_str())
                || info.brands.iter().any(|brand| brand.contains(marker.as_str()))
        })
    }
}

#[async_trait]
impl Probe for SignatureProbe {
    fn name(&self) -> &'static str {
        "signature"
    }

    async fn run(&self) -> bool {
        self.page_has_signature() || self.stripping_environment()
    }
}
