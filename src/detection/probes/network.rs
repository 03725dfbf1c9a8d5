//! Request-blocking probe.
//!
//! Requests a handful of well-known ad and analytics endpoints in parallel.
//! Only reachability matters: any response counts as success, while a
//! cancelled, failed or timed-out request counts as failure.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio::time::timeout;
use url::Url;

use super::Probe;
use crate::host::ProbeTransport;

pub struct NetworkProbe {
    transport: Arc<dyn ProbeTransport>,
    endpoints: Vec<Url>,
    request_timeout: Duration,
    failure_ratio: f32,
}

impl NetworkProbe {
    pub fn new(
        transport: Arc<dyn ProbeTransport>,
        endpoints: Vec<Url>,
        request_timeout: Duration,
        failure_ratio: f32,
    ) -> Self {
        Self {
            transport,
            endpoints,
            request_timeout,
            failure_ratio,
        }
    }
}

#[async_trait]
impl Probe for NetworkProbe {
    fn name(&self) -> &'static str {
        "network"
    }

    async fn run(&self) -> bool {
        if self.endpoints.is_empty() {
            log::debug!("network probe has no endpoints");
            return true;
        }

        let mut requests = JoinSet::new();
        for endpoint in self.endpoints.iter().cloned() {
            let transport = Arc::clone(&self.transport);
            let limit = self.request_timeout;
            requests.spawn(async move {
                match timeout(limit, transport.issue_probe_request(&endpoint)).await {
                    Ok(Ok(_)) => true,
                    Ok(Err(err)) => {
                        log::debug!("probe request to {} failed: {}", endpoint, err);
                        false
                    }
                    Err(_) => {
                        log::debug!("probe request to {} timed out", endpoint);
                        false
                    }
                }
            });
        }

        let mut failures = 0usize;
        while let Some(result) = requests.join_next().await {
            if !matches!(result, Ok(true)) {
                failures += 1;
            }
        }

        let total = self.endpoints.len();
        log::debug!("network probe: {}/{} endpoints unreachable", failures, total);
        failures as f32 >= self.failure_ratio * total as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ProbeResponse, TransportError};
    use http::StatusCode;

    /// Blocks every URL containing one of the listed fragments.
    struct FilteringTransport(Vec<&'static str>);

    #[async_trait]
    impl ProbeTransport for FilteringTransport {
        async fn issue_probe_request(&self, url: &Url) -> Result<ProbeResponse, TransportError> {
            if self.0.iter().any(|fragment| url.as_str().contains(fragment)) {
                Err(TransportError::Blocked(url.to_string()))
            } else {
                Ok(ProbeResponse {
                    status: StatusCode::NOT_FOUND,
                })
            }
        }
    }

    struct HangingTransport;

    #[async_trait]
    impl ProbeTransport for HangingTransport {
        async fn issue_probe_request(&self, _url: &Url) -> Result<ProbeResponse, TransportError> {
            std::future::pending().await
        }
    }

    fn endpoints() -> Vec<Url> {
        ["https://a.test/x.js", "https://b.test/y.js", "https://c.test/z.js", "https://d.test/w.js"]
            .iter()
            .map(|raw| Url::parse(raw).unwrap())
            .collect()
    }

    fn probe(transport: Arc<dyn ProbeTransport>) -> NetworkProbe {
        NetworkProbe::new(transport, endpoints(), Duration::from_millis(50), 0.5)
    }

    #[tokio::test]
    async fn error_statuses_still_count_as_reachable() {
        assert!(!probe(Arc::new(FilteringTransport(vec![]))).run().await);
    }

    #[tokio::test]
    async fn half_unreachable_votes_suppressed() {
        assert!(probe(Arc::new(FilteringTransport(vec!["a.test", "b.test"]))).run().await);
        assert!(!probe(Arc::new(FilteringTransport(vec!["a.test"]))).run().await);
    }

    #[tokio::test]
    async fn timeouts_count_as_failures() {
        assert!(probe(Arc::new(HangingTransport)).run().await);
    }
}
