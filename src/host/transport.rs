//! Reqwest-based implementation of the [`ProbeTransport`] trait.
//!
//! Issues lightweight requests whose body is never read; any HTTP response,
//! whatever its status, means the endpoint was reachable.

use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use reqwest::{Client, redirect::Policy};
use url::Url;

use super::{ProbeResponse, ProbeTransport, TransportError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Reqwest-backed reachability transport.
pub struct ReqwestProbeTransport {
    client: Client,
    timeout: Duration,
}

impl ReqwestProbeTransport {
    /// Creates a client that never follows redirects; the first response is
    /// proof enough of reachability.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Transport(err.to_string()))?;

        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl ProbeTransport for ReqwestProbeTransport {
    async fn issue_probe_request(&self, url: &Url) -> Result<ProbeResponse, TransportError> {
        let response = self
            .client
            .head(url.as_str())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    TransportError::Timeout(self.timeout)
                } else {
                    TransportError::Transport(err.to_string())
                }
            })?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .map_err(|err| TransportError::Transport(err.to_string()))?;
        Ok(ProbeResponse { status })
    }
}

