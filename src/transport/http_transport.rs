use std::time::Duration;

use bytes::Bytes;

use super::PreparedUpstream;
use crate::config::ServerConfig;
use crate::error::GatewayError;

fn build_reqwest_client(
    pool_max_idle_per_host: usize,
    timeout: Duration,
) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .pool_max_idle_per_host(pool_max_idle_per_host)
        .tcp_nodelay(true)
        .connect_timeout(Duration::from_secs(5))
        .redirect(reqwest::redirect::Policy::none())
        .timeout(timeout)
        .no_proxy()
        .build()
        .map_err(|err| GatewayError::Transport(format!("Failed to build HTTP client: {err}")))
}

/// Status and raw body of one upstream reply.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: http::StatusCode,
    pub body: Bytes,
}

/// HTTP transport client for sending requests to upstream providers.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a new transport with connection pooling and timeouts from the given server config.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the HTTP client cannot be built.
    pub fn new(config: &ServerConfig) -> Result<Self, GatewayError> {
        let client = build_reqwest_client(
            config.http_pool_max_idle_per_host.max(1),
            Duration::from_secs(config.timeout),
        )?;
        Ok(Self { client })
    }

    /// POST a chat completion body to the upstream and read the whole reply.
    ///
    /// Non-2xx replies are returned as-is; only transport failures are errors.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the request cannot be sent or
    /// the body cannot be read.
    pub async fn send_chat(
        &self,
        upstream: &PreparedUpstream,
        body: Bytes,
    ) -> Result<UpstreamReply, GatewayError> {
        let response = self
            .client
            .post(upstream.chat_url())
            .headers(upstream.static_headers().clone())
            .body(body)
            .send()
            .await
            .map_err(|err| {
                GatewayError::Transport(format!(
                    "Request to upstream '{}' failed: {err}",
                    upstream.name()
                ))
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|err| {
            GatewayError::Transport(format!(
                "Failed to read body from upstream '{}': {err}",
                upstream.name()
            ))
        })?;
        Ok(UpstreamReply { status, body })
    }
}
