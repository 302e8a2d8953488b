use crate::config::UpstreamServiceConfig;
use crate::util::join_url;

/// Precomputed upstream metadata used by the request path.
#[derive(Debug, Clone)]
pub struct PreparedUpstream {
    name: String,
    provider: String,
    chat_url: String,
    static_headers: http::HeaderMap,
}

impl PreparedUpstream {
    /// Build a prepared upstream from configuration.
    #[must_use]
    pub fn new(upstream: &UpstreamServiceConfig) -> Self {
        Self {
            name: upstream.name.clone(),
            provider: upstream.provider.clone(),
            chat_url: join_url(&upstream.base_url, "chat/completions"),
            static_headers: Self::build_headers(upstream),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    #[must_use]
    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    #[must_use]
    pub fn static_headers(&self) -> &http::HeaderMap {
        &self.static_headers
    }

    // Every provider is reached through an OpenAI-compatible endpoint.
    fn build_headers(upstream: &UpstreamServiceConfig) -> http::HeaderMap {
        let mut headers = http::HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            http::header::ACCEPT,
            http::HeaderValue::from_static("application/json"),
        );
        match http::HeaderValue::from_str(&format!("Bearer {}", upstream.api_key.trim())) {
            Ok(mut val) => {
                val.set_sensitive(true);
                headers.insert(http::header::AUTHORIZATION, val);
            }
            Err(_) => tracing::warn!(
                "upstream '{}' api_key is not a valid header value; sending without auth",
                upstream.name
            ),
        }
        headers
    }
}
