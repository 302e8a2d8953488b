use crate::auth::{authenticate, build_allowed_key_set, AllowedClientKeys};
use crate::config::AppConfig;
use crate::error::GatewayError;
use crate::protocol::error_shapes::{ErrorResponseTransform, UpstreamErrorTransform};
use crate::routing::ModelRouter;
use crate::transport::{HttpTransport, PreparedUpstream};

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub config: AppConfig,
    pub transport: HttpTransport,
    pub model_router: ModelRouter,
    pub prepared_upstreams: Vec<PreparedUpstream>,
    allowed_client_keys: AllowedClientKeys,
    error_transform: Box<dyn ErrorResponseTransform>,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: AppConfig,
        transport: HttpTransport,
        model_router: ModelRouter,
        prepared_upstreams: Vec<PreparedUpstream>,
        allowed_client_keys: AllowedClientKeys,
    ) -> Self {
        Self {
            config,
            transport,
            model_router,
            prepared_upstreams,
            allowed_client_keys,
            error_transform: Box::new(UpstreamErrorTransform),
        }
    }

    /// Build every derived component from a validated config.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] when the HTTP client cannot be built.
    pub fn from_config(config: AppConfig) -> Result<Self, GatewayError> {
        let transport = HttpTransport::new(&config.server)?;
        let model_router = ModelRouter::new(&config);
        let prepared_upstreams = config
            .upstream_services
            .iter()
            .map(PreparedUpstream::new)
            .collect();
        let allowed_client_keys = build_allowed_key_set(&config);
        Ok(Self::new(
            config,
            transport,
            model_router,
            prepared_upstreams,
            allowed_client_keys,
        ))
    }

    /// Replace the transform applied to failed upstream bodies.
    #[must_use]
    pub fn with_error_transform(mut self, transform: Box<dyn ErrorResponseTransform>) -> Self {
        self.error_transform = transform;
        self
    }

    /// Authenticate a request using the prebuilt key index.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Auth` when the API key is missing or invalid.
    pub fn authenticate(&self, headers: &http::HeaderMap) -> Result<(), GatewayError> {
        authenticate(headers, &self.allowed_client_keys)
    }

    #[must_use]
    pub fn error_transform(&self) -> &dyn ErrorResponseTransform {
        self.error_transform.as_ref()
    }

    /// # Errors
    ///
    /// Returns `GatewayError::Internal` for an index the router never produces.
    pub fn upstream(&self, upstream_index: usize) -> Result<&PreparedUpstream, GatewayError> {
        self.prepared_upstreams.get(upstream_index).ok_or_else(|| {
            GatewayError::Internal(format!("Invalid upstream index {upstream_index}"))
        })
    }
}
