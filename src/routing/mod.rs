use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::config::AppConfig;
use crate::error::GatewayError;

/// The resolved target for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteTarget<'a> {
    pub upstream_index: usize,
    pub actual_model: &'a str,
}

#[derive(Debug, Clone)]
struct Candidate {
    upstream_index: usize,
    model: Arc<str>,
}

/// Pre-built model router that indexes all upstream models and aliases for
/// lookup by requested model name.
#[derive(Debug, Clone)]
pub struct ModelRouter {
    /// Requested model name (or alias) to the first upstream declaring it.
    model_index: FxHashMap<String, Candidate>,
    default_upstream: Option<usize>,
}

impl ModelRouter {
    /// Build a `ModelRouter` from the application configuration.
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        let mut model_index: FxHashMap<String, Candidate> = FxHashMap::default();

        for (idx, svc) in config.upstream_services.iter().enumerate() {
            for entry in &svc.models {
                // "alias:real_model" or a plain model name
                let (requested, real_model) = entry
                    .split_once(':')
                    .unwrap_or((entry.as_str(), entry.as_str()));
                model_index
                    .entry(requested.to_string())
                    .or_insert_with(|| Candidate {
                        upstream_index: idx,
                        model: Arc::from(real_model),
                    });
            }
        }

        Self {
            model_index,
            default_upstream: config.upstream_services.iter().position(|svc| svc.is_default),
        }
    }

    #[must_use]
    pub fn known_model_count(&self) -> usize {
        self.model_index.len()
    }

    /// Resolve which upstream service and actual model name to use.
    ///
    /// Resolution order:
    /// 1. Exact model or alias match in the index.
    /// 2. The default upstream, keeping the requested model name.
    /// 3. No match, return an error.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::InvalidRequest` when no route can be resolved.
    pub fn resolve<'a>(&'a self, model: &'a str) -> Result<RouteTarget<'a>, GatewayError> {
        if let Some(candidate) = self.model_index.get(model) {
            return Ok(RouteTarget {
                upstream_index: candidate.upstream_index,
                actual_model: &candidate.model,
            });
        }

        if let Some(upstream_index) = self.default_upstream {
            return Ok(RouteTarget {
                upstream_index,
                actual_model: model,
            });
        }

        Err(GatewayError::InvalidRequest(format!(
            "No upstream found for model '{model}'"
        )))
    }
}
