use std::collections::HashSet;

use super::{AppConfig, ConfigError};
use crate::protocol::{is_known_provider, KNOWN_PROVIDERS};

/// Validate the full application config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_server_config(config)?;
    validate_allowed_keys(config)?;
    validate_upstream_services(config)?;
    validate_log_level(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_server_config(config: &AppConfig) -> Result<(), ConfigError> {
    let server = &config.server;
    if server.http_pool_max_idle_per_host == 0 {
        return Err(validation_err(
            "server.http_pool_max_idle_per_host must be greater than 0",
        ));
    }
    if server.timeout == 0 {
        return Err(validation_err("server.timeout must be greater than 0"));
    }
    Ok(())
}

fn validate_allowed_keys(config: &AppConfig) -> Result<(), ConfigError> {
    if config.client_authentication.allowed_keys.is_empty() {
        return Err(validation_err("allowed_keys cannot be empty"));
    }
    for key in &config.client_authentication.allowed_keys {
        if key.trim().is_empty() {
            return Err(validation_err("allowed_keys contains an empty key"));
        }
    }
    Ok(())
}

fn validate_upstream_services(config: &AppConfig) -> Result<(), ConfigError> {
    if config.upstream_services.is_empty() {
        return Err(validation_err("upstream_services cannot be empty"));
    }

    let mut names = HashSet::new();
    for svc in &config.upstream_services {
        if svc.name.trim().is_empty() {
            return Err(validation_err("upstream service name cannot be empty"));
        }
        if !names.insert(svc.name.as_str()) {
            return Err(validation_err(format!(
                "Duplicate upstream service name '{}'",
                svc.name
            )));
        }
        validate_base_url(&svc.name, &svc.base_url)?;
        if svc.api_key.trim().is_empty() {
            return Err(validation_err(format!(
                "Service '{}': api_key cannot be empty",
                svc.name
            )));
        }
        if !is_known_provider(&svc.provider) {
            return Err(validation_err(format!(
                "Service '{}': unknown provider '{}'. Must be one of: {}",
                svc.name,
                svc.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }
        if svc.models.is_empty() {
            return Err(validation_err(format!(
                "Service '{}' must have at least one model",
                svc.name
            )));
        }
    }

    let defaults = config
        .upstream_services
        .iter()
        .filter(|svc| svc.is_default)
        .count();
    if defaults > 1 {
        return Err(validation_err(
            "Only one upstream service can be marked is_default",
        ));
    }

    // The same model may appear on several upstreams (first one wins);
    // duplicates inside a single service are rejected.
    let mut regular_models = HashSet::new();
    let mut all_aliases = HashSet::new();

    for svc in &config.upstream_services {
        let mut service_entries = HashSet::new();
        for model in &svc.models {
            if model.trim().is_empty() {
                return Err(validation_err(format!(
                    "Service '{}': model name cannot be empty",
                    svc.name
                )));
            }
            if !service_entries.insert(model.as_str()) {
                return Err(validation_err(format!(
                    "Service '{}': duplicate model entry '{model}'",
                    svc.name
                )));
            }
            if let Some((alias, real_model)) = model.split_once(':') {
                if alias.trim().is_empty() || real_model.trim().is_empty() {
                    return Err(validation_err(format!(
                        "Invalid alias format in '{model}'. Both parts must not be empty."
                    )));
                }
                all_aliases.insert(alias);
            } else {
                regular_models.insert(model.as_str());
            }
        }
    }

    for alias in &all_aliases {
        if regular_models.contains(alias) {
            return Err(validation_err(format!(
                "Alias name '{alias}' conflicts with a regular model name"
            )));
        }
    }

    Ok(())
}

fn validate_base_url(service_name: &str, base_url: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(base_url.trim()).map_err(|err| {
        validation_err(format!(
            "Service '{service_name}': base_url is not a valid URL: {err}"
        ))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(validation_err(format!(
            "Service '{service_name}': base_url must start with http:// or https://"
        )));
    }
    Ok(())
}

fn validate_log_level(config: &AppConfig) -> Result<(), ConfigError> {
    let valid_levels = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL", "DISABLED"];
    if !valid_levels.contains(&config.features.log_level.to_uppercase().as_str()) {
        return Err(validation_err(format!(
            "log_level must be one of {valid_levels:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::*;

    fn make_valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig::default(),
            upstream_services: vec![UpstreamServiceConfig {
                name: "openai".to_string(),
                provider: "openai".to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
                api_key: "sk-test".to_string(),
                models: vec!["gpt-4".to_string()],
                description: String::new(),
                is_default: true,
            }],
            client_authentication: ClientAuthConfig {
                allowed_keys: vec!["sk-client-key".to_string()],
            },
            features: FeaturesConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = make_valid_config();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_allowed_keys() {
        let mut config = make_valid_config();
        config.client_authentication.allowed_keys = vec![];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_blank_allowed_key() {
        let mut config = make_valid_config();
        config.client_authentication.allowed_keys = vec!["  ".to_string()];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_no_default_service() {
        let mut config = make_valid_config();
        config.upstream_services[0].is_default = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_multiple_defaults() {
        let mut config = make_valid_config();
        let mut svc2 = config.upstream_services[0].clone();
        svc2.name = "second".to_string();
        svc2.models = vec!["model-b".to_string()];
        svc2.is_default = true;
        config.upstream_services.push(svc2);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_duplicate_service_name() {
        let mut config = make_valid_config();
        let mut svc2 = config.upstream_services[0].clone();
        svc2.is_default = false;
        svc2.models = vec!["model-b".to_string()];
        config.upstream_services.push(svc2);
        let msg = validate_config(&config).unwrap_err().to_string();
        assert!(msg.contains("Duplicate upstream service name"));
    }

    #[test]
    fn test_same_model_across_services() {
        let mut config = make_valid_config();
        let mut svc2 = config.upstream_services[0].clone();
        svc2.name = "second".to_string();
        svc2.is_default = false;
        config.upstream_services.push(svc2);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_duplicate_model_within_same_service() {
        let mut config = make_valid_config();
        config.upstream_services[0].models.push("gpt-4".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_alias_conflicts_with_model() {
        let mut config = make_valid_config();
        config.upstream_services[0]
            .models
            .push("gpt-4:gpt-4-turbo".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_alias_with_empty_part() {
        let mut config = make_valid_config();
        config.upstream_services[0].models.push("fast:".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = make_valid_config();
        config.upstream_services[0].base_url = "ftp://bad.url".to_string();
        assert!(validate_config(&config).is_err());
        config.upstream_services[0].base_url = "not a url".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_api_key() {
        let mut config = make_valid_config();
        config.upstream_services[0].api_key = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = make_valid_config();
        config.features.log_level = "VERBOSE".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_log_level_is_case_insensitive() {
        let mut config = make_valid_config();
        config.features.log_level = "warning".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_pool_max_idle_per_host() {
        let mut config = make_valid_config();
        config.server.http_pool_max_idle_per_host = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = make_valid_config();
        config.server.timeout = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_no_models_is_invalid() {
        let mut config = make_valid_config();
        config.upstream_services[0].models = vec![];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_unknown_provider() {
        let mut config = make_valid_config();
        config.upstream_services[0].provider = "unknown-provider".to_string();
        let result = validate_config(&config);
        let msg = format!("{}", result.unwrap_err());
        assert!(msg.contains("unknown provider"));
    }

    #[test]
    fn test_valid_providers() {
        for provider in KNOWN_PROVIDERS {
            let mut config = make_valid_config();
            config.upstream_services[0].provider = (*provider).to_string();
            assert!(
                validate_config(&config).is_ok(),
                "Provider '{provider}' should be valid"
            );
        }
    }
}
