/// Provider identifiers accepted in `upstream_services[].provider`.
pub const KNOWN_PROVIDERS: &[&str] = &[
    "openai",
    "azure-openai",
    "anthropic",
    "bedrock",
    "google",
    "vertex-ai",
    "perplexity-ai",
    "groq",
    "mistral-ai",
    "together-ai",
    "deepseek",
];

/// Providers whose usage reports Anthropic-style prompt cache counters.
const CACHE_REPORTING_PROVIDERS: &[&str] = &["anthropic", "bedrock", "vertex-ai"];

#[must_use]
pub fn is_known_provider(provider: &str) -> bool {
    KNOWN_PROVIDERS.contains(&provider)
}

/// Whether `cache_read_input_tokens` / `cache_creation_input_tokens` are
/// propagated for this provider.
#[must_use]
pub fn reports_cache_tokens(provider: &str) -> bool {
    CACHE_REPORTING_PROVIDERS.contains(&provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_family() {
        assert!(reports_cache_tokens("anthropic"));
        assert!(reports_cache_tokens("bedrock"));
        assert!(!reports_cache_tokens("openai"));
        assert!(!reports_cache_tokens("Anthropic"));
    }

    #[test]
    fn test_cache_family_is_known() {
        for provider in CACHE_REPORTING_PROVIDERS {
            assert!(is_known_provider(provider));
        }
    }
}
