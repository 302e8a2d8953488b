use serde_json::Value;

use crate::protocol::chunk::ChunkUsage;
use crate::protocol::{reports_cache_tokens, Usage};

/// Build the usage object shared by every event of one response.
///
/// Token counts of zero are treated as absent. `total_tokens` is only
/// emitted when both prompt and completion counts are. Cache counters are
/// only propagated for cache-reporting providers, and only when at least one
/// of them is an integer (zero included).
#[must_use]
pub fn aggregate_usage<'a>(usage: Option<&'a Usage>, provider: &str) -> ChunkUsage<'a> {
    let Some(usage) = usage else {
        return ChunkUsage::default();
    };

    let prompt_tokens = usage.prompt_tokens.filter(|&n| n > 0);
    let completion_tokens = usage.completion_tokens.filter(|&n| n > 0);
    let total_tokens = match (prompt_tokens, completion_tokens) {
        (Some(prompt), Some(completion)) => Some(prompt.saturating_add(completion)),
        _ => None,
    };

    let cache_read = usage.cache_read_input_tokens.as_ref();
    let cache_creation = usage.cache_creation_input_tokens.as_ref();
    let include_cache = reports_cache_tokens(provider)
        && (cache_read.is_some_and(is_integer) || cache_creation.is_some_and(is_integer));

    ChunkUsage {
        prompt_tokens,
        completion_tokens,
        total_tokens,
        cache_read_input_tokens: cache_read.filter(|_| include_cache),
        cache_creation_input_tokens: cache_creation.filter(|_| include_cache),
        num_search_queries: usage.num_search_queries.filter(|&n| n > 0),
    }
}

#[inline]
fn is_integer(value: &Value) -> bool {
    value.is_i64() || value.is_u64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn usage(value: Value) -> Usage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_total_requires_both_counts() {
        let full = usage(json!({"prompt_tokens": 10, "completion_tokens": 5}));
        let out = aggregate_usage(Some(&full), "openai");
        assert_eq!(out.total_tokens, Some(15));

        let prompt_only = usage(json!({"prompt_tokens": 10}));
        let out = aggregate_usage(Some(&prompt_only), "openai");
        assert_eq!(out.prompt_tokens, Some(10));
        assert_eq!(out.total_tokens, None);

        let zero_completion = usage(json!({"prompt_tokens": 10, "completion_tokens": 0}));
        let out = aggregate_usage(Some(&zero_completion), "openai");
        assert_eq!(out.completion_tokens, None);
        assert_eq!(out.total_tokens, None);
    }

    #[test]
    fn test_upstream_total_is_recomputed() {
        let u = usage(json!({"prompt_tokens": 1, "completion_tokens": 2, "total_tokens": 99}));
        assert_eq!(aggregate_usage(Some(&u), "openai").total_tokens, Some(3));
    }

    #[test]
    fn test_cache_counts_only_for_cache_family() {
        let u = usage(json!({
            "prompt_tokens": 10,
            "completion_tokens": 5,
            "cache_read_input_tokens": 7,
            "cache_creation_input_tokens": 3
        }));
        let out = aggregate_usage(Some(&u), "anthropic");
        assert_eq!(out.cache_read_input_tokens, Some(&json!(7)));
        assert_eq!(out.cache_creation_input_tokens, Some(&json!(3)));

        let out = aggregate_usage(Some(&u), "openai");
        assert!(out.cache_read_input_tokens.is_none());
        assert!(out.cache_creation_input_tokens.is_none());
    }

    #[test]
    fn test_zero_cache_count_is_included() {
        let u = usage(json!({"cache_read_input_tokens": 0}));
        let out = aggregate_usage(Some(&u), "bedrock");
        assert_eq!(out.cache_read_input_tokens, Some(&json!(0)));
        assert!(out.cache_creation_input_tokens.is_none());
    }

    #[test]
    fn test_malformed_cache_counts_are_dropped() {
        let u = usage(json!({
            "cache_read_input_tokens": "12",
            "cache_creation_input_tokens": 1.5
        }));
        let out = aggregate_usage(Some(&u), "anthropic");
        assert!(out.cache_read_input_tokens.is_none());
        assert!(out.cache_creation_input_tokens.is_none());
    }

    #[test]
    fn test_one_integer_cache_count_opens_the_gate() {
        let u = usage(json!({
            "cache_read_input_tokens": 4,
            "cache_creation_input_tokens": "n/a"
        }));
        let out = aggregate_usage(Some(&u), "vertex-ai");
        assert_eq!(out.cache_read_input_tokens, Some(&json!(4)));
        assert_eq!(out.cache_creation_input_tokens, Some(&json!("n/a")));
    }

    #[test]
    fn test_search_queries() {
        let u = usage(json!({"num_search_queries": 2}));
        assert_eq!(
            aggregate_usage(Some(&u), "perplexity-ai").num_search_queries,
            Some(2)
        );
        assert_eq!(aggregate_usage(None, "perplexity-ai"), ChunkUsage::default());
    }
}
