use serde_json::{json, Value};
use streamshim::protocol::{ChatResponse, ContentBlock};
use streamshim::stream::{ChunkAccumulator, SseParser};
use streamshim::synth::{synthesize, synthesize_with_created, SLICE_CHARS};

fn response(value: Value) -> ChatResponse {
    serde_json::from_value(value).expect("response fixture")
}

fn fixtures() -> Vec<(&'static str, ChatResponse)> {
    let long_unicode = "héllo wörld ✓ ".repeat(120);
    vec![
        (
            "openai",
            response(json!({
                "id": "chatcmpl-flat",
                "model": "gpt-4o",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": long_unicode},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 12, "completion_tokens": 400}
            })),
        ),
        (
            "anthropic",
            response(json!({
                "id": "msg-blocks",
                "model": "claude-sonnet-4",
                "choices": [{
                    "index": 0,
                    "message": {
                        "content_blocks": [
                            {"type": "thinking", "thinking": "r".repeat(1234), "signature": "sig"},
                            {"type": "redacted_thinking", "data": "d".repeat(501)},
                            {"type": "text", "text": "final answer"}
                        ],
                        "tool_calls": [
                            {"id": "toolu_1", "function": {"name": "a", "arguments": "{\"x\":1}"}},
                            {"id": "toolu_2", "function": {"name": "b", "arguments": "{}"}}
                        ]
                    },
                    "finish_reason": "tool_calls"
                }],
                "usage": {"prompt_tokens": 3, "cache_read_input_tokens": 0}
            })),
        ),
        (
            "google",
            response(json!({
                "id": "gemini-multi",
                "choices": [
                    {"index": 0, "message": {"content": "first"}, "finish_reason": "stop",
                     "groundingMetadata": {"webSearchQueries": ["q"]}},
                    {"index": 1, "message": {"content": ""}, "finish_reason": "stop"}
                ]
            })),
        ),
    ]
}

fn payload(event: &str) -> Value {
    let json = event
        .strip_prefix("data: ")
        .and_then(|e| e.strip_suffix("\n\n"))
        .expect("framed event");
    serde_json::from_str(json).expect("event json")
}

#[test]
fn sentinel_is_last_and_unique() {
    for (provider, resp) in fixtures() {
        let events = synthesize(&resp, provider).unwrap();
        let done_count = events.iter().filter(|e| *e == "data: [DONE]\n\n").count();
        assert_eq!(done_count, 1, "{provider}");
        assert_eq!(events.last().map(String::as_str), Some("data: [DONE]\n\n"));
    }
}

#[test]
fn every_event_is_framed_and_carries_usage() {
    for (provider, resp) in fixtures() {
        let events = synthesize(&resp, provider).unwrap();
        for event in &events[..events.len() - 1] {
            assert!(event.starts_with("data: ") && event.ends_with("\n\n"));
            let payload = payload(event);
            assert!(payload["usage"].is_object(), "{provider}: {payload}");
            assert_eq!(payload["object"], "chat.completion.chunk");
            assert_eq!(payload["provider"], provider);
            assert_eq!(payload["choices"].as_array().map(Vec::len), Some(1));
        }
    }
}

#[test]
fn slices_never_exceed_the_bound() {
    for (provider, resp) in fixtures() {
        let events = synthesize(&resp, provider).unwrap();
        for event in &events[..events.len() - 1] {
            let delta = &payload(event)["choices"][0]["delta"];
            if let Some(content) = delta["content"].as_str() {
                assert!(content.chars().count() <= SLICE_CHARS);
            }
            if let Some(block) = delta["content_blocks"][0]["delta"].as_object() {
                for key in ["text", "thinking", "data"] {
                    if let Some(value) = block.get(key).and_then(Value::as_str) {
                        assert!(value.chars().count() <= SLICE_CHARS);
                    }
                }
            }
        }
    }
}

#[test]
fn accumulated_stream_matches_the_response() {
    for (provider, resp) in fixtures() {
        let events = synthesize_with_created(&resp, provider, 1_700_000_000).unwrap();
        let mut accumulator = ChunkAccumulator::new();
        // Feed in awkward pieces to exercise partial frames.
        let text = events.concat();
        let mut rest = text.as_str();
        while !rest.is_empty() {
            let cut = rest
                .char_indices()
                .nth(37)
                .map_or(rest.len(), |(i, _)| i);
            accumulator.feed(&rest[..cut]).unwrap();
            rest = &rest[cut..];
        }
        assert!(accumulator.is_done());
        assert_eq!(accumulator.events_seen(), events.len());
        assert_eq!(accumulator.id(), Some(resp.id.as_str()));

        for choice in &resp.choices {
            let rebuilt = accumulator
                .choices()
                .iter()
                .find(|c| c.index == choice.index)
                .expect("choice present");
            assert_eq!(rebuilt.finish_reason, choice.finish_reason);

            match &choice.message.content_blocks {
                Some(blocks) => {
                    assert_eq!(&rebuilt.content_blocks(), blocks);
                    let text: String = blocks
                        .iter()
                        .filter_map(|b| match b {
                            ContentBlock::Text { text } => Some(text.as_str()),
                            _ => None,
                        })
                        .collect();
                    assert_eq!(rebuilt.content, text);
                }
                None => assert_eq!(
                    rebuilt.content,
                    choice.message.content.clone().unwrap_or_default()
                ),
            }

            let expected_calls: Vec<(String, String, String)> = choice
                .message
                .tool_calls
                .iter()
                .flatten()
                .map(|c| (c.id.clone(), c.function.name.clone(), c.function.arguments.clone()))
                .collect();
            let rebuilt_calls = rebuilt.tool_calls();
            assert!(rebuilt_calls.iter().all(|c| c.type_ == "function"));
            let rebuilt_calls: Vec<(String, String, String)> = rebuilt_calls
                .into_iter()
                .map(|c| (c.id, c.function.name, c.function.arguments))
                .collect();
            assert_eq!(rebuilt_calls, expected_calls);
        }
    }
}

#[test]
fn finish_event_closes_each_choice() {
    for (provider, resp) in fixtures() {
        let events = synthesize(&resp, provider).unwrap();
        let mut parser = SseParser::new();
        let parsed = parser.feed(&events.concat());
        let payloads: Vec<Value> = parsed[..parsed.len() - 1]
            .iter()
            .map(|e| serde_json::from_str(&e.data).unwrap())
            .collect();

        let mut closed = Vec::new();
        for payload in &payloads {
            let choice = &payload["choices"][0];
            let index = choice["index"].as_u64().unwrap();
            assert!(!closed.contains(&index), "event after finish for {index}");
            if choice["delta"] == json!({}) {
                closed.push(index);
            }
        }
        assert_eq!(closed.len(), resp.choices.len());
    }
}

#[test]
fn tool_call_events_come_in_pairs() {
    let (provider, resp) = fixtures().swap_remove(1);
    let events = synthesize(&resp, provider).unwrap();
    let tool_deltas: Vec<Value> = events[..events.len() - 1]
        .iter()
        .map(|e| payload(e)["choices"][0]["delta"].clone())
        .filter(|d| d.get("tool_calls").is_some())
        .collect();
    assert_eq!(tool_deltas.len(), 4);
    for pair in tool_deltas.chunks(2) {
        let head = &pair[0]["tool_calls"][0];
        let tail = &pair[1]["tool_calls"][0];
        assert_eq!(head["index"], tail["index"]);
        assert_eq!(head["function"]["arguments"], "");
        assert!(head["function"]["name"].is_string());
        assert!(tail.get("id").is_none());
        assert!(tail["function"].get("name").is_none());
    }
}

#[test]
fn zero_choices_yield_only_the_sentinel() {
    let resp = response(json!({"id": "empty", "choices": []}));
    assert_eq!(synthesize(&resp, "openai").unwrap(), vec!["data: [DONE]\n\n"]);
}
