//! Borrowed wire types for synthesized `chat.completion.chunk` events.
//!
//! Everything here borrows from the source [`ChatResponse`](super::ChatResponse),
//! so building an event never clones message content.

use serde::Serialize;
use serde_json::Value;

pub const CHUNK_OBJECT: &str = "chat.completion.chunk";
pub const ASSISTANT_ROLE: &str = "assistant";

/// Fields shared verbatim by every event synthesized from one response.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkEnvelope<'a> {
    pub id: &'a str,
    pub object: &'static str,
    pub created: u64,
    pub model: &'a str,
    pub system_fingerprint: Option<&'a str>,
    pub provider: &'a str,
    pub usage: ChunkUsage<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations: Option<&'a [Value]>,
}

/// Aggregated usage embedded in every event of a response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChunkUsage<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_creation_input_tokens: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_search_queries: Option<u64>,
}

/// The single choice carried by one event.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkChoice<'a> {
    pub index: u32,
    pub delta: ChunkDelta<'a>,
    #[serde(rename = "groundingMetadata", skip_serializing_if = "Option::is_none")]
    pub grounding_metadata: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<&'a str>,
}

/// Incremental message delta. `content: Some(None)` serializes as `null`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChunkDelta<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Option<&'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_blocks: Option<[ContentBlockDelta<'a>; 1]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<[ToolCallDelta<'a>; 1]>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentBlockDelta<'a> {
    pub index: usize,
    pub delta: BlockFieldDelta<'a>,
}

/// Payload of a content-block delta; at most one field is set per event.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BlockFieldDelta<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolCallDelta<'a> {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<&'static str>,
    pub function: FunctionDelta<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDelta<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    pub arguments: &'a str,
}
