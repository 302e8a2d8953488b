use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Complete (non-streaming) chat completion response as returned upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Value>>,
}

/// A single choice in the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(
        rename = "groundingMetadata",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub grounding_metadata: Option<Value>,
}

/// Assistant message carried by a choice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_blocks: Option<Vec<ContentBlock>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// One unit of a structured message body.
///
/// On the wire the kind is decided by which payload field is populated;
/// exactly one of `text`, `thinking` and `data` must be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ContentBlockWire", into = "ContentBlockWire")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
        signature: Option<String>,
    },
    Data {
        data: String,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ContentBlockWire {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    block_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thinking: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<String>,
}

impl TryFrom<ContentBlockWire> for ContentBlock {
    type Error = String;

    fn try_from(wire: ContentBlockWire) -> Result<Self, Self::Error> {
        match (wire.text, wire.thinking, wire.data) {
            (Some(text), None, None) => Ok(ContentBlock::Text { text }),
            (None, Some(thinking), None) => Ok(ContentBlock::Thinking {
                thinking,
                signature: wire.signature,
            }),
            (None, None, Some(data)) => Ok(ContentBlock::Data { data }),
            (None, None, None) => Err(format!(
                "content block of type '{}' has no text, thinking or data field",
                wire.block_type.as_deref().unwrap_or("unknown")
            )),
            _ => Err("content block must populate exactly one of text, thinking, data".to_string()),
        }
    }
}

impl From<ContentBlock> for ContentBlockWire {
    fn from(block: ContentBlock) -> Self {
        match block {
            ContentBlock::Text { text } => ContentBlockWire {
                block_type: Some("text".to_string()),
                text: Some(text),
                ..ContentBlockWire::default()
            },
            ContentBlock::Thinking {
                thinking,
                signature,
            } => ContentBlockWire {
                block_type: Some("thinking".to_string()),
                thinking: Some(thinking),
                signature,
                ..ContentBlockWire::default()
            },
            ContentBlock::Data { data } => ContentBlockWire {
                block_type: Some("redacted_thinking".to_string()),
                data: Some(data),
                ..ContentBlockWire::default()
            },
        }
    }
}

/// A tool call within a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "default_tool_type")]
    pub type_: String,
    pub function: ToolCallFunction,
}

fn default_tool_type() -> String {
    "function".to_string()
}

/// The function part of a tool call. `arguments` stays a serialized string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// Usage statistics as reported by the upstream.
///
/// Cache counters are kept as raw JSON so that a defined zero can be told
/// apart from a missing or malformed value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_creation_input_tokens: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_search_queries: Option<u64>,
}
