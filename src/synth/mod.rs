//! Synthetic streaming: turn a complete chat completion into the
//! `chat.completion.chunk` SSE events a streaming upstream would have sent.
//!
//! Every event carries the same envelope (id, model, timestamp, usage, ...)
//! and a single choice whose `delta` differs per event. The envelope is
//! serialized once per response and reused as a prefix for every event.

pub mod usage;

use crate::error::GatewayError;
use crate::protocol::chunk::{
    BlockFieldDelta, ChunkChoice, ChunkDelta, ChunkEnvelope, ContentBlockDelta, FunctionDelta,
    ToolCallDelta, ASSISTANT_ROLE, CHUNK_OBJECT,
};
use crate::protocol::{ChatResponse, Choice, ContentBlock, ToolCall};
use crate::stream::sse::{DATA_PREFIX, DONE_FRAME, FRAME_END};
use crate::util::unix_now_secs;

pub use usage::aggregate_usage;

/// Maximum number of characters carried by one text, thinking or data delta.
pub const SLICE_CHARS: usize = 500;

/// Synthesize the full SSE event sequence for a complete response.
///
/// The result always ends with exactly one `data: [DONE]\n\n` event.
///
/// # Errors
///
/// Returns [`GatewayError::Internal`] when an event cannot be serialized; no
/// partial sequence is returned in that case.
pub fn synthesize(response: &ChatResponse, provider: &str) -> Result<Vec<String>, GatewayError> {
    synthesize_with_created(response, provider, unix_now_secs())
}

/// Same as [`synthesize`] but with a caller-provided `created` timestamp.
///
/// # Errors
///
/// Returns [`GatewayError::Internal`] when an event cannot be serialized.
pub fn synthesize_with_created(
    response: &ChatResponse,
    provider: &str,
    created: u64,
) -> Result<Vec<String>, GatewayError> {
    let envelope = ChunkEnvelope {
        id: &response.id,
        object: CHUNK_OBJECT,
        created,
        model: response.model.as_deref().unwrap_or_default(),
        system_fingerprint: response.system_fingerprint.as_deref(),
        provider,
        usage: aggregate_usage(response.usage.as_ref(), provider),
        citations: response.citations.as_deref(),
    };

    let mut writer = EventWriter::new(&envelope, estimate_event_count(response))?;
    for choice in &response.choices {
        writer.emit_choice(choice)?;
    }
    Ok(writer.finish())
}

/// Which payload field of a content block a slice belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockField {
    Text,
    Thinking,
    Data,
}

impl BlockField {
    fn delta(self, slice: &str) -> BlockFieldDelta<'_> {
        match self {
            BlockField::Text => BlockFieldDelta {
                text: Some(slice),
                ..BlockFieldDelta::default()
            },
            BlockField::Thinking => BlockFieldDelta {
                thinking: Some(slice),
                ..BlockFieldDelta::default()
            },
            BlockField::Data => BlockFieldDelta {
                data: Some(slice),
                ..BlockFieldDelta::default()
            },
        }
    }

    /// Only text slices are mirrored into the flat `delta.content`.
    fn mirrors_flat_content(self) -> bool {
        self == BlockField::Text
    }
}

struct EventWriter {
    /// `data: {<envelope fields>,"choices":[`
    prefix: String,
    events: Vec<String>,
}

impl EventWriter {
    fn new(envelope: &ChunkEnvelope<'_>, capacity: usize) -> Result<Self, GatewayError> {
        let json = serde_json::to_string(envelope)
            .map_err(|e| GatewayError::Internal(format!("Failed to serialize chunk envelope: {e}")))?;
        let fields = json.strip_suffix('}').ok_or_else(|| {
            GatewayError::Internal("Chunk envelope did not serialize to an object".to_string())
        })?;

        let mut prefix = String::with_capacity(DATA_PREFIX.len() + fields.len() + 13);
        prefix.push_str(DATA_PREFIX);
        prefix.push_str(fields);
        prefix.push_str(",\"choices\":[");
        Ok(Self {
            prefix,
            events: Vec::with_capacity(capacity),
        })
    }

    fn push(&mut self, choice: &ChunkChoice<'_>) -> Result<(), GatewayError> {
        let choice_json = serde_json::to_string(choice)
            .map_err(|e| GatewayError::Internal(format!("Failed to serialize chunk choice: {e}")))?;
        let mut out =
            String::with_capacity(self.prefix.len() + choice_json.len() + 2 + FRAME_END.len());
        out.push_str(&self.prefix);
        out.push_str(&choice_json);
        out.push_str("]}");
        out.push_str(FRAME_END);
        self.events.push(out);
        Ok(())
    }

    fn emit_choice(&mut self, choice: &Choice) -> Result<(), GatewayError> {
        let message = &choice.message;

        if let Some(blocks) = &message.content_blocks {
            for (block_index, block) in blocks.iter().enumerate() {
                self.emit_content_block(choice.index, block_index, block)?;
            }
        }

        if let Some(tool_calls) = message.tool_calls.as_deref() {
            for (call_index, call) in tool_calls.iter().enumerate() {
                self.emit_tool_call(choice.index, call_index, call)?;
            }
        }

        if message.content_blocks.is_none() {
            if let Some(content) = message.content.as_deref().filter(|c| !c.is_empty()) {
                for slice in char_windows(content, SLICE_CHARS) {
                    self.push(&ChunkChoice {
                        index: choice.index,
                        delta: ChunkDelta {
                            role: Some(ASSISTANT_ROLE),
                            content: Some(Some(slice)),
                            ..ChunkDelta::default()
                        },
                        grounding_metadata: choice.grounding_metadata.as_ref(),
                        finish_reason: None,
                    })?;
                }
            }
        }

        self.push(&ChunkChoice {
            index: choice.index,
            delta: ChunkDelta::default(),
            grounding_metadata: None,
            finish_reason: choice.finish_reason.as_deref(),
        })
    }

    fn emit_content_block(
        &mut self,
        choice_index: u32,
        block_index: usize,
        block: &ContentBlock,
    ) -> Result<(), GatewayError> {
        match block {
            ContentBlock::Text { text } => {
                self.emit_block_slices(choice_index, block_index, BlockField::Text, text)
            }
            ContentBlock::Thinking {
                thinking,
                signature,
            } => {
                self.emit_block_slices(choice_index, block_index, BlockField::Thinking, thinking)?;
                self.push(&ChunkChoice {
                    index: choice_index,
                    delta: ChunkDelta {
                        content_blocks: Some([ContentBlockDelta {
                            index: block_index,
                            delta: BlockFieldDelta {
                                signature: signature.as_deref(),
                                ..BlockFieldDelta::default()
                            },
                        }]),
                        ..ChunkDelta::default()
                    },
                    grounding_metadata: None,
                    finish_reason: None,
                })
            }
            ContentBlock::Data { data } => {
                self.emit_block_slices(choice_index, block_index, BlockField::Data, data)
            }
        }
    }

    fn emit_block_slices(
        &mut self,
        choice_index: u32,
        block_index: usize,
        field: BlockField,
        value: &str,
    ) -> Result<(), GatewayError> {
        for slice in char_windows(value, SLICE_CHARS) {
            self.push(&ChunkChoice {
                index: choice_index,
                delta: ChunkDelta {
                    role: Some(ASSISTANT_ROLE),
                    content: field.mirrors_flat_content().then_some(Some(slice)),
                    content_blocks: Some([ContentBlockDelta {
                        index: block_index,
                        delta: field.delta(slice),
                    }]),
                    tool_calls: None,
                },
                grounding_metadata: None,
                finish_reason: None,
            })?;
        }
        Ok(())
    }

    fn emit_tool_call(
        &mut self,
        choice_index: u32,
        call_index: usize,
        call: &ToolCall,
    ) -> Result<(), GatewayError> {
        self.push(&ChunkChoice {
            index: choice_index,
            delta: ChunkDelta {
                content: Some(None),
                tool_calls: Some([ToolCallDelta {
                    index: call_index,
                    id: Some(&call.id),
                    type_: Some("function"),
                    function: FunctionDelta {
                        name: Some(&call.function.name),
                        arguments: "",
                    },
                }]),
                ..ChunkDelta::default()
            },
            grounding_metadata: None,
            finish_reason: None,
        })?;
        self.push(&ChunkChoice {
            index: choice_index,
            delta: ChunkDelta {
                tool_calls: Some([ToolCallDelta {
                    index: call_index,
                    id: None,
                    type_: None,
                    function: FunctionDelta {
                        name: None,
                        arguments: &call.function.arguments,
                    },
                }]),
                ..ChunkDelta::default()
            },
            grounding_metadata: None,
            finish_reason: None,
        })
    }

    fn finish(mut self) -> Vec<String> {
        self.events.push(DONE_FRAME.to_owned());
        self.events
    }
}

/// Split `value` into consecutive windows of at most `width` characters.
///
/// An empty string yields exactly one empty window. Windows never split a
/// character.
pub(crate) fn char_windows(value: &str, width: usize) -> impl Iterator<Item = &str> {
    debug_assert!(width > 0);
    let mut rest = Some(value);
    std::iter::from_fn(move || {
        let current = rest?;
        let split = current
            .char_indices()
            .nth(width)
            .map_or(current.len(), |(byte_index, _)| byte_index);
        let (head, tail) = current.split_at(split);
        rest = (!tail.is_empty()).then_some(tail);
        Some(head)
    })
}

fn slice_count(value: &str) -> usize {
    value.chars().count().div_ceil(SLICE_CHARS).max(1)
}

fn estimate_event_count(response: &ChatResponse) -> usize {
    let mut count = 1;
    for choice in &response.choices {
        let message = &choice.message;
        count += 1;
        if let Some(blocks) = &message.content_blocks {
            for block in blocks {
                count += match block {
                    ContentBlock::Text { text } => slice_count(text),
                    ContentBlock::Thinking { thinking, .. } => slice_count(thinking) + 1,
                    ContentBlock::Data { data } => slice_count(data),
                };
            }
        } else if let Some(content) = message.content.as_deref().filter(|c| !c.is_empty()) {
            count += slice_count(content);
        }
        count += message.tool_calls.as_ref().map_or(0, |calls| calls.len() * 2);
    }
    count
}
