//! Consumer-side delta merging for `chat.completion.chunk` streams.
//!
//! Applies events in order and rebuilds, per choice, the message a
//! non-streaming response would have carried.

use serde_json::Value;

use super::sse::{is_done_event, SseParser};
use super::SseEvent;
use crate::error::GatewayError;
use crate::protocol::{ContentBlock, ToolCall};
use crate::protocol::response::ToolCallFunction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Text,
    Thinking,
    Data,
}

#[derive(Debug, Clone, Default)]
struct AccumulatedBlock {
    kind: Option<BlockKind>,
    value: String,
    signature: Option<String>,
}

impl AccumulatedBlock {
    fn append(&mut self, kind: BlockKind, fragment: &str) {
        self.kind.get_or_insert(kind);
        self.value.push_str(fragment);
    }

    fn to_content_block(&self) -> Option<ContentBlock> {
        let block = match self.kind? {
            BlockKind::Text => ContentBlock::Text {
                text: self.value.clone(),
            },
            BlockKind::Thinking => ContentBlock::Thinking {
                thinking: self.value.clone(),
                signature: self.signature.clone(),
            },
            BlockKind::Data => ContentBlock::Data {
                data: self.value.clone(),
            },
        };
        Some(block)
    }
}

/// A tool call rebuilt from its name and argument deltas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccumulatedToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// Everything merged so far for one choice index.
#[derive(Debug, Clone, Default)]
pub struct AccumulatedChoice {
    pub index: u32,
    pub role: Option<String>,
    pub content: String,
    pub tool_calls: Vec<AccumulatedToolCall>,
    pub finish_reason: Option<String>,
    pub grounding_metadata: Option<Value>,
    blocks: Vec<AccumulatedBlock>,
}

impl AccumulatedChoice {
    /// Content blocks in block-index order; gaps are skipped.
    #[must_use]
    pub fn content_blocks(&self) -> Vec<ContentBlock> {
        self.blocks
            .iter()
            .filter_map(AccumulatedBlock::to_content_block)
            .collect()
    }

    /// Tool calls in the response wire shape.
    #[must_use]
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.tool_calls
            .iter()
            .map(|call| ToolCall {
                id: call.id.clone(),
                type_: "function".to_string(),
                function: ToolCallFunction {
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                },
            })
            .collect()
    }

    fn apply_delta(&mut self, delta: &Value) {
        if let Some(role) = delta.get("role").and_then(Value::as_str) {
            self.role = Some(role.to_string());
        }

        let has_blocks = if let Some(blocks) = delta.get("content_blocks").and_then(Value::as_array) {
            for block in blocks {
                self.apply_block_delta(block);
            }
            true
        } else {
            false
        };

        // Text blocks mirror their slice into `content`; avoid double counting.
        if !has_blocks {
            if let Some(content) = delta.get("content").and_then(Value::as_str) {
                self.content.push_str(content);
            }
        }

        if let Some(calls) = delta.get("tool_calls").and_then(Value::as_array) {
            for call in calls {
                self.apply_tool_call_delta(call);
            }
        }
    }

    fn apply_block_delta(&mut self, block: &Value) {
        let Some(index) = block.get("index").and_then(Value::as_u64) else {
            return;
        };
        let Ok(index) = usize::try_from(index) else {
            return;
        };
        if self.blocks.len() <= index {
            self.blocks.resize_with(index + 1, AccumulatedBlock::default);
        }
        let target = &mut self.blocks[index];
        let Some(delta) = block.get("delta") else {
            return;
        };
        if let Some(text) = delta.get("text").and_then(Value::as_str) {
            target.append(BlockKind::Text, text);
            self.content.push_str(text);
        }
        if let Some(thinking) = delta.get("thinking").and_then(Value::as_str) {
            target.append(BlockKind::Thinking, thinking);
        }
        if let Some(data) = delta.get("data").and_then(Value::as_str) {
            target.append(BlockKind::Data, data);
        }
        if let Some(signature) = delta.get("signature").and_then(Value::as_str) {
            target.signature = Some(signature.to_string());
        }
    }

    fn apply_tool_call_delta(&mut self, call: &Value) {
        let Some(index) = call
            .get("index")
            .and_then(Value::as_u64)
            .and_then(|i| usize::try_from(i).ok())
        else {
            return;
        };
        if self.tool_calls.len() <= index {
            self.tool_calls
                .resize_with(index + 1, AccumulatedToolCall::default);
        }
        let target = &mut self.tool_calls[index];
        if let Some(id) = call.get("id").and_then(Value::as_str) {
            target.id = id.to_string();
        }
        if let Some(function) = call.get("function") {
            if let Some(name) = function.get("name").and_then(Value::as_str) {
                target.name = name.to_string();
            }
            if let Some(arguments) = function.get("arguments").and_then(Value::as_str) {
                target.arguments.push_str(arguments);
            }
        }
    }
}

/// Rebuilds complete choices from a `chat.completion.chunk` SSE stream.
#[derive(Debug, Default)]
pub struct ChunkAccumulator {
    parser: SseParser,
    id: Option<String>,
    model: Option<String>,
    usage: Option<Value>,
    choices: Vec<AccumulatedChoice>,
    events_seen: usize,
    done: bool,
}

impl ChunkAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw SSE text (any split) and apply every complete event.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Translation`] when an event is not valid chunk
    /// JSON or arrives after the `[DONE]` sentinel.
    pub fn feed(&mut self, text: &str) -> Result<(), GatewayError> {
        for event in self.parser.feed(text) {
            self.apply_event(&event)?;
        }
        Ok(())
    }

    /// Apply one parsed SSE event.
    ///
    /// # Errors
    ///
    /// See [`ChunkAccumulator::feed`].
    pub fn apply_event(&mut self, event: &SseEvent) -> Result<(), GatewayError> {
        if self.done {
            return Err(GatewayError::Translation(
                "Received an event after [DONE]".to_string(),
            ));
        }
        self.events_seen += 1;
        if is_done_event(event) {
            self.done = true;
            return Ok(());
        }
        let chunk: Value = serde_json::from_str(&event.data)
            .map_err(|e| GatewayError::Translation(format!("Invalid chunk JSON: {e}")))?;
        self.apply_chunk(&chunk);
        Ok(())
    }

    /// Merge one decoded chunk object.
    pub fn apply_chunk(&mut self, chunk: &Value) {
        if let Some(id) = chunk.get("id").and_then(Value::as_str) {
            self.id.get_or_insert_with(|| id.to_string());
        }
        if let Some(model) = chunk.get("model").and_then(Value::as_str) {
            self.model.get_or_insert_with(|| model.to_string());
        }
        if let Some(usage) = chunk.get("usage").filter(|u| !u.is_null()) {
            self.usage = Some(usage.clone());
        }

        let Some(choices) = chunk.get("choices").and_then(Value::as_array) else {
            return;
        };
        for choice in choices {
            let index = choice
                .get("index")
                .and_then(Value::as_u64)
                .and_then(|i| u32::try_from(i).ok())
                .unwrap_or(0);
            let target = self.choice_mut(index);
            if let Some(delta) = choice.get("delta") {
                target.apply_delta(delta);
            }
            if let Some(reason) = choice.get("finish_reason").and_then(Value::as_str) {
                target.finish_reason = Some(reason.to_string());
            }
            if let Some(grounding) = choice.get("groundingMetadata") {
                target.grounding_metadata = Some(grounding.clone());
            }
        }
    }

    fn choice_mut(&mut self, index: u32) -> &mut AccumulatedChoice {
        let position = match self.choices.iter().position(|c| c.index == index) {
            Some(position) => position,
            None => {
                self.choices.push(AccumulatedChoice {
                    index,
                    ..AccumulatedChoice::default()
                });
                self.choices.len() - 1
            }
        };
        &mut self.choices[position]
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    #[must_use]
    pub fn events_seen(&self) -> usize {
        self.events_seen
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    #[must_use]
    pub fn usage(&self) -> Option<&Value> {
        self.usage.as_ref()
    }

    /// Choices in order of first appearance.
    #[must_use]
    pub fn choices(&self) -> &[AccumulatedChoice] {
        &self.choices
    }
}
