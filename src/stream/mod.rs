pub mod accumulator;
pub mod sse;

pub use accumulator::{AccumulatedChoice, AccumulatedToolCall, ChunkAccumulator};
pub use sse::{is_done_event, sse_data_frame, SseParser, DATA_PREFIX, DONE_FRAME, FRAME_END};

/// A parsed SSE frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
    pub retry: Option<u64>,
}
