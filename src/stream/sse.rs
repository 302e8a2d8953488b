//! SSE framing for synthesized events and an incremental parser for
//! consumers reading them back.

use memchr::memchr_iter;

use super::SseEvent;

/// Field prefix opening an unnamed `data` event.
pub const DATA_PREFIX: &str = "data: ";

/// Blank line terminating an event.
pub const FRAME_END: &str = "\n\n";

/// Terminal sentinel closing every synthesized stream.
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Frame a payload as a single unnamed SSE `data` event.
#[must_use]
pub fn sse_data_frame(payload: &str) -> String {
    let mut out = String::with_capacity(DATA_PREFIX.len() + payload.len() + FRAME_END.len());
    out.push_str(DATA_PREFIX);
    out.push_str(payload);
    out.push_str(FRAME_END);
    out
}

/// Check if an [`SseEvent`] is the terminal `[DONE]` event.
#[must_use]
pub fn is_done_event(event: &SseEvent) -> bool {
    event.data.trim() == "[DONE]"
}

/// Incremental SSE line parser.
///
/// Feed it text chunks split at arbitrary boundaries and it yields
/// fully-assembled [`SseEvent`] frames.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
    event_type: Option<String>,
    data_buffer: String,
    has_data: bool,
    last_event_id: Option<String>,
    retry: Option<u64>,
}

impl SseParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw text and return any complete events parsed.
    pub fn feed(&mut self, chunk: &str) -> Vec<SseEvent> {
        let mut out = Vec::new();
        self.feed_into(chunk, &mut out);
        out
    }

    /// Feed raw text and append complete events into a caller-provided buffer.
    ///
    /// - `data:` lines append to the data buffer, joined with `\n`
    /// - an empty line terminates a frame
    /// - `:` lines are comments
    /// - `event:`, `id:` and `retry:` set the matching field
    pub fn feed_into(&mut self, chunk: &str, out: &mut Vec<SseEvent>) {
        self.buffer.push_str(chunk);
        let buffer = std::mem::take(&mut self.buffer);
        let mut processed_up_to = 0;
        for line_end in memchr_iter(b'\n', buffer.as_bytes()) {
            let line = &buffer[processed_up_to..line_end];
            self.process_line(line.strip_suffix('\r').unwrap_or(line), out);
            processed_up_to = line_end + 1;
        }
        self.buffer = buffer;
        self.buffer.drain(..processed_up_to);
    }

    fn process_line(&mut self, line: &str, out: &mut Vec<SseEvent>) {
        if line.is_empty() {
            if self.has_data {
                out.push(SseEvent {
                    event: self.event_type.take(),
                    data: std::mem::take(&mut self.data_buffer),
                    id: self.last_event_id.clone(),
                    retry: self.retry.take(),
                });
                self.has_data = false;
            }
            return;
        }

        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => {
                if self.has_data {
                    self.data_buffer.push('\n');
                } else {
                    self.has_data = true;
                }
                self.data_buffer.push_str(value);
            }
            "event" => self.event_type = Some(value.to_string()),
            "id" => self.last_event_id = Some(value.to_string()),
            "retry" => self.retry = value.trim().parse().ok(),
            _ => {}
        }
    }
}
