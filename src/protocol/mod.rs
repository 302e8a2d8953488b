pub mod chunk;
pub mod error_shapes;
pub mod params;
pub mod provider;
pub mod response;

pub use provider::{is_known_provider, reports_cache_tokens, KNOWN_PROVIDERS};
pub use response::{ChatResponse, Choice, ContentBlock, Message, ToolCall, Usage};
