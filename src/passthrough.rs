//! Non-streaming response passthrough.

use http::StatusCode;
use serde_json::Value;

use crate::protocol::error_shapes::{is_error_shaped, ErrorResponseTransform};

/// Return the body a non-streaming client should see for an upstream reply.
///
/// Failed calls with an error-shaped body are rewritten through `transform`;
/// everything else is returned unchanged.
#[must_use]
pub fn transform_non_streaming(
    status: StatusCode,
    body: Value,
    provider: &str,
    transform: &dyn ErrorResponseTransform,
) -> Value {
    if status.is_success() || !is_error_shaped(&body) {
        return body;
    }
    let shaped = transform.transform(&body, provider);
    match serde_json::to_value(&shaped) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!("failed to serialize transformed {provider} error: {err}");
            body
        }
    }
}
