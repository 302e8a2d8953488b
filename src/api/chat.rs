use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::error::GatewayError;
use crate::observability::{log_request_complete, log_synthesis};
use crate::passthrough::transform_non_streaming;
use crate::protocol::params::apply_param_table;
use crate::protocol::ChatResponse;
use crate::state::AppState;
use crate::synth::synthesize;
use crate::transport::{PreparedUpstream, UpstreamReply};

pub async fn handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match handler_inner(&state, &headers, &body).await {
        Ok(response) => response,
        Err(err) => {
            tracing::debug!("chat completion failed: {err}");
            err.into_response()
        }
    }
}

async fn handler_inner(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Response, GatewayError> {
    state.authenticate(headers)?;

    let mut request = parse_chat_request(body)?;
    let model = request
        .get("model")
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::InvalidRequest("Missing 'model' field".to_string()))?
        .to_string();
    let wants_stream = request
        .get("stream")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let route = state.model_router.resolve(&model)?;
    let upstream = state.upstream(route.upstream_index)?;
    let upstream_body = build_upstream_body(&mut request, route.actual_model, upstream.provider())?;

    let start_time = Instant::now();
    let reply = state.transport.send_chat(upstream, upstream_body).await?;

    if !reply.status.is_success() {
        return Ok(upstream_error_response(state, upstream, reply));
    }

    if wants_stream && state.config.features.synthetic_streaming {
        let response: ChatResponse = serde_json::from_slice(&reply.body).map_err(|e| {
            GatewayError::Translation(format!(
                "Invalid chat completion from upstream '{}': {e}",
                upstream.name()
            ))
        })?;
        let synth_start = Instant::now();
        let events = synthesize(&response, upstream.provider())?;
        log_synthesis(
            upstream.provider(),
            response.model.as_deref().unwrap_or(route.actual_model),
            response.choices.len(),
            events.len(),
            synth_start.elapsed(),
        );
        log_request_complete(route.actual_model, response.usage.as_ref(), start_time);
        return Ok(sse_response(events));
    }

    tracing::debug!(
        upstream = upstream.name(),
        model = route.actual_model,
        bytes = reply.body.len(),
        "forwarding non-streaming response"
    );
    Ok(json_bytes_response(reply.status, reply.body))
}

fn parse_chat_request(body: &Bytes) -> Result<Map<String, Value>, GatewayError> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(GatewayError::InvalidRequest(
            "Request body must be a JSON object".to_string(),
        )),
        Err(e) => Err(GatewayError::InvalidRequest(format!(
            "Invalid chat completion request body: {e}"
        ))),
    }
}

/// Rewrite the client body for the upstream: resolved model, provider
/// parameter table, and a forced non-streaming call.
fn build_upstream_body(
    request: &mut Map<String, Value>,
    actual_model: &str,
    provider: &str,
) -> Result<Bytes, GatewayError> {
    request.insert("model".to_string(), Value::String(actual_model.to_string()));
    apply_param_table(provider, request)?;
    request.insert("stream".to_string(), Value::Bool(false));
    request.remove("stream_options");
    serde_json::to_vec(request)
        .map(Bytes::from)
        .map_err(|e| GatewayError::Internal(format!("Failed to serialize upstream request: {e}")))
}

fn upstream_error_response(
    state: &AppState,
    upstream: &PreparedUpstream,
    reply: UpstreamReply,
) -> Response {
    tracing::warn!(
        upstream = upstream.name(),
        status = reply.status.as_u16(),
        "upstream returned an error"
    );
    match serde_json::from_slice::<Value>(&reply.body) {
        Ok(body) => {
            let body = transform_non_streaming(
                reply.status,
                body,
                upstream.provider(),
                state.error_transform(),
            );
            (reply.status, Json(body)).into_response()
        }
        Err(_) => GatewayError::Upstream {
            status: reply.status.as_u16(),
            message: String::from_utf8_lossy(&reply.body).into_owned(),
        }
        .into_response(),
    }
}

fn sse_response(events: Vec<String>) -> Response {
    let stream = futures_util::stream::iter(
        events
            .into_iter()
            .map(|event| Ok::<_, Infallible>(Bytes::from(event))),
    );
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream")),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}

fn json_bytes_response(status: StatusCode, body: Bytes) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("object fixture"),
        }
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(parse_chat_request(&Bytes::from_static(b"[1,2]")).is_err());
        assert!(parse_chat_request(&Bytes::from_static(b"{bad")).is_err());
        assert!(parse_chat_request(&Bytes::from_static(b"{\"model\":\"m\"}")).is_ok());
    }

    #[test]
    fn test_upstream_body_forces_non_streaming() {
        let mut req = request(json!({
            "model": "smart",
            "messages": [{"role": "user", "content": "hi"}],
            "stream": true,
            "stream_options": {"include_usage": true}
        }));
        let out = build_upstream_body(&mut req, "gpt-4o", "openai").unwrap();
        let out: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(out["model"], "gpt-4o");
        assert_eq!(out["stream"], false);
        assert!(out.get("stream_options").is_none());
        assert_eq!(out["messages"][0]["content"], "hi");
    }

    #[test]
    fn test_upstream_body_applies_param_table() {
        let mut req = request(json!({
            "model": "claude",
            "messages": [],
            "temperature": 1.7,
            "stop": ["END"]
        }));
        let out = build_upstream_body(&mut req, "claude-sonnet-4", "anthropic").unwrap();
        let out: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(out["max_tokens"], 4096);
        assert_eq!(out["temperature"], 1.0);
        assert_eq!(out["stop"], json!(["END"]));
        assert!(out.get("stop_sequences").is_none());
    }
}
