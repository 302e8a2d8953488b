use serde::Serialize;
use serde_json::Value;

use crate::error::ErrorCategory;

fn gateway_error_type(cat: ErrorCategory) -> &'static str {
    match cat {
        ErrorCategory::InvalidRequest => "invalid_request_error",
        ErrorCategory::Authentication => "authentication_error",
        ErrorCategory::Permission => "permission_error",
        ErrorCategory::NotFound => "not_found_error",
        ErrorCategory::RateLimit => "rate_limit_error",
        ErrorCategory::ServerError | ErrorCategory::Unknown => "server_error",
    }
}

fn gateway_error_code(cat: ErrorCategory) -> &'static str {
    match cat {
        ErrorCategory::InvalidRequest => "invalid_request",
        ErrorCategory::Authentication => "invalid_api_key",
        ErrorCategory::Permission => "permission_denied",
        ErrorCategory::NotFound => "not_found",
        ErrorCategory::RateLimit => "rate_limit_exceeded",
        ErrorCategory::ServerError | ErrorCategory::Unknown => "server_error",
    }
}

#[must_use]
pub(crate) fn gateway_error_payload(
    cat: ErrorCategory,
    message: &str,
    provider: Option<&str>,
) -> Value {
    let mut payload = serde_json::json!({
        "error": {
            "message": message,
            "type": gateway_error_type(cat),
            "code": gateway_error_code(cat),
            "param": null,
        }
    });
    if let Some(provider) = provider {
        payload["provider"] = Value::String(provider.to_string());
    }
    payload
}

/// Gateway-shaped error returned to clients in place of an upstream error body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub param: Option<Value>,
    pub code: Option<Value>,
}

/// Shapes an upstream error body into the gateway's error envelope.
pub trait ErrorResponseTransform: Send + Sync {
    fn transform(&self, body: &Value, provider: &str) -> ErrorResponse;
}

/// Default transform understanding the OpenAI, Anthropic and Google error shapes.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpstreamErrorTransform;

impl ErrorResponseTransform for UpstreamErrorTransform {
    fn transform(&self, body: &Value, provider: &str) -> ErrorResponse {
        let error = body.get("error");
        let detail = match error {
            // {"error": "message"}
            Some(Value::String(message)) => ErrorDetail {
                message: prefixed_message(provider, message),
                type_: None,
                param: None,
                code: None,
            },
            Some(Value::Object(fields)) => {
                let message = fields
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                // Google puts the canonical code in `status`; OpenAI and
                // Anthropic use `type`.
                let type_ = fields
                    .get("type")
                    .or_else(|| fields.get("status"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                ErrorDetail {
                    message: prefixed_message(provider, message),
                    type_,
                    param: fields.get("param").filter(|v| !v.is_null()).cloned(),
                    code: fields.get("code").filter(|v| !v.is_null()).cloned(),
                }
            }
            _ => ErrorDetail {
                message: prefixed_message(provider, &body.to_string()),
                type_: None,
                param: None,
                code: None,
            },
        };
        ErrorResponse {
            error: detail,
            provider: provider.to_string(),
        }
    }
}

fn prefixed_message(provider: &str, message: &str) -> String {
    format!("{provider} error: {message}")
}

/// Whether a body looks like an upstream error payload.
#[must_use]
pub fn is_error_shaped(body: &Value) -> bool {
    body.as_object()
        .and_then(|fields| fields.get("error"))
        .is_some_and(|error| !error.is_null())
}
