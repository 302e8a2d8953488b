//! Declarative request parameter tables per provider family.
//!
//! Each entry names a client-facing chat-completions parameter, the name the
//! upstream expects, and optional default/min/max/required constraints.
//! Every upstream is reached through its OpenAI-compatible endpoint, so the
//! built-in tables keep OpenAI wire names.

use serde_json::{Map, Number, Value};

use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDefault {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ParamDefault {
    fn to_value(self) -> Value {
        match self {
            ParamDefault::Int(v) => Value::from(v),
            ParamDefault::Float(v) => Number::from_f64(v).map_or(Value::Null, Value::Number),
            ParamDefault::Bool(v) => Value::Bool(v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub param: &'static str,
    pub wire_name: &'static str,
    pub default: Option<ParamDefault>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub required: bool,
}

impl ParamSpec {
    const fn same(param: &'static str) -> Self {
        Self {
            param,
            wire_name: param,
            default: None,
            min: None,
            max: None,
            required: false,
        }
    }

    const fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    const fn at_least(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    const fn default(mut self, default: ParamDefault) -> Self {
        self.default = Some(default);
        self
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

const OPENAI_PARAMS: &[ParamSpec] = &[
    ParamSpec::same("temperature").range(0.0, 2.0),
    ParamSpec::same("top_p").range(0.0, 1.0),
    ParamSpec::same("n").at_least(1.0),
    ParamSpec::same("presence_penalty").range(-2.0, 2.0),
    ParamSpec::same("frequency_penalty").range(-2.0, 2.0),
    ParamSpec::same("max_tokens").at_least(0.0),
];

const ANTHROPIC_PARAMS: &[ParamSpec] = &[
    ParamSpec::same("max_tokens")
        .at_least(1.0)
        .default(ParamDefault::Int(4096))
        .required(),
    ParamSpec::same("temperature")
        .range(0.0, 1.0)
        .default(ParamDefault::Float(1.0)),
    ParamSpec::same("top_p").range(0.0, 1.0),
    ParamSpec::same("top_k").at_least(0.0),
];

const GOOGLE_PARAMS: &[ParamSpec] = &[
    ParamSpec::same("max_tokens").at_least(1.0),
    ParamSpec::same("temperature").range(0.0, 2.0),
    ParamSpec::same("top_p").range(0.0, 1.0),
    ParamSpec::same("top_k").at_least(1.0),
];

const PERPLEXITY_PARAMS: &[ParamSpec] = &[
    ParamSpec::same("max_tokens").at_least(1.0),
    ParamSpec::same("temperature")
        .range(0.0, 2.0)
        .default(ParamDefault::Float(0.2)),
    ParamSpec::same("top_p").range(0.0, 1.0),
    ParamSpec::same("top_k").range(0.0, 2048.0),
    ParamSpec::same("return_citations").default(ParamDefault::Bool(false)),
    ParamSpec::same("presence_penalty").range(-2.0, 2.0),
    ParamSpec::same("frequency_penalty").range(0.0, 2.0),
];

/// Parameter table for a provider. Providers without a table forward
/// parameters unchanged.
#[must_use]
pub fn param_table(provider: &str) -> &'static [ParamSpec] {
    match provider {
        "openai" | "azure-openai" | "groq" | "mistral-ai" | "together-ai" | "deepseek" => {
            OPENAI_PARAMS
        }
        "anthropic" | "bedrock" => ANTHROPIC_PARAMS,
        "google" | "vertex-ai" => GOOGLE_PARAMS,
        "perplexity-ai" => PERPLEXITY_PARAMS,
        _ => &[],
    }
}

/// Apply the provider's parameter table to a request body in place.
///
/// Known parameters are written under their wire name, clamped into range
/// and filled from defaults; unknown keys are left untouched.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] when a required parameter is
/// missing and has no default.
pub fn apply_param_table(
    provider: &str,
    body: &mut Map<String, Value>,
) -> Result<(), GatewayError> {
    apply_specs(param_table(provider), provider, body)
}

fn apply_specs(
    table: &[ParamSpec],
    provider: &str,
    body: &mut Map<String, Value>,
) -> Result<(), GatewayError> {
    for spec in table {
        let value = body.remove(spec.param).filter(|v| !v.is_null());
        let value = match (value, spec.default) {
            (Some(value), _) => clamp_number(value, spec.min, spec.max),
            (None, Some(default)) => default.to_value(),
            (None, None) if spec.required => {
                return Err(GatewayError::InvalidRequest(format!(
                    "Missing required parameter '{}' for provider '{provider}'",
                    spec.param
                )));
            }
            (None, None) => continue,
        };
        body.insert(spec.wire_name.to_string(), value);
    }
    Ok(())
}

fn clamp_number(value: Value, min: Option<f64>, max: Option<f64>) -> Value {
    let Value::Number(number) = &value else {
        return value;
    };
    let Some(raw) = number.as_f64() else {
        return value;
    };
    let mut clamped = raw;
    if let Some(min) = min {
        clamped = clamped.max(min);
    }
    if let Some(max) = max {
        clamped = clamped.min(max);
    }
    if (clamped - raw).abs() < f64::EPSILON {
        return value;
    }
    if number.is_f64() {
        return Number::from_f64(clamped).map_or(value, Value::Number);
    }
    #[allow(clippy::cast_possible_truncation)]
    let int = clamped.round() as i64;
    Value::from(int)
}
