use std::time::Duration;

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::protocol::Usage;

/// Initialize the tracing subscriber with the configured log level.
///
/// Maps config log levels to tracing levels:
/// - "DISABLED" -> no subscriber installed
/// - "WARNING" -> WARN
/// - "CRITICAL" -> ERROR
/// - Others map directly (DEBUG, INFO, ERROR)
pub fn init_tracing(log_level: &str) {
    let level = log_level.to_uppercase();

    if level == "DISABLED" {
        return;
    }

    let filter = EnvFilter::try_new(tracing_directive(&level))
        .unwrap_or_else(|_| EnvFilter::new("INFO"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

fn tracing_directive(level: &str) -> &str {
    match level {
        "WARNING" => "WARN",
        "CRITICAL" => "ERROR",
        other => other,
    }
}

/// Log one synthesized response.
pub fn log_synthesis(
    provider: &str,
    model: &str,
    choices: usize,
    events: usize,
    elapsed: Duration,
) {
    debug!(
        provider = provider,
        model = model,
        choices = choices,
        events = events,
        elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
        "synthesized chunk stream"
    );
}

/// Log token usage for a completed request at INFO level.
pub fn log_request_complete(model: &str, usage: Option<&Usage>, start_time: std::time::Instant) {
    let usage = usage.cloned().unwrap_or_default();
    info!(
        model = model,
        prompt_tokens = usage.prompt_tokens.unwrap_or(0),
        completion_tokens = usage.completion_tokens.unwrap_or(0),
        duration_seconds = start_time.elapsed().as_secs_f64(),
        "request completed"
    );
}
