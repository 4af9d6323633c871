/*!
 * Structured Tracing
 * Subscriber setup and per-transform spans using the tracing crate
 *
 * Environment variables:
 * - RUST_LOG: log level filter (default: info)
 * - TAB_HIBERNATOR_TRACE_JSON: JSON output when "1" or "true"
 */

use crate::core::types::TabId;
use tracing::{info, span, Level, Span};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

pub const ENV_TRACE_JSON: &str = "TAB_HIBERNATOR_TRACE_JSON";

/// Install the global subscriber
///
/// `log` records from lower-level modules are bridged into tracing. Calling
/// this twice is harmless: the second install is ignored.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json = use_json, "Structured tracing initialized");
    }
}

/// Unique id correlating the log lines of one transform
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span wrapping a single hibernate / reactivate transform
pub fn transform_span(operation: &'static str, tab_id: TabId) -> Span {
    let trace_id = generate_trace_id();
    span!(
        Level::DEBUG,
        "transform",
        trace_id = %trace_id,
        operation = operation,
        tab_id = tab_id,
        outcome = tracing::field::Empty,
    )
}

/// Span wrapping a sweep over many tabs
pub fn sweep_span(kind: &'static str, sweep_id: Uuid) -> Span {
    span!(
        Level::DEBUG,
        "sweep",
        sweep_id = %sweep_id,
        kind = kind,
        hibernated = tracing::field::Empty,
    )
}
