//! Structured lifecycle events.
//!
//! Every event is a `tracing` event under the [`TARGET`] target so a
//! subscriber can route them separately from diagnostic logs.

use crate::config::AuthType;

/// The `tracing` target of lifecycle events
pub const TARGET: &str = "visual_embed::telemetry";

pub(crate) fn init_called(host: &str, auth_type: AuthType) {
    tracing::info!(target: TARGET, event = "sdk-called-init", host, ?auth_type);
}

pub(crate) fn authenticated(auth_type: AuthType, logged_in: bool) {
    tracing::info!(target: TARGET, event = "sdk-auth-resolved", ?auth_type, logged_in);
}

pub(crate) fn render_started(url: &str) {
    tracing::info!(target: TARGET, event = "sdk-render-start", url);
}

pub(crate) fn render_completed(url: &str, duration_ms: f64) {
    tracing::info!(
        target: TARGET,
        event = "sdk-render-complete",
        url,
        duration_ms
    );
}

pub(crate) fn render_failed(url: &str, reason: &str) {
    tracing::warn!(target: TARGET, event = "sdk-render-failed", url, reason);
}

pub(crate) fn iframe_load_failed(url: &str) {
    tracing::warn!(target: TARGET, event = "sdk-iframe-load-failed", url);
}

pub(crate) fn trigger_sent(event_type: &str) {
    tracing::debug!(target: TARGET, event = "sdk-trigger", event_type);
}

pub(crate) fn session_received(user_guid: Option<&str>) {
    tracing::debug!(target: TARGET, event = "sdk-session-info", user_guid);
}
