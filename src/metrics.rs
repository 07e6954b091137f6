//! Prometheus metrics for the moderation scheduler.
//!
//! Exposed on `/metrics` when `[metrics] port` is configured.
//!
//! - `chanmod_actions_admitted_total{kind}` - Actions accepted into the queue
//! - `chanmod_actions_executed_total{kind}` - Actions that ran
//! - `chanmod_actions_abandoned_total{reason}` - Actions dropped (timeout, not found)
//! - `chanmod_identity_requests_total{command}` - WHOIS/WHOWAS lookups issued
//! - `chanmod_command_errors_total{error}` - Moderator commands rejected before admission
//! - `chanmod_pending_actions` - Current queue length

use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters
// ========================================================================

pub static ACTIONS_ADMITTED: OnceLock<IntCounterVec> = OnceLock::new();

pub static ACTIONS_EXECUTED: OnceLock<IntCounterVec> = OnceLock::new();

pub static ACTIONS_ABANDONED: OnceLock<IntCounterVec> = OnceLock::new();

/// WHOIS and WHOWAS requests sent on behalf of queued actions.
pub static IDENTITY_REQUESTS: OnceLock<IntCounterVec> = OnceLock::new();

pub static COMMAND_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Gauges
// ========================================================================

pub static PENDING_ACTIONS: OnceLock<IntGauge> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Until this runs every `record_*` helper is a no-op.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(ACTIONS_ADMITTED, IntCounterVec::new(Opts::new("chanmod_actions_admitted_total", "Actions admitted to the queue"), &["kind"]));
    register!(ACTIONS_EXECUTED, IntCounterVec::new(Opts::new("chanmod_actions_executed_total", "Actions executed"), &["kind"]));
    register!(ACTIONS_ABANDONED, IntCounterVec::new(Opts::new("chanmod_actions_abandoned_total", "Actions abandoned before execution"), &["reason"]));
    register!(IDENTITY_REQUESTS, IntCounterVec::new(Opts::new("chanmod_identity_requests_total", "Identity lookups issued"), &["command"]));
    register!(COMMAND_ERRORS, IntCounterVec::new(Opts::new("chanmod_command_errors_total", "Moderator commands rejected"), &["error"]));
    register!(PENDING_ACTIONS, IntGauge::new("chanmod_pending_actions", "Actions waiting in the queue"));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

fn inc(metric: &OnceLock<IntCounterVec>, label: &str) {
    if let Some(c) = metric.get() {
        c.with_label_values(&[label]).inc();
    }
}

#[inline]
pub fn record_action_admitted(kind: &str) {
    inc(&ACTIONS_ADMITTED, kind);
}

#[inline]
pub fn record_action_executed(kind: &str) {
    inc(&ACTIONS_EXECUTED, kind);
}

#[inline]
pub fn record_action_abandoned(reason: &str) {
    inc(&ACTIONS_ABANDONED, reason);
}

#[inline]
pub fn record_identity_request(command: &str) {
    inc(&IDENTITY_REQUESTS, command);
}

#[inline]
pub fn record_command_error(error: &str) {
    inc(&COMMAND_ERRORS, error);
}

#[inline]
pub fn set_pending_actions(count: usize) {
    if let Some(g) = PENDING_ACTIONS.get() {
        g.set(count as i64);
    }
}
