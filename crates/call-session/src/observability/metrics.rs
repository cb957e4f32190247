//! Metrics definitions for the call session.
//!
//! All metrics follow Prometheus naming conventions:
//! - `call_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `outcome`: success, refused, error
//! - `reason`: bounded by refusal kinds (~5 values)
//! - `kind`: bounded by engine event kinds (5 values)
//! - `status`: bounded by `SessionStatus` (6 values)

use metrics::{counter, gauge, histogram};
use std::time::Duration;

// ============================================================================
// Call Lifecycle
// ============================================================================

/// Record a `start_call` attempt.
///
/// Metric: `call_join_attempts_total`
/// Labels: `outcome` (accepted, refused, error), `reason`
pub fn record_join_attempt(outcome: &'static str, reason: &'static str) {
    counter!("call_join_attempts_total", "outcome" => outcome, "reason" => reason).increment(1);
}

/// Record time from `start_call` to the join-success event.
///
/// Metric: `call_join_latency_seconds`
pub fn record_join_latency(duration: Duration) {
    histogram!("call_join_latency_seconds").record(duration.as_secs_f64());
}

/// Record a completed `end_call`.
///
/// Metric: `call_leave_total`
/// Labels: `outcome` (success, error)
pub fn record_leave(outcome: &'static str) {
    counter!("call_leave_total", "outcome" => outcome).increment(1);
}

/// Record a status transition.
///
/// Metric: `call_status_transitions_total`
/// Labels: `status` (target status)
pub fn record_status_transition(status: &'static str) {
    counter!("call_status_transitions_total", "status" => status).increment(1);
}

// ============================================================================
// Credential
// ============================================================================

/// Record how a background credential fetch settled.
///
/// Metric: `call_credential_fetch_total`, `call_credential_fetch_duration_seconds`
/// Labels: `outcome` (success, error)
pub fn record_credential_fetch(outcome: &'static str, duration: Duration) {
    counter!("call_credential_fetch_total", "outcome" => outcome).increment(1);
    histogram!("call_credential_fetch_duration_seconds", "outcome" => outcome)
        .record(duration.as_secs_f64());
}

// ============================================================================
// Engine Events & Roster
// ============================================================================

/// Record an engine callback.
///
/// Metric: `call_engine_events_total`
/// Labels: `kind`
pub fn record_engine_event(kind: &'static str) {
    counter!("call_engine_events_total", "kind" => kind).increment(1);
}

/// Set the number of remote participants.
///
/// Metric: `call_roster_size`
pub fn set_roster_size(size: usize) {
    // usize to f64 conversion is safe for realistic roster sizes
    #[allow(clippy::cast_precision_loss)]
    gauge!("call_roster_size").set(size as f64);
}
