//! Observability for the call session.
//!
//! Instrumentation uses `#[instrument(skip_all)]` with explicit safe fields.
//! Credential tokens never appear in logs or metric labels.
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `call_join_attempts_total` | Counter | `outcome`, `reason` | `start_call` results |
//! | `call_join_latency_seconds` | Histogram | none | `start_call` to join success |
//! | `call_leave_total` | Counter | `outcome` | `end_call` teardowns |
//! | `call_status_transitions_total` | Counter | `status` | Session status changes |
//! | `call_credential_fetch_total` | Counter | `outcome` | Credential fetch results |
//! | `call_credential_fetch_duration_seconds` | Histogram | `outcome` | Credential fetch latency |
//! | `call_engine_events_total` | Counter | `kind` | Engine callbacks |
//! | `call_roster_size` | Gauge | none | Remote participants |

pub mod metrics;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "call_session=info,common=info,rtc_engine=info,session=info";

/// Install a global `tracing` subscriber for the embedding application.
///
/// Uses `RUST_LOG` when set. `json` selects structured JSON output.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(json: bool) -> Result<(), String> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.map_err(|e| format!("Failed to install tracing subscriber: {e}"))
}
