//! Metrics collection.
//!
//! # Metrics
//! - `lifeline_transactions_total` (counter): submitted actions by action, status
//! - `lifeline_queries_total` (counter): contract views by view
//! - `lifeline_errors_total` (counter): facade errors by kind
//! - `lifeline_confirmation_seconds` (histogram): send-to-confirmation latency
//!
//! No recorder is installed here; embedding applications choose an exporter.

use crate::facade::error::ErrorKind;
use crate::model::ActionKind;

/// Count a settled transaction.
pub fn record_transaction(action: ActionKind, status: &'static str) {
    ::metrics::counter!(
        "lifeline_transactions_total",
        "action" => action.as_str(),
        "status" => status
    )
    .increment(1);
}

/// Count a contract view.
pub fn record_query(view: &'static str) {
    ::metrics::counter!("lifeline_queries_total", "view" => view).increment(1);
}

/// Count a facade error.
pub fn record_error(kind: ErrorKind) {
    ::metrics::counter!("lifeline_errors_total", "kind" => kind.as_str()).increment(1);
}

/// Record how long a transaction took to confirm.
pub fn record_confirmation_latency(seconds: f64) {
    ::metrics::histogram!("lifeline_confirmation_seconds").record(seconds);
}
