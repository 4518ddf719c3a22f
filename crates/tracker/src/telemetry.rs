//! Sink for failures that are swallowed instead of returned.

use tracing::error;

/// Target used for every swallowed failure, so a subscriber can route them.
pub const TARGET: &str = "telemetry";

pub fn report(operation: &'static str, err: &dyn std::fmt::Display) {
    error!(target: TARGET, operation, error = %err, "operation failed");
}

/// Convert a persistence result into a best-effort value, reporting the error.
pub(crate) fn best_effort<T>(operation: &'static str, result: Result<T, sqlx::Error>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            report(operation, &e);
            None
        }
    }
}
