//! Lifecycle logging for the component itself.
//!
//! These events are separate from per-exchange lines and are only emitted
//! when the internal-debug toggle is on; callers check the toggle.

use super::constants::LIFECYCLE_TARGET;
use super::metrics::MetricsSnapshot;
use super::types::CorrelationId;

/// Log dispatcher startup with a configuration summary.
pub fn log_dispatcher_started(config_summary: &str) {
    tracing::debug!(
        target: LIFECYCLE_TARGET,
        config = %config_summary,
        "Exchange log dispatcher started"
    );
}

/// Log dispatcher shutdown with final counters.
pub fn log_dispatcher_stopped(metrics: MetricsSnapshot) {
    tracing::debug!(
        target: LIFECYCLE_TARGET,
        queued = %metrics.queued,
        emitted = %metrics.emitted,
        dropped = %metrics.dropped,
        failures = %metrics.failures(),
        "Exchange log dispatcher stopped"
    );
}

/// Log construction of the attachment behavior.
pub fn log_behavior_constructed() {
    tracing::debug!(target: LIFECYCLE_TARGET, "Constructing logging behavior");
}

/// Log one attachment step being executed.
///
/// # Example
///
/// ```rust,ignore
/// log_attachment_step("on_client_pipeline_built");
/// ```
pub fn log_attachment_step(step: &str) {
    tracing::debug!(target: LIFECYCLE_TARGET, step = %step, "Executing attachment step");
}

/// Log a fresh interceptor being registered on a pipeline.
///
/// Only the short form of the correlation ID is logged; it is enough to tell
/// interceptors apart in diagnostics.
pub fn log_interceptor_attached(side: &str, address: &str, correlation_id: CorrelationId) {
    tracing::debug!(
        target: LIFECYCLE_TARGET,
        side = %side,
        address = %address,
        correlation_id = %correlation_id.short(),
        "Interceptor attached"
    );
}
