//! Constants and default values for the logging module.

/// Length of the short correlation ID format (first N characters of UUID).
pub const SHORT_ID_LENGTH: usize = 8;

/// Default capacity of the dispatcher queue.
///
/// Records arriving while the queue is full are dropped and reported once.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Default number of background workers draining the queue.
pub const DEFAULT_WORKER_COUNT: usize = 1;

/// Tracing target used by [`TracingSink`](super::TracingSink) for emitted lines.
pub const EXCHANGE_LOG_TARGET: &str = "exchange_log";

/// Tracing target used for the component's own lifecycle events.
pub const LIFECYCLE_TARGET: &str = "exchange_log::lifecycle";

/// Environment variable holding the internal-debug toggle.
pub const INTERNAL_DEBUG_ENV: &str = "EXCHANGE_LOG_INTERNAL_DEBUG";

/// Body text substituted when a message cannot be rendered.
pub const RENDER_FAILURE_PLACEHOLDER: &str = "[unrenderable body]";
