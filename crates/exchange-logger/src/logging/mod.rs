//! Correlated, asynchronous exchange logging
//!
//! Turns observed messages into one log line per direction per exchange,
//! without letting the log sink's speed or health affect the exchange.
//!
//! # Architecture
//!
//! - **types**: `CorrelationId`, `Direction`, `ExchangeRecord`, `LogLine`
//! - **render**: the `Renderable` capability for opaque payloads
//! - **sink**: the `LogSink` capability and its implementations
//! - **dispatcher**: bounded worker pool that renders and emits off the hook thread
//! - **metrics**: atomic dispatcher counters
//! - **constants**: defaults and well-known names
//! - **lifecycle**: the component's own debug events
//!
//! # Basic Usage
//!
//! ```rust,ignore
//! use exchange_logger::logging::{LogDispatcher, TracingSink};
//!
//! let dispatcher = LogDispatcher::new(Arc::new(TracingSink), LoggerConfig::new());
//! let interceptor = MessageInterceptor::new(dispatcher.clone());
//! ```
//!
//! # Cost When Disabled
//!
//! `LogSink::is_verbose_enabled` is checked before anything is captured.
//! When it returns false a hook does no allocation, no rendering and no
//! queueing.

// =============================================================================
// Submodules
// =============================================================================

pub mod constants;
mod dispatcher;
mod lifecycle;
mod metrics;
mod render;
mod sink;
mod types;

// =============================================================================
// Public API Re-exports
// =============================================================================

// Core Types
pub use types::{CapturedBody, CorrelationId, Direction, ExchangeRecord, LogLine};

// Rendering
pub use render::{BufferedBody, Json, Renderable};

// Sinks
pub use sink::{LogSink, TracingSink, WriterSink};

// Dispatch
pub use dispatcher::{DispatchOutcome, LogDispatcher};
pub use metrics::{DispatcherMetrics, MetricsSnapshot};

// Lifecycle Logging
pub(crate) use lifecycle::{
    log_attachment_step, log_behavior_constructed, log_interceptor_attached,
};

// Test utilities (only exported in test builds)
#[cfg(test)]
pub use sink::MemorySink;
