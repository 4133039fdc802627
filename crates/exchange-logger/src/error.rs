//! Error types for exchange logging
//!
//! Errors are split by where they can occur:
//!
//! - [`RenderError`] and [`SinkError`] happen inside the background logging
//!   unit and never leave it; they are reported through
//!   [`LogSink::emit_error`](crate::LogSink::emit_error) as a [`DispatchError`].
//! - [`AttachError`] is the only error raised to a caller, and only while a
//!   pipeline is being built.
//! - [`PipelineError`] belongs to the in-process host framework and describes
//!   failures of the exchange itself, never of logging.

use thiserror::Error;

/// A message body could not be converted to text.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Serializing a structured payload failed
    #[error("failed to serialize message body: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The buffered bytes are not valid UTF-8
    #[error("message body is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A one-shot stream failed while it was being buffered
    #[error("failed to buffer streamed message body: {0}")]
    Capture(String),

    /// A custom renderer reported a failure
    #[error("{0}")]
    Custom(String),
}

impl RenderError {
    /// Creates a custom render error.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

/// A log sink failed to accept a record.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Writing to the underlying output failed
    #[error("log sink i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// The sink refused the record
    #[error("log sink rejected record: {0}")]
    Rejected(String),
}

impl SinkError {
    /// Creates a rejection error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

/// A failure inside the background logging unit, handed to
/// [`LogSink::emit_error`](crate::LogSink::emit_error) as the cause.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The message body could not be rendered
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The sink failed while emitting the line
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The log line could not be serialized
    #[error("failed to format log line: {0}")]
    Format(#[source] serde_json::Error),

    /// A sink or renderable panicked
    #[error("logging unit panicked: {0}")]
    Panicked(String),

    /// The queue was full and records were discarded
    #[error("log queue full, dropped {dropped} record(s)")]
    QueueFull {
        /// Number of records dropped since the last report
        dropped: u64,
    },
}

impl DispatchError {
    /// Builds a panic error from a payload caught with `catch_unwind`.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked(message)
    }
}

/// Precondition failure while attaching interceptors to a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachError {
    /// The client runtime was already opened
    #[error("client runtime for '{0}' is already open; inspectors can no longer be added")]
    ClientRuntimeOpen(String),

    /// The service host was already opened
    #[error("service host is already open; inspectors can no longer be added")]
    ServiceHostOpen,

    /// The endpoint dispatcher was already opened
    #[error("endpoint '{0}' is already open; inspectors can no longer be added")]
    EndpointOpen(String),
}

/// Result type for attachment operations.
pub type AttachResult<T> = Result<T, AttachError>;

/// Failure of an exchange in the host framework.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// No endpoint is registered at the address
    #[error("no endpoint listening at '{0}'")]
    EndpointNotFound(String),

    /// The service host has not been opened
    #[error("service host is not open")]
    HostNotOpen,

    /// The service operation failed
    #[error("operation '{action}' failed: {message}")]
    Handler {
        /// Action of the failed request
        action: String,
        /// Failure description
        message: String,
    },

    /// The transport could not deliver the message
    #[error("transport failure: {0}")]
    Transport(String),
}

impl PipelineError {
    /// Creates a handler error for the given action.
    pub fn handler(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler {
            action: action.into(),
            message: message.into(),
        }
    }
}

/// Result type for exchanges in the host framework.
pub type PipelineResult<T> = Result<T, PipelineError>;
