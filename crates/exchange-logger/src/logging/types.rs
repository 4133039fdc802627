//! Core types for the logging module.
//!
//! - CorrelationId: key shared by every record one interceptor produces
//! - Direction: which of the four hook points observed a message
//! - CapturedBody: the message body as captured during the hook
//! - ExchangeRecord: immutable unit of work handed to the dispatcher
//! - LogLine: the serialized shape of one emitted line

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::constants::SHORT_ID_LENGTH;
use super::render::Renderable;
use crate::config::LineFormat;
use crate::error::{DispatchError, RenderError};

/// Correlation key joining a request with its reply in the log stream.
///
/// A random (v4) UUID generated once per interceptor. It carries no ordering
/// information; consumers join records by its value alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(uuid::Uuid);

impl CorrelationId {
    /// Generates a new random correlation ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Returns the short form of the ID (first N characters).
    pub fn short(&self) -> String {
        let full = self.0.to_string();
        full.chars().take(SHORT_ID_LENGTH).collect()
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for CorrelationId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl From<CorrelationId> for uuid::Uuid {
    fn from(id: CorrelationId) -> Self {
        id.0
    }
}

impl std::str::FromStr for CorrelationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

/// The hook point at which a message was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Client side, before the request is sent
    ClientRequest,
    /// Client side, after the reply is received
    ClientReply,
    /// Service side, after the request is received
    ServiceRequest,
    /// Service side, before the reply is sent
    ServiceReply,
}

impl Direction {
    /// Returns the tag written to log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientRequest => "ClientRequest",
            Self::ClientReply => "ClientReply",
            Self::ServiceRequest => "ServiceRequest",
            Self::ServiceReply => "ServiceReply",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message body as captured during a hook.
///
/// Capturing never renders. Payloads are shared read-only with the message;
/// one-shot streams are buffered before they get here.
#[derive(Clone)]
pub enum CapturedBody {
    /// The message has no body
    Empty,
    /// A renderable payload
    Payload(Arc<dyn Renderable>),
    /// Buffering the body failed during the hook
    Failed(String),
}

impl CapturedBody {
    /// Renders the captured body. `Ok(None)` means the message was empty.
    pub fn render(&self) -> Result<Option<String>, RenderError> {
        match self {
            Self::Empty => Ok(None),
            Self::Payload(payload) => payload.render_to_text().map(Some),
            Self::Failed(reason) => Err(RenderError::Capture(reason.clone())),
        }
    }
}

impl fmt::Debug for CapturedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Payload(_) => f.write_str("Payload(..)"),
            Self::Failed(reason) => f.debug_tuple("Failed").field(reason).finish(),
        }
    }
}

/// One observed message, ready for the dispatcher.
///
/// Built fresh at every hook invocation and never mutated afterwards. The
/// rendered body is computed lazily by [`ExchangeRecord::render_body`].
#[derive(Debug, Clone)]
pub struct ExchangeRecord {
    correlation_id: CorrelationId,
    direction: Direction,
    action: String,
    captured_at: u64,
    body: CapturedBody,
}

impl ExchangeRecord {
    /// Creates a record stamped with the current time.
    pub fn new(
        correlation_id: CorrelationId,
        direction: Direction,
        action: impl Into<String>,
        body: CapturedBody,
    ) -> Self {
        Self {
            correlation_id,
            direction,
            action: action.into(),
            captured_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            body,
        }
    }

    /// Correlation ID of the interceptor that produced this record.
    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    /// Hook point that produced this record.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Action of the observed message.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Unix timestamp in milliseconds at which the record was captured.
    pub fn captured_at(&self) -> u64 {
        self.captured_at
    }

    /// Captured message body.
    pub fn body(&self) -> &CapturedBody {
        &self.body
    }

    /// Renders the body to text.
    pub fn render_body(&self) -> Result<Option<String>, RenderError> {
        self.body.render()
    }
}

/// The serialized form of one log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogLine {
    /// Correlation ID shared by request and reply
    pub correlation_id: CorrelationId,
    /// Hook point tag
    pub direction: Direction,
    /// Message action
    pub action: String,
    /// Unix timestamp in milliseconds
    pub captured_at: u64,
    /// Rendered body, `None` for empty messages
    pub body: Option<String>,
}

impl LogLine {
    /// Builds a line from a record and its rendered body.
    pub fn from_record(record: &ExchangeRecord, body: Option<String>) -> Self {
        Self {
            correlation_id: record.correlation_id,
            direction: record.direction,
            action: record.action.clone(),
            captured_at: record.captured_at,
            body,
        }
    }

    /// Formats the line as a single line of text.
    pub fn to_text(&self, format: LineFormat) -> Result<String, DispatchError> {
        match format {
            LineFormat::Json => serde_json::to_string(self).map_err(DispatchError::Format),
            LineFormat::Compact => {
                let action = serde_json::to_string(&self.action).map_err(DispatchError::Format)?;
                let body = serde_json::to_string(&self.body).map_err(DispatchError::Format)?;
                Ok(format!(
                    "correlation_id={} direction={} action={} captured_at={} body={}",
                    self.correlation_id, self.direction, action, self.captured_at, body
                ))
            }
        }
    }
}
