//! Conversion of opaque message payloads into loggable text.
//!
//! Message bodies are treated as opaque blobs. Anything that can be logged
//! implements [`Renderable`]; the dispatcher calls it only on a background
//! worker and only when verbose logging is enabled.

use std::fmt;

use serde::Serialize;

use crate::error::RenderError;

/// A payload that can be rendered to text for logging.
///
/// Implementations must be read-only: rendering may happen on another thread
/// after the exchange has moved on, and may never happen at all.
pub trait Renderable: Send + Sync {
    /// Renders the payload to text.
    fn render_to_text(&self) -> Result<String, RenderError>;
}

impl Renderable for String {
    fn render_to_text(&self) -> Result<String, RenderError> {
        Ok(self.clone())
    }
}

impl Renderable for &'static str {
    fn render_to_text(&self) -> Result<String, RenderError> {
        Ok((*self).to_string())
    }
}

impl Renderable for serde_json::Value {
    fn render_to_text(&self) -> Result<String, RenderError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Renders any serializable payload as JSON.
///
/// ```rust,ignore
/// let body = Json(GetUser { id: 7 });
/// assert_eq!(body.render_to_text()?, r#"{"id":7}"#);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

impl<T> Renderable for Json<T>
where
    T: Serialize + Send + Sync,
{
    fn render_to_text(&self) -> Result<String, RenderError> {
        Ok(serde_json::to_string(&self.0)?)
    }
}

/// Bytes buffered from a one-shot stream.
///
/// Rendering expects UTF-8; anything else is a [`RenderError::InvalidUtf8`].
#[derive(Clone, PartialEq, Eq)]
pub struct BufferedBody {
    bytes: Vec<u8>,
}

impl BufferedBody {
    /// Wraps already-buffered bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

impl fmt::Debug for BufferedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedBody")
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Renderable for BufferedBody {
    fn render_to_text(&self) -> Result<String, RenderError> {
        Ok(String::from_utf8(self.bytes.clone())?)
    }
}
