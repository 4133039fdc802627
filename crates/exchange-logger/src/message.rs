//! Messages exchanged through the pipeline.
//!
//! A [`Message`] carries an action name and an opaque body. Bodies are either
//! shared renderable payloads, which can be read any number of times, or
//! one-shot streams. Capturing a stream for logging buffers it in place so
//! the rest of the pipeline still sees the same bytes.

use std::any::Any;
use std::fmt;
use std::io::{self, Cursor, Read};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::error::RenderError;
use crate::logging::{BufferedBody, CapturedBody, Renderable};

/// Body of a [`Message`].
pub enum MessageBody {
    /// No body
    Empty,
    /// Shared, read-only payload
    Payload(Arc<dyn Renderable>),
    /// One-shot stream, readable once
    Stream(Box<dyn Read + Send>),
}

impl fmt::Debug for MessageBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Payload(_) => f.write_str("Payload(..)"),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A request or reply travelling through a pipeline.
#[derive(Debug)]
pub struct Message {
    action: String,
    body: MessageBody,
}

impl Message {
    /// Creates a message with a renderable payload.
    pub fn new(action: impl Into<String>, body: impl Renderable + 'static) -> Self {
        Self {
            action: action.into(),
            body: MessageBody::Payload(Arc::new(body)),
        }
    }

    /// Creates a message without a body.
    pub fn empty(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            body: MessageBody::Empty,
        }
    }

    /// Creates a message whose body is a one-shot stream.
    pub fn streamed(action: impl Into<String>, reader: impl Read + Send + 'static) -> Self {
        Self {
            action: action.into(),
            body: MessageBody::Stream(Box::new(reader)),
        }
    }

    /// Action (operation name) of the message.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Returns true if the message has no body.
    pub fn is_empty(&self) -> bool {
        matches!(self.body, MessageBody::Empty)
    }

    /// Returns the body.
    pub fn body(&self) -> &MessageBody {
        &self.body
    }

    /// Consumes the message and returns its body.
    pub fn into_body(self) -> MessageBody {
        self.body
    }

    /// Reads the body as text. Stream bodies are buffered first, so the
    /// message stays readable afterwards.
    pub fn read_text(&mut self) -> Result<Option<String>, RenderError> {
        self.capture_body().render()
    }

    /// Captures the body for logging without rendering it.
    ///
    /// Payloads are shared. A stream is read to the end and replaced by an
    /// equivalent buffered payload; if the read fails, the message is left
    /// yielding the bytes read so far followed by the same error. If the
    /// stream panics, the message gets a replayable stream back before the
    /// panic continues.
    pub fn capture_body(&mut self) -> CapturedBody {
        let body = std::mem::replace(&mut self.body, MessageBody::Empty);
        let (restored, captured) = match body {
            MessageBody::Empty => (MessageBody::Empty, CapturedBody::Empty),
            MessageBody::Payload(payload) => (
                MessageBody::Payload(payload.clone()),
                CapturedBody::Payload(payload),
            ),
            MessageBody::Stream(reader) => match buffer_stream(reader) {
                Ok(buffered) => buffered,
                Err(unwound) => {
                    self.body = unwound.body;
                    std::panic::resume_unwind(unwound.payload);
                }
            },
        };
        self.body = restored;
        captured
    }
}

/// A stream that panicked while being buffered.
struct Unwound {
    body: MessageBody,
    payload: Box<dyn Any + Send>,
}

fn buffer_stream(mut reader: Box<dyn Read + Send>) -> Result<(MessageBody, CapturedBody), Unwound> {
    let mut bytes = Vec::new();
    let read = std::panic::catch_unwind(AssertUnwindSafe(|| reader.read_to_end(&mut bytes)));

    match read {
        Ok(Ok(_)) => {
            let buffered: Arc<dyn Renderable> = Arc::new(BufferedBody::new(bytes));
            Ok((
                MessageBody::Payload(buffered.clone()),
                CapturedBody::Payload(buffered),
            ))
        }
        Ok(Err(error)) => {
            let reason = error.to_string();
            let replay = Cursor::new(bytes).chain(FailedRead {
                kind: error.kind(),
                message: reason.clone(),
            });
            Ok((
                MessageBody::Stream(Box::new(replay)),
                CapturedBody::Failed(reason),
            ))
        }
        Err(payload) => {
            let replay = Cursor::new(bytes).chain(FailedRead {
                kind: io::ErrorKind::Other,
                message: "stream panicked while being read".to_string(),
            });
            Err(Unwound {
                body: MessageBody::Stream(Box::new(replay)),
                payload,
            })
        }
    }
}

/// Reader that keeps failing with the error a buffered stream ended with.
struct FailedRead {
    kind: io::ErrorKind,
    message: String,
}

impl Read for FailedRead {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(self.kind, self.message.clone()))
    }
}
