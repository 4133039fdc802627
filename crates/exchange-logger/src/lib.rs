#![warn(missing_docs)]
//! # Exchange Logger
//!
//! Correlated, best-effort logging of request/reply exchanges flowing through
//! an RPC pipeline.
//!
//! ## Overview
//!
//! - **One interceptor per pipeline** with its own correlation ID, so a request
//!   and its reply can be joined in the log stream
//! - **Four hook points**: client request, client reply, service request,
//!   service reply
//! - **Asynchronous emission** on a bounded worker pool; a slow or failing
//!   sink never delays or fails an exchange
//! - **Zero cost when disabled**: nothing is captured unless the sink reports
//!   verbose logging enabled
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────── Host framework ───────────────────────────┐
//! │  ClientRuntime / ClientChannel          ServiceHost / EndpointDispatcher │
//! │         ▲                                          ▲                  │
//! └─────────┼──────────────────────────────────────────┼──────────────────┘
//!           │ PipelineAttachment (LoggingBehavior)      │
//!           ▼                                          ▼
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  MessageInterceptor (one per runtime / endpoint, one CorrelationId)   │
//! │    hook ─▶ gate check ─▶ capture body ─▶ LogDispatcher::dispatch_with  │
//! └───────────────────────────────────┬──────────────────────────────────┘
//!                                     ▼
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  LogDispatcher: bounded queue ─▶ workers ─▶ render ─▶ LogSink::emit    │
//! │                                   failures ─▶ LogSink::emit_error      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use exchange_logger::prelude::*;
//!
//! let dispatcher = LogDispatcher::new(Arc::new(TracingSink), LoggerConfig::from_env());
//! let behavior = LoggingBehavior::new(dispatcher.clone());
//!
//! let mut host = ServiceHost::new().endpoint(
//!     "svc://echo",
//!     handler_fn(|mut request: Message| async move {
//!         let text = request.read_text().ok().flatten().unwrap_or_default();
//!         Ok(Message::new("echoReply", text))
//!     }),
//! );
//! behavior.on_service_pipeline_built(&mut host)?;
//! host.open();
//!
//! let mut runtime = ClientRuntime::new("svc://echo");
//! behavior.on_client_pipeline_built(&mut runtime)?;
//! let channel = ClientChannel::open(runtime, Arc::new(LoopbackTransport::new(Arc::new(host))));
//!
//! let reply = channel.call(Message::new("echo", "ping")).await?;
//! dispatcher.shutdown().await;
//! ```

pub mod attachment;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod logging;
pub mod message;
pub mod pipeline;

#[cfg(test)]
mod tests;

// Public API
pub use attachment::{LoggingBehavior, PipelineAttachment};
pub use config::{InternalDebug, LineFormat, LoggerConfig, RenderFailurePolicy};
pub use error::{
    AttachError, AttachResult, DispatchError, PipelineError, PipelineResult, RenderError,
    SinkError,
};
pub use interceptor::{
    ClientMessageInspector, CorrelationToken, DispatchMessageInspector, MessageInterceptor,
};
pub use logging::{
    BufferedBody, CapturedBody, CorrelationId, Direction, DispatchOutcome, ExchangeRecord, Json,
    LogDispatcher, LogLine, LogSink, MetricsSnapshot, Renderable, TracingSink, WriterSink,
};
pub use message::{Message, MessageBody};
pub use pipeline::{
    ClientChannel, ClientRuntime, EndpointDispatcher, Handler, LoopbackTransport, ServiceHost,
    Transport, handler_fn,
};

/// Prelude for convenient imports
///
/// ```rust,ignore
/// use exchange_logger::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Attachment
        LoggingBehavior,
        PipelineAttachment,
        // Configuration
        InternalDebug,
        LineFormat,
        LoggerConfig,
        RenderFailurePolicy,
        // Errors
        AttachError,
        AttachResult,
        DispatchError,
        PipelineError,
        PipelineResult,
        RenderError,
        SinkError,
        // Interception
        MessageInterceptor,
        // Logging
        CorrelationId,
        Direction,
        Json,
        LogDispatcher,
        LogSink,
        Renderable,
        TracingSink,
        WriterSink,
        // Messages
        Message,
        // Pipeline
        ClientChannel,
        ClientRuntime,
        EndpointDispatcher,
        LoopbackTransport,
        ServiceHost,
        Transport,
        handler_fn,
    };
    pub use std::sync::Arc;
}
