//! Message interception at the four pipeline hook points.
//!
//! A [`MessageInterceptor`] is created once per client channel or service
//! endpoint and stamps every message it observes with the same
//! [`CorrelationId`], so a request and its reply can be joined in the log
//! stream by that value alone.
//!
//! Hooks never fail and never change the exchange: they capture the message
//! body (buffering one-shot streams in place), hand a record to the
//! [`LogDispatcher`], and return. Internal faults are reported through the
//! sink's error channel from a background worker.

use std::panic::AssertUnwindSafe;

use crate::error::DispatchError;
use crate::logging::{CorrelationId, Direction, DispatchOutcome, ExchangeRecord, LogDispatcher};
use crate::message::Message;

/// Opaque state returned by request hooks and handed back to reply hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationToken(CorrelationId);

impl CorrelationToken {
    /// Correlation ID of the interceptor that issued the token.
    pub fn correlation_id(&self) -> CorrelationId {
        self.0
    }
}

/// Client-side extension point: outbound request and inbound reply.
pub trait ClientMessageInspector: Send + Sync {
    /// Called before a request is handed to the transport.
    fn before_send_request(&self, request: &mut Message) -> CorrelationToken;

    /// Called after a reply is received, before it reaches the caller.
    fn after_receive_reply(&self, reply: &mut Message, token: CorrelationToken);
}

/// Service-side extension point: inbound request and outbound reply.
pub trait DispatchMessageInspector: Send + Sync {
    /// Called after a request is received, before the operation runs.
    fn after_receive_request(&self, request: &mut Message) -> CorrelationToken;

    /// Called after the operation returns, before the reply is sent.
    fn before_send_reply(&self, reply: &mut Message, token: CorrelationToken);
}

/// Observes messages and forwards correlated records to the dispatcher.
#[derive(Debug, Clone)]
pub struct MessageInterceptor {
    correlation_id: CorrelationId,
    dispatcher: LogDispatcher,
}

impl MessageInterceptor {
    /// Creates an interceptor with a fresh correlation ID.
    pub fn new(dispatcher: LogDispatcher) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            dispatcher,
        }
    }

    /// The correlation ID shared by every record this interceptor produces.
    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    /// Client side: the request is about to be sent.
    pub fn on_client_request(&self, request: &mut Message) -> CorrelationToken {
        self.observe(Direction::ClientRequest, request);
        self.token()
    }

    /// Client side: the reply has been received.
    pub fn on_client_reply(&self, reply: &mut Message, _token: CorrelationToken) {
        self.observe(Direction::ClientReply, reply);
    }

    /// Service side: the request has been received.
    pub fn on_service_request(&self, request: &mut Message) -> CorrelationToken {
        self.observe(Direction::ServiceRequest, request);
        self.token()
    }

    /// Service side: the reply is about to be sent.
    pub fn on_service_reply(&self, reply: &mut Message, _token: CorrelationToken) {
        self.observe(Direction::ServiceReply, reply);
    }

    fn token(&self) -> CorrelationToken {
        CorrelationToken(self.correlation_id)
    }

    fn observe(&self, direction: Direction, message: &mut Message) -> DispatchOutcome {
        let correlation_id = self.correlation_id;
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.dispatcher.dispatch_with(|| {
                let action = message.action().to_string();
                let body = message.capture_body();
                ExchangeRecord::new(correlation_id, direction, action, body)
            })
        }));

        match outcome {
            Ok(outcome) => outcome,
            Err(payload) => {
                self.dispatcher.report_fault(
                    format!(
                        "failed to capture {} message for exchange {}",
                        direction, correlation_id
                    ),
                    DispatchError::from_panic(payload),
                );
                DispatchOutcome::Dropped
            }
        }
    }
}

impl ClientMessageInspector for MessageInterceptor {
    fn before_send_request(&self, request: &mut Message) -> CorrelationToken {
        self.on_client_request(request)
    }

    fn after_receive_reply(&self, reply: &mut Message, token: CorrelationToken) {
        self.on_client_reply(reply, token)
    }
}

impl DispatchMessageInspector for MessageInterceptor {
    fn after_receive_request(&self, request: &mut Message) -> CorrelationToken {
        self.on_service_request(request)
    }

    fn before_send_reply(&self, reply: &mut Message, token: CorrelationToken) {
        self.on_service_reply(reply, token)
    }
}
