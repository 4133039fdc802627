//! In-process request/reply framework hosting the interceptors.
//!
//! ```text
//! ClientChannel::call(request)
//!   → client inspectors: before_send_request   (registration order)
//!   → Transport::send ──▶ ServiceHost::dispatch(address)
//!                           → endpoint inspectors: after_receive_request
//!                           → Handler
//!                           → endpoint inspectors: before_send_reply  (reverse order)
//!   → client inspectors: after_receive_reply   (reverse order)
//! ← reply
//! ```
//!
//! Inspectors can only be added while a runtime, endpoint or host is still
//! being built; opening it freezes the pipeline.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

use crate::error::{AttachError, AttachResult, PipelineError, PipelineResult};
use crate::interceptor::{ClientMessageInspector, DispatchMessageInspector};
use crate::message::Message;

// =============================================================================
// Handlers
// =============================================================================

/// Service operation: turns a request into a reply.
pub type Handler = Arc<dyn Fn(Message) -> BoxFuture<'static, PipelineResult<Message>> + Send + Sync>;

/// Create a handler from an async function
///
/// # Example
/// ```rust,ignore
/// async fn echo(mut request: Message) -> PipelineResult<Message> {
///     let text = request.read_text().unwrap_or_default().unwrap_or_default();
///     Ok(Message::new("echo", text))
/// }
///
/// let endpoint = EndpointDispatcher::new("svc://echo", handler_fn(echo));
/// ```
pub fn handler_fn<F, Fut>(f: F) -> Handler
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = PipelineResult<Message>> + Send + 'static,
{
    Arc::new(move |request| Box::pin(f(request)))
}

// =============================================================================
// Service Side
// =============================================================================

/// One service endpoint: an address, its operation, and its inspectors.
pub struct EndpointDispatcher {
    address: String,
    handler: Handler,
    inspectors: Vec<Arc<dyn DispatchMessageInspector>>,
    opened: bool,
}

impl std::fmt::Debug for EndpointDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointDispatcher")
            .field("address", &self.address)
            .field("inspectors", &self.inspectors.len())
            .field("opened", &self.opened)
            .finish()
    }
}

impl EndpointDispatcher {
    /// Creates an endpoint serving `handler` at `address`.
    pub fn new(address: impl Into<String>, handler: Handler) -> Self {
        Self {
            address: address.into(),
            handler,
            inspectors: Vec::new(),
            opened: false,
        }
    }

    /// Address of the endpoint.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns true once the endpoint has been opened.
    pub fn is_open(&self) -> bool {
        self.opened
    }

    /// Number of registered inspectors.
    pub fn inspector_count(&self) -> usize {
        self.inspectors.len()
    }

    /// Registers an inspector.
    pub fn add_inspector(&mut self, inspector: Arc<dyn DispatchMessageInspector>) -> AttachResult<()> {
        if self.opened {
            return Err(AttachError::EndpointOpen(self.address.clone()));
        }
        self.inspectors.push(inspector);
        Ok(())
    }

    /// Freezes the inspector list.
    pub fn open(&mut self) {
        self.opened = true;
    }

    /// Runs one request through the inspectors and the handler.
    pub async fn dispatch(&self, mut request: Message) -> PipelineResult<Message> {
        let tokens: Vec<_> = self
            .inspectors
            .iter()
            .map(|inspector| inspector.after_receive_request(&mut request))
            .collect();

        let mut reply = (self.handler)(request).await?;

        for (inspector, token) in self.inspectors.iter().zip(tokens).rev() {
            inspector.before_send_reply(&mut reply, token);
        }
        Ok(reply)
    }
}

/// A set of endpoints served together.
#[derive(Debug, Default)]
pub struct ServiceHost {
    endpoints: Vec<EndpointDispatcher>,
    opened: bool,
}

impl ServiceHost {
    /// Creates an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an endpoint.
    pub fn add_endpoint(&mut self, endpoint: EndpointDispatcher) -> AttachResult<()> {
        if self.opened {
            return Err(AttachError::ServiceHostOpen);
        }
        self.endpoints.push(endpoint);
        Ok(())
    }

    /// Builder-style variant of [`add_endpoint`](Self::add_endpoint) for hosts
    /// that have not been opened.
    pub fn endpoint(mut self, address: impl Into<String>, handler: Handler) -> Self {
        self.endpoints.push(EndpointDispatcher::new(address, handler));
        self
    }

    /// Returns true once the host has been opened.
    pub fn is_open(&self) -> bool {
        self.opened
    }

    /// Registered endpoints.
    pub fn endpoints(&self) -> &[EndpointDispatcher] {
        &self.endpoints
    }

    /// Registered endpoints, mutably, for attaching inspectors.
    pub fn endpoints_mut(&mut self) -> &mut [EndpointDispatcher] {
        &mut self.endpoints
    }

    /// Opens the host and every endpoint.
    pub fn open(&mut self) {
        for endpoint in &mut self.endpoints {
            endpoint.open();
        }
        self.opened = true;
    }

    /// Routes a request to the endpoint at `address`.
    pub async fn dispatch(&self, address: &str, request: Message) -> PipelineResult<Message> {
        if !self.opened {
            return Err(PipelineError::HostNotOpen);
        }
        let endpoint = self
            .endpoints
            .iter()
            .find(|endpoint| endpoint.address == address)
            .ok_or_else(|| PipelineError::EndpointNotFound(address.to_string()))?;
        endpoint.dispatch(request).await
    }
}

// =============================================================================
// Transport
// =============================================================================

/// Carries a request to a service and brings back the reply.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` to `address` and waits for the reply.
    async fn send(&self, address: &str, request: Message) -> PipelineResult<Message>;
}

/// Transport delivering directly to an in-process [`ServiceHost`].
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    host: Arc<ServiceHost>,
}

impl LoopbackTransport {
    /// Creates a transport for an opened host.
    pub fn new(host: Arc<ServiceHost>) -> Self {
        Self { host }
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&self, address: &str, request: Message) -> PipelineResult<Message> {
        self.host.dispatch(address, request).await
    }
}

// =============================================================================
// Client Side
// =============================================================================

/// Client pipeline under construction for one remote address.
pub struct ClientRuntime {
    address: String,
    inspectors: Vec<Arc<dyn ClientMessageInspector>>,
    opened: bool,
}

impl std::fmt::Debug for ClientRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRuntime")
            .field("address", &self.address)
            .field("inspectors", &self.inspectors.len())
            .field("opened", &self.opened)
            .finish()
    }
}

impl ClientRuntime {
    /// Creates a client runtime targeting `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            inspectors: Vec::new(),
            opened: false,
        }
    }

    /// Remote address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns true once a channel has been opened on this runtime.
    pub fn is_open(&self) -> bool {
        self.opened
    }

    /// Number of registered inspectors.
    pub fn inspector_count(&self) -> usize {
        self.inspectors.len()
    }

    /// Registers an inspector.
    pub fn add_inspector(&mut self, inspector: Arc<dyn ClientMessageInspector>) -> AttachResult<()> {
        if self.opened {
            return Err(AttachError::ClientRuntimeOpen(self.address.clone()));
        }
        self.inspectors.push(inspector);
        Ok(())
    }
}

/// An open client channel.
pub struct ClientChannel {
    runtime: ClientRuntime,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for ClientChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientChannel")
            .field("runtime", &self.runtime)
            .finish()
    }
}

impl ClientChannel {
    /// Opens a channel, freezing the runtime's inspectors.
    pub fn open(mut runtime: ClientRuntime, transport: Arc<dyn Transport>) -> Self {
        runtime.opened = true;
        Self { runtime, transport }
    }

    /// The runtime backing this channel.
    pub fn runtime(&self) -> &ClientRuntime {
        &self.runtime
    }

    /// The runtime backing this channel, mutably.
    pub fn runtime_mut(&mut self) -> &mut ClientRuntime {
        &mut self.runtime
    }

    /// Sends a request and returns the reply.
    pub async fn call(&self, mut request: Message) -> PipelineResult<Message> {
        let tokens: Vec<_> = self
            .runtime
            .inspectors
            .iter()
            .map(|inspector| inspector.before_send_request(&mut request))
            .collect();

        let mut reply = self.transport.send(&self.runtime.address, request).await?;

        for (inspector, token) in self.runtime.inspectors.iter().zip(tokens).rev() {
            inspector.after_receive_reply(&mut reply, token);
        }
        Ok(reply)
    }
}
