//! Registration of interceptors onto pipelines.
//!
//! [`PipelineAttachment`] is the only contact point with the host framework.
//! [`LoggingBehavior`] implements it by giving every client runtime and every
//! service endpoint its own [`MessageInterceptor`], so correlation IDs never
//! leak between unrelated channels.
//!
//! ```rust,ignore
//! let behavior = LoggingBehavior::new(dispatcher.clone());
//!
//! let mut host = ServiceHost::new().endpoint("svc://echo", handler_fn(echo));
//! behavior.on_service_pipeline_built(&mut host)?;
//! host.open();
//!
//! let mut runtime = ClientRuntime::new("svc://echo");
//! behavior.on_client_pipeline_built(&mut runtime)?;
//! let channel = ClientChannel::open(runtime, transport);
//! ```

use std::sync::Arc;

use crate::config::InternalDebug;
use crate::error::{AttachError, AttachResult};
use crate::interceptor::MessageInterceptor;
use crate::logging::{
    LogDispatcher, log_attachment_step, log_behavior_constructed, log_interceptor_attached,
};
use crate::pipeline::{ClientRuntime, EndpointDispatcher, ServiceHost};

/// Hooks invoked by the host framework while pipelines are built.
///
/// Each call may happen many times, once per pipeline. Errors are
/// precondition failures reported to the framework immediately.
pub trait PipelineAttachment: Send + Sync {
    /// A client runtime is being built.
    fn on_client_pipeline_built(&self, runtime: &mut ClientRuntime) -> AttachResult<()>;

    /// A whole service host is being built.
    fn on_service_pipeline_built(&self, host: &mut ServiceHost) -> AttachResult<()>;

    /// A single service endpoint is being built.
    fn on_endpoint_built(&self, endpoint: &mut EndpointDispatcher) -> AttachResult<()>;
}

/// Attaches a fresh logging interceptor to every pipeline it is given.
#[derive(Debug, Clone)]
pub struct LoggingBehavior {
    dispatcher: LogDispatcher,
    internal_debug: InternalDebug,
}

impl LoggingBehavior {
    /// Creates the behavior; the internal-debug toggle is taken from the
    /// dispatcher's configuration once, here.
    pub fn new(dispatcher: LogDispatcher) -> Self {
        let internal_debug = dispatcher.config().internal_debug;
        Self::with_internal_debug(dispatcher, internal_debug)
    }

    /// Creates the behavior with an explicit internal-debug toggle.
    pub fn with_internal_debug(dispatcher: LogDispatcher, internal_debug: InternalDebug) -> Self {
        if internal_debug.is_enabled() {
            log_behavior_constructed();
        }
        Self {
            dispatcher,
            internal_debug,
        }
    }

    /// Whether lifecycle events are logged.
    pub fn internal_debug(&self) -> InternalDebug {
        self.internal_debug
    }

    fn step(&self, name: &str) {
        if self.internal_debug.is_enabled() {
            log_attachment_step(name);
        }
    }

    fn attach_to_endpoint(&self, endpoint: &mut EndpointDispatcher) -> AttachResult<()> {
        let interceptor = MessageInterceptor::new(self.dispatcher.clone());
        let correlation_id = interceptor.correlation_id();
        endpoint.add_inspector(Arc::new(interceptor))?;

        if self.internal_debug.is_enabled() {
            log_interceptor_attached("service", endpoint.address(), correlation_id);
        }
        Ok(())
    }
}

impl PipelineAttachment for LoggingBehavior {
    fn on_client_pipeline_built(&self, runtime: &mut ClientRuntime) -> AttachResult<()> {
        self.step("on_client_pipeline_built");

        let interceptor = MessageInterceptor::new(self.dispatcher.clone());
        let correlation_id = interceptor.correlation_id();
        runtime.add_inspector(Arc::new(interceptor))?;

        if self.internal_debug.is_enabled() {
            log_interceptor_attached("client", runtime.address(), correlation_id);
        }
        Ok(())
    }

    fn on_service_pipeline_built(&self, host: &mut ServiceHost) -> AttachResult<()> {
        self.step("on_service_pipeline_built");

        if host.is_open() {
            return Err(AttachError::ServiceHostOpen);
        }
        if let Some(open) = host.endpoints().iter().find(|endpoint| endpoint.is_open()) {
            return Err(AttachError::EndpointOpen(open.address().to_string()));
        }

        for endpoint in host.endpoints_mut() {
            self.attach_to_endpoint(endpoint)?;
        }
        Ok(())
    }

    fn on_endpoint_built(&self, endpoint: &mut EndpointDispatcher) -> AttachResult<()> {
        self.step("on_endpoint_built");
        self.attach_to_endpoint(endpoint)
    }
}
