//! Asynchronous, best-effort dispatch of exchange records.
//!
//! ```text
//! hook thread                      worker pool (tokio tasks)
//! ───────────                      ─────────────────────────
//! dispatch_with(capture)
//!   ├─ sink.is_verbose_enabled()?  ── no ──▶ return Disabled
//!   ├─ capture()  (no rendering)
//!   └─ try_send ──▶ [bounded queue] ──▶ render body
//!        │                              format line
//!        └─ full: drop, count           sink.emit(line)
//!                                       failure/panic ──▶ sink.emit_error (once)
//! ```
//!
//! The hook side never awaits and never blocks: a full queue drops the record
//! and the next worker to finish a job reports the dropped batch once.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, Notify, mpsc};

use super::constants::RENDER_FAILURE_PLACEHOLDER;
use super::lifecycle;
use super::metrics::{DispatcherMetrics, MetricsSnapshot};
use super::sink::LogSink;
use super::types::{ExchangeRecord, LogLine};
use crate::config::{LoggerConfig, RenderFailurePolicy};
use crate::error::DispatchError;

/// Result of handing a record to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Verbose logging is off; nothing was captured
    Disabled,
    /// The record is waiting for a worker
    Queued,
    /// The queue was full; the record was discarded
    Dropped,
    /// The dispatcher is shut down; the record was discarded
    Closed,
}

/// Unit of work for a worker.
enum Job {
    Record(ExchangeRecord),
    Fault {
        context: String,
        error: DispatchError,
    },
}

/// State shared between the dispatcher handles and the workers.
struct Shared {
    sink: Arc<dyn LogSink>,
    config: LoggerConfig,
    metrics: DispatcherMetrics,
    pending: AtomicUsize,
    idle: Notify,
    unreported_drops: AtomicU64,
}

struct Inner {
    sender: mpsc::Sender<Job>,
    shared: Arc<Shared>,
    closed: AtomicBool,
}

/// Hands exchange records to a bounded pool of background workers.
///
/// Cloning is cheap; all clones feed the same queue. When the last clone is
/// dropped the queue closes and the workers exit after draining it.
#[derive(Clone)]
pub struct LogDispatcher {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for LogDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogDispatcher")
            .field("config", &self.inner.shared.config)
            .field("pending", &self.inner.shared.pending.load(Ordering::Relaxed))
            .finish()
    }
}

impl LogDispatcher {
    /// Starts a dispatcher on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime, like `tokio::spawn`.
    pub fn new(sink: Arc<dyn LogSink>, config: LoggerConfig) -> Self {
        Self::with_handle(&Handle::current(), sink, config)
    }

    /// Starts a dispatcher whose workers run on the given runtime.
    pub fn with_handle(handle: &Handle, sink: Arc<dyn LogSink>, config: LoggerConfig) -> Self {
        let config = config.normalized();
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        let shared = Arc::new(Shared {
            sink,
            config,
            metrics: DispatcherMetrics::new(),
            pending: AtomicUsize::new(0),
            idle: Notify::new(),
            unreported_drops: AtomicU64::new(0),
        });

        for worker_id in 0..shared.config.worker_count {
            handle.spawn(run_worker(worker_id, receiver.clone(), shared.clone()));
        }

        if shared.config.internal_debug.is_enabled() {
            lifecycle::log_dispatcher_started(&shared.config.summary());
        }

        Self {
            inner: Arc::new(Inner {
                sender,
                shared,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Hands a record to the workers.
    pub fn dispatch(&self, record: ExchangeRecord) -> DispatchOutcome {
        self.dispatch_with(|| record)
    }

    /// Checks the verbose gate, then captures and queues a record.
    ///
    /// `capture` only runs when verbose logging is enabled, so callers can
    /// defer any buffering work until it is known to be needed.
    pub fn dispatch_with<F>(&self, capture: F) -> DispatchOutcome
    where
        F: FnOnce() -> ExchangeRecord,
    {
        if !self.inner.shared.sink.is_verbose_enabled() {
            return DispatchOutcome::Disabled;
        }
        if self.inner.closed.load(Ordering::Acquire) {
            self.inner.shared.metrics.record_dropped();
            return DispatchOutcome::Closed;
        }

        let outcome = self.enqueue(Job::Record(capture()));
        if outcome == DispatchOutcome::Queued {
            self.inner.shared.metrics.record_queued();
        }
        outcome
    }

    /// Queues an internal fault for reporting through `emit_error`.
    ///
    /// Used by hooks that fail before a record could be built. Not gated by
    /// the verbose check.
    pub fn report_fault(&self, context: impl Into<String>, error: DispatchError) -> DispatchOutcome {
        if self.inner.closed.load(Ordering::Acquire) {
            return DispatchOutcome::Closed;
        }
        self.enqueue(Job::Fault {
            context: context.into(),
            error,
        })
    }

    fn enqueue(&self, job: Job) -> DispatchOutcome {
        let shared = &self.inner.shared;
        shared.pending.fetch_add(1, Ordering::SeqCst);

        match self.inner.sender.try_send(job) {
            Ok(()) => DispatchOutcome::Queued,
            Err(TrySendError::Full(_)) => {
                shared.finish_one();
                shared.metrics.record_dropped();
                shared.unreported_drops.fetch_add(1, Ordering::SeqCst);
                DispatchOutcome::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                shared.finish_one();
                shared.metrics.record_dropped();
                DispatchOutcome::Closed
            }
        }
    }

    /// Waits until every queued record has been processed.
    pub async fn flush(&self) {
        let shared = &self.inner.shared;
        loop {
            let idle = shared.idle.notified();
            if shared.pending.load(Ordering::SeqCst) == 0 {
                break;
            }
            idle.await;
        }
        shared.report_drops().await;
    }

    /// Stops accepting records and waits for the queue to drain.
    pub async fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.flush().await;

        let shared = &self.inner.shared;
        if shared.config.internal_debug.is_enabled() {
            lifecycle::log_dispatcher_stopped(shared.metrics.snapshot());
        }
    }

    /// Returns true once [`shutdown`](Self::shutdown) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Returns the current counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.shared.metrics.snapshot()
    }

    /// Returns the configuration in effect.
    pub fn config(&self) -> &LoggerConfig {
        &self.inner.shared.config
    }
}

// =============================================================================
// Worker
// =============================================================================

async fn run_worker(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
    shared: Arc<Shared>,
) {
    loop {
        let next = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };
        let Some(job) = next else {
            break;
        };

        match job {
            Job::Record(record) => shared.process(record).await,
            Job::Fault { context, error } => shared.report(&context, &error).await,
        }
        shared.report_drops().await;
        shared.finish_one();
    }

    tracing::trace!(worker_id = %worker_id, "Log dispatcher worker exiting");
}

impl Shared {
    fn finish_one(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    /// Renders, formats and emits one record; any failure is reported once.
    async fn process(&self, record: ExchangeRecord) {
        let outcome = AssertUnwindSafe(self.write_record(&record))
            .catch_unwind()
            .await;

        let error = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(error)) => error,
            Err(payload) => {
                self.metrics.record_panic();
                DispatchError::from_panic(payload)
            }
        };
        self.report(&failure_context(&record), &error).await;
    }

    async fn write_record(&self, record: &ExchangeRecord) -> Result<(), DispatchError> {
        let body = match record.render_body() {
            Ok(body) => body,
            Err(error) => {
                self.metrics.record_render_failure();
                match self.config.render_failure {
                    RenderFailurePolicy::Report => return Err(error.into()),
                    RenderFailurePolicy::EmitPlaceholder => {
                        let error = DispatchError::from(error);
                        self.report(&failure_context(record), &error).await;
                        Some(RENDER_FAILURE_PLACEHOLDER.to_string())
                    }
                }
            }
        };

        let line = LogLine::from_record(record, body).to_text(self.config.line_format)?;

        if let Err(error) = self.sink.emit(&line).await {
            self.metrics.record_sink_failure();
            return Err(error.into());
        }
        self.metrics.record_emitted();
        Ok(())
    }

    /// Calls `emit_error`, discarding its own failures.
    async fn report(&self, context: &str, cause: &DispatchError) {
        let outcome = AssertUnwindSafe(self.sink.emit_error(context, cause))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                tracing::debug!(error = %error, cause = %cause, "Log sink failed to report an error");
            }
            Err(_) => {
                tracing::debug!(cause = %cause, "Log sink panicked while reporting an error");
            }
        }
    }

    async fn report_drops(&self) {
        let dropped = self.unreported_drops.swap(0, Ordering::SeqCst);
        if dropped > 0 {
            self.report(
                "exchange log queue overflowed",
                &DispatchError::QueueFull { dropped },
            )
            .await;
        }
    }
}

fn failure_context(record: &ExchangeRecord) -> String {
    format!(
        "failed to log {} message '{}' for exchange {}",
        record.direction(),
        record.action(),
        record.correlation_id()
    )
}
