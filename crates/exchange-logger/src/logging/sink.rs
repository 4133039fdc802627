use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::constants::EXCHANGE_LOG_TARGET;
use crate::error::{DispatchError, SinkError};

// =============================================================================
// LogSink Trait
// =============================================================================

/// Destination for exchange log lines.
///
/// The sink is the only object shared by every interceptor and worker, so
/// implementations must tolerate concurrent calls. Failures returned from
/// `emit` are reported once through `emit_error` and never retried; failures
/// of `emit_error` itself are discarded.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Returns true if per-exchange lines should be captured at all.
    ///
    /// Called on the hook's thread for every observed message, so it must be
    /// cheap and side-effect free.
    fn is_verbose_enabled(&self) -> bool;

    /// Writes one formatted line.
    async fn emit(&self, line: &str) -> Result<(), SinkError>;

    /// Reports an internal logging fault.
    async fn emit_error(&self, context: &str, cause: &DispatchError) -> Result<(), SinkError>;
}

// =============================================================================
// TracingSink
// =============================================================================

/// Sink that forwards lines to `tracing`.
///
/// Verbose logging is enabled when a subscriber accepts `DEBUG` events on the
/// `exchange_log` target.
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

#[async_trait]
impl LogSink for TracingSink {
    fn is_verbose_enabled(&self) -> bool {
        tracing::enabled!(target: EXCHANGE_LOG_TARGET, tracing::Level::DEBUG)
    }

    async fn emit(&self, line: &str) -> Result<(), SinkError> {
        tracing::debug!(target: EXCHANGE_LOG_TARGET, "{}", line);
        Ok(())
    }

    async fn emit_error(&self, context: &str, cause: &DispatchError) -> Result<(), SinkError> {
        tracing::error!(
            target: EXCHANGE_LOG_TARGET,
            error = %cause,
            "{}",
            context
        );
        Ok(())
    }
}

// =============================================================================
// WriterSink
// =============================================================================

/// Sink writing newline-terminated lines to any [`Write`] implementation.
///
/// ```rust,ignore
/// let sink = WriterSink::new(std::io::stdout());
/// ```
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: Mutex<W>,
    verbose: AtomicBool,
}

impl<W: Write + Send> WriterSink<W> {
    /// Creates a sink with verbose logging enabled.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            verbose: AtomicBool::new(true),
        }
    }

    /// Turns per-exchange logging on or off.
    pub fn set_verbose(&self, enabled: bool) {
        self.verbose.store(enabled, Ordering::Relaxed);
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_line(&self, line: &str) -> Result<(), SinkError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| SinkError::rejected("writer lock poisoned"))?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

#[async_trait]
impl<W: Write + Send> LogSink for WriterSink<W> {
    fn is_verbose_enabled(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    async fn emit(&self, line: &str) -> Result<(), SinkError> {
        self.write_line(line)
    }

    async fn emit_error(&self, context: &str, cause: &DispatchError) -> Result<(), SinkError> {
        self.write_line(&format!("ERROR {}: {}", context, cause))
    }
}

// =============================================================================
// MemorySink (for testing)
// =============================================================================

#[cfg(test)]
use std::sync::Arc;
#[cfg(test)]
use std::sync::atomic::AtomicUsize;

/// A sink that records everything in memory, with failure injection.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Arc<MemorySinkState>,
}

#[cfg(test)]
#[derive(Debug, Default)]
struct MemorySinkState {
    verbose: AtomicBool,
    fail_emit: AtomicBool,
    panic_emit: AtomicBool,
    fail_emit_error: AtomicBool,
    gate_checks: AtomicUsize,
    emit_attempts: AtomicUsize,
    lines: Mutex<Vec<String>>,
    errors: Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl MemorySink {
    /// Creates a sink with verbose logging enabled.
    pub fn new() -> Self {
        let sink = Self::default();
        sink.set_verbose(true);
        sink
    }

    /// Creates a sink with verbose logging disabled.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Creates a sink whose `emit` always fails.
    pub fn failing() -> Self {
        let sink = Self::new();
        sink.state.fail_emit.store(true, Ordering::SeqCst);
        sink
    }

    /// Creates a sink whose `emit` always panics.
    pub fn panicking() -> Self {
        let sink = Self::new();
        sink.state.panic_emit.store(true, Ordering::SeqCst);
        sink
    }

    /// Makes `emit_error` fail as well.
    pub fn with_failing_error_channel(self) -> Self {
        self.state.fail_emit_error.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_verbose(&self, enabled: bool) {
        self.state.verbose.store(enabled, Ordering::SeqCst);
    }

    /// Emitted lines.
    pub fn lines(&self) -> Vec<String> {
        self.state.lines.lock().unwrap().clone()
    }

    /// Emitted lines parsed as JSON.
    pub fn json_lines(&self) -> Vec<serde_json::Value> {
        self.lines()
            .iter()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    /// Reported errors as `(context, cause)` pairs.
    pub fn errors(&self) -> Vec<(String, String)> {
        self.state.errors.lock().unwrap().clone()
    }

    pub fn emit_attempts(&self) -> usize {
        self.state.emit_attempts.load(Ordering::SeqCst)
    }

    pub fn gate_checks(&self) -> usize {
        self.state.gate_checks.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl LogSink for MemorySink {
    fn is_verbose_enabled(&self) -> bool {
        self.state.gate_checks.fetch_add(1, Ordering::SeqCst);
        self.state.verbose.load(Ordering::SeqCst)
    }

    async fn emit(&self, line: &str) -> Result<(), SinkError> {
        self.state.emit_attempts.fetch_add(1, Ordering::SeqCst);
        if self.state.panic_emit.load(Ordering::SeqCst) {
            panic!("sink exploded");
        }
        if self.state.fail_emit.load(Ordering::SeqCst) {
            return Err(SinkError::rejected("sink offline"));
        }
        self.state.lines.lock().unwrap().push(line.to_string());
        Ok(())
    }

    async fn emit_error(&self, context: &str, cause: &DispatchError) -> Result<(), SinkError> {
        self.state
            .errors
            .lock()
            .unwrap()
            .push((context.to_string(), cause.to_string()));
        if self.state.fail_emit_error.load(Ordering::SeqCst) {
            return Err(SinkError::rejected("error channel offline"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writer_sink_writes_lines() {
        let sink = WriterSink::new(Vec::new());
        assert!(sink.is_verbose_enabled());

        sink.emit("first").await.unwrap();
        sink.emit("second").await.unwrap();
        sink.emit_error("render failed", &DispatchError::Panicked("x".to_string()))
            .await
            .unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            output,
            "first\nsecond\nERROR render failed: logging unit panicked: x\n"
        );
    }

    #[test]
    fn test_writer_sink_gate() {
        let sink = WriterSink::new(Vec::new());
        sink.set_verbose(false);
        assert!(!sink.is_verbose_enabled());
    }

    #[test]
    fn test_tracing_sink_gate_follows_subscriber() {
        let sink = TracingSink;

        let quiet = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_test_writer()
            .finish();
        tracing::subscriber::with_default(quiet, || {
            assert!(!sink.is_verbose_enabled());
        });

        let verbose = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::with_default(verbose, || {
            assert!(sink.is_verbose_enabled());
        });
    }

    #[tokio::test]
    async fn test_memory_sink_records_and_fails() {
        let sink = MemorySink::failing();
        assert!(sink.emit("line").await.is_err());
        assert_eq!(sink.emit_attempts(), 1);
        assert!(sink.lines().is_empty());
    }
}
