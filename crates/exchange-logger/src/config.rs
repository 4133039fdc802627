//! Configuration for exchange logging.
//!
//! [`LoggerConfig`] controls the dispatcher's worker pool, the log line
//! format, what happens when a body cannot be rendered, and whether the
//! component logs its own lifecycle. It deserializes from JSON with every
//! field optional, and can be built in code:
//!
//! ```rust,ignore
//! let config = LoggerConfig::new()
//!     .with_queue_capacity(4096)
//!     .with_worker_count(2)
//!     .with_line_format(LineFormat::Compact);
//! ```

use serde::{Deserialize, Serialize};

use crate::logging::constants::{
    DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKER_COUNT, INTERNAL_DEBUG_ENV,
};

/// Serialization of emitted log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Space-separated `key=value` pairs with JSON-escaped strings
    Compact,
}

/// What the dispatcher does when a message body cannot be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderFailurePolicy {
    /// Report through `emit_error` only
    #[default]
    Report,
    /// Report through `emit_error`, then emit the line with a placeholder body
    EmitPlaceholder,
}

/// Internal-debug toggle.
///
/// Controls whether the component logs its own lifecycle events, separately
/// from per-exchange logging. Parsing is lenient: surrounding whitespace and
/// case are ignored, and any value other than `true` or `false` disables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct InternalDebug(bool);

impl<'de> Deserialize<'de> for InternalDebug {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Text(String),
            Other(serde_json::Value),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Flag(enabled) => Self(enabled),
            Raw::Text(text) => Self::parse(Some(&text)),
            Raw::Other(_) => Self::OFF,
        })
    }
}

impl InternalDebug {
    /// Enabled toggle.
    pub const ON: Self = Self(true);
    /// Disabled toggle.
    pub const OFF: Self = Self(false);

    /// Parses a raw setting; absent or malformed values are disabled.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("true") => Self::ON,
            Some(value) if value.eq_ignore_ascii_case("false") => Self::OFF,
            Some(value) => {
                tracing::trace!(value = %value, "Ignoring malformed internal debug setting");
                Self::OFF
            }
            None => Self::OFF,
        }
    }

    /// Reads the toggle from the environment.
    pub fn from_env() -> Self {
        Self::parse(std::env::var(INTERNAL_DEBUG_ENV).ok().as_deref())
    }

    /// Returns true if lifecycle logging is enabled.
    pub fn is_enabled(&self) -> bool {
        self.0
    }
}

impl From<bool> for InternalDebug {
    fn from(enabled: bool) -> Self {
        Self(enabled)
    }
}

/// Configuration for the dispatcher and attachment behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggerConfig {
    /// Whether the component logs its own lifecycle events.
    pub internal_debug: InternalDebug,
    /// Maximum number of records waiting for a worker.
    pub queue_capacity: usize,
    /// Number of background workers.
    pub worker_count: usize,
    /// Serialization of emitted lines.
    pub line_format: LineFormat,
    /// Behavior when a body cannot be rendered.
    pub render_failure: RenderFailurePolicy,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            internal_debug: InternalDebug::OFF,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            worker_count: DEFAULT_WORKER_COUNT,
            line_format: LineFormat::Json,
            render_failure: RenderFailurePolicy::Report,
        }
    }
}

impl LoggerConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a default configuration with the internal-debug toggle read
    /// from the environment.
    pub fn from_env() -> Self {
        Self::default().with_internal_debug(InternalDebug::from_env())
    }

    /// Parses a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(json).map(Self::normalized)
    }

    /// Sets the internal-debug toggle.
    #[must_use = "This method returns a new LoggerConfig and does not modify self"]
    pub fn with_internal_debug(mut self, toggle: impl Into<InternalDebug>) -> Self {
        self.internal_debug = toggle.into();
        self
    }

    /// Sets the queue capacity (at least 1).
    #[must_use = "This method returns a new LoggerConfig and does not modify self"]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Sets the worker count (at least 1).
    #[must_use = "This method returns a new LoggerConfig and does not modify self"]
    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count = workers.max(1);
        self
    }

    /// Sets the line format.
    #[must_use = "This method returns a new LoggerConfig and does not modify self"]
    pub fn with_line_format(mut self, format: LineFormat) -> Self {
        self.line_format = format;
        self
    }

    /// Sets the render failure policy.
    #[must_use = "This method returns a new LoggerConfig and does not modify self"]
    pub fn with_render_failure(mut self, policy: RenderFailurePolicy) -> Self {
        self.render_failure = policy;
        self
    }

    /// Clamps sizes to usable values.
    pub fn normalized(mut self) -> Self {
        self.queue_capacity = self.queue_capacity.max(1);
        self.worker_count = self.worker_count.max(1);
        self
    }

    /// One-line summary for lifecycle logging.
    pub fn summary(&self) -> String {
        format!(
            "queue_capacity={}, workers={}, format={:?}, render_failure={:?}",
            self.queue_capacity, self.worker_count, self.line_format, self.render_failure
        )
    }
}
