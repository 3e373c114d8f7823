//! Driver logging infrastructure.
//!
//! Drivers report lifecycle and read events through a [`LogContext`]. The
//! gateway plugs in a [`DriverLogHandler`] (the built-in
//! [`TracingLogHandler`] forwards to `tracing`) and filters with a
//! [`DriverLogConfig`].
//!
//! # Example
//!
//! ```ignore
//! use fieldgw::core::logging::{DriverLogConfig, TracingLogHandler};
//!
//! let mut driver = SiemensS7Driver::new(device_id, params, transport);
//! driver.set_log_handler(Arc::new(TracingLogHandler));
//! driver.set_log_config(DriverLogConfig::all());
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::SystemTime;
use uuid::Uuid;

use crate::core::data::ReadResult;

// ============================================================================
// Error Context
// ============================================================================

/// Operation during which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorContext {
    Connect,
    Close,
    Read,
    Address,
    Conversion,
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Close => write!(f, "close"),
            Self::Read => write!(f, "read"),
            Self::Address => write!(f, "address"),
            Self::Conversion => write!(f, "conversion"),
        }
    }
}

// ============================================================================
// Driver Log Event
// ============================================================================

/// Event reported by a driver.
#[derive(Debug, Clone)]
pub enum DriverLogEvent {
    /// Transport opened.
    Connected {
        timestamp: SystemTime,
        /// Remote endpoint (e.g. `"192.168.0.10:102"`).
        endpoint: String,
        duration_ms: u64,
    },

    /// Transport failed to open.
    ConnectFailed {
        timestamp: SystemTime,
        endpoint: String,
        error: String,
    },

    /// Transport closed.
    Disconnected {
        timestamp: SystemTime,
        /// `None` for an intentional close.
        reason: Option<String>,
    },

    /// One read finished, good or bad.
    ReadOperation {
        timestamp: SystemTime,
        address: String,
        result: ReadResult,
        duration_ms: u64,
    },

    /// Error outside the read path.
    Error {
        timestamp: SystemTime,
        error: String,
        context: ErrorContext,
    },

    /// Transport handle released.
    Disposed { timestamp: SystemTime },
}

impl DriverLogEvent {
    /// Get the event timestamp.
    pub fn timestamp(&self) -> SystemTime {
        match self {
            Self::Connected { timestamp, .. }
            | Self::ConnectFailed { timestamp, .. }
            | Self::Disconnected { timestamp, .. }
            | Self::ReadOperation { timestamp, .. }
            | Self::Error { timestamp, .. }
            | Self::Disposed { timestamp } => *timestamp,
        }
    }

    /// Filtering category of this event.
    pub fn event_type(&self) -> LogEventType {
        match self {
            Self::Connected { .. } => LogEventType::Connected,
            Self::ConnectFailed { .. } => LogEventType::ConnectFailed,
            Self::Disconnected { .. } => LogEventType::Disconnected,
            Self::ReadOperation { .. } => LogEventType::ReadOperation,
            Self::Error { .. } => LogEventType::Error,
            Self::Disposed { .. } => LogEventType::Disposed,
        }
    }
}

/// Log event type for filtering configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEventType {
    Connected,
    ConnectFailed,
    Disconnected,
    ReadOperation,
    Error,
    Disposed,
}

impl LogEventType {
    /// Get all event types.
    pub fn all() -> HashSet<LogEventType> {
        use LogEventType::*;
        [
            Connected,
            ConnectFailed,
            Disconnected,
            ReadOperation,
            Error,
            Disposed,
        ]
        .into_iter()
        .collect()
    }

    /// Everything except the per-read events.
    pub fn default_set() -> HashSet<LogEventType> {
        let mut set = Self::all();
        set.remove(&LogEventType::ReadOperation);
        set
    }
}

// ============================================================================
// Driver Log Config
// ============================================================================

/// Controls which events reach the handler.
#[derive(Debug, Clone)]
pub struct DriverLogConfig {
    enabled_events: HashSet<LogEventType>,
    /// Also report reads that came back `Good`.
    log_successful_reads: bool,
}

impl Default for DriverLogConfig {
    fn default() -> Self {
        Self {
            enabled_events: LogEventType::default_set(),
            log_successful_reads: false,
        }
    }
}

impl DriverLogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log everything, including successful reads.
    pub fn all() -> Self {
        Self {
            enabled_events: LogEventType::all(),
            log_successful_reads: true,
        }
    }

    /// Log nothing.
    pub fn disabled() -> Self {
        Self {
            enabled_events: HashSet::new(),
            log_successful_reads: false,
        }
    }

    #[must_use]
    pub fn enable_event(mut self, event_type: LogEventType) -> Self {
        self.enabled_events.insert(event_type);
        self
    }

    #[must_use]
    pub fn disable_event(mut self, event_type: LogEventType) -> Self {
        self.enabled_events.remove(&event_type);
        self
    }

    #[must_use]
    pub fn with_successful_reads(mut self, enable: bool) -> Self {
        self.log_successful_reads = enable;
        self
    }

    pub fn is_enabled(&self, event_type: LogEventType) -> bool {
        self.enabled_events.contains(&event_type)
    }

    /// Check if an event should be logged based on configuration.
    pub fn should_log(&self, event: &DriverLogEvent) -> bool {
        if !self.is_enabled(event.event_type()) {
            return false;
        }
        match event {
            DriverLogEvent::ReadOperation { result, .. } => {
                !result.is_good() || self.log_successful_reads
            }
            _ => true,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Receiver of driver log events.
///
/// Uses `async_trait` so handlers can be shared as `Arc<dyn DriverLogHandler>`.
#[async_trait]
pub trait DriverLogHandler: Send + Sync {
    async fn on_log(&self, device_id: Uuid, event: DriverLogEvent);
}

/// Log handler that forwards events to `tracing`.
#[cfg(feature = "tracing-support")]
pub struct TracingLogHandler;

#[cfg(feature = "tracing-support")]
#[async_trait]
impl DriverLogHandler for TracingLogHandler {
    async fn on_log(&self, device_id: Uuid, event: DriverLogEvent) {
        use tracing::{debug, info, warn};

        match &event {
            DriverLogEvent::Connected {
                endpoint,
                duration_ms,
                ..
            } => {
                info!(
                    device_id = %device_id,
                    endpoint = %endpoint,
                    duration_ms = duration_ms,
                    "Device connected"
                );
            }
            DriverLogEvent::ConnectFailed {
                endpoint, error, ..
            } => {
                warn!(
                    device_id = %device_id,
                    endpoint = %endpoint,
                    error = %error,
                    "Device connect failed"
                );
            }
            DriverLogEvent::Disconnected { reason, .. } => {
                if let Some(reason) = reason {
                    warn!(device_id = %device_id, reason = %reason, "Device disconnected");
                } else {
                    info!(device_id = %device_id, "Device disconnected");
                }
            }
            DriverLogEvent::ReadOperation {
                address,
                result,
                duration_ms,
                ..
            } => {
                if result.is_good() {
                    debug!(
                        device_id = %device_id,
                        address = %address,
                        value = ?result.value,
                        duration_ms = duration_ms,
                        "Read completed"
                    );
                } else {
                    warn!(
                        device_id = %device_id,
                        address = %address,
                        reason = result.message(),
                        duration_ms = duration_ms,
                        "Read failed"
                    );
                }
            }
            DriverLogEvent::Error { error, context, .. } => {
                warn!(
                    device_id = %device_id,
                    error = %error,
                    context = %context,
                    "Driver error"
                );
            }
            DriverLogEvent::Disposed { .. } => {
                debug!(device_id = %device_id, "Driver disposed");
            }
        }
    }
}

// ============================================================================
// Log Context
// ============================================================================

/// Logging context owned by a driver.
#[derive(Clone)]
pub struct LogContext {
    device_id: Uuid,
    handler: Option<Arc<dyn DriverLogHandler>>,
    config: DriverLogConfig,
}

impl LogContext {
    pub fn new(device_id: Uuid) -> Self {
        Self {
            device_id,
            handler: None,
            config: DriverLogConfig::default(),
        }
    }

    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn DriverLogHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: DriverLogConfig) -> Self {
        self.config = config;
        self
    }

    pub fn set_handler(&mut self, handler: Arc<dyn DriverLogHandler>) {
        self.handler = Some(handler);
    }

    pub fn set_config(&mut self, config: DriverLogConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &DriverLogConfig {
        &self.config
    }

    pub fn device_id(&self) -> Uuid {
        self.device_id
    }

    /// Log an event (async).
    pub async fn log(&self, event: DriverLogEvent) {
        if let Some(handler) = &self.handler {
            if self.config.should_log(&event) {
                handler.on_log(self.device_id, event).await;
            }
        }
    }

    /// Log from synchronous code. Dropped when no tokio runtime is running.
    pub fn log_spawn(&self, event: DriverLogEvent) {
        let Some(handler) = &self.handler else {
            return;
        };
        if !self.config.should_log(&event) {
            return;
        }
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let handler = handler.clone();
            let device_id = self.device_id;
            runtime.spawn(async move {
                handler.on_log(device_id, event).await;
            });
        }
    }

    // === Convenience methods ===

    pub async fn log_connected(&self, endpoint: impl Into<String>, duration_ms: u64) {
        self.log(DriverLogEvent::Connected {
            timestamp: SystemTime::now(),
            endpoint: endpoint.into(),
            duration_ms,
        })
        .await;
    }

    pub async fn log_connect_failed(&self, endpoint: impl Into<String>, error: impl Into<String>) {
        self.log(DriverLogEvent::ConnectFailed {
            timestamp: SystemTime::now(),
            endpoint: endpoint.into(),
            error: error.into(),
        })
        .await;
    }

    pub async fn log_disconnected(&self, reason: Option<String>) {
        self.log(DriverLogEvent::Disconnected {
            timestamp: SystemTime::now(),
            reason,
        })
        .await;
    }

    pub async fn log_read(&self, address: impl Into<String>, result: &ReadResult, duration_ms: u64) {
        self.log(DriverLogEvent::ReadOperation {
            timestamp: SystemTime::now(),
            address: address.into(),
            result: result.clone(),
            duration_ms,
        })
        .await;
    }

    pub async fn log_error(&self, error: impl Into<String>, context: ErrorContext) {
        self.log(DriverLogEvent::Error {
            timestamp: SystemTime::now(),
            error: error.into(),
            context,
        })
        .await;
    }

    pub fn log_disposed(&self) {
        self.log_spawn(DriverLogEvent::Disposed {
            timestamp: SystemTime::now(),
        });
    }
}

impl std::fmt::Debug for LogContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogContext")
            .field("device_id", &self.device_id)
            .field("has_handler", &self.handler.is_some())
            .field("config", &self.config)
            .finish()
    }
}

/// Drivers whose log output can be configured.
pub trait LoggableDriver {
    fn set_log_handler(&mut self, handler: Arc<dyn DriverLogHandler>);

    fn set_log_config(&mut self, config: DriverLogConfig);

    fn log_config(&self) -> &DriverLogConfig;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        count: AtomicUsize,
    }

    #[async_trait]
    impl DriverLogHandler for CountingHandler {
        async fn on_log(&self, _device_id: Uuid, _event: DriverLogEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_log_config() {
        let config = DriverLogConfig::new();
        assert!(config.is_enabled(LogEventType::Connected));
        assert!(!config.is_enabled(LogEventType::ReadOperation));

        let config = DriverLogConfig::all();
        assert!(config.is_enabled(LogEventType::ReadOperation));

        let config = DriverLogConfig::disabled();
        assert!(!config.is_enabled(LogEventType::Connected));
    }

    #[test]
    fn test_successful_reads_filtered() {
        let good = DriverLogEvent::ReadOperation {
            timestamp: SystemTime::now(),
            address: "DB1.DBW0".into(),
            result: ReadResult::good(1i64),
            duration_ms: 1,
        };
        let bad = DriverLogEvent::ReadOperation {
            timestamp: SystemTime::now(),
            address: "DB1.DBW0".into(),
            result: ReadResult::bad("timeout"),
            duration_ms: 1,
        };

        let config = DriverLogConfig::new().enable_event(LogEventType::ReadOperation);
        assert!(!config.should_log(&good));
        assert!(config.should_log(&bad));
        assert!(config.with_successful_reads(true).should_log(&good));
    }

    #[tokio::test]
    async fn test_log_context() {
        let handler = Arc::new(CountingHandler {
            count: AtomicUsize::new(0),
        });

        let ctx = LogContext::new(Uuid::new_v4())
            .with_handler(handler.clone())
            .with_config(DriverLogConfig::all());

        ctx.log_connected("localhost:102", 5).await;
        ctx.log_error("boom", ErrorContext::Close).await;
        ctx.log_read("DB1.DBW0", &ReadResult::good(1i64), 1).await;

        assert_eq!(handler.count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_log_context_without_handler_is_silent() {
        let ctx = LogContext::new(Uuid::new_v4()).with_config(DriverLogConfig::all());
        ctx.log_disconnected(None).await;
        ctx.log_disposed();
    }
}
