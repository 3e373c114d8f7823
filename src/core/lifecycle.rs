//! Connection lifecycle around a single owned transport.
//!
//! ```text
//! Disconnected --connect ok--> Connected --close--> Disconnected
//!       \                           |
//!        +-------- dispose ---------+--> Disposed (terminal)
//! ```
//!
//! A failed read never changes the state; only the transport reports loss.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::core::error::{GatewayError, Result};
use crate::core::logging::{ErrorContext, LogContext};
use crate::core::traits::{ConnectionState, RawValue, Transport};

/// Bound a transport future by `timeout`.
pub(crate) async fn bounded<F, R>(timeout: Duration, fut: F) -> Result<R>
where
    F: Future<Output = Result<R>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout(timeout.as_millis() as u64)),
    }
}

/// Owns the transport handle of one driver instance.
///
/// `connect` / `close` fold every transport error into a boolean; `dispose`
/// drops the handle and can never fail.
pub struct Connection<T: Transport> {
    transport: Option<T>,
    timeout: Duration,
    log: LogContext,
}

impl<T: Transport> Connection<T> {
    /// Wrap a freshly created (not yet opened) transport.
    pub fn new(transport: T, timeout: Duration, log: LogContext) -> Self {
        Self {
            transport: Some(transport),
            timeout,
            log,
        }
    }

    /// True iff the handle exists and the transport reports itself connected.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| t.is_connected())
    }

    #[inline]
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from(self.is_connected())
    }

    /// Whether `dispose` has released the handle.
    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.transport.is_none()
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn log(&self) -> &LogContext {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut LogContext {
        &mut self.log
    }

    /// Remote endpoint of the transport, if it still exists.
    pub fn endpoint(&self) -> Option<String> {
        self.transport.as_ref().map(|t| t.endpoint())
    }

    /// Open the transport. Each call re-attempts the open.
    pub async fn connect(&mut self) -> bool {
        let timeout = self.timeout;
        let Some(transport) = self.transport.as_mut() else {
            self.log
                .log_error(GatewayError::Disposed.to_string(), ErrorContext::Connect)
                .await;
            return false;
        };

        let endpoint = transport.endpoint();
        let started = Instant::now();
        match bounded(timeout, transport.open()).await {
            Ok(()) => {
                let connected = transport.is_connected();
                if connected {
                    tracing::debug!(device_id = %self.log.device_id(), %endpoint, "Transport opened");
                    self.log
                        .log_connected(endpoint, started.elapsed().as_millis() as u64)
                        .await;
                } else {
                    self.log
                        .log_connect_failed(endpoint, "transport reports not connected after open")
                        .await;
                }
                connected
            }
            Err(e) => {
                tracing::debug!(device_id = %self.log.device_id(), %endpoint, error = %e, "Transport open failed");
                self.log.log_connect_failed(endpoint, e.to_string()).await;
                false
            }
        }
    }

    /// Close the transport. `true` iff the connection is closed afterwards.
    pub async fn close(&mut self) -> bool {
        let timeout = self.timeout;
        let Some(transport) = self.transport.as_mut() else {
            return true;
        };

        match bounded(timeout, transport.close()).await {
            Ok(()) => {
                let closed = !transport.is_connected();
                if closed {
                    tracing::debug!(device_id = %self.log.device_id(), "Transport closed");
                    self.log.log_disconnected(None).await;
                }
                closed
            }
            Err(e) => {
                self.log.log_error(e.to_string(), ErrorContext::Close).await;
                false
            }
        }
    }

    /// Release the transport handle. Idempotent and terminal.
    pub fn dispose(&mut self) {
        if self.transport.take().is_some() {
            tracing::debug!(device_id = %self.log.device_id(), "Transport released");
            self.log.log_disposed();
        }
    }

    /// Raw transport read bounded by the configured timeout.
    pub async fn read_raw(&mut self, address: &str, word_count: usize) -> Result<RawValue> {
        let timeout = self.timeout;
        let transport = self.transport.as_mut().ok_or(GatewayError::Disposed)?;
        if !transport.is_connected() {
            return Err(GatewayError::NotConnected);
        }
        bounded(timeout, transport.read(address, word_count)).await
    }
}

impl<T: Transport> std::fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint())
            .field("state", &self.state())
            .field("disposed", &self.is_disposed())
            .field("timeout", &self.timeout)
            .finish()
    }
}
