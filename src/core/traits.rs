//! Core traits for driver implementations.
//!
//! # Layers
//!
//! ```text
//! Transport   // external field-bus client: open, close, raw reads
//!     │
//! Connection  // owns one transport, turns errors into bool outcomes
//!     │
//! Driver      // what the gateway holds: config + lifecycle + read
//! ```
//!
//! Both traits use `async_trait` so that the gateway can keep
//! heterogeneous drivers as `Box<dyn Driver>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::config::DriverConfig;
use crate::core::data::{ReadResult, Value};
use crate::core::error::Result;
use crate::core::metadata::DriverInfo;
use crate::core::point::RegisterAddress;

/// Connection state of a driver, derived from its transport handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    #[inline]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl From<bool> for ConnectionState {
    fn from(connected: bool) -> Self {
        if connected {
            Self::Connected
        } else {
            Self::Disconnected
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "Disconnected",
            Self::Connected => "Connected",
        };
        write!(f, "{}", s)
    }
}

/// What a transport returns for one address.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Registers as they came off the wire, still in device word order.
    Words(Vec<u16>),
    /// A value the transport already decoded (bits, strings, native types).
    Scalar(Value),
}

/// Field-bus client used by a driver.
///
/// Implementations report failures as errors; the driver layer decides how
/// they surface to the gateway.
#[async_trait]
pub trait Transport: Send {
    /// Remote endpoint for diagnostics (e.g. `"192.168.0.10:102"`).
    fn endpoint(&self) -> String;

    /// Open the connection.
    async fn open(&mut self) -> Result<()>;

    /// Close the connection.
    async fn close(&mut self) -> Result<()>;

    /// Whether the transport currently considers itself connected.
    fn is_connected(&self) -> bool;

    /// Read `word_count` registers (or a native value) at `address`.
    async fn read(&mut self, address: &str, word_count: usize) -> Result<RawValue>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    fn endpoint(&self) -> String {
        (**self).endpoint()
    }

    async fn open(&mut self) -> Result<()> {
        (**self).open().await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    async fn read(&mut self, address: &str, word_count: usize) -> Result<RawValue> {
        (**self).read(address, word_count).await
    }
}

/// The contract every field driver exposes to the gateway.
///
/// None of these methods return errors: connection problems become `false`,
/// read problems become a `Bad` [`ReadResult`]. One instance is driven by a
/// single polling task; `&mut self` enforces sequential use.
#[async_trait]
pub trait Driver: Send {
    /// Discovery tag: name, version, author, supported models.
    fn info(&self) -> &'static DriverInfo;

    /// Configuration the driver was built with.
    fn config(&self) -> &DriverConfig;

    /// Device this driver is bound to.
    fn device_id(&self) -> Uuid {
        self.config().device_id()
    }

    /// True iff a transport handle exists and reports itself connected.
    fn is_connected(&self) -> bool;

    /// Current connection state.
    fn connection_state(&self) -> ConnectionState {
        ConnectionState::from(self.is_connected())
    }

    /// Open the transport. Returns `false` on any failure.
    async fn connect(&mut self) -> bool;

    /// Close the transport. Returns `true` iff the driver ends up disconnected.
    async fn close(&mut self) -> bool;

    /// Read one point.
    async fn read(&mut self, address: &RegisterAddress) -> ReadResult;

    /// Release the transport handle. Idempotent, never fails, terminal.
    fn dispose(&mut self);
}
