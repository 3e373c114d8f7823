//! Modbus TCP driver.
//!
//! Reads holding registers through a [`Transport`]. Point addresses are
//! either `"register"` (unit id from the parameters) or `"unit:register"`.
//!
//! # Example
//!
//! ```rust
//! use fieldgw::protocols::modbus::{ModbusTcpDriver, ModbusTcpParams};
//! use fieldgw::protocols::simulated::SimulatedTransport;
//!
//! let params = ModbusTcpParams::new("192.168.1.100").with_unit_id(3);
//! let transport = SimulatedTransport::new(params.endpoint());
//! let driver = ModbusTcpDriver::new(uuid::Uuid::new_v4(), params, transport);
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::config::DriverConfig;
use crate::core::data::ReadResult;
use crate::core::error::{GatewayError, Result};
use crate::core::lifecycle::Connection;
use crate::core::logging::{DriverLogConfig, DriverLogHandler, LogContext, LoggableDriver};
use crate::core::metadata::{
    DriverInfo, DriverMetadata, HasMetadata, ParameterMetadata, ParameterType,
};
use crate::core::pipeline::read_point;
use crate::core::point::RegisterAddress;
use crate::core::traits::{Driver, Transport};

/// Identity of the Modbus TCP driver.
pub static MODBUS_TCP_INFO: DriverInfo = DriverInfo {
    name: "ModbusTcp",
    version: "V1.0.0",
    author: "fieldgw",
    supported_models: &["ModbusTcp"],
};

// ============================================================================
// Addressing
// ============================================================================

/// Resolved holding-register address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModbusAddress {
    pub unit_id: u8,
    pub register: u16,
}

impl ModbusAddress {
    /// Parse `"register"` or `"unit:register"`, falling back to `default_unit`.
    pub fn parse(s: &str, default_unit: u8) -> Result<Self> {
        let invalid = || GatewayError::Config(format!("Invalid Modbus address: {}", s));
        let s = s.trim();

        let (unit_id, register) = match s.split_once(':') {
            Some((unit, register)) => (
                unit.trim().parse::<u8>().map_err(|_| invalid())?,
                register.trim(),
            ),
            None => (default_unit, s),
        };
        let register = register.parse::<u16>().map_err(|_| invalid())?;

        Ok(Self { unit_id, register })
    }
}

impl fmt::Display for ModbusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.unit_id, self.register)
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// Modbus TCP parameters (deserialized from a device's `parameters` object).
///
/// # Example JSON
///
/// ```json
/// {
///     "host": "192.168.1.100",
///     "port": 502,
///     "unit_id": 1
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModbusTcpParams {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Unit id used when an address does not name one
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u32,

    #[serde(default = "default_min_period_ms")]
    pub min_period_ms: u32,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    502
}

fn default_unit_id() -> u8 {
    1
}

fn default_timeout_ms() -> u32 {
    3000
}

fn default_min_period_ms() -> u32 {
    1000
}

impl Default for ModbusTcpParams {
    fn default() -> Self {
        Self::new(default_host())
    }
}

impl ModbusTcpParams {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            unit_id: default_unit_id(),
            timeout_ms: default_timeout_ms(),
            min_period_ms: default_min_period_ms(),
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_unit_id(mut self, unit_id: u8) -> Self {
        self.unit_id = unit_id;
        self
    }

    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Convert to the shared [`DriverConfig`] for `device_id`.
    pub fn to_config(&self, device_id: Uuid) -> DriverConfig {
        DriverConfig::new(device_id, &self.host, self.port)
            .with_timeout_ms(self.timeout_ms)
            .with_min_period_ms(self.min_period_ms)
            .with_addressing("unit_id", self.unit_id)
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Modbus TCP driver.
pub struct ModbusTcpDriver<T: Transport> {
    config: DriverConfig,
    params: ModbusTcpParams,
    conn: Connection<T>,
}

impl<T: Transport> ModbusTcpDriver<T> {
    pub fn new(device_id: Uuid, params: ModbusTcpParams, transport: T) -> Self {
        let config = params.to_config(device_id);
        let conn = Connection::new(transport, config.timeout(), LogContext::new(device_id));
        Self {
            config,
            params,
            conn,
        }
    }

    pub fn params(&self) -> &ModbusTcpParams {
        &self.params
    }

    /// Resolve a point address against this driver's default unit id.
    pub fn resolve(&self, address: &str) -> Result<ModbusAddress> {
        ModbusAddress::parse(address, self.params.unit_id)
    }
}

#[async_trait]
impl<T: Transport> Driver for ModbusTcpDriver<T> {
    fn info(&self) -> &'static DriverInfo {
        &MODBUS_TCP_INFO
    }

    fn config(&self) -> &DriverConfig {
        &self.config
    }

    fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    async fn connect(&mut self) -> bool {
        tracing::info!(
            device_id = %self.config.device_id(),
            unit_id = self.params.unit_id,
            "Connecting to Modbus TCP server at {}",
            self.config.endpoint()
        );
        self.conn.connect().await
    }

    async fn close(&mut self) -> bool {
        self.conn.close().await
    }

    async fn read(&mut self, address: &RegisterAddress) -> ReadResult {
        let unit_id = self.params.unit_id;
        read_point(&mut self.conn, address, |a| {
            ModbusAddress::parse(a, unit_id).map(|target| target.to_string())
        })
        .await
    }

    fn dispose(&mut self) {
        self.conn.dispose();
    }
}

impl<T: Transport> LoggableDriver for ModbusTcpDriver<T> {
    fn set_log_handler(&mut self, handler: Arc<dyn DriverLogHandler>) {
        self.conn.log_mut().set_handler(handler);
    }

    fn set_log_config(&mut self, config: DriverLogConfig) {
        self.conn.log_mut().set_config(config);
    }

    fn log_config(&self) -> &DriverLogConfig {
        self.conn.log().config()
    }
}

// ============================================================================
// HasMetadata Implementation
// ============================================================================

pub type ModbusTcp = ModbusTcpDriver<Box<dyn Transport>>;

impl<T: Transport> HasMetadata for ModbusTcpDriver<T> {
    fn metadata() -> DriverMetadata {
        DriverMetadata {
            info: &MODBUS_TCP_INFO,
            display_name: "Modbus TCP",
            description: "Modbus TCP client reading holding registers.",
            example_config: serde_json::json!({
                "host": "192.168.1.100",
                "port": 502,
                "unit_id": 1,
                "timeout_ms": 3000
            }),
            parameters: vec![
                ParameterMetadata::required(
                    "host",
                    "IP address",
                    "Modbus server host name or IP address",
                    ParameterType::String,
                ),
                ParameterMetadata::optional(
                    "port",
                    "Port",
                    "Modbus TCP port",
                    ParameterType::Integer,
                    serde_json::json!(502),
                ),
                ParameterMetadata::optional(
                    "unit_id",
                    "Unit ID",
                    "Unit id used when an address does not name one",
                    ParameterType::Integer,
                    serde_json::json!(1),
                ),
                ParameterMetadata::optional(
                    "timeout_ms",
                    "Timeout (ms)",
                    "Upper bound for a single I/O wait",
                    ParameterType::Integer,
                    serde_json::json!(3000),
                ),
                ParameterMetadata::optional(
                    "min_period_ms",
                    "Minimum period (ms)",
                    "Minimum polling period hint",
                    ParameterType::Integer,
                    serde_json::json!(1000),
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::CONNECTION_FAILED;
    use crate::core::point::{DataType, ValueKind, WordOrder};
    use crate::protocols::simulated::SimulatedTransport;

    #[test]
    fn test_address_parse() {
        assert_eq!(
            ModbusAddress::parse("100", 1).unwrap(),
            ModbusAddress { unit_id: 1, register: 100 }
        );
        assert_eq!(
            ModbusAddress::parse("7:40001", 1).unwrap(),
            ModbusAddress { unit_id: 7, register: 40001 }
        );
        assert_eq!(ModbusAddress::parse(" 2 : 10 ", 1).unwrap().to_string(), "2:10");

        assert!(ModbusAddress::parse("", 1).is_err());
        assert!(ModbusAddress::parse("DB1.DBW0", 1).is_err());
        assert!(ModbusAddress::parse("300:1", 1).is_err());
        assert!(ModbusAddress::parse("1:70000", 1).is_err());
    }

    #[test]
    fn test_params_defaults() {
        let params: ModbusTcpParams =
            serde_json::from_value(serde_json::json!({ "host": "10.1.1.1" })).unwrap();
        assert_eq!(params.port, 502);
        assert_eq!(params.unit_id, 1);
        assert_eq!(params.endpoint(), "10.1.1.1:502");
    }

    #[test]
    fn test_config_carries_unit_id() {
        let params = ModbusTcpParams::new("10.1.1.1").with_unit_id(9);
        let driver = ModbusTcpDriver::new(Uuid::new_v4(), params, SimulatedTransport::new("sim"));

        assert_eq!(driver.config().addressing("unit_id"), Some(&9.into()));
        assert_eq!(driver.config().port, 502);
    }

    #[tokio::test]
    async fn test_read_with_default_unit() {
        let params = ModbusTcpParams::new("10.1.1.1").with_unit_id(3);
        // 0x0001_0002 stored as CDAB
        let transport = SimulatedTransport::new(params.endpoint()).with_words("3:10", vec![0x0002, 0x0001]);
        let mut driver = ModbusTcpDriver::new(Uuid::new_v4(), params, transport);

        assert!(driver.connect().await);
        let result = driver
            .read(&RegisterAddress::new("10", DataType::of(ValueKind::UInt32)))
            .await;

        assert!(result.is_good());
        assert_eq!(result.value.as_i64(), Some(0x0001_0002));
    }

    #[tokio::test]
    async fn test_read_invalid_address() {
        let params = ModbusTcpParams::new("10.1.1.1");
        let transport = SimulatedTransport::new(params.endpoint());
        let handle = transport.handle();
        let mut driver = ModbusTcpDriver::new(Uuid::new_v4(), params, transport);

        assert!(driver.connect().await);
        let result = driver
            .read(&RegisterAddress::new(
                "holding:10",
                DataType::new(ValueKind::Int32, WordOrder::V1),
            ))
            .await;

        assert!(!result.is_good());
        assert!(result.message().contains("Invalid Modbus address"));
        assert_eq!(handle.read_count(), 0);
    }

    #[tokio::test]
    async fn test_read_not_connected() {
        let params = ModbusTcpParams::new("10.1.1.1");
        let mut driver =
            ModbusTcpDriver::new(Uuid::new_v4(), params.clone(), SimulatedTransport::new(params.endpoint()));

        let result = driver
            .read(&RegisterAddress::new("bogus", DataType::default()))
            .await;
        assert_eq!(result.message(), CONNECTION_FAILED);
    }
}
