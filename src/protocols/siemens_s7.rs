//! Siemens S7 driver.
//!
//! Drives an S7 PLC through a [`Transport`] that speaks ISO-on-TCP. The
//! transport returns either decoded values (bits, bytes, native types) or raw
//! register words, which go through the word-order converter.
//!
//! # Example
//!
//! ```rust
//! use fieldgw::prelude::*;
//! use fieldgw::protocols::siemens_s7::{CpuType, SiemensS7Driver, SiemensS7Params};
//! use fieldgw::protocols::simulated::SimulatedTransport;
//!
//! # async fn demo() {
//! let params = SiemensS7Params::new("192.168.0.10").with_cpu_type(CpuType::S71500);
//! let transport = SimulatedTransport::new(params.endpoint());
//! let mut driver = SiemensS7Driver::new(uuid::Uuid::new_v4(), params, transport);
//!
//! if driver.connect().await {
//!     let result = driver
//!         .read(&RegisterAddress::new("DB1.DBD0", "float".parse().unwrap()))
//!         .await;
//!     println!("{:?}", result);
//! }
//! driver.dispose();
//! # }
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

/// Identity of the S7 driver.
pub static SIEMENS_S7_INFO: DriverInfo = DriverInfo {
    name: "SiemensS7",
    version: "V1.0.0",
    author: "Copyright WHD 2021-12-19",
    supported_models: &["1500", "1200", "400", "300", "200", "200Smart"],
};

/// S7 CPU family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CpuType {
    #[serde(rename = "S7-200", alias = "S7200")]
    S7200,
    #[serde(rename = "S7-200Smart", alias = "S7200Smart")]
    S7200Smart,
    #[serde(rename = "S7-300", alias = "S7300")]
    S7300,
    #[serde(rename = "S7-400", alias = "S7400")]
    S7400,
    #[default]
    #[serde(rename = "S7-1200", alias = "S71200")]
    S71200,
    #[serde(rename = "S7-1500", alias = "S71500")]
    S71500,
}

impl CpuType {
    pub const ALL: [CpuType; 6] = [
        Self::S7200,
        Self::S7200Smart,
        Self::S7300,
        Self::S7400,
        Self::S71200,
        Self::S71500,
    ];

    /// Model string as listed in [`SIEMENS_S7_INFO`].
    pub const fn model(&self) -> &'static str {
        match self {
            Self::S7200 => "200",
            Self::S7200Smart => "200Smart",
            Self::S7300 => "300",
            Self::S7400 => "400",
            Self::S71200 => "1200",
            Self::S71500 => "1500",
        }
    }
}

impl fmt::Display for CpuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S7-{}", self.model())
    }
}

// ============================================================================
// Addressing
// ============================================================================

/// Memory area of an S7 address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum S7Area {
    DataBlock(u16),
    Input,
    Output,
    Memory,
    /// S7-200 V memory (mapped to DB1).
    Variable,
    Timer,
    Counter,
}

/// Access size of an S7 address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum S7Size {
    Bit,
    Byte,
    Word,
    DWord,
}

/// Parsed S7 address such as `DB1.DBD4`, `MW10`, `I0.3` or `T5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct S7Address {
    pub area: S7Area,
    pub size: S7Size,
    /// Byte offset (number for timers and counters).
    pub offset: u32,
    pub bit: Option<u8>,
}

impl S7Address {
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || GatewayError::Config(format!("Invalid S7 address: {}", s));
        let upper = s.trim().to_ascii_uppercase();

        if let Some(rest) = upper.strip_prefix("DB") {
            let (db, item) = rest.split_once('.').ok_or_else(invalid)?;
            let db = db.parse::<u16>().map_err(|_| invalid())?;
            let item = item.strip_prefix("DB").ok_or_else(invalid)?;
            let (size, offset, bit) = parse_sized(item, true).ok_or_else(invalid)?;
            return Ok(Self {
                area: S7Area::DataBlock(db),
                size,
                offset,
                bit,
            });
        }

        let mut chars = upper.chars();
        let area = match chars.next() {
            Some('I' | 'E') => S7Area::Input,
            Some('Q' | 'A') => S7Area::Output,
            Some('M') => S7Area::Memory,
            Some('V') => S7Area::Variable,
            Some('T') => S7Area::Timer,
            Some('C' | 'Z') => S7Area::Counter,
            _ => return Err(invalid()),
        };
        let rest = chars.as_str();

        if matches!(area, S7Area::Timer | S7Area::Counter) {
            let offset = rest.parse::<u32>().map_err(|_| invalid())?;
            return Ok(Self {
                area,
                size: S7Size::Word,
                offset,
                bit: None,
            });
        }

        let (size, offset, bit) = parse_sized(rest, false).ok_or_else(invalid)?;
        Ok(Self {
            area,
            size,
            offset,
            bit,
        })
    }
}

/// Parse `[X|B|W|D]offset[.bit]`. A bare offset is a bit access and needs `.bit`;
/// `X` is only spelled out inside data blocks.
fn parse_sized(item: &str, in_db: bool) -> Option<(S7Size, u32, Option<u8>)> {
    let (size, rest) = match item.chars().next()? {
        'X' if in_db => (S7Size::Bit, &item[1..]),
        'B' => (S7Size::Byte, &item[1..]),
        'W' => (S7Size::Word, &item[1..]),
        'D' => (S7Size::DWord, &item[1..]),
        c if c.is_ascii_digit() && !in_db => (S7Size::Bit, item),
        _ => return None,
    };

    match rest.split_once('.') {
        Some((offset, bit)) if size == S7Size::Bit => {
            let bit = bit.parse::<u8>().ok().filter(|b| *b < 8)?;
            Some((size, offset.parse().ok()?, Some(bit)))
        }
        None if size != S7Size::Bit => Some((size, rest.parse().ok()?, None)),
        _ => None,
    }
}

impl fmt::Display for S7Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = match self.size {
            S7Size::Bit => "X",
            S7Size::Byte => "B",
            S7Size::Word => "W",
            S7Size::DWord => "D",
        };
        let prefix = match self.area {
            S7Area::DataBlock(db) => return match self.bit {
                Some(bit) => write!(f, "DB{}.DBX{}.{}", db, self.offset, bit),
                None => write!(f, "DB{}.DB{}{}", db, size, self.offset),
            },
            S7Area::Timer => return write!(f, "T{}", self.offset),
            S7Area::Counter => return write!(f, "C{}", self.offset),
            S7Area::Input => "I",
            S7Area::Output => "Q",
            S7Area::Memory => "M",
            S7Area::Variable => "V",
        };
        match self.bit {
            Some(bit) => write!(f, "{}{}.{}", prefix, self.offset, bit),
            None => write!(f, "{}{}{}", prefix, size, self.offset),
        }
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// S7 parameters (deserialized from a device's `parameters` object).
///
/// # Example JSON
///
/// ```json
/// {
///     "cpu_type": "S7-1200",
///     "host": "192.168.0.10",
///     "port": 102,
///     "rack": 0,
///     "slot": 1
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiemensS7Params {
    #[serde(default)]
    pub cpu_type: CpuType,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub rack: i16,

    #[serde(default)]
    pub slot: i16,

    /// I/O timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u32,

    /// Minimum polling period in milliseconds
    #[serde(default = "default_min_period_ms")]
    pub min_period_ms: u32,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    102
}

fn default_timeout_ms() -> u32 {
    3000
}

fn default_min_period_ms() -> u32 {
    3000
}

impl Default for SiemensS7Params {
    fn default() -> Self {
        Self::new(default_host())
    }
}

impl SiemensS7Params {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            cpu_type: CpuType::default(),
            host: host.into(),
            port: default_port(),
            rack: 0,
            slot: 0,
            timeout_ms: default_timeout_ms(),
            min_period_ms: default_min_period_ms(),
        }
    }

    #[must_use]
    pub fn with_cpu_type(mut self, cpu_type: CpuType) -> Self {
        self.cpu_type = cpu_type;
        self
    }

    #[must_use]
    pub fn with_rack_slot(mut self, rack: i16, slot: i16) -> Self {
        self.rack = rack;
        self.slot = slot;
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
            .with_addressing("cpu_type", self.cpu_type.to_string())
            .with_addressing("rack", self.rack)
            .with_addressing("slot", self.slot)
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Siemens S7 PLC driver.
pub struct SiemensS7Driver<T: Transport> {
    config: DriverConfig,
    params: SiemensS7Params,
    conn: Connection<T>,
}

impl<T: Transport> SiemensS7Driver<T> {
    /// Create a driver for `device_id` over an unopened `transport`.
    pub fn new(device_id: Uuid, params: SiemensS7Params, transport: T) -> Self {
        let config = params.to_config(device_id);
        let conn = Connection::new(transport, config.timeout(), LogContext::new(device_id));
        Self {
            config,
            params,
            conn,
        }
    }

    pub fn params(&self) -> &SiemensS7Params {
        &self.params
    }

    #[inline]
    pub fn cpu_type(&self) -> CpuType {
        self.params.cpu_type
    }

    /// Whether `dispose` has been called.
    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.conn.is_disposed()
    }
}

#[async_trait]
impl<T: Transport> Driver for SiemensS7Driver<T> {
    fn info(&self) -> &'static DriverInfo {
        &SIEMENS_S7_INFO
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
            cpu = %self.params.cpu_type,
            rack = self.params.rack,
            slot = self.params.slot,
            "Connecting to S7 PLC at {}",
            self.config.endpoint()
        );
        self.conn.connect().await
    }

    async fn close(&mut self) -> bool {
        self.conn.close().await
    }

    async fn read(&mut self, address: &RegisterAddress) -> ReadResult {
        read_point(&mut self.conn, address, |a| {
            S7Address::parse(a).map(|_| a.to_string())
        })
        .await
    }

    fn dispose(&mut self) {
        self.conn.dispose();
    }
}

impl<T: Transport> LoggableDriver for SiemensS7Driver<T> {
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

impl<T: Transport> fmt::Debug for SiemensS7Driver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiemensS7Driver")
            .field("config", &self.config)
            .field("cpu_type", &self.params.cpu_type)
            .field("conn", &self.conn)
            .finish()
    }
}

// ============================================================================
// HasMetadata Implementation
// ============================================================================

/// Metadata is independent of the transport type.
pub type SiemensS7 = SiemensS7Driver<Box<dyn Transport>>;

impl<T: Transport> HasMetadata for SiemensS7Driver<T> {
    fn metadata() -> DriverMetadata {
        DriverMetadata {
            info: &SIEMENS_S7_INFO,
            display_name: "Siemens S7",
            description: "Siemens S7 PLC family over ISO-on-TCP (S7-200 to S7-1500).",
            example_config: serde_json::json!({
                "cpu_type": "S7-1200",
                "host": "192.168.0.10",
                "port": 102,
                "rack": 0,
                "slot": 1,
                "timeout_ms": 3000,
                "min_period_ms": 3000
            }),
            parameters: vec![
                ParameterMetadata::optional(
                    "cpu_type",
                    "PLC type",
                    "CPU family: S7-200, S7-200Smart, S7-300, S7-400, S7-1200, S7-1500",
                    ParameterType::Enum,
                    serde_json::json!("S7-1200"),
                ),
                ParameterMetadata::optional(
                    "host",
                    "IP address",
                    "PLC host name or IP address",
                    ParameterType::String,
                    serde_json::json!("127.0.0.1"),
                ),
                ParameterMetadata::optional(
                    "port",
                    "Port",
                    "ISO-on-TCP port",
                    ParameterType::Integer,
                    serde_json::json!(102),
                ),
                ParameterMetadata::optional(
                    "rack",
                    "Rack",
                    "Rack number of the CPU",
                    ParameterType::Integer,
                    serde_json::json!(0),
                ),
                ParameterMetadata::optional(
                    "slot",
                    "Slot",
                    "Slot number of the CPU",
                    ParameterType::Integer,
                    serde_json::json!(0),
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
                    serde_json::json!(3000),
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data::Value;
    use crate::core::point::{DataType, ValueKind, WordOrder};
    use crate::protocols::simulated::{SimulatedHandle, SimulatedTransport};

    fn make_driver() -> (SiemensS7Driver<SimulatedTransport>, SimulatedHandle) {
        let params = SiemensS7Params::new("10.0.0.5").with_timeout_ms(200);
        let transport = SimulatedTransport::new(params.endpoint());
        let handle = transport.handle();
        (SiemensS7Driver::new(Uuid::new_v4(), params, transport), handle)
    }

    #[test]
    fn test_params_defaults() {
        let params: SiemensS7Params = serde_json::from_value(serde_json::json!({})).unwrap();

        assert_eq!(params.cpu_type, CpuType::S71200);
        assert_eq!(params.host, "127.0.0.1");
        assert_eq!(params.port, 102);
        assert_eq!((params.rack, params.slot), (0, 0));
        assert_eq!(params.timeout_ms, 3000);
        assert_eq!(params.min_period_ms, 3000);
    }

    #[test]
    fn test_cpu_type_names() {
        let params: SiemensS7Params =
            serde_json::from_value(serde_json::json!({ "cpu_type": "S7-200Smart" })).unwrap();
        assert_eq!(params.cpu_type, CpuType::S7200Smart);

        let params: SiemensS7Params =
            serde_json::from_value(serde_json::json!({ "cpu_type": "S71500" })).unwrap();
        assert_eq!(params.cpu_type, CpuType::S71500);
        assert_eq!(params.cpu_type.to_string(), "S7-1500");

        for cpu in CpuType::ALL {
            assert!(SIEMENS_S7_INFO.supports(cpu.model()));
        }
    }

    #[test]
    fn test_config_carries_rack_slot() {
        let params = SiemensS7Params::new("10.0.0.5")
            .with_cpu_type(CpuType::S71500)
            .with_rack_slot(0, 1);
        let driver = SiemensS7Driver::new(Uuid::new_v4(), params, SimulatedTransport::new("sim"));
        let config = driver.config();

        assert_eq!(config.addressing("cpu_type"), Some(&"S7-1500".into()));
        assert_eq!(config.addressing("rack"), Some(&0.into()));
        assert_eq!(config.addressing("slot"), Some(&1.into()));
    }

    #[test]
    fn test_address_parse() {
        let addr = S7Address::parse("DB1.DBD4").unwrap();
        assert_eq!(addr.area, S7Area::DataBlock(1));
        assert_eq!(addr.size, S7Size::DWord);
        assert_eq!(addr.offset, 4);

        let addr = S7Address::parse("db10.dbx2.7").unwrap();
        assert_eq!(addr.size, S7Size::Bit);
        assert_eq!(addr.bit, Some(7));
        assert_eq!(addr.to_string(), "DB10.DBX2.7");

        assert_eq!(S7Address::parse("MW10").unwrap().to_string(), "MW10");
        assert_eq!(S7Address::parse("E0.3").unwrap().area, S7Area::Input);
        assert_eq!(S7Address::parse("Q1.0").unwrap().to_string(), "Q1.0");
        assert_eq!(S7Address::parse("VB100").unwrap().area, S7Area::Variable);
        assert_eq!(S7Address::parse("T5").unwrap().area, S7Area::Timer);
    }

    #[test]
    fn test_address_parse_rejects() {
        for bad in ["", "DB1", "DB1.DBX0", "DB1.DBW0.1", "M0.8", "M10", "MW", "X1.0", "DB1.MW0"] {
            assert!(S7Address::parse(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_metadata_labels() {
        let meta = SiemensS7::metadata();
        assert_eq!(meta.name(), "SiemensS7");
        assert_eq!(meta.info.version, "V1.0.0");
        assert_eq!(meta.label_of("host"), Some("IP address"));
        assert_eq!(meta.label_of("rack"), Some("Rack"));
        assert!(meta.info.supports("200smart"));
    }

    #[tokio::test]
    async fn test_read_before_connect() {
        let (mut driver, _) = make_driver();
        let result = driver
            .read(&RegisterAddress::new("DB1.DBW0", DataType::of(ValueKind::Int16)))
            .await;

        assert!(!result.is_good());
        assert!(!result.message().is_empty());
        assert!(result.value.is_null());
    }

    #[tokio::test]
    async fn test_connect_read_close() {
        let (mut driver, handle) = make_driver();
        handle.set_value("M0.0", true);
        handle.set_words("DB1.DBD4", vec![0x4228, 0x0000]);

        assert!(driver.connect().await);
        assert!(driver.is_connected());

        let bit = driver
            .read(&RegisterAddress::new("M0.0", DataType::of(ValueKind::Bool)))
            .await;
        assert_eq!(bit.value, Value::Bool(true));

        let real = driver
            .read(&RegisterAddress::new(
                "DB1.DBD4",
                DataType::new(ValueKind::Float32, WordOrder::V1),
            ))
            .await;
        assert!(real.is_good());
        assert_eq!(real.value.as_f64(), Some(42.0));

        assert!(driver.close().await);
        assert!(!driver.is_connected());
    }

    #[tokio::test]
    async fn test_invalid_address_skips_io() {
        let (mut driver, handle) = make_driver();
        assert!(driver.connect().await);

        let result = driver
            .read(&RegisterAddress::new("40001", DataType::of(ValueKind::Int16)))
            .await;
        assert!(!result.is_good());
        assert!(result.message().contains("Invalid S7 address"));
        assert_eq!(handle.read_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_error_becomes_bad() {
        let (mut driver, handle) = make_driver();
        assert!(driver.connect().await);

        handle.fail_read("PLC is in STOP mode");
        let result = driver
            .read(&RegisterAddress::new("DB1.DBW0", DataType::of(ValueKind::Int16)))
            .await;

        assert!(!result.is_good());
        assert!(result.message().contains("PLC is in STOP mode"));
        assert!(driver.is_connected());
    }

    #[tokio::test]
    async fn test_connection_loss_reported_by_transport() {
        let (mut driver, handle) = make_driver();
        assert!(driver.connect().await);

        handle.drop_connection();
        assert!(!driver.is_connected());

        let result = driver
            .read(&RegisterAddress::new("DB1.DBW0", DataType::of(ValueKind::Int16)))
            .await;
        assert_eq!(result.message(), "connection failed");

        // reconnect re-attempts open
        assert!(driver.connect().await);
    }

    #[tokio::test]
    async fn test_dispose_any_state() {
        let (mut driver, _) = make_driver();
        driver.dispose();
        assert!(!driver.is_connected());

        let (mut driver, _) = make_driver();
        assert!(driver.connect().await);
        driver.dispose();
        driver.dispose();
        assert!(driver.is_disposed());
        assert!(!driver.is_connected());
        assert!(!driver.connect().await);
    }
}
