//! Per-instance driver configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core::error::{GatewayError, Result};

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_timeout_ms() -> u32 {
    3000
}

fn default_min_period_ms() -> u32 {
    3000
}

/// Configuration shared by every driver.
///
/// Protocol-specific addressing (rack/slot, unit id, ...) is carried as named
/// values in `addressing`, filled by each driver's parameter struct. The
/// device id is fixed at construction; drivers only hand out `&DriverConfig`,
/// so the record is immutable once a driver owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    device_id: Uuid,

    /// Device host name or IP address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Device TCP port.
    pub port: u16,

    /// Upper bound for a single I/O wait, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u32,

    /// Minimum polling period hint for the caller, in milliseconds.
    #[serde(default = "default_min_period_ms")]
    pub min_period_ms: u32,

    /// Protocol-specific addressing parameters.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub addressing: Map<String, Value>,
}

impl DriverConfig {
    /// Create a configuration bound to `device_id` with default timings.
    pub fn new(device_id: Uuid, host: impl Into<String>, port: u16) -> Self {
        Self {
            device_id,
            host: host.into(),
            port,
            timeout_ms: default_timeout_ms(),
            min_period_ms: default_min_period_ms(),
            addressing: Map::new(),
        }
    }

    /// Set the I/O timeout.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the minimum polling period hint.
    #[must_use]
    pub fn with_min_period_ms(mut self, min_period_ms: u32) -> Self {
        self.min_period_ms = min_period_ms;
        self
    }

    /// Add a protocol addressing parameter.
    #[must_use]
    pub fn with_addressing(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.addressing.insert(name.into(), value.into());
        self
    }

    /// Protocol addressing parameter by name.
    pub fn addressing(&self, name: &str) -> Option<&Value> {
        self.addressing.get(name)
    }

    #[inline]
    pub fn device_id(&self) -> Uuid {
        self.device_id
    }

    /// `host:port` form of the transport address.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.timeout_ms))
    }

    #[inline]
    pub fn min_period(&self) -> Duration {
        Duration::from_millis(u64::from(self.min_period_ms))
    }

    /// Reject values no transport can work with.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(GatewayError::Config("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(GatewayError::Config("port must not be 0".into()));
        }
        if self.timeout_ms == 0 {
            return Err(GatewayError::Config("timeout_ms must be greater than 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_config_defaults() {
        let id = Uuid::new_v4();
        let config = DriverConfig::new(id, "192.168.0.10", 102);

        assert_eq!(config.device_id(), id);
        assert_eq!(config.endpoint(), "192.168.0.10:102");
        assert_eq!(config.timeout(), Duration::from_millis(3000));
        assert_eq!(config.min_period(), Duration::from_millis(3000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_driver_config_validate() {
        let id = Uuid::new_v4();
        assert!(DriverConfig::new(id, "", 102).validate().is_err());
        assert!(DriverConfig::new(id, "plc", 0).validate().is_err());
        assert!(DriverConfig::new(id, "plc", 102)
            .with_timeout_ms(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_driver_config_deserialize() {
        let id = Uuid::new_v4();
        let json = serde_json::json!({ "device_id": id, "port": 502 });
        let config: DriverConfig = serde_json::from_value(json).unwrap();

        assert_eq!(config.device_id(), id);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.timeout_ms, 3000);
        assert!(config.addressing.is_empty());
    }

    #[test]
    fn test_driver_config_addressing() {
        let config = DriverConfig::new(Uuid::new_v4(), "plc", 102)
            .with_addressing("rack", 0)
            .with_addressing("slot", 1);

        assert_eq!(config.addressing("slot"), Some(&Value::from(1)));
        assert!(config.addressing("unit_id").is_none());

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["addressing"]["rack"], 0);
    }
}
