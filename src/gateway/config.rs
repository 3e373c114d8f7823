//! Gateway configuration file.
//!
//! ```toml
//! [[devices]]
//! name = "press-line"
//! kind = "group"
//!
//! [[devices]]
//! id = "6f1c1d2e-3f4a-4b5c-8d9e-0a1b2c3d4e5f"
//! name = "press-1"
//! driver = "SiemensS7"
//!
//! [devices.parameters]
//! host = "192.168.0.10"
//! cpu_type = "S7-1500"
//!
//! [[devices.points]]
//! name = "temperature"
//! address = "DB1.DBD4"
//! data_type = "float"
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::{GatewayError, Result};
use crate::core::point::{AccessMode, DataType, DeviceKind, RegisterAddress};
use crate::core::metadata::get_driver_registry;

use super::address::validate_address;
use super::factory::validate_parameters;

fn default_true() -> bool {
    true
}

fn empty_parameters() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Top-level configuration: the device tree, flattened.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub devices: Vec<DeviceDefinition>,
}

/// One configured device (or grouping node).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDefinition {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    pub name: String,

    /// Driver name; required for devices, absent for groups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,

    #[serde(default)]
    pub kind: DeviceKind,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Driver-specific parameters, parsed by the factory.
    #[serde(default = "empty_parameters")]
    pub parameters: serde_json::Value,

    #[serde(default)]
    pub points: Vec<PointDefinition>,
}

/// One configured point of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointDefinition {
    pub name: String,

    pub address: String,

    #[serde(default)]
    pub data_type: DataType,

    /// Register count of string points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u16>,

    #[serde(default)]
    pub access: AccessMode,
}

impl PointDefinition {
    pub fn register_address(&self) -> RegisterAddress {
        let address = RegisterAddress::new(&self.address, self.data_type);
        match self.length {
            Some(length) => address.with_length(length),
            None => address,
        }
    }
}

impl DeviceDefinition {
    /// Driver name, or a config error for nodes without one.
    pub fn driver_name(&self) -> Result<&str> {
        self.driver.as_deref().ok_or_else(|| {
            GatewayError::Config(format!("Device '{}' has no driver", self.name))
        })
    }

    /// Whether this node should get a running driver.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.enabled && self.kind == DeviceKind::Device
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(GatewayError::Config(format!("Device {} has an empty name", self.id)));
        }

        if self.kind == DeviceKind::Group {
            if let Some(driver) = &self.driver {
                return Err(GatewayError::Config(format!(
                    "Group '{}' cannot have a driver (found '{}')",
                    self.name, driver
                )));
            }
            if !self.points.is_empty() {
                return Err(GatewayError::Config(format!(
                    "Group '{}' cannot have points",
                    self.name
                )));
            }
            return Ok(());
        }

        let driver = self.driver_name()?;
        if get_driver_registry().get_driver(driver).is_none() {
            return Err(GatewayError::Config(format!(
                "Device '{}': unknown driver '{}'. Check if the required feature is enabled.",
                self.name, driver
            )));
        }
        validate_parameters(driver, &self.parameters)?;

        let mut names = HashSet::with_capacity(self.points.len());
        for point in &self.points {
            if !names.insert(point.name.as_str()) {
                return Err(GatewayError::Config(format!(
                    "Device '{}': duplicate point '{}'",
                    self.name, point.name
                )));
            }
            let context =
                |e: GatewayError| GatewayError::Config(format!("Point '{}.{}': {}", self.name, point.name, e));
            point.data_type.validate().map_err(context)?;
            validate_address(driver, &point.address).map_err(context)?;
        }
        Ok(())
    }
}

impl GatewayConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| GatewayError::Config(e.to_string()))
    }

    /// Check ids, drivers, parameters, data types and point addresses.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::with_capacity(self.devices.len());
        for device in &self.devices {
            if !ids.insert(device.id) {
                return Err(GatewayError::Config(format!(
                    "Duplicate device id {}",
                    device.id
                )));
            }
            device.validate()?;
        }
        Ok(())
    }

    /// Enabled leaf devices.
    pub fn active_devices(&self) -> impl Iterator<Item = &DeviceDefinition> {
        self.devices.iter().filter(|d| d.is_active())
    }
}
