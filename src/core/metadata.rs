//! Driver metadata system.
//!
//! Drivers describe themselves (name, version, supported models and the
//! labelled configuration fields) so that configuration tooling can discover
//! them without knowing any concrete driver type.

use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;

/// Parameter type for configuration options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    String,
    Integer,
    Boolean,
    Float,
    Enum,
}

/// Metadata for a single configuration parameter.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterMetadata {
    /// Internal parameter name (used in config).
    pub name: &'static str,
    /// Human-readable label for UI rendering.
    pub display_name: &'static str,
    /// Description of the parameter.
    pub description: &'static str,
    /// Whether this parameter is required.
    pub required: bool,
    /// Default value if not specified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    /// Type of the parameter.
    pub param_type: ParameterType,
}

impl ParameterMetadata {
    /// Create a new required parameter.
    pub const fn required(
        name: &'static str,
        display_name: &'static str,
        description: &'static str,
        param_type: ParameterType,
    ) -> Self {
        Self {
            name,
            display_name,
            description,
            required: true,
            default_value: None,
            param_type,
        }
    }

    /// Create a new optional parameter with a default value.
    pub fn optional(
        name: &'static str,
        display_name: &'static str,
        description: &'static str,
        param_type: ParameterType,
        default_value: Value,
    ) -> Self {
        Self {
            name,
            display_name,
            description,
            required: false,
            default_value: Some(default_value),
            param_type,
        }
    }
}

/// Declarative identity of a driver implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DriverInfo {
    /// Driver name, also the `driver` key in gateway configuration.
    pub name: &'static str,
    pub version: &'static str,
    pub author: &'static str,
    /// Device models the driver is known to work with.
    pub supported_models: &'static [&'static str],
}

impl DriverInfo {
    /// Whether `model` is listed as supported (case-insensitive).
    pub fn supports(&self, model: &str) -> bool {
        self.supported_models
            .iter()
            .any(|m| m.eq_ignore_ascii_case(model))
    }
}

/// Metadata for a driver implementation.
#[derive(Debug, Clone, Serialize)]
pub struct DriverMetadata {
    pub info: &'static DriverInfo,
    /// Human-readable display name.
    pub display_name: &'static str,
    /// Description of the driver.
    pub description: &'static str,
    /// Example `parameters` object.
    pub example_config: Value,
    /// Available configuration parameters.
    pub parameters: Vec<ParameterMetadata>,
}

impl DriverMetadata {
    #[inline]
    pub fn name(&self) -> &'static str {
        self.info.name
    }

    /// Label of a configuration field, if the driver declares it.
    pub fn label_of(&self, parameter: &str) -> Option<&'static str> {
        self.parameters
            .iter()
            .find(|p| p.name == parameter)
            .map(|p| p.display_name)
    }
}

/// Registry of all available drivers.
pub struct DriverRegistry {
    drivers: Vec<DriverMetadata>,
}

impl DriverRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            drivers: Vec::new(),
        }
    }

    /// Register a driver.
    pub fn register(&mut self, driver: DriverMetadata) {
        self.drivers.push(driver);
    }

    /// Get all registered drivers.
    pub fn drivers(&self) -> &[DriverMetadata] {
        &self.drivers
    }

    /// Get a driver by name (case-insensitive).
    pub fn get_driver(&self, name: &str) -> Option<&DriverMetadata> {
        self.drivers
            .iter()
            .find(|d| d.name().eq_ignore_ascii_case(name))
    }

    /// Find the drivers that list `model` as supported.
    pub fn drivers_for_model(&self, model: &str) -> Vec<&DriverMetadata> {
        self.drivers
            .iter()
            .filter(|d| d.info.supports(model))
            .collect()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for types that can provide their own metadata.
pub trait HasMetadata {
    /// Get the metadata for this type.
    fn metadata() -> DriverMetadata;
}

/// Build the global driver registry.
fn build_registry() -> DriverRegistry {
    #[allow(unused_mut)]
    let mut registry = DriverRegistry::new();

    #[cfg(feature = "s7")]
    {
        use crate::protocols::siemens_s7::SiemensS7;
        registry.register(SiemensS7::metadata());
    }

    #[cfg(feature = "modbus")]
    {
        use crate::protocols::modbus::ModbusTcp;
        registry.register(ModbusTcp::metadata());
    }

    registry
}

/// Global driver registry instance.
static DRIVER_REGISTRY: Lazy<DriverRegistry> = Lazy::new(build_registry);

/// Get the global driver registry.
pub fn get_driver_registry() -> &'static DriverRegistry {
    &DRIVER_REGISTRY
}
