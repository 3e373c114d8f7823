//! Driver factory.
//!
//! Creates boxed drivers from device definitions. The transport each driver
//! talks through comes from a [`TransportConnector`], so the same factory
//! serves real field-bus clients and the simulated transport.

use std::sync::Arc;

use crate::core::config::DriverConfig;
use crate::core::error::{GatewayError, Result};
use crate::core::logging::{DriverLogConfig, DriverLogHandler};
use crate::core::traits::{Driver, Transport};

use super::config::DeviceDefinition;

/// Source of transports for newly created drivers.
pub trait TransportConnector: Send + Sync {
    /// Build an unopened transport for `driver` at `config.endpoint()`.
    ///
    /// `parameters` is the device's raw parameter object, for transports that
    /// need protocol details (CPU type, rack, slot, ...).
    fn create(
        &self,
        driver: &str,
        config: &DriverConfig,
        parameters: &serde_json::Value,
    ) -> Result<Box<dyn Transport>>;
}

/// Logging attached to every driver the factory creates.
#[derive(Clone, Default)]
pub struct DriverLogging {
    pub handler: Option<Arc<dyn DriverLogHandler>>,
    pub config: Option<DriverLogConfig>,
}

/// Create a driver from a device definition.
pub fn create_driver(
    def: &DeviceDefinition,
    connector: &dyn TransportConnector,
) -> Result<Box<dyn Driver>> {
    create_driver_with_logging(def, connector, &DriverLogging::default())
}

/// Create a driver and attach `logging` to it.
pub fn create_driver_with_logging(
    def: &DeviceDefinition,
    connector: &dyn TransportConnector,
    logging: &DriverLogging,
) -> Result<Box<dyn Driver>> {
    let driver = def.driver_name()?;

    // Use eq_ignore_ascii_case to avoid String allocation from to_lowercase()
    #[cfg(feature = "s7")]
    if driver.eq_ignore_ascii_case("SiemensS7") {
        return create_s7_driver(def, connector, logging);
    }

    #[cfg(feature = "modbus")]
    if driver.eq_ignore_ascii_case("ModbusTcp") {
        return create_modbus_driver(def, connector, logging);
    }

    let _ = (connector, logging);
    Err(GatewayError::Config(format!(
        "Unsupported driver: {}. Check if the required feature is enabled.",
        driver
    )))
}

/// Check that `parameters` deserialize for `driver`.
pub fn validate_parameters(driver: &str, parameters: &serde_json::Value) -> Result<()> {
    #[cfg(feature = "s7")]
    if driver.eq_ignore_ascii_case("SiemensS7") {
        use crate::protocols::siemens_s7::SiemensS7Params;
        let params: SiemensS7Params = parse_params("SiemensS7", parameters)?;
        return params.to_config(uuid::Uuid::nil()).validate();
    }

    #[cfg(feature = "modbus")]
    if driver.eq_ignore_ascii_case("ModbusTcp") {
        use crate::protocols::modbus::ModbusTcpParams;
        let params: ModbusTcpParams = parse_params("ModbusTcp", parameters)?;
        return params.to_config(uuid::Uuid::nil()).validate();
    }

    let _ = parameters;
    Err(GatewayError::Config(format!("Unsupported driver: {}", driver)))
}

#[allow(dead_code)]
fn parse_params<P: serde::de::DeserializeOwned>(
    driver: &str,
    parameters: &serde_json::Value,
) -> Result<P> {
    serde_json::from_value(parameters.clone())
        .map_err(|e| GatewayError::Config(format!("Invalid {} parameters: {}", driver, e)))
}

#[allow(dead_code)]
fn attach_logging<D: crate::core::logging::LoggableDriver>(driver: &mut D, logging: &DriverLogging) {
    if let Some(handler) = &logging.handler {
        driver.set_log_handler(Arc::clone(handler));
    }
    if let Some(config) = &logging.config {
        driver.set_log_config(config.clone());
    }
}

// ============================================================================
// Driver-specific creators
// ============================================================================

#[cfg(feature = "s7")]
fn create_s7_driver(
    def: &DeviceDefinition,
    connector: &dyn TransportConnector,
    logging: &DriverLogging,
) -> Result<Box<dyn Driver>> {
    use crate::protocols::siemens_s7::{SiemensS7Driver, SiemensS7Params};

    let params: SiemensS7Params = parse_params("SiemensS7", &def.parameters)?;
    let config = params.to_config(def.id);
    config.validate()?;

    let transport = connector.create("SiemensS7", &config, &def.parameters)?;
    let mut driver = SiemensS7Driver::new(def.id, params, transport);
    attach_logging(&mut driver, logging);

    tracing::debug!(device = %def.name, device_id = %def.id, "Created SiemensS7 driver");
    Ok(Box::new(driver))
}

#[cfg(feature = "modbus")]
fn create_modbus_driver(
    def: &DeviceDefinition,
    connector: &dyn TransportConnector,
    logging: &DriverLogging,
) -> Result<Box<dyn Driver>> {
    use crate::protocols::modbus::{ModbusTcpDriver, ModbusTcpParams};

    let params: ModbusTcpParams = parse_params("ModbusTcp", &def.parameters)?;
    let config = params.to_config(def.id);
    config.validate()?;

    let transport = connector.create("ModbusTcp", &config, &def.parameters)?;
    let mut driver = ModbusTcpDriver::new(def.id, params, transport);
    attach_logging(&mut driver, logging);

    tracing::debug!(device = %def.name, device_id = %def.id, "Created ModbusTcp driver");
    Ok(Box::new(driver))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::simulated::SimulatedConnector;

    fn device(driver: &str, parameters: serde_json::Value) -> DeviceDefinition {
        DeviceDefinition {
            id: uuid::Uuid::new_v4(),
            name: "dev".into(),
            driver: Some(driver.into()),
            kind: Default::default(),
            enabled: true,
            parameters,
            points: Vec::new(),
        }
    }

    #[cfg(feature = "s7")]
    #[tokio::test]
    async fn test_create_s7_driver() {
        let connector = SimulatedConnector::new();
        let def = device("siemenss7", serde_json::json!({ "host": "10.0.0.1", "slot": 1 }));

        let mut driver = create_driver(&def, &connector).unwrap();
        assert_eq!(driver.info().name, "SiemensS7");
        assert_eq!(driver.device_id(), def.id);
        assert_eq!(driver.config().endpoint(), "10.0.0.1:102");

        assert!(driver.connect().await);
        assert!(connector.handle(def.id).unwrap().is_connected());
        driver.dispose();
        assert!(!driver.is_connected());
    }

    #[cfg(feature = "modbus")]
    #[test]
    fn test_create_modbus_driver() {
        let connector = SimulatedConnector::new();
        let def = device("ModbusTcp", serde_json::json!({ "host": "10.0.0.2", "unit_id": 4 }));

        let driver = create_driver(&def, &connector).unwrap();
        assert_eq!(driver.info().name, "ModbusTcp");
        assert_eq!(driver.config().port, 502);
    }

    #[test]
    fn test_create_rejects() {
        let connector = SimulatedConnector::new();

        let def = device("Bacnet", serde_json::json!({}));
        assert!(create_driver(&def, &connector).is_err());

        let mut def = device("SiemensS7", serde_json::json!({}));
        def.driver = None;
        assert!(create_driver(&def, &connector).is_err());
    }

    #[cfg(feature = "s7")]
    #[test]
    fn test_invalid_parameters() {
        let connector = SimulatedConnector::new();
        let def = device("SiemensS7", serde_json::json!({ "port": "not a number" }));
        let err = create_driver(&def, &connector).err().unwrap();
        assert!(err.to_string().contains("Invalid SiemensS7 parameters"));

        let def = device("SiemensS7", serde_json::json!({ "port": 0 }));
        assert!(create_driver(&def, &connector).is_err());
        assert!(validate_parameters("SiemensS7", &def.parameters).is_err());
    }
}
