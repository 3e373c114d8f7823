//! Gateway-side configuration and driver construction.

pub mod address;
pub mod config;
pub mod factory;

pub use address::validate_address;
pub use config::{DeviceDefinition, GatewayConfig, PointDefinition};
pub use factory::{create_driver, create_driver_with_logging, DriverLogging, TransportConnector};
