//! # fieldgw
//!
//! Field device driver layer for industrial data-acquisition gateways.
//!
//! A gateway polls many heterogeneous devices. Each device is served by a
//! driver that exposes the same small contract: connect, read a point,
//! close, dispose. Failures never escape as errors; they surface as `false`
//! or as a `Bad` [`ReadResult`] with a reason.
//!
//! ## Features
//!
//! - **Uniform driver contract**: drivers live side by side as `Box<dyn Driver>`
//! - **Word-order normalization**: CDAB / ABCD / BADC / DCBA handling for
//!   multi-register values, with explicit errors for undefined combinations
//! - **Bounded I/O**: every transport call is limited by the configured timeout
//! - **Feature Gated**: compile only the drivers you need
//!
//! ## Quick Start
//!
//! ```rust
//! use fieldgw::prelude::*;
//! use fieldgw::protocols::simulated::SimulatedTransport;
//! use fieldgw::protocols::siemens_s7::{SiemensS7Driver, SiemensS7Params};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let params = SiemensS7Params::new("192.168.0.10");
//! let transport = SimulatedTransport::new(params.endpoint());
//! transport.handle().set_words("DB1.DBD0", vec![0x0000, 0x4228]);
//!
//! let mut driver: Box<dyn Driver> =
//!     Box::new(SiemensS7Driver::new(uuid::Uuid::new_v4(), params, transport));
//!
//! assert!(driver.connect().await);
//! let result = driver
//!     .read(&RegisterAddress::new("DB1.DBD0", DataType::of(ValueKind::Float32)))
//!     .await;
//! assert_eq!(result.value.as_f64(), Some(42.0));
//! driver.dispose();
//! # }
//! ```
//!
//! ## Supported Drivers
//!
//! | Driver | Feature | Models |
//! |--------|---------|--------|
//! | `SiemensS7` | `s7` | S7-200, S7-200 Smart, S7-300, S7-400, S7-1200, S7-1500 |
//! | `ModbusTcp` | `modbus` | Modbus TCP servers |

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod codec;
pub mod core;
pub mod gateway;
pub mod protocols;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        config::DriverConfig,
        data::*,
        error::{GatewayError, Result},
        point::*,
        traits::*,
    };
    pub use crate::core::logging::{DriverLogConfig, DriverLogHandler, LoggableDriver};
    pub use crate::core::metadata::{get_driver_registry, DriverInfo, HasMetadata};
}

// Re-export core types at crate root for convenience
pub use crate::core::config::DriverConfig;
pub use crate::core::data::{ReadResult, ReadStatus, Value};
pub use crate::core::error::{GatewayError, Result};
pub use crate::core::point::{DataType, RegisterAddress, ValueKind, WordOrder};
pub use crate::core::traits::{ConnectionState, Driver, RawValue, Transport};
