//! Core abstractions for field drivers.
//!
//! This module provides the foundational types and traits that every driver implements.

pub mod config;
pub mod data;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod metadata;
pub mod pipeline;
pub mod point;
pub mod traits;

pub use config::DriverConfig;
pub use data::*;
pub use error::{GatewayError, Result};
pub use lifecycle::Connection;
pub use point::*;
pub use traits::*;
