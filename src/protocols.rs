//! Driver implementations.
//!
//! Each driver adapts a field-bus transport to the [`Driver`](crate::core::traits::Driver)
//! contract. The simulated transport is always available.

pub mod simulated;

#[cfg(feature = "s7")]
#[cfg_attr(docsrs, doc(cfg(feature = "s7")))]
pub mod siemens_s7;

#[cfg(feature = "modbus")]
#[cfg_attr(docsrs, doc(cfg(feature = "modbus")))]
pub mod modbus;
