//! Point address validation.
//!
//! Checks address strings against the syntax of the driver that will read
//! them, so configuration errors surface at load time instead of as bad reads.

use crate::core::error::{GatewayError, Result};

/// Validate `address` for the driver named `driver`.
///
/// # Address Formats
///
/// - **SiemensS7**: `DB{n}.DB{X|B|W|D}{offset}[.bit]`, `{I|Q|M|V}[B|W|D]{offset}[.bit]`,
///   `T{n}`, `C{n}`
///   - Example: `"DB1.DBD4"`, `"MW10"`, `"I0.3"`
///
/// - **ModbusTcp**: `"register"` or `"unit:register"`
///   - Example: `"100"` → default unit, register 100
///   - Example: `"3:40001"` → unit 3, register 40001
pub fn validate_address(driver: &str, address: &str) -> Result<()> {
    #[cfg(feature = "s7")]
    if driver.eq_ignore_ascii_case("SiemensS7") {
        return crate::protocols::siemens_s7::S7Address::parse(address).map(|_| ());
    }

    #[cfg(feature = "modbus")]
    if driver.eq_ignore_ascii_case("ModbusTcp") {
        return crate::protocols::modbus::ModbusAddress::parse(address, 1).map(|_| ());
    }

    let _ = address;
    Err(GatewayError::Config(format!("Unknown driver: {}", driver)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "s7")]
    #[test]
    fn test_s7_addresses() {
        assert!(validate_address("SiemensS7", "DB1.DBW0").is_ok());
        assert!(validate_address("siemenss7", "M0.1").is_ok());
        assert!(validate_address("SiemensS7", "1:100").is_err());
    }

    #[cfg(feature = "modbus")]
    #[test]
    fn test_modbus_addresses() {
        assert!(validate_address("ModbusTcp", "1:100").is_ok());
        assert!(validate_address("modbustcp", "100").is_ok());
        assert!(validate_address("ModbusTcp", "DB1.DBW0").is_err());
    }

    #[test]
    fn test_unknown_driver() {
        let err = validate_address("dnp3", "1").unwrap_err();
        assert!(err.to_string().contains("Unknown driver"));
    }
}
