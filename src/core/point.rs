//! Point addressing and data type tags.
//!
//! A [`DataType`] is a closed `(kind, word order)` pair. Parsing from the
//! configuration names (`"float_2"`, `"int64"`, ...) goes through an explicit
//! table; whether a pair is convertible is decided by
//! [`DataType::validate`], which matches exhaustively.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::{GatewayError, Result};

/// Classifies a configuration node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Logical grouping of devices.
    Group,
    /// Leaf acquisition point.
    #[default]
    Device,
}

impl DeviceKind {
    /// Human-readable label used by configuration tooling.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Group => "Acquisition group",
            Self::Device => "Acquisition device",
        }
    }
}

/// Whether a point may be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    #[default]
    ReadOnly,
    ReadWrite,
}

impl AccessMode {
    /// Human-readable label used by configuration tooling.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::ReadOnly => "Read only",
            Self::ReadWrite => "Read/write",
        }
    }

    #[inline]
    pub const fn is_writable(&self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

/// Register width class of a value kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    /// One register.
    W16,
    /// Two registers.
    W32,
    /// Four registers.
    W64,
}

impl Width {
    /// Number of 16-bit registers this width occupies.
    #[inline]
    pub const fn register_count(&self) -> usize {
        match self {
            Self::W16 => 1,
            Self::W32 => 2,
            Self::W64 => 4,
        }
    }
}

/// Underlying kind of a point value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueKind {
    /// Single register, non-zero means `true`.
    Bool,
    UInt16,
    Int16,
    UInt32,
    Int32,
    Float32,
    UInt64,
    Int64,
    Float64,
    /// Two ASCII characters per register, high byte first.
    AsciiString,
    /// Whatever the transport returns, passed through untouched.
    #[default]
    Any,
}

impl ValueKind {
    /// Fixed width of the kind, `None` for variable-length kinds.
    pub const fn width(&self) -> Option<Width> {
        match self {
            Self::Bool | Self::UInt16 | Self::Int16 => Some(Width::W16),
            Self::UInt32 | Self::Int32 | Self::Float32 => Some(Width::W32),
            Self::UInt64 | Self::Int64 | Self::Float64 => Some(Width::W64),
            Self::AsciiString | Self::Any => None,
        }
    }

    /// Canonical configuration name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::UInt16 => "uint16",
            Self::Int16 => "int16",
            Self::UInt32 => "uint32",
            Self::Int32 => "int32",
            Self::Float32 => "float",
            Self::UInt64 => "uint64",
            Self::Int64 => "int64",
            Self::Float64 => "double",
            Self::AsciiString => "ascii",
            Self::Any => "any",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "bool" => Self::Bool,
            "uint16" => Self::UInt16,
            "int16" => Self::Int16,
            "uint32" => Self::UInt32,
            "int32" => Self::Int32,
            "float" | "float32" => Self::Float32,
            "uint64" => Self::UInt64,
            "int64" => Self::Int64,
            "double" | "float64" => Self::Float64,
            "ascii" | "string" => Self::AsciiString,
            "any" => Self::Any,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Word-order variant of a multi-register value.
///
/// Byte names refer to the registers as read: `A B` is the first register
/// (high, low), `C D` the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WordOrder {
    /// CDAB: registers swapped, bytes kept.
    #[default]
    Default,
    /// ABCD: as read.
    V1,
    /// BADC: bytes swapped inside each register.
    V2,
    /// DCBA: registers and bytes swapped.
    V3,
}

impl WordOrder {
    /// Suffix used in configuration names (`_1`, `_2`, `_3`).
    const fn suffix(&self) -> Option<u8> {
        match self {
            Self::Default => None,
            Self::V1 => Some(1),
            Self::V2 => Some(2),
            Self::V3 => Some(3),
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "1" => Some(Self::V1),
            "2" => Some(Self::V2),
            "3" => Some(Self::V3),
            _ => None,
        }
    }
}

impl fmt::Display for WordOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Default => "cdab",
            Self::V1 => "abcd",
            Self::V2 => "badc",
            Self::V3 => "dcba",
        };
        f.write_str(s)
    }
}

/// Declared type of a point: value kind plus word order.
///
/// Any pair can be constructed; [`DataType::validate`] rejects the
/// combinations the converter does not define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataType {
    pub kind: ValueKind,
    pub order: WordOrder,
}

impl DataType {
    pub const fn new(kind: ValueKind, order: WordOrder) -> Self {
        Self { kind, order }
    }

    /// Data type with the default (CDAB) word order.
    pub const fn of(kind: ValueKind) -> Self {
        Self::new(kind, WordOrder::Default)
    }

    /// Registers to request from the transport, `None` for variable-length kinds.
    #[inline]
    pub const fn register_count(&self) -> Option<usize> {
        match self.kind.width() {
            Some(width) => Some(width.register_count()),
            None => None,
        }
    }

    /// Check that the converter defines this combination.
    ///
    /// | width | default | V1 | V2 | V3 |
    /// |---|---|---|---|---|
    /// | 16 | pass | byte swap | - | - |
    /// | 32 | CDAB | ABCD | BADC | DCBA |
    /// | 64 | reversed | identity | - | - |
    /// | variable | pass | - | - | - |
    pub fn validate(&self) -> Result<()> {
        let defined = match (self.kind.width(), self.order) {
            (Some(Width::W32), _) => true,
            (Some(Width::W16 | Width::W64), WordOrder::Default | WordOrder::V1) => true,
            (Some(Width::W16 | Width::W64), WordOrder::V2 | WordOrder::V3) => false,
            (None, WordOrder::Default) => true,
            (None, _) => false,
        };
        if defined {
            Ok(())
        } else {
            Err(GatewayError::invalid_data_type(*self))
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.order.suffix() {
            Some(n) => write!(f, "{}_{}", self.kind, n),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl FromStr for DataType {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let unknown = || GatewayError::Config(format!("Unknown data type: {}", s));

        if let Some(kind) = ValueKind::from_name(&lower) {
            return Ok(Self::of(kind));
        }

        let (base, suffix) = lower.rsplit_once('_').ok_or_else(unknown)?;
        let kind = ValueKind::from_name(base).ok_or_else(unknown)?;
        let order = WordOrder::from_suffix(suffix).ok_or_else(unknown)?;
        Ok(Self::new(kind, order))
    }
}

impl TryFrom<String> for DataType {
    type Error = GatewayError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<DataType> for String {
    fn from(dt: DataType) -> Self {
        dt.to_string()
    }
}

/// A protocol-specific address string plus its declared data type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegisterAddress {
    /// Address as understood by the driver (e.g. `"DB1.DBD4"`, `"1:100"`).
    pub address: String,

    /// Declared data type.
    #[serde(default)]
    pub data_type: DataType,

    /// Register count for variable-length kinds (strings).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u16>,
}

impl RegisterAddress {
    pub fn new(address: impl Into<String>, data_type: DataType) -> Self {
        Self {
            address: address.into(),
            data_type,
            length: None,
        }
    }

    /// Set the register count of a variable-length point.
    #[must_use]
    pub fn with_length(mut self, length: u16) -> Self {
        self.length = Some(length);
        self
    }

    /// Registers the transport should read for this address.
    pub fn word_count(&self) -> usize {
        self.data_type
            .register_count()
            .unwrap_or_else(|| usize::from(self.length.unwrap_or(1)))
    }
}

impl fmt::Display for RegisterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address, self.data_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_type_names() {
        assert_eq!("float".parse::<DataType>().unwrap(), DataType::of(ValueKind::Float32));
        assert_eq!(
            "uint32_2".parse::<DataType>().unwrap(),
            DataType::new(ValueKind::UInt32, WordOrder::V2)
        );
        assert_eq!(
            "Double_1".parse::<DataType>().unwrap(),
            DataType::new(ValueKind::Float64, WordOrder::V1)
        );
        assert_eq!(
            "int64_3".parse::<DataType>().unwrap(),
            DataType::new(ValueKind::Int64, WordOrder::V3)
        );
    }

    #[test]
    fn test_parse_rejects_unknown_names() {
        assert!("int32_4".parse::<DataType>().is_err());
        assert!("int_32".parse::<DataType>().is_err());
        assert!("float32x".parse::<DataType>().is_err());
        assert!("".parse::<DataType>().is_err());
    }

    #[test]
    fn test_display_round_trips_config_name() {
        let dt = DataType::new(ValueKind::Int32, WordOrder::V3);
        assert_eq!(dt.to_string(), "int32_3");
        assert_eq!(DataType::of(ValueKind::Float64).to_string(), "double");
    }

    #[test]
    fn test_validate_matrix() {
        for order in [WordOrder::Default, WordOrder::V1, WordOrder::V2, WordOrder::V3] {
            assert!(DataType::new(ValueKind::Float32, order).validate().is_ok());
        }
        assert!(DataType::new(ValueKind::Int16, WordOrder::V1).validate().is_ok());
        assert!(DataType::new(ValueKind::Int16, WordOrder::V2).validate().is_err());
        assert!(DataType::new(ValueKind::UInt64, WordOrder::V1).validate().is_ok());
        assert!(DataType::new(ValueKind::Float64, WordOrder::V3).validate().is_err());
        assert!(DataType::new(ValueKind::AsciiString, WordOrder::V1).validate().is_err());
    }

    #[test]
    fn test_word_count() {
        let addr = RegisterAddress::new("DB1.DBD0", DataType::of(ValueKind::Float32));
        assert_eq!(addr.word_count(), 2);

        let addr = RegisterAddress::new("DB1.DBB10", DataType::of(ValueKind::AsciiString))
            .with_length(8);
        assert_eq!(addr.word_count(), 8);
    }

    #[test]
    fn test_serde_as_string() {
        let addr: RegisterAddress =
            serde_json::from_str(r#"{"address":"1:100","data_type":"int32_1"}"#).unwrap();
        assert_eq!(addr.data_type, DataType::new(ValueKind::Int32, WordOrder::V1));

        let json = serde_json::to_string(&addr).unwrap();
        assert!(json.contains(r#""data_type":"int32_1""#));
    }
}
