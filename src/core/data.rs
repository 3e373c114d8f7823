//! Point values and read results.
//!
//! A [`ReadResult`] is what every driver hands back to the gateway for one
//! read: the decoded value, a good/bad status and, for bad reads, the reason.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A protocol-agnostic value representation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Integer value
    Integer(i64),

    /// Floating-point number (most common for analog values)
    Float(f64),

    /// Boolean value (digital I/O)
    Bool(bool),

    /// String value
    String(String),

    /// Absent value
    #[default]
    Null,
}

impl Value {
    /// Try to get the value as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Integer(v) => Some(*v as f64),
            Self::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Try to get the value as i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Float(v) => Some(*v as i64),
            Self::Bool(v) => Some(if *v { 1 } else { 0 }),
            _ => None,
        }
    }

    /// Try to get the value as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            Self::Integer(v) => Some(*v != 0),
            Self::Float(v) => Some(*v != 0.0),
            _ => None,
        }
    }

    /// Try to get the value as string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Check if this is an absent value.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v as f64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(v as i64)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Self::Integer(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Integer(v as i64)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Self::Integer(v as i64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

/// Status of a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStatus {
    Good,
    Bad,
}

impl ReadStatus {
    #[inline]
    pub const fn is_good(&self) -> bool {
        matches!(self, Self::Good)
    }
}

impl std::fmt::Display for ReadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Good => write!(f, "Good"),
            Self::Bad => write!(f, "Bad"),
        }
    }
}

/// Outcome of one driver read.
///
/// Invariant: a `Bad` result always carries a non-empty message and no value.
/// Construct through [`ReadResult::good`] / [`ReadResult::bad`] to keep it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadResult {
    /// Decoded value (`Null` for bad reads or legitimately empty points).
    pub value: Value,

    pub status: ReadStatus,

    /// Diagnostic text, always present when `status` is `Bad`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// When the gateway produced this result.
    pub timestamp: DateTime<Utc>,
}

impl ReadResult {
    /// Successful read.
    pub fn good(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            status: ReadStatus::Good,
            message: None,
            timestamp: Utc::now(),
        }
    }

    /// Failed read. An empty message is replaced so the invariant holds.
    pub fn bad(message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = "read failed".to_string();
        }
        Self {
            value: Value::Null,
            status: ReadStatus::Bad,
            message: Some(message),
            timestamp: Utc::now(),
        }
    }

    #[inline]
    pub fn is_good(&self) -> bool {
        self.status.is_good()
    }

    /// Diagnostic message, empty for good reads.
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }
}
