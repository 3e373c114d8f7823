//! Word-order normalization and register decoding.
//!
//! [`normalize_words`] reorders the registers of one logical value so that
//! they read big-endian, first register most significant. [`decode_words`]
//! then turns the normalized registers into a typed [`Value`].

use crate::core::data::Value;
use crate::core::error::{GatewayError, Result};
use crate::core::point::{DataType, ValueKind, Width, WordOrder};

/// Reorder registers according to the declared data type.
///
/// The output always has the same length as the input. Combinations rejected
/// by [`DataType::validate`] fail with `InvalidDataType`, and a register count
/// that does not match the width fails with `InvalidData`.
pub fn normalize_words(words: &[u16], data_type: DataType) -> Result<Vec<u16>> {
    data_type.validate()?;

    let width = match data_type.kind.width() {
        Some(width) => width,
        // Variable-length kinds only accept the default order.
        None => return Ok(words.to_vec()),
    };

    if words.len() != width.register_count() {
        return Err(GatewayError::invalid_data(format!(
            "{} needs {} registers, got {}",
            data_type.kind,
            width.register_count(),
            words.len()
        )));
    }

    let out = match (width, data_type.order) {
        (Width::W16, WordOrder::Default) => vec![words[0]],
        (Width::W16, WordOrder::V1) => vec![words[0].swap_bytes()],

        (Width::W32, WordOrder::V1) => vec![words[0], words[1]],
        (Width::W32, WordOrder::V2) => vec![words[0].swap_bytes(), words[1].swap_bytes()],
        (Width::W32, WordOrder::V3) => vec![words[1].swap_bytes(), words[0].swap_bytes()],
        (Width::W32, WordOrder::Default) => vec![words[1], words[0]],

        (Width::W64, WordOrder::V1) => words.to_vec(),
        (Width::W64, WordOrder::Default) => words.iter().rev().copied().collect(),

        (Width::W16 | Width::W64, WordOrder::V2 | WordOrder::V3) => {
            return Err(GatewayError::invalid_data_type(data_type))
        }
    };

    Ok(out)
}

/// Decode normalized registers into a value of the given kind.
pub fn decode_words(words: &[u16], kind: ValueKind) -> Result<Value> {
    if let Some(width) = kind.width() {
        if words.len() != width.register_count() {
            return Err(GatewayError::invalid_data(format!(
                "{} needs {} registers, got {}",
                kind,
                width.register_count(),
                words.len()
            )));
        }
    }

    let value = match kind {
        ValueKind::Bool => Value::Bool(words[0] != 0),
        ValueKind::UInt16 => Value::Integer(words[0] as i64),
        ValueKind::Int16 => Value::Integer(words[0] as i16 as i64),
        ValueKind::UInt32 => Value::Integer(u32::from_be_bytes(bytes_32(words)) as i64),
        ValueKind::Int32 => Value::Integer(i32::from_be_bytes(bytes_32(words)) as i64),
        ValueKind::Float32 => {
            let v = f32::from_be_bytes(bytes_32(words));
            if !v.is_finite() {
                return Err(GatewayError::invalid_data("Invalid float32 value"));
            }
            Value::Float(v as f64)
        }
        ValueKind::UInt64 => {
            let v = u64::from_be_bytes(bytes_64(words));
            let v = i64::try_from(v).map_err(|_| {
                GatewayError::invalid_data(format!("uint64 value {} exceeds the integer range", v))
            })?;
            Value::Integer(v)
        }
        ValueKind::Int64 => Value::Integer(i64::from_be_bytes(bytes_64(words))),
        ValueKind::Float64 => {
            let v = f64::from_be_bytes(bytes_64(words));
            if !v.is_finite() {
                return Err(GatewayError::invalid_data("Invalid float64 value"));
            }
            Value::Float(v)
        }
        ValueKind::AsciiString => Value::String(decode_ascii(words)),
        ValueKind::Any => decode_any(words)?,
    };

    Ok(value)
}

/// Normalize then decode, the full conversion for one point.
pub fn convert_words(words: &[u16], data_type: DataType) -> Result<Value> {
    let ordered = normalize_words(words, data_type)?;
    decode_words(&ordered, data_type.kind)
}

fn bytes_32(words: &[u16]) -> [u8; 4] {
    let [a, b] = words[0].to_be_bytes();
    let [c, d] = words[1].to_be_bytes();
    [a, b, c, d]
}

fn bytes_64(words: &[u16]) -> [u8; 8] {
    let mut bytes = [0u8; 8];
    for (chunk, word) in bytes.chunks_exact_mut(2).zip(words) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    bytes
}

fn decode_ascii(words: &[u16]) -> String {
    let mut s = String::with_capacity(words.len() * 2);
    for byte in words.iter().flat_map(|w| w.to_be_bytes()) {
        if byte == 0 {
            break;
        }
        s.push(byte as char);
    }
    s
}

fn decode_any(words: &[u16]) -> Result<Value> {
    match words.len() {
        0 => Ok(Value::Null),
        1 => decode_words(words, ValueKind::UInt16),
        2 => decode_words(words, ValueKind::UInt32),
        4 => decode_words(words, ValueKind::UInt64),
        n => Err(GatewayError::invalid_data(format!(
            "Cannot decode {} registers without a data type",
            n
        ))),
    }
}
