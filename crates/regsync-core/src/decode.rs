//! Decoding of raw Modbus register words into typed values.
//!
//! The device transmits multi-word values in word-swapped big-endian order:
//! the low word first, bytes inside each word big-endian. Character
//! registers pack two ASCII bytes per word, high byte first, padded with
//! trailing NULs.

use crate::domain::register::{RegisterKind, VersionedCellMap, VersionedRegisterMap};

/// Errors produced while decoding raw register words.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("expected {expected} words for {kind}[{array_size}], got {actual}")]
    LengthMismatch {
        kind: &'static str,
        array_size: u16,
        expected: u16,
        actual: usize,
    },

    #[error("array decoding is not supported for {kind}")]
    ArrayUnsupported { kind: &'static str },

    #[error("register data is not valid text")]
    InvalidText,
}

/// A decoded register value.
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterValue {
    Uint(u64),
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl std::fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterValue::Uint(v) => write!(f, "{v}"),
            RegisterValue::Int(v) => write!(f, "{v}"),
            RegisterValue::Float(v) => write!(f, "{v}"),
            RegisterValue::Text(v) => write!(f, "{v}"),
            RegisterValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// Where and how to read one field: the access plan a driver needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAccess {
    /// Absolute word address of the first word.
    pub address: u16,

    /// Number of words to read.
    pub words: u16,

    /// Value kind for decoding.
    pub kind: RegisterKind,

    /// Element count (character count for `char`).
    pub array_size: u16,
}

/// Compute the access plan for a static register.
pub fn plan_field(map: &VersionedRegisterMap, key: &str) -> Option<FieldAccess> {
    let reg = map.find(key)?;
    Some(FieldAccess {
        address: reg.address,
        words: reg.span(),
        kind: reg.kind,
        array_size: reg.array_size,
    })
}

/// Compute the access plan for a cell register of the given cell index.
pub fn plan_cell_field(cells: &VersionedCellMap, cell: u16, key: &str) -> Option<FieldAccess> {
    let reg = cells.find(key)?;
    Some(FieldAccess {
        address: cells.base + cell * cells.stride + reg.offset,
        words: reg.span(),
        kind: reg.kind,
        array_size: reg.array_size,
    })
}

/// Decode raw words read from the device into a typed value.
///
/// The slice length must match the register's span exactly; short or long
/// reads are reported, never truncated.
pub fn decode_words(
    kind: RegisterKind,
    array_size: u16,
    words: &[u16],
) -> Result<RegisterValue, DecodeError> {
    let expected = kind.span_words(array_size);
    if words.len() != usize::from(expected) {
        return Err(DecodeError::LengthMismatch {
            kind: kind.as_str(),
            array_size,
            expected,
            actual: words.len(),
        });
    }

    // Only char registers are arrays in practice; numeric kinds are scalar.
    if kind != RegisterKind::Char && array_size != 1 {
        return Err(DecodeError::ArrayUnsupported {
            kind: kind.as_str(),
        });
    }

    let value = match kind {
        RegisterKind::Uint8 => RegisterValue::Uint(u64::from(words[0] & 0x00ff)),
        RegisterKind::Int8 => RegisterValue::Int(i64::from((words[0] & 0x00ff) as u8 as i8)),
        RegisterKind::Uint16 => RegisterValue::Uint(u64::from(words[0])),
        RegisterKind::Int16 => RegisterValue::Int(i64::from(words[0] as i16)),
        RegisterKind::Uint32 => RegisterValue::Uint(u64::from(u32_from_words(words))),
        RegisterKind::Int32 => RegisterValue::Int(i64::from(u32_from_words(words) as i32)),
        RegisterKind::Uint64 => RegisterValue::Uint(u64_from_words(words)),
        RegisterKind::Int64 => RegisterValue::Int(u64_from_words(words) as i64),
        RegisterKind::Float32 => {
            RegisterValue::Float(f64::from(f32::from_bits(u32_from_words(words))))
        }
        RegisterKind::Float64 => RegisterValue::Float(f64::from_bits(u64_from_words(words))),
        RegisterKind::Bool => RegisterValue::Bool(words[0] != 0),
        RegisterKind::Char => RegisterValue::Text(text_from_words(words)?),
    };

    Ok(value)
}

/// 32-bit value from word-swapped big-endian registers (low word first).
fn u32_from_words(words: &[u16]) -> u32 {
    (u32::from(words[1]) << 16) | u32::from(words[0])
}

/// 64-bit value from word-swapped big-endian registers (low word first).
fn u64_from_words(words: &[u16]) -> u64 {
    (u64::from(words[3]) << 48)
        | (u64::from(words[2]) << 32)
        | (u64::from(words[1]) << 16)
        | u64::from(words[0])
}

/// Text from char registers: two ASCII bytes per word, high byte first,
/// trailing NULs stripped.
fn text_from_words(words: &[u16]) -> Result<String, DecodeError> {
    let mut bytes = Vec::with_capacity(words.len() * 2);
    for word in words {
        bytes.push((word >> 8) as u8);
        bytes.push((word & 0x00ff) as u8);
    }
    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    String::from_utf8(bytes).map_err(|_| DecodeError::InvalidText)
}
