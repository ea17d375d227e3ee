//! Display conversion of raw driver values
//!
//! Engine adapters decode every result cell into a [`RawValue`]; the display
//! string is then chosen from the column's declared type name. Type names are
//! matched in a fixed order: exact names first, then the broader substring
//! checks, then a generic fallback. Conversion never fails.

use std::fmt::Write;

use uuid::Uuid;

/// A decoded driver value
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

/// Binary GUIDs stored with the first three groups little-endian
const GUID_TYPES: &[&str] = &["uniqueidentifier"];

/// Numeric, monetary, temporal and boolean types shown as their native value
const PLAIN_TYPES: &[&str] = &[
    "numeric",
    "decimal",
    "money",
    "smallmoney",
    "date",
    "time",
    "datetime",
    "datetime2",
    "smalldatetime",
    "datetimeoffset",
    "timestamp",
    "timestamptz",
    "timestamp with time zone",
    "timestamp without time zone",
    "bool",
    "boolean",
    "bit",
    "float",
    "float4",
    "float8",
    "real",
    "double",
    "double precision",
];

const TEXT_MARKERS: &[&str] = &["char", "text", "clob", "json"];

/// Convert a raw value to the string shown for a column of `type_name`
///
/// `None` only for SQL NULL.
pub fn to_display_string(value: &RawValue, type_name: &str) -> Option<String> {
    if matches!(value, RawValue::Null) {
        return None;
    }

    let declared = base_type_name(type_name);

    if GUID_TYPES.contains(&declared.as_str()) {
        return Some(guid_string(value));
    }
    if PLAIN_TYPES.contains(&declared.as_str()) {
        return Some(plain_string(value));
    }
    if TEXT_MARKERS.iter().any(|marker| declared.contains(marker)) {
        return Some(plain_string(value));
    }
    // Broad match, so it runs after the text markers ("point" and "interval" land here too)
    if declared.contains("int") {
        return Some(plain_string(value));
    }

    Some(generic_string(value))
}

/// Lower-cased type name with any parameter list removed
pub(crate) fn base_type_name(type_name: &str) -> String {
    let base = match type_name.find('(') {
        Some(open) => {
            let close = type_name[open..]
                .find(')')
                .map(|offset| open + offset + 1)
                .unwrap_or(type_name.len());
            format!("{}{}", &type_name[..open], &type_name[close..])
        }
        None => type_name.to_string(),
    };
    base.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

fn guid_string(value: &RawValue) -> String {
    match value {
        RawValue::Bytes(bytes) => match <[u8; 16]>::try_from(bytes.as_slice()) {
            Ok(bytes) => Uuid::from_bytes_le(bytes).to_string(),
            Err(_) => generic_string(value),
        },
        _ => generic_string(value),
    }
}

/// Native stringification; byte sequences are textual encodings here
fn plain_string(value: &RawValue) -> String {
    match value {
        RawValue::Null => String::new(),
        RawValue::Integer(integer) => integer.to_string(),
        RawValue::Float(float) => float.to_string(),
        RawValue::Text(text) => text.clone(),
        RawValue::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Best effort for unknown types: UTF-8 bytes as text, anything else as hex
fn generic_string(value: &RawValue) -> String {
    match value {
        RawValue::Bytes(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => hex_string(bytes),
        },
        _ => plain_string(value),
    }
}

fn hex_string(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(2 + bytes.len() * 2);
    output.push_str("0x");
    for byte in bytes {
        let _ = write!(output, "{:02x}", byte);
    }
    output
}
