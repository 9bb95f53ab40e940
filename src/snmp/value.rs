use std::fmt::Write;

use async_snmp::Value;

/// Rendered in place of a value the agent does not have
pub const NOT_AVAILABLE: &str = "N/A";

/// Renders an SNMP value as item text.
///
/// Printable octet strings come out as text, binary ones as lowercase hex.
/// Integer types are printed at their native width so large counters never
/// lose precision.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::OctetString(bytes) => format_octets(bytes),
        Value::Integer(v) => v.to_string(),
        Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => v.to_string(),
        Value::Counter64(v) => v.to_string(),
        Value::ObjectIdentifier(oid) => oid.to_string(),
        Value::IpAddress([a, b, c, d]) => format!("{a}.{b}.{c}.{d}"),
        Value::Opaque(bytes) => hex(bytes),
        Value::Null | Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => {
            NOT_AVAILABLE.to_string()
        }
        other => other.to_string(),
    }
}

/// True for the values the vendor recovery walk tries to replace
pub fn is_placeholder(value: &str) -> bool {
    matches!(value.trim(), "" | NOT_AVAILABLE | "0")
}

/// Numeric reading of a value, used for derived metrics
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(v) => Some(f64::from(*v)),
        Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => Some(f64::from(*v)),
        Value::Counter64(v) => Some(*v as f64),
        Value::OctetString(bytes) => std::str::from_utf8(bytes).ok()?.trim().parse().ok(),
        _ => None,
    }
}

fn format_octets(bytes: &[u8]) -> String {
    let binary = bytes
        .iter()
        .any(|&b| (b < 32 && !matches!(b, b'\t' | b'\n' | b'\r')) || b > 126);
    if binary {
        hex(bytes)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
