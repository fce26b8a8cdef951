//! Line protocol encoder.
//!
//! Serializes one point into the InfluxDB line protocol:
//!
//! ```text
//! measurement[,tag=val,...] field=val[,field=val...] [timestamp]
//! ```
//!
//! The encoder is a pure function. It does no I/O, and its only ambient
//! input is the wall clock, read when a write asks for a client-side
//! timestamp.

use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;

use crate::error::{Error, Result};
use crate::types::{Fields, Tags};
use crate::value::FieldValue;

/// Milliseconds to nanoseconds.
const NANOS_PER_MILLI: i64 = 1_000_000;

const MEASUREMENT_SPECIALS: &[char] = &[',', ' '];
const KEY_SPECIALS: &[char] = &[',', ' ', '='];
const STRING_FIELD_SPECIALS: &[char] = &[',', ' ', '"', '\\'];

static NUMERIC_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$")
        .expect("numeric literal pattern")
});

static BOOLEAN_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(t|T|true|True|TRUE|f|F|false|False|FALSE)$")
        .expect("boolean literal pattern")
});

/// Returns true if `s` reads as a finite decimal number.
///
/// Surrounding whitespace is ignored. Accepts an optional sign, integer
/// and fractional forms (`5`, `5.`, `.5`, `5.25`) and an exponent (`1e-3`).
/// `inf`, `NaN`, hex, the empty string and exponents that overflow `f64`
/// (`1e400`) are not numeric.
pub fn is_numeric_literal(s: &str) -> bool {
    let s = s.trim();
    NUMERIC_LITERAL.is_match(s) && s.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Returns true if `s` is one of the boolean spellings line protocol accepts:
/// `t`, `T`, `true`, `True`, `TRUE`, `f`, `F`, `false`, `False`, `FALSE`.
pub fn is_boolean_literal(s: &str) -> bool {
    BOOLEAN_LITERAL.is_match(s)
}

fn escape<'a>(s: &'a str, specials: &[char]) -> Cow<'a, str> {
    if !s.contains(specials) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        if specials.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    Cow::Owned(out)
}

/// Escape a measurement name (comma and space).
pub fn escape_measurement(s: &str) -> Cow<'_, str> {
    escape(s, MEASUREMENT_SPECIALS)
}

/// Escape a tag key, tag value or field key (comma, space and `=`).
pub fn escape_key(s: &str) -> Cow<'_, str> {
    escape(s, KEY_SPECIALS)
}

/// Render a field value as a line protocol literal.
pub fn field_literal(key: &str, value: &FieldValue) -> Result<String> {
    match value {
        FieldValue::Float(f) => {
            let f = f.into_inner();
            if !f.is_finite() {
                return Err(Error::validation(format!(
                    "field '{}' is not a finite number: {}",
                    key, f
                )));
            }
            Ok(f.to_string())
        }
        FieldValue::Integer(i) => Ok(i.to_string()),
        FieldValue::UnsignedInteger(u) => Ok(u.to_string()),
        FieldValue::Boolean(b) => Ok(b.to_string()),
        FieldValue::String(s) if is_numeric_literal(s) => Ok(s.trim().to_string()),
        FieldValue::String(s) if is_boolean_literal(s) => Ok(s.clone()),
        FieldValue::String(s) => Ok(format!("\"{}\"", escape(s, STRING_FIELD_SPECIALS))),
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn millis_to_nanos(millis: i64) -> Result<i64> {
    millis.checked_mul(NANOS_PER_MILLI).ok_or_else(|| {
        Error::validation(format!(
            "timestamp {} ms overflows nanosecond precision",
            millis
        ))
    })
}

/// Encode a point as one line of line protocol.
///
/// `timestamp` is in epoch milliseconds and is written in nanoseconds. When
/// it is `None` and `use_wall_clock_timestamp` is set, the current time is
/// used. Otherwise the timestamp is left off and the server assigns one.
///
/// # Errors
///
/// Returns [`Error::Validation`] if the measurement is empty, the field set
/// is empty, a float field is not finite, or the timestamp overflows.
///
/// # Example
///
/// ```
/// use influx_connector::line_protocol::encode;
/// use influx_connector::{Fields, Tags};
///
/// let line = encode(
///     "cpu",
///     &Fields::from([("state", "idle")]),
///     &Tags::from([("host", "a b,c")]),
///     None,
///     false,
/// )
/// .unwrap();
///
/// assert_eq!(line, r#"cpu,host=a\ b\,c state="idle""#);
/// ```
pub fn encode(
    measurement: &str,
    fields: &Fields,
    tags: &Tags,
    timestamp: Option<i64>,
    use_wall_clock_timestamp: bool,
) -> Result<String> {
    if measurement.is_empty() {
        return Err(Error::validation("measurement name must not be empty"));
    }
    if fields.is_empty() {
        return Err(Error::validation(format!(
            "point '{}' has no fields",
            measurement
        )));
    }

    let mut line = String::with_capacity(64);
    line.push_str(&escape_measurement(measurement));

    for (key, value) in tags.iter() {
        line.push(',');
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&escape_key(value));
    }

    line.push(' ');
    for (i, (key, value)) in fields.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&field_literal(key, value)?);
    }

    let millis = match timestamp {
        Some(ms) => Some(ms),
        None if use_wall_clock_timestamp => Some(now_millis()),
        None => None,
    };
    if let Some(ms) = millis {
        line.push(' ');
        line.push_str(&millis_to_nanos(ms)?.to_string());
    }

    Ok(line)
}
