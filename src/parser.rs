//! Parser for InfluxDB 1.x query responses.
//!
//! `/query` answers with nested JSON:
//!
//! ```text
//! {"results": [{"statement_id": 0, "series": [
//!     {"name": "cpu", "tags": {...}, "columns": ["time", "value"], "values": [[...], ...]}
//! ]}]}
//! ```
//!
//! [`parse_series`] flattens the first result into [`Series`] with one
//! [`Row`] per value row. The `time` column is converted from RFC 3339 to
//! epoch milliseconds.

use std::collections::BTreeMap;

use chrono::DateTime;
use ordered_float::OrderedFloat;
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::types::{Row, Series};
use crate::value::Value;

/// Name of the timestamp column in query results.
pub const TIME_COLUMN: &str = "time";

/// Flatten `results[0].series[]` of a query response into rows.
///
/// A response without results or series yields an empty vector. An `error`
/// reported by the server for the statement yields [`Error::QueryError`].
pub fn parse_series(body: &JsonValue) -> Result<Vec<Series>> {
    if let Some(message) = body.get("error") {
        return Err(query_error(message));
    }

    let results = match body.get("results") {
        Some(JsonValue::Array(results)) => results,
        Some(_) => return Err(Error::parse("`results` is not an array")),
        None => return Ok(Vec::new()),
    };

    let Some(first) = results.first() else {
        return Ok(Vec::new());
    };

    if let Some(message) = first.get("error") {
        return Err(query_error(message));
    }

    match first.get("series") {
        Some(JsonValue::Array(series)) => series.iter().map(parse_one).collect(),
        Some(_) => Err(Error::parse("`series` is not an array")),
        None => Ok(Vec::new()),
    }
}

fn query_error(message: &JsonValue) -> Error {
    let message = match message {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    };
    Error::QueryError { message }
}

fn parse_one(series: &JsonValue) -> Result<Series> {
    let name = match series.get("name") {
        Some(JsonValue::String(s)) => s.clone(),
        None | Some(JsonValue::Null) => String::new(),
        Some(other) => {
            return Err(Error::parse(format!(
                "series name is not a string: {}",
                other
            )));
        }
    };

    let mut tags = BTreeMap::new();
    match series.get("tags") {
        Some(JsonValue::Object(map)) => {
            for (key, value) in map {
                let value = match value {
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                };
                tags.insert(key.clone(), value);
            }
        }
        None | Some(JsonValue::Null) => {}
        Some(_) => {
            return Err(Error::parse(format!(
                "tags of series '{}' are not an object",
                name
            )));
        }
    }

    let columns = match series.get("columns") {
        Some(JsonValue::Array(columns)) => columns
            .iter()
            .map(|c| {
                c.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::parse(format!("column name is not a string: {}", c)))
            })
            .collect::<Result<Vec<_>>>()?,
        _ => return Err(Error::parse(format!("series '{}' has no columns", name))),
    };

    let rows = match series.get("values") {
        Some(JsonValue::Array(rows)) => rows,
        None | Some(JsonValue::Null) => {
            return Ok(Series {
                name,
                tags,
                columns,
                values: Vec::new(),
            });
        }
        Some(_) => {
            return Err(Error::parse(format!(
                "values of series '{}' are not an array",
                name
            )));
        }
    };

    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        let cells = row
            .as_array()
            .ok_or_else(|| Error::parse(format!("row of series '{}' is not an array", name)))?;

        if cells.len() != columns.len() {
            return Err(Error::parse(format!(
                "column count mismatch in series '{}': expected {}, got {}",
                name,
                columns.len(),
                cells.len()
            )));
        }

        let mut parsed = Row::new();
        for (column, cell) in columns.iter().zip(cells) {
            let value = if column == TIME_COLUMN {
                parse_time(cell)?
            } else {
                parse_value(cell, column)?
            };
            parsed.values.insert(column.clone(), value);
        }
        values.push(parsed);
    }

    Ok(Series {
        name,
        tags,
        columns,
        values,
    })
}

/// Convert a JSON cell into a Value.
fn parse_value(cell: &JsonValue, column: &str) -> Result<Value> {
    match cell {
        JsonValue::Null => Ok(Value::Null),
        JsonValue::Bool(b) => Ok(Value::Bool(*b)),
        JsonValue::String(s) => Ok(Value::String(s.clone())),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Long(i))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::UnsignedLong(u))
            } else {
                n.as_f64()
                    .map(|f| Value::Double(OrderedFloat(f)))
                    .ok_or_else(|| Error::parse(format!("invalid number in column '{}'", column)))
            }
        }
        JsonValue::Array(_) | JsonValue::Object(_) => Err(Error::parse(format!(
            "nested value in column '{}'",
            column
        ))),
    }
}

/// Convert a `time` cell to epoch milliseconds.
///
/// RFC 3339 strings are converted. Integers (responses requested with an
/// `epoch` precision) are kept unchanged.
fn parse_time(cell: &JsonValue) -> Result<Value> {
    match cell {
        JsonValue::String(s) => {
            let t = DateTime::parse_from_rfc3339(s).map_err(|e| {
                Error::parse(format!("Invalid RFC3339 timestamp '{}': {}", s, e))
            })?;
            Ok(Value::Long(t.timestamp_millis()))
        }
        JsonValue::Number(n) => n
            .as_i64()
            .map(Value::Long)
            .ok_or_else(|| Error::parse(format!("time is not an integer: {}", n))),
        JsonValue::Null => Ok(Value::Null),
        other => Err(Error::parse(format!("invalid time value: {}", other))),
    }
}
