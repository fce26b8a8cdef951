//! Core types for points written to and results read from InfluxDB.

use std::collections::{BTreeMap, HashMap};

use reqwest::header::HeaderMap;
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::line_protocol;
use crate::value::{FieldValue, Value};

/// Key used when a bare scalar is written instead of a field set.
pub const DEFAULT_FIELD_KEY: &str = "value";

/// Ordered tag set of a point.
///
/// Tags keep insertion order. Tags collected from a `HashMap` are sorted by
/// key so the encoded line does not depend on hash order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tags(Vec<(String, String)>);

impl Tags {
    /// Create an empty tag set.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a tag.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no tags.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(key, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for Tags {
    fn from(pairs: Vec<(K, V)>) -> Self {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Tags {
    fn from(pairs: [(K, V); N]) -> Self {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<String>> From<BTreeMap<K, V>> for Tags {
    fn from(map: BTreeMap<K, V>) -> Self {
        Self(map.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<String>> From<HashMap<K, V>> for Tags {
    fn from(map: HashMap<K, V>) -> Self {
        let mut pairs: Vec<(String, String)> =
            map.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        Self(pairs)
    }
}

/// Ordered field set of a point.
///
/// A bare scalar converts into a one-entry set keyed by [`DEFAULT_FIELD_KEY`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fields(Vec<(String, FieldValue)>);

impl Fields {
    /// Create an empty field set.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// A single field stored under the key `value`.
    pub fn scalar(value: impl Into<FieldValue>) -> Self {
        Self(vec![(DEFAULT_FIELD_KEY.to_string(), value.into())])
    }

    /// Append a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.push((key.into(), value.into()));
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(key, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

macro_rules! impl_fields_from_scalar {
    ($($t:ty),*) => {
        $(impl From<$t> for Fields {
            fn from(v: $t) -> Self {
                Fields::scalar(v)
            }
        })*
    };
}

impl_fields_from_scalar!(
    f64, f32, i8, i16, i32, i64, u8, u16, u32, u64, bool, &str, String, &String, FieldValue
);

impl<K: Into<String>, V: Into<FieldValue>> From<Vec<(K, V)>> for Fields {
    fn from(pairs: Vec<(K, V)>) -> Self {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<FieldValue>, const N: usize> From<[(K, V); N]> for Fields {
    fn from(pairs: [(K, V); N]) -> Self {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<FieldValue>> From<BTreeMap<K, V>> for Fields {
    fn from(map: BTreeMap<K, V>) -> Self {
        Self(map.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<FieldValue>> From<HashMap<K, V>> for Fields {
    fn from(map: HashMap<K, V>) -> Self {
        let mut pairs: Vec<(String, FieldValue)> =
            map.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        Self(pairs)
    }
}

/// A single data point, built per write.
///
/// # Example
///
/// ```
/// use influx_connector::Point;
///
/// let line = Point::new("cpu")
///     .tag("host", "server01")
///     .field("usage", 0.64)
///     .timestamp(1_700_000_000_000)
///     .to_line_protocol(false)
///     .unwrap();
///
/// assert_eq!(line, "cpu,host=server01 usage=0.64 1700000000000000000");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    /// Measurement name.
    pub measurement: String,
    /// Tag set.
    pub tags: Tags,
    /// Field set. Must not be empty when encoded.
    pub fields: Fields,
    /// Epoch timestamp in milliseconds.
    pub timestamp: Option<i64>,
}

impl Point {
    /// Create a point with no tags, no fields and no timestamp.
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: Tags::new(),
            fields: Fields::new(),
            timestamp: None,
        }
    }

    /// Add a tag.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key, value);
        self
    }

    /// Replace the tag set.
    pub fn tags(mut self, tags: impl Into<Tags>) -> Self {
        self.tags = tags.into();
        self
    }

    /// Add a field.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key, value);
        self
    }

    /// Replace the field set. A bare scalar becomes `value=<scalar>`.
    pub fn fields(mut self, fields: impl Into<Fields>) -> Self {
        self.fields = fields.into();
        self
    }

    /// Set the timestamp in epoch milliseconds.
    pub fn timestamp(mut self, millis: i64) -> Self {
        self.timestamp = Some(millis);
        self
    }

    /// Encode this point as one line of line protocol.
    pub fn to_line_protocol(&self, use_wall_clock_timestamp: bool) -> Result<String> {
        line_protocol::encode(
            &self.measurement,
            &self.fields,
            &self.tags,
            self.timestamp,
            use_wall_clock_timestamp,
        )
    }

    /// Build a point from loosely typed JSON input.
    ///
    /// `fields` may be an object or a bare scalar. `tags` must be a flat
    /// object of scalars. `timestamp` must be a whole number of milliseconds.
    /// Missing or `null` tags and timestamp are treated as absent.
    pub fn from_json(
        name: &JsonValue,
        fields: &JsonValue,
        tags: Option<&JsonValue>,
        timestamp: Option<&JsonValue>,
    ) -> Result<Self> {
        let measurement = match name {
            JsonValue::String(s) if !s.is_empty() => s.clone(),
            _ => return Err(Error::validation("measurement must be a non-empty string")),
        };

        let fields = match fields {
            JsonValue::Object(map) => {
                let mut out = Fields::new();
                for (key, value) in map {
                    out.insert(key.clone(), json_field_value(key, value)?);
                }
                out
            }
            other => Fields::scalar(json_field_value(DEFAULT_FIELD_KEY, other)?),
        };

        let tags = match tags {
            None | Some(JsonValue::Null) => Tags::new(),
            Some(JsonValue::Object(map)) => {
                let mut out = Tags::new();
                for (key, value) in map {
                    let value = match value {
                        JsonValue::String(s) => s.clone(),
                        JsonValue::Number(n) => n.to_string(),
                        JsonValue::Bool(b) => b.to_string(),
                        _ => {
                            return Err(Error::validation(format!(
                                "tag '{}' must be a string, number or boolean",
                                key
                            )));
                        }
                    };
                    out.insert(key.clone(), value);
                }
                out
            }
            Some(_) => return Err(Error::validation("tags must be a flat mapping")),
        };

        let timestamp = match timestamp {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::Number(n)) => Some(whole_millis(n)?),
            Some(_) => return Err(Error::validation("timestamp must be a whole number")),
        };

        Ok(Self {
            measurement,
            tags,
            fields,
            timestamp,
        })
    }
}

fn json_field_value(key: &str, value: &JsonValue) -> Result<FieldValue> {
    match value {
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(FieldValue::Integer(i))
            } else if let Some(u) = n.as_u64() {
                Ok(FieldValue::UnsignedInteger(u))
            } else {
                n.as_f64()
                    .map(FieldValue::from)
                    .ok_or_else(|| Error::validation(format!("field '{}' is not a number", key)))
            }
        }
        JsonValue::Bool(b) => Ok(FieldValue::Boolean(*b)),
        JsonValue::String(s) => Ok(FieldValue::String(s.clone())),
        JsonValue::Null => Err(Error::validation(format!("field '{}' is null", key))),
        JsonValue::Array(_) | JsonValue::Object(_) => Err(Error::validation(format!(
            "field '{}' must be a number, boolean or string",
            key
        ))),
    }
}

fn whole_millis(n: &serde_json::Number) -> Result<i64> {
    if let Some(i) = n.as_i64() {
        return Ok(i);
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        _ => Err(Error::validation(format!(
            "timestamp must be a whole number, got {}",
            n
        ))),
    }
}

/// Decoded body of an HTTP response.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    /// No body (e.g. `204 No Content` after a write).
    Empty,
    /// Non-JSON body text.
    Text(String),
    /// Body served as `application/json`, already parsed.
    Json(JsonValue),
}

impl Body {
    /// Returns the parsed JSON if the body was JSON.
    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            Body::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the text if the body was plain text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true if the body was empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }
}

/// A successful (2xx) response.
#[derive(Clone, Debug)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Body,
}

/// One series of a query result, reshaped into rows.
#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    /// Measurement name.
    pub name: String,
    /// Group-by tags of the series.
    pub tags: BTreeMap<String, String>,
    /// Column names in server order.
    pub columns: Vec<String>,
    /// One entry per returned row.
    pub values: Vec<Row>,
}

/// A single row of a series, keyed by column name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    /// Column name to value mapping.
    pub values: BTreeMap<String, Value>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value by column name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Get value as string.
    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(|v| v.as_string())
    }

    /// Get value as f64.
    pub fn get_double(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(|v| v.as_double())
    }

    /// Get value as i64.
    pub fn get_long(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(|v| v.as_long())
    }

    /// Get value as bool.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(|v| v.as_bool())
    }

    /// Get the timestamp (`time` column) in epoch milliseconds.
    pub fn time(&self) -> Option<i64> {
        self.get_long("time")
    }
}
