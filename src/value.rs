use std::{cmp::Ordering, collections::HashMap, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use serde::{Deserialize, Serialize};

/// Datetime layout used for record timestamps and datetime macros.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3fZ";

/// A field or request value seen by the filter evaluator.
///
/// This type represents all JSON types with a distinction between integers
/// and floats. Comparisons coerce between variants explicitly; see
/// [`Value::compare`].
///
/// # Examples
///
/// ```
/// use record_rules::Value;
///
/// let status = Value::from("published");
/// let views = Value::Integer(100);
/// let tags = Value::Array(vec![Value::from("T1"), Value::from("T2")]);
/// assert_eq!(views.type_name(), "integer");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    /// JSON null
    Null,

    /// JSON boolean (true/false)
    Boolean(bool),

    /// Floating-point number
    Float(f64),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// UTF-8 string
    String(String),

    /// Array of values
    Array(Vec<Value>),

    /// Object with string keys (JSON fields)
    Object(HashMap<String, Value>),
}

impl Value {
    /// Returns a human-readable type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Exact decimal view of a numeric value.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Integer(n) => Some(Decimal::from(*n)),
            Value::Float(n) => Decimal::from_f64(*n),
            _ => None,
        }
    }

    /// Parses a string value as a datetime when it has a date shape.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::String(s) => parse_datetime(s),
            _ => None,
        }
    }

    /// String form used for string comparison and containment.
    ///
    /// `null` becomes the empty string.
    pub fn as_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Float(n) => n.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Null => String::new(),
            Value::Array(_) | Value::Object(_) => serde_json::Value::from(self.clone()).to_string(),
        }
    }

    /// Orders two scalar values.
    ///
    /// Coercion priority: numbers (including a number against a numeric
    /// string) compare as exact decimals, or as `f64` when a side is outside
    /// the decimal range; two booleans compare as booleans,
    /// two datetime-shaped strings compare as instants, and everything
    /// else compares by its string form, byte-wise and case-sensitive.
    pub fn compare(&self, other: &Value) -> Ordering {
        if let Some(ordering) = numeric_order(self, other) {
            return ordering;
        }
        if let (Value::Boolean(a), Value::Boolean(b)) = (self, other) {
            return a.cmp(b);
        }
        if let (Some(a), Some(b)) = (self.as_datetime(), other.as_datetime()) {
            return a.cmp(&b);
        }
        self.as_string().cmp(&other.as_string())
    }

    /// Case-insensitive substring containment of `needle` in `self`.
    pub fn contains(&self, needle: &Value) -> bool {
        self.as_string()
            .to_lowercase()
            .contains(&needle.as_string().to_lowercase())
    }
}

/// Numeric view of a value: exact when `rust_decimal` can hold it.
#[derive(Debug, Clone, Copy)]
enum Number {
    Exact(Decimal),
    Approx(f64),
}

impl Number {
    fn of(v: &Value) -> Option<Self> {
        match v {
            Value::Integer(n) => Some(Number::Exact(Decimal::from(*n))),
            Value::Float(n) => Some(Decimal::from_f64(*n).map_or(Number::Approx(*n), Number::Exact)),
            _ => None,
        }
    }

    fn parse(v: &Value) -> Option<Self> {
        let Value::String(s) = v else {
            return None;
        };
        let s = s.trim();
        match Decimal::from_str(s) {
            Ok(d) => Some(Number::Exact(d)),
            Err(_) => s.parse::<f64>().ok().filter(|n| n.is_finite()).map(Number::Approx),
        }
    }

    fn to_f64(self) -> f64 {
        match self {
            Number::Exact(d) => d.to_f64().unwrap_or(f64::NAN),
            Number::Approx(n) => n,
        }
    }
}

/// Orders two values numerically when at least one is a number and the
/// other is a number or a numeric string.
fn numeric_order(a: &Value, b: &Value) -> Option<Ordering> {
    let (x, y) = match (Number::of(a), Number::of(b)) {
        (Some(x), Some(y)) => (x, y),
        (Some(x), None) => (x, Number::parse(b)?),
        (None, Some(y)) => (Number::parse(a)?, y),
        (None, None) => return None,
    };
    let ordering = match (x, y) {
        (Number::Exact(x), Number::Exact(y)) => x.cmp(&y),
        _ => {
            let (x, y) = (x.to_f64(), y.to_f64());
            x.partial_cmp(&y).unwrap_or_else(|| x.total_cmp(&y))
        }
    };
    Some(ordering)
}

/// Parses the datetime layouts records and macros use.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let bytes = s.as_bytes();
    // cheap shape check: YYYY-MM-DD prefix
    if bytes.len() < 10 || bytes[4] != b'-' || bytes[7] != b'-' || !bytes[..4].iter().all(u8::is_ascii_digit) {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = s.strip_suffix('Z').unwrap_or(s);
    for layout in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, layout) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Formats an instant in the record datetime layout.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(b),
            Value::Integer(i) => serde_json::Value::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(arr) => {
                serde_json::Value::Array(arr.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Object(obj) => serde_json::Value::Object(
                obj.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}
