//! Dynamic field values and dotted-path access.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

/// Field values of a form, keyed by field name.
///
/// Keys are kept sorted so snapshots compare and print deterministically.
pub type Values = BTreeMap<String, Value>;

/// A dynamic value that a form field can hold.
///
/// # Example
///
/// ```
/// use formaflex::Value;
///
/// let email = Value::from("jane@example.com");
/// let accepted = Value::from(true);
/// let empty = Value::Null;
/// assert!(empty.is_blank());
/// assert_eq!(email.as_str(), Some("jane@example.com"));
/// assert_eq!(accepted.as_bool(), Some(true));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean value (checkboxes, toggles).
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// Text value.
    Text(String),
    /// Nested record of further fields.
    Record(Values),
}

impl Value {
    /// Returns `true` if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Record(_) => "record",
        }
    }

    /// Returns the text content, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the nested record, if this is a record value.
    pub fn as_record(&self) -> Option<&Values> {
        match self {
            Value::Record(map) => Some(map),
            _ => None,
        }
    }

    /// Returns `true` if the value counts as "not filled in".
    ///
    /// Null, whitespace-only text and an unchecked boolean are blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Text(s) => s.trim().is_empty(),
            Value::Number(_) | Value::Record(_) => false,
        }
    }

    /// Returns `true` for null, empty text and an empty record.
    ///
    /// Unlike [`is_blank`](Self::is_blank), whitespace is content here.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            Value::Record(map) => map.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }

    /// Length in characters for text, in entries for records.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Text(s) => Some(s.chars().count()),
            Value::Record(map) => Some(map.len()),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Record(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<Values> for Value {
    fn from(map: Values) -> Self {
        Value::Record(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => Value::Record(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| (i.to_string(), Value::from(item)))
                    .collect(),
            ),
            serde_json::Value::Object(map) => Value::Record(
                map.into_iter()
                    .map(|(key, item)| (key, Value::from(item)))
                    .collect(),
            ),
        }
    }
}

/// Builds a [`Values`] map from key/value pairs.
///
/// ```
/// use formaflex::{Value, values};
///
/// let initial = values([("email", ""), ("password", "")]);
/// assert_eq!(initial.get("email"), Some(&Value::from("")));
/// ```
pub fn values<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Values
where
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

/// Looks up a field by key, descending into nested records on `.`.
///
/// A top-level key that literally contains dots wins over nested access.
pub fn get_path<'a>(values: &'a Values, path: &str) -> Option<&'a Value> {
    if let Some(value) = values.get(path) {
        return Some(value);
    }

    let mut segments = path.split('.');
    let mut current = values.get(segments.next()?)?;
    for segment in segments {
        current = current.as_record()?.get(segment)?;
    }
    Some(current)
}

/// Stores a field by key, creating nested records on `.` as needed.
///
/// Intermediate segments that hold a non-record value are replaced by an
/// empty record. A top-level key that literally contains dots is
/// overwritten in place.
pub fn set_path(values: &mut Values, path: &str, value: Value) {
    if !path.contains('.') || values.contains_key(path) {
        values.insert(path.to_string(), value);
        return;
    }

    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(last) = segments.pop() else {
        return;
    };

    let mut current = values;
    for segment in segments {
        current = descend(current, segment);
    }
    current.insert(last.to_string(), value);
}

fn descend<'a>(map: &'a mut Values, key: &str) -> &'a mut Values {
    let entry = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Record(Values::new()));
    if !matches!(entry, Value::Record(_)) {
        *entry = Value::Record(Values::new());
    }
    match entry {
        Value::Record(inner) => inner,
        _ => unreachable!("entry was just replaced by a record"),
    }
}
