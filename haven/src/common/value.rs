use crate::collection::{Document, DocumentId};
use crate::errors::{ErrorKind, HavenError, HavenResult};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::{Display, Formatter};

/// Compare two floats for equality with NaN treated as equal to itself.
#[inline]
fn num_eq_float(a: f64, b: f64) -> bool {
    if a.is_nan() && b.is_nan() {
        true
    } else {
        a == b
    }
}

/// Represents a [Document] value.
///
/// A value is either a primitive ([Value::Bool], [Value::I64], [Value::F64],
/// [Value::String]), a container ([Value::Array], [Value::Document]) or one of
/// the two distinguished kinds the remote database also carries: an
/// identifier ([Value::Id]) and an instant ([Value::DateTime]).
///
/// Cloning a value clones every nested container, so a cloned document never
/// shares state with the original. The store relies on this to hand out
/// independent copies on every read and to take independent copies on every
/// write.
///
/// Integers and floats compare equal by numeric value, so `Value::from(3)` equals
/// `Value::from(3.0)`. Identifiers compare by their underlying value.
///
/// ```text
/// let v1: Value = 42.into();
/// let v2 = Value::from("hello");
/// let doc = doc! { "age": 42, "name": "Alice" };
/// ```
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Represents a null value.
    #[default]
    Null,
    /// Represents a boolean value.
    Bool(bool),
    /// Represents a signed 64-bit integer value.
    I64(i64),
    /// Represents a 64-bit floating point value.
    F64(f64),
    /// Represents a string value.
    String(String),
    /// Represents an ordered list of values.
    Array(Vec<Value>),
    /// Represents a nested document.
    Document(Document),
    /// Represents a document identifier.
    Id(DocumentId),
    /// Represents an instant in time.
    DateTime(DateTime<Utc>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => num_eq_float(*a, *b),
            (Value::I64(a), Value::F64(b)) | (Value::F64(b), Value::I64(a)) => {
                num_eq_float(*a as f64, *b)
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Document(a), Value::Document(b)) => a == b,
            (Value::Id(a), Value::Id(b)) => a.id_value() == b.id_value(),
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Creates a value from anything convertible into one.
    pub fn from<T: Into<Value>>(value: T) -> Value {
        value.into()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the numeric value widened to `f64`, for both integers and floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::I64(i) => Some(*i as f64),
            Value::F64(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_document_mut(&mut self) -> Option<&mut Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_id(&self) -> Option<&DocumentId> {
        match self {
            Value::Id(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::I64(_) | Value::F64(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_document(&self) -> bool {
        matches!(self, Value::Document(_))
    }

    /// Returns the name of the value kind, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I64(_) => "int",
            Value::F64(_) => "double",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Document(_) => "document",
            Value::Id(_) => "id",
            Value::DateTime(_) => "date",
        }
    }

    /// Type-strict equality: unlike `==`, an integer never equals a float and
    /// embedded documents must keep the same field order.
    pub(crate) fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.identical(y))
            }
            (Value::Document(a), Value::Document(b)) => a.identical(b),
            (Value::I64(_), Value::F64(_)) | (Value::F64(_), Value::I64(_)) => false,
            _ => self == other,
        }
    }

    /// Adds `delta` to this value. A missing or non-numeric current value
    /// counts as zero. Integer arithmetic stays integral unless it overflows
    /// or either side is a float.
    pub(crate) fn numeric_add(current: Option<&Value>, delta: &Value) -> HavenResult<Value> {
        let base = match current {
            Some(v) if v.is_number() => v.clone(),
            _ => Value::I64(0),
        };

        match (&base, delta) {
            (Value::I64(a), Value::I64(b)) => Ok(a
                .checked_add(*b)
                .map(Value::I64)
                .unwrap_or(Value::F64(*a as f64 + *b as f64))),
            (_, d) if d.is_number() => {
                let a = base.as_f64().unwrap_or(0.0);
                let b = d.as_f64().unwrap_or(0.0);
                Ok(Value::F64(a + b))
            }
            _ => {
                log::error!("Cannot increment with non-numeric delta {}", delta);
                Err(HavenError::new(
                    &format!("Cannot increment with non-numeric value of type {}", delta.type_name()),
                    ErrorKind::InvalidUpdate,
                ))
            }
        }
    }

    /// Converts a JSON value into a [Value].
    ///
    /// Extended JSON wrappers `{"$oid": ..}` and `{"$date": ..}` are
    /// recognized so fixtures can carry identifiers and instants.
    pub fn from_json(json: serde_json::Value) -> HavenResult<Value> {
        match json {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Value::I64(i)),
                None => Ok(Value::F64(n.as_f64().unwrap_or(f64::NAN))),
            },
            serde_json::Value::String(s) => Ok(Value::String(s)),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(Value::from_json)
                .collect::<HavenResult<Vec<_>>>()
                .map(Value::Array),
            serde_json::Value::Object(map) => {
                if map.len() == 1 {
                    if let Some(serde_json::Value::String(oid)) = map.get("$oid") {
                        return Ok(Value::Id(oid.parse::<DocumentId>()?));
                    }
                    if let Some(serde_json::Value::String(date)) = map.get("$date") {
                        let parsed = DateTime::parse_from_rfc3339(date).map_err(|e| {
                            log::error!("Invalid $date value {}: {}", date, e);
                            HavenError::new(
                                &format!("Invalid $date value {}: {}", date, e),
                                ErrorKind::InvalidOperation,
                            )
                        })?;
                        return Ok(Value::DateTime(parsed.with_timezone(&Utc)));
                    }
                }

                let mut doc = Document::new();
                for (key, value) in map {
                    doc.insert_raw(key, Value::from_json(value)?);
                }
                Ok(Value::Document(doc))
            }
        }
    }

    /// Converts this value into JSON, using Extended JSON wrappers for
    /// identifiers and instants.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::I64(i) => serde_json::Value::from(*i),
            Value::F64(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Document(doc) => doc.to_json(),
            Value::Id(id) => serde_json::json!({ "$oid": id.to_string() }),
            Value::DateTime(dt) => serde_json::json!({
                "$date": dt.to_rfc3339_opts(SecondsFormat::Millis, true)
            }),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::I64(value as i64)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::I64(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::I64(value as i64)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::F64(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::F64(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Value::Document(value)
    }
}

impl From<DocumentId> for Value {
    fn from(value: DocumentId) -> Self {
        Value::Id(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl<T> From<Vec<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}
