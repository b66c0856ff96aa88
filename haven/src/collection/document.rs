use crate::collection::DocumentId;
use crate::common::{Value, DOC_ID, FIELD_SEPARATOR};
use crate::errors::{ErrorKind, HavenError, HavenResult};
use indexmap::IndexMap;
use std::fmt::{Debug, Display};

/// Represents a document: an insertion-ordered mapping from field name to
/// [Value].
///
/// Nested documents are addressed with dot paths. For a document
/// `{"a": {"b": 1}}`, `document.get("a.b")` returns `1`. Numeric path
/// segments index into arrays (`"items.0"`), and a non-numeric segment applied
/// to an array collects that field from every element (`"authors.name"`).
///
/// The `_id` field is the document identifier. It may hold any value; when a
/// document without one is inserted into a collection, a fresh
/// [DocumentId] is assigned.
///
/// Cloning a document deep-copies every nested value. Equality ignores field
/// order.
#[derive(Clone, Default, PartialEq)]
pub struct Document {
    data: IndexMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document {
            data: IndexMap::new(),
        }
    }

    /// Checks if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of top-level fields.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Associates `value` with `key`, replacing any previous value.
    ///
    /// Dot-separated keys assign into nested documents, creating any missing
    /// intermediate documents. A numeric segment addresses an array element;
    /// an index past the end pads the array with nulls. Existing values are
    /// never replaced on the way down: a path through a scalar, or through an
    /// array with a non-numeric segment, is rejected and the document is left
    /// as it was.
    ///
    /// ```ignore
    /// let mut doc = Document::new();
    /// doc.put("user.name", "Alice")?;
    /// assert_eq!(doc.get("user.name"), Some(Value::from("Alice")));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the key, or any of its segments, is empty, or if
    /// the path runs through an existing value that cannot hold a field.
    pub fn put<T: Into<Value>>(&mut self, key: &str, value: T) -> HavenResult<()> {
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(HavenError::new(
                "Document does not support empty key",
                ErrorKind::InvalidOperation,
            ));
        }

        let value = value.into();
        if !key.contains(FIELD_SEPARATOR) {
            self.data.insert(key.to_string(), value);
            return Ok(());
        }

        let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
        if splits.iter().any(|s| s.is_empty()) {
            log::error!("Invalid embedded key {}", key);
            return Err(HavenError::new(
                &format!("Invalid embedded key {}", key),
                ErrorKind::InvalidOperation,
            ));
        }

        match self.data.get_mut(splits[0]) {
            Some(slot) => put_into(slot, &splits[1..], value).map_err(|element| {
                log::error!("Cannot create field {} in element {}", key, element);
                HavenError::new(
                    &format!("Cannot create field {} in element {}", key, element),
                    ErrorKind::InvalidOperation,
                )
            }),
            None => {
                self.data
                    .insert(splits[0].to_string(), nest(&splits[1..], value));
                Ok(())
            }
        }
    }

    /// Returns a copy of the value at `key`, or `None` if any segment of the
    /// path is missing.
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.data.get(key) {
            return Some(value.clone());
        }

        if !key.contains(FIELD_SEPARATOR) {
            return None;
        }

        let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
        if splits.iter().any(|s| s.is_empty()) {
            return None;
        }
        recursive_get(self.data.get(splits[0]), &splits[1..])
    }

    /// Returns a mutable reference to a top-level field.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.data.get_mut(key)
    }

    /// Returns the `_id` value, if the document has one.
    pub fn id(&self) -> Option<&Value> {
        self.data.get(DOC_ID)
    }

    /// Checks whether the document carries an `_id` field.
    pub fn has_id(&self) -> bool {
        self.data.contains_key(DOC_ID)
    }

    /// Returns the `_id` value, assigning a fresh [DocumentId] first if the
    /// document has none.
    pub fn ensure_id(&mut self) -> Value {
        self.data
            .entry(DOC_ID.to_string())
            .or_insert_with(|| Value::Id(DocumentId::new()))
            .clone()
    }

    /// Removes the field at `key`. Removing a missing field is not an error.
    pub fn remove(&mut self, key: &str) -> HavenResult<()> {
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(HavenError::new(
                "Document does not support empty key",
                ErrorKind::InvalidOperation,
            ));
        }

        if self.data.shift_remove(key).is_some() || !key.contains(FIELD_SEPARATOR) {
            return Ok(());
        }

        let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
        if let Some(slot) = self.data.get_mut(splits[0]) {
            remove_from(slot, &splits[1..]);
        }
        Ok(())
    }

    /// Checks if a top-level field exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Checks if a (possibly embedded) field exists.
    pub fn contains_field(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Iterates over top-level fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    /// Returns the top-level field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    /// Inserts a top-level field verbatim: dots in `key` are not interpreted,
    /// so `{"stats.views": 10}` keeps its single dotted key. Query and update
    /// documents are built this way.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty.
    pub fn insert<T: Into<Value>>(&mut self, key: &str, value: T) -> HavenResult<()> {
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(HavenError::new(
                "Document does not support empty key",
                ErrorKind::InvalidOperation,
            ));
        }
        self.data.insert(key.to_string(), value.into());
        Ok(())
    }

    pub(crate) fn insert_raw(&mut self, key: String, value: Value) {
        self.data.insert(key, value);
    }

    /// Type-strict, order-sensitive comparison used for change detection.
    pub(crate) fn identical(&self, other: &Document) -> bool {
        self.data.len() == other.data.len()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|((k1, v1), (k2, v2))| k1 == k2 && v1.identical(v2))
    }

    /// Builds a document from a JSON object.
    pub fn from_json(json: serde_json::Value) -> HavenResult<Document> {
        match Value::from_json(json)? {
            Value::Document(doc) => Ok(doc),
            other => {
                log::error!("Expected a JSON object, found {}", other.type_name());
                Err(HavenError::new(
                    &format!("Expected a JSON object, found {}", other.type_name()),
                    ErrorKind::InvalidOperation,
                ))
            }
        }
    }

    /// Converts the document into a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .data
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

fn array_index(segment: &str, len: usize) -> Option<usize> {
    segment.parse::<usize>().ok().filter(|i| *i < len)
}

/// Wraps `value` in one document per remaining segment.
fn nest(splits: &[&str], value: Value) -> Value {
    splits.iter().rev().fold(value, |inner, segment| {
        let mut doc = Document::new();
        doc.data.insert(segment.to_string(), inner);
        Value::Document(doc)
    })
}

/// Assigns `value` below `slot`. On conflict returns the existing value that
/// blocks the path, untouched.
fn put_into(slot: &mut Value, splits: &[&str], value: Value) -> Result<(), Value> {
    let Some((segment, rest)) = splits.split_first() else {
        *slot = value;
        return Ok(());
    };

    match slot {
        Value::Document(doc) => match doc.data.get_mut(*segment) {
            Some(next) => put_into(next, rest, value),
            None => {
                doc.data.insert(segment.to_string(), nest(rest, value));
                Ok(())
            }
        },
        Value::Array(items) => match segment.parse::<usize>() {
            Ok(index) if index < items.len() => put_into(&mut items[index], rest, value),
            Ok(index) => {
                items.resize(index, Value::Null);
                items.push(nest(rest, value));
                Ok(())
            }
            Err(_) => Err(Value::Array(items.clone())),
        },
        other => Err(other.clone()),
    }
}

fn remove_from(slot: &mut Value, splits: &[&str]) {
    let Some((last, parents)) = splits.split_last() else {
        return;
    };

    let mut current = slot;
    for segment in parents {
        current = match current {
            Value::Document(doc) => match doc.data.get_mut(*segment) {
                Some(next) => next,
                None => return,
            },
            Value::Array(items) => match array_index(segment, items.len()) {
                Some(index) => &mut items[index],
                None => return,
            },
            _ => return,
        };
    }

    match current {
        Value::Document(doc) => {
            doc.data.shift_remove(*last);
        }
        Value::Array(items) => {
            if let Some(index) = array_index(last, items.len()) {
                items.remove(index);
            }
        }
        _ => {}
    }
}

fn recursive_get(value: Option<&Value>, splits: &[&str]) -> Option<Value> {
    let value = value?;
    if splits.is_empty() {
        return Some(value.clone());
    }

    match value {
        Value::Document(doc) => recursive_get(doc.data.get(splits[0]), &splits[1..]),
        Value::Array(items) => match splits[0].parse::<usize>() {
            Ok(index) => recursive_get(items.get(index), &splits[1..]),
            // if the current key is not an integer, decompose the list
            Err(_) => decompose(items, splits),
        },
        _ => None,
    }
}

fn decompose(items: &[Value], splits: &[&str]) -> Option<Value> {
    let mut collected: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        match recursive_get(Some(item), splits) {
            Some(Value::Array(values)) => {
                for v in values {
                    if !collected.contains(&v) {
                        collected.push(v);
                    }
                }
            }
            Some(v) => {
                if !collected.contains(&v) {
                    collected.push(v);
                }
            }
            None => {}
        }
    }

    if collected.is_empty() {
        None
    } else {
        Some(Value::Array(collected))
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string_pretty(&self.to_json()) {
            Ok(json) => write!(f, "{}", json),
            Err(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

pub fn normalize(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Creates a [Document] with JSON-like syntax.
///
/// Keys are inserted verbatim, so a dotted key such as `"stats.views"` stays
/// a single field. This is the shape query and update documents take.
///
/// ```rust
/// use haven::doc;
///
/// let empty = doc!{};
///
/// let story = doc!{
///     name: "Harbor Lights",
///     "summary": "A lighthouse keeper's last season",
///     tags: ["coastal", "mystery"],
///     stats: { views: 10, likes: (2 * 3) }
/// };
/// assert_eq!(story.get("stats.likes"), Some(haven::common::Value::from(6)));
/// ```
#[macro_export]
macro_rules! doc {
    // match an empty document (with braces)
    ({}) => {
        $crate::collection::Document::new()
    };

    // match an empty document
    () => {
        $crate::collection::Document::new()
    };

    // match a document with key value pairs wrapped in outer braces
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::doc!($($key : $value),*)
    };

    // match a document with key value pairs
    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::doc_value;

            let mut doc = $crate::collection::Document::new();
            $(
                doc.insert(&$crate::collection::normalize(stringify!($key)), $crate::doc_value!($value))
                .expect(&format!("Failed to put value {} in document", stringify!($value)));
            )*
            doc
        }
    };
}

/// Helper macro converting values for the [doc!] macro.
#[macro_export]
macro_rules! doc_value {
    // match a nested document
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        {
            $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
        }
    };

    // match an array of values
    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    // match an expression
    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
