use super::IndexDescriptor;
use crate::collection::Document;
use crate::common::Value;
use crate::errors::{ErrorKind, HavenError, HavenResult};
use chrono::SecondsFormat;
use itertools::Itertools;
use std::collections::HashMap;
use std::fmt::Write;

/// The canonical form of the values a document holds at an index's fields.
///
/// Two keys are equal exactly when the values compare equal: integral floats
/// collapse onto integers and embedded documents ignore field order. A
/// missing field is keyed as `null`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct IndexKey(String);

impl IndexKey {
    pub(crate) fn of(document: &Document, fields: &[String]) -> IndexKey {
        let mut key = String::new();
        for field in fields {
            let value = document.get(field).unwrap_or(Value::Null);
            write_canonical(&value, &mut key);
            key.push('|');
        }
        IndexKey(key)
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push('n'),
        Value::Bool(b) => {
            let _ = write!(out, "b:{}", b);
        }
        Value::I64(i) => {
            let _ = write!(out, "i:{}", i);
        }
        Value::F64(f) => {
            if f.is_nan() {
                out.push_str("f:nan");
            } else if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                let _ = write!(out, "i:{}", *f as i64);
            } else {
                let _ = write!(out, "f:{}", f);
            }
        }
        Value::String(s) => {
            out.push_str("s:");
            out.push_str(&serde_json::Value::from(s.as_str()).to_string());
        }
        Value::Array(items) => {
            out.push('[');
            for item in items {
                write_canonical(item, out);
                out.push(',');
            }
            out.push(']');
        }
        Value::Document(doc) => {
            out.push('{');
            for (key, item) in doc.iter().sorted_by(|a, b| a.0.cmp(b.0)) {
                out.push_str(&serde_json::Value::from(key.as_str()).to_string());
                out.push(':');
                write_canonical(item, out);
                out.push(',');
            }
            out.push('}');
        }
        Value::Id(id) => {
            let _ = write!(out, "o:{}", id);
        }
        Value::DateTime(dt) => {
            let _ = write!(out, "d:{}", dt.to_rfc3339_opts(SecondsFormat::Nanos, true));
        }
    }
}

/// Enforces a unique index by mapping each index key to the `_id` of the
/// document that owns it.
///
/// The owning collection holds its write lock while it checks and updates
/// the entries, so a check followed by an add is atomic.
pub(crate) struct UniqueIndex {
    descriptor: IndexDescriptor,
    entries: HashMap<IndexKey, Value>,
}

impl UniqueIndex {
    pub(crate) fn new(descriptor: IndexDescriptor) -> Self {
        UniqueIndex {
            descriptor,
            entries: HashMap::new(),
        }
    }

    /// Builds the index over existing documents, failing if they already
    /// violate it.
    pub(crate) fn build(
        descriptor: IndexDescriptor,
        collection_name: &str,
        documents: &[Document],
    ) -> HavenResult<UniqueIndex> {
        let mut index = UniqueIndex::new(descriptor);
        for document in documents {
            index.check(collection_name, document, None)?;
            index.add(document);
        }
        Ok(index)
    }

    /// Verifies that `document` can own its key. For an insert (`current`
    /// is `None`) the key must be free; for an update it may already belong
    /// to `current`, the `_id` of the document being replaced.
    pub(crate) fn check(
        &self,
        collection_name: &str,
        document: &Document,
        current: Option<&Value>,
    ) -> HavenResult<()> {
        let key = IndexKey::of(document, self.descriptor.fields());
        match self.entries.get(&key) {
            Some(owner) if Some(owner) != current => {
                let dup_key = self
                    .descriptor
                    .fields()
                    .iter()
                    .map(|f| format!("{}: {}", f, document.get(f).unwrap_or(Value::Null)))
                    .join(", ");
                let message = format!(
                    "E11000 duplicate key error collection: {} index: {} dup key: {{ {} }}",
                    collection_name,
                    self.descriptor.name(),
                    dup_key
                );
                log::error!("{}", message);
                Err(HavenError::new(&message, ErrorKind::DuplicateKey))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn add(&mut self, document: &Document) {
        let key = IndexKey::of(document, self.descriptor.fields());
        let owner = document.id().cloned().unwrap_or(Value::Null);
        self.entries.insert(key, owner);
    }

    pub(crate) fn remove(&mut self, document: &Document) {
        let key = IndexKey::of(document, self.descriptor.fields());
        if self.entries.get(&key) == document.id() {
            self.entries.remove(&key);
        }
    }
}
