use crate::collection::Document;
use crate::common::{Value, DOC_ID};
use crate::errors::{ErrorKind, HavenError, HavenResult};

/// A single field modification within an [Update].
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateOperation {
    /// Assigns `value` at `path`, creating intermediate documents.
    Set { path: String, value: Value },
    /// Adds `delta` to the number at `path`; a missing or non-numeric value
    /// counts as zero.
    Inc { path: String, delta: Value },
    /// Appends `value` to the array at `path`, creating the array if absent.
    Push { path: String, value: Value },
}

/// An ordered list of update operations.
///
/// Build one fluently or parse it from an update document:
///
/// ```rust,ignore
/// use haven::collection::Update;
/// use haven::doc;
///
/// let fluent = Update::new().set("status", "published").inc("stats.views", 1);
/// let parsed = Update::parse(&doc! {
///     "$set": { "status": "published" },
///     "$inc": { "stats.views": 1 }
/// })?;
/// assert_eq!(fluent, parsed);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Update {
    operations: Vec<UpdateOperation>,
}

impl Update {
    pub fn new() -> Self {
        Update {
            operations: Vec::new(),
        }
    }

    pub fn set<T: Into<Value>>(mut self, path: &str, value: T) -> Self {
        self.operations.push(UpdateOperation::Set {
            path: path.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn inc<T: Into<Value>>(mut self, path: &str, delta: T) -> Self {
        self.operations.push(UpdateOperation::Inc {
            path: path.to_string(),
            delta: delta.into(),
        });
        self
    }

    pub fn push<T: Into<Value>>(mut self, path: &str, value: T) -> Self {
        self.operations.push(UpdateOperation::Push {
            path: path.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn operations(&self) -> &[UpdateOperation] {
        &self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Parses an update document of the form
    /// `{$set: {path: value}, $inc: {path: number}, $push: {path: value}}`.
    ///
    /// # Errors
    ///
    /// Returns [ErrorKind::InvalidUpdate] for unknown operators, operands that
    /// are not documents, non-numeric `$inc` amounts, updates that target
    /// `_id`, and empty updates.
    pub fn parse(update: &Document) -> HavenResult<Update> {
        let mut operations = Vec::new();
        for (operator, operand) in update.iter() {
            let fields = operand.as_document().ok_or_else(|| {
                invalid_update(format!(
                    "{} expects a document, found {}",
                    operator,
                    operand.type_name()
                ))
            })?;

            for (path, value) in fields.iter() {
                let operation = match operator.as_str() {
                    "$set" => UpdateOperation::Set {
                        path: path.clone(),
                        value: value.clone(),
                    },
                    "$inc" => UpdateOperation::Inc {
                        path: path.clone(),
                        delta: value.clone(),
                    },
                    "$push" => UpdateOperation::Push {
                        path: path.clone(),
                        value: value.clone(),
                    },
                    other => {
                        return Err(invalid_update(format!(
                            "Unsupported update operator {}",
                            other
                        )))
                    }
                };
                operations.push(operation);
            }
        }

        let update = Update { operations };
        update.validate()?;
        Ok(update)
    }

    /// Renders this update back into an update document.
    pub fn to_document(&self) -> Document {
        let mut update = Document::new();
        for operation in &self.operations {
            let (operator, path, value) = match operation {
                UpdateOperation::Set { path, value } => ("$set", path, value),
                UpdateOperation::Inc { path, delta } => ("$inc", path, delta),
                UpdateOperation::Push { path, value } => ("$push", path, value),
            };

            if !update.contains_key(operator) {
                update.insert_raw(operator.to_string(), Value::Document(Document::new()));
            }
            if let Some(Value::Document(fields)) = update.get_mut(operator) {
                fields.insert_raw(path.clone(), value.clone());
            }
        }
        update
    }

    pub(crate) fn validate(&self) -> HavenResult<()> {
        if self.operations.is_empty() {
            return Err(invalid_update("Update must contain at least one operation".to_string()));
        }

        for operation in &self.operations {
            let path = match operation {
                UpdateOperation::Set { path, .. } | UpdateOperation::Push { path, .. } => path,
                UpdateOperation::Inc { path, delta } => {
                    if !delta.is_number() {
                        return Err(invalid_update(format!(
                            "Cannot increment {} with non-numeric value of type {}",
                            path,
                            delta.type_name()
                        )));
                    }
                    path
                }
            };

            if path.is_empty() {
                return Err(invalid_update("Update path must not be empty".to_string()));
            }
            if path == DOC_ID || path.starts_with(&format!("{}.", DOC_ID)) {
                return Err(invalid_update(format!(
                    "Performing an update on the path {} would modify the immutable field",
                    DOC_ID
                )));
            }
        }
        Ok(())
    }

    /// Applies every operation to `document` in order, returning whether the
    /// document changed. On error the document may be partially modified, so
    /// callers apply updates to a copy.
    pub(crate) fn apply(&self, document: &mut Document) -> HavenResult<bool> {
        let before = document.clone();
        for operation in &self.operations {
            match operation {
                UpdateOperation::Set { path, value } => {
                    put_path(document, path, value.clone())?;
                }
                UpdateOperation::Inc { path, delta } => {
                    let next = Value::numeric_add(document.get(path).as_ref(), delta)?;
                    put_path(document, path, next)?;
                }
                UpdateOperation::Push { path, value } => match document.get(path) {
                    None => put_path(document, path, Value::Array(vec![value.clone()]))?,
                    Some(Value::Array(mut items)) => {
                        items.push(value.clone());
                        put_path(document, path, Value::Array(items))?;
                    }
                    Some(other) => {
                        return Err(invalid_update(format!(
                            "The field {} must be an array but is of type {}",
                            path,
                            other.type_name()
                        )))
                    }
                },
            }
        }
        Ok(!document.identical(&before))
    }
}

/// Conversion into a parsed [Update], implemented for updates and update
/// documents.
pub trait IntoUpdate {
    fn into_update(self) -> HavenResult<Update>;
}

impl IntoUpdate for Update {
    fn into_update(self) -> HavenResult<Update> {
        self.validate()?;
        Ok(self)
    }
}

impl IntoUpdate for &Update {
    fn into_update(self) -> HavenResult<Update> {
        self.validate()?;
        Ok(self.clone())
    }
}

impl IntoUpdate for &Document {
    fn into_update(self) -> HavenResult<Update> {
        Update::parse(self)
    }
}

impl IntoUpdate for Document {
    fn into_update(self) -> HavenResult<Update> {
        Update::parse(&self)
    }
}

impl TryFrom<&Document> for Update {
    type Error = HavenError;

    fn try_from(update: &Document) -> Result<Self, Self::Error> {
        Update::parse(update)
    }
}

impl TryFrom<Document> for Update {
    type Error = HavenError;

    fn try_from(update: Document) -> Result<Self, Self::Error> {
        Update::parse(&update)
    }
}

fn put_path(document: &mut Document, path: &str, value: Value) -> HavenResult<()> {
    document
        .put(path, value)
        .map_err(|e| HavenError::new(e.message(), ErrorKind::InvalidUpdate))
}

fn invalid_update(message: String) -> HavenError {
    log::error!("{}", message);
    HavenError::new(&message, ErrorKind::InvalidUpdate)
}
