use crate::collection::Document;
use crate::common::{Value, TEXT_SEARCH_FIELDS};
use crate::errors::{ErrorKind, HavenError, HavenResult};
use std::fmt::{Display, Formatter};

/// A parsed query filter.
///
/// Filters are parsed once from a query document (see [Filter::parse]) or
/// built with the fluent helpers in this module, then matched against
/// documents exhaustively.
///
/// # Matching rules
///
/// - `FieldEquals` compares by value. When the stored value is an array and
///   the literal is not, any equal element matches.
/// - `FieldIn` matches when the stored value equals any listed literal.
/// - `TextSearch` is a case-insensitive substring search over the `name`,
///   `summary` and `tags` fields, checking array elements individually.
/// - A path that does not exist in the document never matches.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    /// Matches documents whose value at `path` equals `value`.
    FieldEquals { path: String, value: Value },
    /// Matches documents whose value at `path` equals any of `values`.
    FieldIn { path: String, values: Vec<Value> },
    /// Matches documents containing `query` in a searchable text field.
    TextSearch { query: String },
    /// Matches documents satisfying every inner filter.
    And(Vec<Filter>),
}

impl Filter {
    /// Checks whether `document` satisfies this filter.
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::FieldEquals { path, value } => match document.get(path) {
                Some(stored) => value_matches(&stored, value),
                None => false,
            },
            Filter::FieldIn { path, values } => match document.get(path) {
                Some(stored) => values.iter().any(|v| value_matches(&stored, v)),
                None => false,
            },
            Filter::TextSearch { query } => text_matches(document, query),
            Filter::And(filters) => filters.iter().all(|f| f.matches(document)),
        }
    }

    /// Combines this filter with another, flattening nested conjunctions.
    pub fn and(self, other: Filter) -> Filter {
        let mut filters = match self {
            Filter::All => return other,
            Filter::And(filters) => filters,
            single => vec![single],
        };

        match other {
            Filter::All => {}
            Filter::And(more) => filters.extend(more),
            single => filters.push(single),
        }
        Filter::And(filters)
    }

    /// Parses a query document.
    ///
    /// Accepted shapes:
    ///
    /// ```text
    /// {}                               all documents
    /// {path: literal}                  equality
    /// {path: {$eq: literal}}           equality
    /// {path: {$in: [literals]}}        membership
    /// {$text: {$search: "query"}}      text search
    /// {$and: [filter, ...]}            conjunction
    /// ```
    ///
    /// Several top-level fields form an implicit conjunction.
    ///
    /// # Errors
    ///
    /// Returns [ErrorKind::InvalidFilter] for unknown operators or malformed
    /// operands.
    pub fn parse(query: &Document) -> HavenResult<Filter> {
        let mut clauses = Vec::with_capacity(query.size());
        for (key, value) in query.iter() {
            let clause = if key.starts_with('$') {
                parse_top_level_operator(key, value)?
            } else {
                parse_field(key, value)?
            };
            clauses.push(clause);
        }

        Ok(match clauses.len() {
            0 => Filter::All,
            1 => clauses.remove(0),
            _ => Filter::And(clauses),
        })
    }

    /// Renders this filter back into a query document, for drivers that
    /// forward queries to a remote database.
    pub fn to_document(&self) -> Document {
        let mut query = Document::new();
        match self {
            Filter::All => {}
            Filter::FieldEquals { path, value } => {
                query.insert_raw(path.clone(), value.clone());
            }
            Filter::FieldIn { path, values } => {
                let mut operand = Document::new();
                operand.insert_raw("$in".to_string(), Value::Array(values.clone()));
                query.insert_raw(path.clone(), Value::Document(operand));
            }
            Filter::TextSearch { query: text } => {
                let mut operand = Document::new();
                operand.insert_raw("$search".to_string(), Value::from(text.as_str()));
                query.insert_raw("$text".to_string(), Value::Document(operand));
            }
            Filter::And(filters) => {
                let clauses = filters
                    .iter()
                    .map(|f| Value::Document(f.to_document()))
                    .collect();
                query.insert_raw("$and".to_string(), Value::Array(clauses));
            }
        }
        query
    }
}

/// Conversion into a parsed [Filter], implemented for filters and query
/// documents.
pub trait IntoFilter {
    fn into_filter(self) -> HavenResult<Filter>;
}

impl IntoFilter for Filter {
    fn into_filter(self) -> HavenResult<Filter> {
        Ok(self)
    }
}

impl IntoFilter for &Filter {
    fn into_filter(self) -> HavenResult<Filter> {
        Ok(self.clone())
    }
}

impl IntoFilter for &Document {
    fn into_filter(self) -> HavenResult<Filter> {
        Filter::parse(self)
    }
}

impl IntoFilter for Document {
    fn into_filter(self) -> HavenResult<Filter> {
        Filter::parse(&self)
    }
}

impl TryFrom<&Document> for Filter {
    type Error = HavenError;

    fn try_from(query: &Document) -> Result<Self, Self::Error> {
        Filter::parse(query)
    }
}

impl TryFrom<Document> for Filter {
    type Error = HavenError;

    fn try_from(query: Document) -> Result<Self, Self::Error> {
        Filter::parse(&query)
    }
}

impl Display for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.to_document())
    }
}

fn invalid_filter(message: String) -> HavenError {
    log::error!("{}", message);
    HavenError::new(&message, ErrorKind::InvalidFilter)
}

fn parse_top_level_operator(operator: &str, operand: &Value) -> HavenResult<Filter> {
    match operator {
        "$and" => {
            let items = operand.as_array().ok_or_else(|| {
                invalid_filter(format!("$and expects an array, found {}", operand.type_name()))
            })?;

            let mut filters = Vec::with_capacity(items.len());
            for item in items {
                let query = item.as_document().ok_or_else(|| {
                    invalid_filter(format!(
                        "$and expects an array of documents, found {}",
                        item.type_name()
                    ))
                })?;
                filters.push(Filter::parse(query)?);
            }
            Ok(Filter::And(filters))
        }
        "$text" => {
            let search = operand
                .as_document()
                .and_then(|d| d.get("$search"))
                .ok_or_else(|| invalid_filter("$text expects {$search: <string>}".to_string()))?;

            match search {
                Value::String(query) => Ok(Filter::TextSearch { query }),
                other => Err(invalid_filter(format!(
                    "$search expects a string, found {}",
                    other.type_name()
                ))),
            }
        }
        _ => Err(invalid_filter(format!("Unsupported filter operator {}", operator))),
    }
}

fn parse_field(path: &str, operand: &Value) -> HavenResult<Filter> {
    let operators = match operand {
        Value::Document(doc) if doc.keys().any(|k| k.starts_with('$')) => doc,
        // a plain document is an equality literal
        literal => {
            return Ok(Filter::FieldEquals {
                path: path.to_string(),
                value: literal.clone(),
            })
        }
    };

    let mut clauses = Vec::with_capacity(operators.size());
    for (operator, value) in operators.iter() {
        let clause = match operator.as_str() {
            "$eq" => Filter::FieldEquals {
                path: path.to_string(),
                value: value.clone(),
            },
            "$in" => match value {
                Value::Array(values) => Filter::FieldIn {
                    path: path.to_string(),
                    values: values.clone(),
                },
                other => {
                    return Err(invalid_filter(format!(
                        "$in on {} expects an array, found {}",
                        path,
                        other.type_name()
                    )))
                }
            },
            other if other.starts_with('$') => {
                return Err(invalid_filter(format!(
                    "Unsupported operator {} on field {}",
                    other, path
                )))
            }
            other => {
                return Err(invalid_filter(format!(
                    "Cannot mix operator and field {} in the condition on {}",
                    other, path
                )))
            }
        };
        clauses.push(clause);
    }

    Ok(match clauses.len() {
        1 => clauses.remove(0),
        _ => Filter::And(clauses),
    })
}

fn value_matches(stored: &Value, literal: &Value) -> bool {
    if stored == literal {
        return true;
    }

    match (stored, literal) {
        (Value::Array(_), Value::Array(_)) => false,
        (Value::Array(items), _) => items.iter().any(|item| item == literal),
        _ => false,
    }
}

fn text_matches(document: &Document, query: &str) -> bool {
    let needle = query.to_lowercase();
    TEXT_SEARCH_FIELDS.iter().any(|field| match document.get(field) {
        Some(Value::String(text)) => text.to_lowercase().contains(&needle),
        Some(Value::Array(items)) => items.iter().any(|item| {
            item.as_str()
                .map(|text| text.to_lowercase().contains(&needle))
                .unwrap_or(false)
        }),
        _ => false,
    })
}
