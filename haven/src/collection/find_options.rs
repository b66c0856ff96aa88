use crate::collection::Document;
use crate::common::{SortOrder, Value};
use crate::errors::{ErrorKind, HavenError, HavenResult};

/// A single-key sort specification.
///
/// Sorting honors only one key. A sort document with several keys, such as
/// `{"created_at": -1, "name": 1}`, is reduced to its first key.
#[derive(Clone, Debug, PartialEq)]
pub struct SortSpec {
    field: String,
    order: SortOrder,
}

impl SortSpec {
    pub fn new(field: &str, order: SortOrder) -> Self {
        SortSpec {
            field: field.to_string(),
            order,
        }
    }

    /// Builds a sort from the first key of a sort document. Directions are
    /// numbers: negative is descending, anything else ascending.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty sort document or a non-numeric direction.
    pub fn from_document(spec: &Document) -> HavenResult<SortSpec> {
        let (field, direction) = match spec.iter().next() {
            Some(entry) => entry,
            None => {
                log::error!("Sort specification must name a field");
                return Err(HavenError::new(
                    "Sort specification must name a field",
                    ErrorKind::InvalidOperation,
                ));
            }
        };

        if spec.size() > 1 {
            log::debug!("Sorting honors only the first key, ignoring the rest of {:?}", spec);
        }

        let direction = match direction {
            Value::I64(d) => *d,
            Value::F64(d) => *d as i64,
            other => {
                log::error!("Invalid sort direction {} for {}", other, field);
                return Err(HavenError::new(
                    &format!("Invalid sort direction {} for {}", other, field),
                    ErrorKind::InvalidOperation,
                ));
            }
        };

        Ok(SortSpec::new(field, SortOrder::from_direction(direction)))
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }
}

/// Sort, skip and limit applied by a [crate::collection::DocumentCursor]
/// when it is materialized.
///
/// `skip` and `limit` of zero mean "none", matching the remote database.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindOptions {
    pub(crate) sort_by: Option<SortSpec>,
    pub(crate) skip: u64,
    pub(crate) limit: u64,
}

/// Creates `FindOptions` with sorting by a field.
pub fn order_by(field_name: &str, sort_order: SortOrder) -> FindOptions {
    FindOptions::new().sort_by(field_name, sort_order)
}

/// Creates `FindOptions` that skips a number of results.
pub fn skip_by(skip: i64) -> FindOptions {
    FindOptions::new().skip(skip)
}

/// Creates `FindOptions` that limits the number of results.
pub fn limit_to(limit: i64) -> FindOptions {
    FindOptions::new().limit(limit)
}

impl FindOptions {
    pub fn new() -> Self {
        FindOptions::default()
    }

    pub fn sort_by(mut self, field_name: &str, sort_order: SortOrder) -> Self {
        self.sort_by = Some(SortSpec::new(field_name, sort_order));
        self
    }

    pub fn sort(mut self, spec: SortSpec) -> Self {
        self.sort_by = Some(spec);
        self
    }

    /// Sets the number of results to skip; negative values clamp to zero.
    pub fn skip(mut self, skip: i64) -> Self {
        self.skip = skip.max(0) as u64;
        self
    }

    /// Sets the maximum number of results; negative values clamp to zero and
    /// zero means no limit.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit.max(0) as u64;
        self
    }

    pub fn sort_spec(&self) -> Option<&SortSpec> {
        self.sort_by.as_ref()
    }

    pub fn skip_count(&self) -> u64 {
        self.skip
    }

    /// Returns the limit, or `None` when results are unlimited.
    pub fn limit_count(&self) -> Option<u64> {
        if self.limit == 0 {
            None
        } else {
            Some(self.limit)
        }
    }
}
