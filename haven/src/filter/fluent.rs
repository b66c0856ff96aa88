use super::Filter;
use crate::common::Value;

/// Creates a fluent filter builder for the specified field path.
///
/// ```rust,ignore
/// use haven::filter::field;
///
/// let published = field("status").eq("published");
/// let featured = field("slug").in_array(vec!["intro", "harbor-lights"]);
/// let both = published.and(featured);
/// ```
pub fn field(field_name: &str) -> FluentFilter {
    FluentFilter {
        field_name: field_name.to_string(),
    }
}

/// Creates a filter matching every document.
#[inline]
pub fn all() -> Filter {
    Filter::All
}

/// Creates a case-insensitive text search over the searchable fields.
#[inline]
pub fn text(query: &str) -> Filter {
    Filter::TextSearch {
        query: query.to_string(),
    }
}

/// Creates a conjunction of the given filters.
pub fn and(filters: Vec<Filter>) -> Filter {
    filters.into_iter().fold(Filter::All, Filter::and)
}

/// A fluent builder for filters on a single field.
pub struct FluentFilter {
    field_name: String,
}

impl FluentFilter {
    /// Creates a filter that matches documents where the field equals the
    /// specified value.
    #[inline]
    pub fn eq<T: Into<Value>>(self, value: T) -> Filter {
        Filter::FieldEquals {
            path: self.field_name,
            value: value.into(),
        }
    }

    /// Creates a filter that matches documents where the field equals any of
    /// the specified values.
    #[inline]
    pub fn in_array<T: Into<Value>>(self, values: Vec<T>) -> Filter {
        Filter::FieldIn {
            path: self.field_name,
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}
