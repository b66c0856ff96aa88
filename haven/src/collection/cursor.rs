use crate::collection::{Document, FindOptions, SortSpec};
use crate::common::{SortOrder, Value};
use crate::errors::{ErrorKind, HavenError, HavenResult};
use icu_collator::options::CollatorOptions;
use icu_collator::{Collator, CollatorPreferences};
use std::cmp::Ordering;

/// Supplies the documents behind a [DocumentCursor].
///
/// The embedded store hands out a [SnapshotSource] holding copies taken when
/// the cursor was created. A remote driver can implement this trait to push
/// sort, skip and limit down to the server.
pub trait CursorSource: Send {
    /// Produces the documents for `options`, already sorted, skipped and
    /// limited.
    fn fetch(self: Box<Self>, options: &FindOptions) -> HavenResult<Vec<Document>>;
}

/// A cursor source over an in-memory snapshot.
pub struct SnapshotSource {
    documents: Vec<Document>,
}

impl SnapshotSource {
    pub fn new(documents: Vec<Document>) -> Self {
        SnapshotSource { documents }
    }
}

impl CursorSource for SnapshotSource {
    fn fetch(self: Box<Self>, options: &FindOptions) -> HavenResult<Vec<Document>> {
        let mut documents = self.documents;
        if let Some(spec) = options.sort_spec() {
            sort_documents(&mut documents, spec)?;
        }

        let skip = options.skip_count() as usize;
        let limit = options.limit_count().map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(documents.into_iter().skip(skip).take(limit).collect())
    }
}

/// A lazy, chainable view over the result of a find operation.
///
/// Sort, skip and limit are recorded and applied only when the cursor is
/// materialized with [DocumentCursor::to_array]. A cursor never changes the
/// collection it came from.
///
/// ```rust,ignore
/// let latest = stories
///     .find(&doc! { "status": "published" })?
///     .sort(&doc! { "created_at": (-1) })
///     .skip(10)
///     .limit(5)
///     .to_array()?;
/// ```
pub struct DocumentCursor {
    source: Box<dyn CursorSource>,
    options: FindOptions,
    error: Option<HavenError>,
}

impl DocumentCursor {
    pub fn new<S: CursorSource + 'static>(source: S) -> Self {
        DocumentCursor {
            source: Box::new(source),
            options: FindOptions::default(),
            error: None,
        }
    }

    /// Creates a cursor over already-copied documents.
    pub fn from_documents(documents: Vec<Document>) -> Self {
        DocumentCursor::new(SnapshotSource::new(documents))
    }

    /// Sorts by the first key of a sort document such as `{"x": 1}`.
    ///
    /// An invalid sort document is reported by [DocumentCursor::to_array].
    pub fn sort(mut self, spec: &Document) -> Self {
        match SortSpec::from_document(spec) {
            Ok(spec) => self.options = self.options.sort(spec),
            Err(e) => self.error = Some(e),
        }
        self
    }

    pub fn sort_by(mut self, field: &str, order: SortOrder) -> Self {
        self.options = self.options.sort_by(field, order);
        self
    }

    pub fn skip(mut self, skip: i64) -> Self {
        self.options = self.options.skip(skip);
        self
    }

    /// Limits the number of results; zero means no limit.
    pub fn limit(mut self, limit: i64) -> Self {
        self.options = self.options.limit(limit);
        self
    }

    pub fn with_options(mut self, options: FindOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &FindOptions {
        &self.options
    }

    /// Materializes the cursor into independent documents.
    pub fn to_array(self) -> HavenResult<Vec<Document>> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let documents = self.source.fetch(&self.options)?;
        log::debug!(
            "Cursor materialized {} documents with {:?}",
            documents.len(),
            self.options
        );
        Ok(documents)
    }
}

type Keyed = (Option<Value>, Document);

/// Stable single-key sort. Instants compare chronologically, numbers
/// numerically and strings with the default locale collator; any other pair
/// (including a missing value) compares equal and keeps its relative order.
pub(crate) fn sort_documents(documents: &mut Vec<Document>, spec: &SortSpec) -> HavenResult<()> {
    let collator = Collator::try_new(CollatorPreferences::default(), CollatorOptions::default())
        .map_err(|_| {
            log::error!("Failed to create collator for sorting");
            HavenError::new(
                "Failed to create collator for sorting",
                ErrorKind::InternalError,
            )
        })?;

    let keyed: Vec<Keyed> = documents
        .drain(..)
        .map(|doc| (doc.get(spec.field()), doc))
        .collect();

    let keyed = merge_sort(keyed, &|(a, _): &Keyed, (b, _): &Keyed| {
        let cmp = match (a, b) {
            (Some(Value::DateTime(a)), Some(Value::DateTime(b))) => a.cmp(b),
            (Some(Value::I64(a)), Some(Value::I64(b))) => a.cmp(b),
            (Some(a), Some(b)) if a.is_number() && b.is_number() => {
                let a = a.as_f64().unwrap_or(0.0);
                let b = b.as_f64().unwrap_or(0.0);
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
            (Some(Value::String(a)), Some(Value::String(b))) => collator.compare(a, b),
            _ => Ordering::Equal,
        };

        match spec.order() {
            SortOrder::Ascending => cmp,
            SortOrder::Descending => cmp.reverse(),
        }
    });

    documents.extend(keyed.into_iter().map(|(_, doc)| doc));
    Ok(())
}

// Stable merge sort. Incomparable values compare equal, which is not a
// total order, so the std sorts are avoided.
fn merge_sort<T, F>(mut items: Vec<T>, compare: &F) -> Vec<T>
where
    F: Fn(&T, &T) -> Ordering,
{
    if items.len() <= 1 {
        return items;
    }

    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, compare);
    let right = merge_sort(right, compare);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
        if compare(r, l) == Ordering::Less {
            merged.extend(right.next());
        } else {
            merged.extend(left.next());
        }
    }
    merged.extend(left);
    merged.extend(right);
    merged
}
