/// Specifies configuration options for creating indexes.
///
/// IndexOptions is passed to `create_index()`:
///
/// ```ignore
/// // one story per slug
/// stories.create_index(&["slug"], &unique_index())?;
///
/// // one translation per story and locale
/// translations.create_index(&["story_id", "locale"], &unique_index())?;
///
/// // lookup index with no constraint
/// stories.create_index(&["status"], &non_unique_index())?;
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IndexOptions {
    unique: bool,
}

impl IndexOptions {
    /// Creates a new IndexOptions with the given uniqueness.
    pub fn new(unique: bool) -> IndexOptions {
        IndexOptions { unique }
    }

    /// Returns `true` if the index rejects duplicate keys.
    pub fn is_unique(&self) -> bool {
        self.unique
    }
}

/// Creates options for a unique index.
///
/// No two documents may share the same values at all indexed fields. A
/// missing field counts as `null`, so at most one document may omit it.
pub fn unique_index() -> IndexOptions {
    IndexOptions::new(true)
}

/// Creates options for an index without a uniqueness constraint.
pub fn non_unique_index() -> IndexOptions {
    IndexOptions::new(false)
}
