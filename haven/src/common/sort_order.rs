/// Specifies the direction for sorting documents.
///
/// Used by [`crate::collection::SortSpec`] when ordering cursor results.
/// `Ascending` corresponds to `1` and `Descending` to `-1` in a sort document
/// such as `{"created_at": -1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Sort in ascending order (smallest to largest, A-Z, oldest to newest)
    Ascending,
    /// Sort in descending order (largest to smallest, Z-A, newest to oldest)
    Descending,
}

impl SortOrder {
    /// Maps a sort-document direction to an order: negative numbers are
    /// descending, everything else ascending.
    pub fn from_direction(direction: i64) -> SortOrder {
        if direction < 0 {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        }
    }
}
