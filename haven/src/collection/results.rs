use crate::common::Value;

/// Result of an `insert_one` operation.
#[derive(Clone, Debug, PartialEq)]
pub struct InsertOneResult {
    /// The `_id` of the inserted document, assigned if it had none.
    pub inserted_id: Value,
}

/// Result of an `insert_many` operation.
#[derive(Clone, Debug, PartialEq)]
pub struct InsertManyResult {
    /// The `_id` of every inserted document, in input order.
    pub inserted_ids: Vec<Value>,
}

/// Result of an `update_one` operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched_count: u64,
    /// Zero when the update left the matched document unchanged.
    pub modified_count: u64,
}

/// Result of a `delete_one` operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

impl DeleteResult {
    /// Returns `true` if a document was deleted.
    pub fn deleted(&self) -> bool {
        self.deleted_count > 0
    }
}

/// Which snapshot `find_one_and_update` returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReturnDocument {
    /// The document as it was before the update.
    #[default]
    Before,
    /// The document as it is after the update.
    After,
}
