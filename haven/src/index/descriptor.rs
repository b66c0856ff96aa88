use crate::common::DOC_ID;
use itertools::Itertools;

/// Name of the implicit unique index on `_id`.
pub const ID_INDEX_NAME: &str = "_id_";

/// Describes an index declared on a collection: its generated name, the
/// ordered field paths it covers and whether it is unique.
///
/// Names follow the remote database's convention of joining each field with
/// its direction, so an index over `story_id` and `locale` is named
/// `story_id_1_locale_1`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IndexDescriptor {
    name: String,
    fields: Vec<String>,
    unique: bool,
}

impl IndexDescriptor {
    pub fn new(fields: &[&str], unique: bool) -> Self {
        IndexDescriptor {
            name: index_name(fields),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            unique,
        }
    }

    /// The implicit unique index every collection has on `_id`.
    pub fn id_index() -> Self {
        IndexDescriptor {
            name: ID_INDEX_NAME.to_string(),
            fields: vec![DOC_ID.to_string()],
            unique: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_compound_index(&self) -> bool {
        self.fields.len() > 1
    }

    /// Checks whether this index covers exactly `fields`, in order.
    pub fn covers(&self, fields: &[&str]) -> bool {
        self.fields.len() == fields.len() && self.fields.iter().zip(fields).all(|(a, b)| a == b)
    }
}

/// Generates the index name for `fields`, e.g. `story_id_1_locale_1`.
pub fn index_name(fields: &[&str]) -> String {
    fields.iter().map(|f| format!("{}_1", f)).join("_")
}
