use crate::errors::{ErrorKind, HavenError, HavenResult};
use crate::ID_GENERATOR;
use once_cell::sync::Lazy;
use std::fmt::{Debug, Display};
use std::str::FromStr;

static MAX_VALUE: Lazy<u64> = Lazy::new(|| 10u64.pow(19));
static MIN_VALUE: Lazy<u64> = Lazy::new(|| 10u64.pow(18));

/// A unique identifier for documents.
///
/// Documents inserted without an `_id` field receive a freshly generated
/// `DocumentId`. Ids are produced by a snowflake-style generator, so they are
/// unique within the process and roughly ordered by creation time. Values
/// always fall in the range [10^18, 10^19).
///
/// Two ids are equal when their numeric values are equal, regardless of
/// where the ids came from.
///
/// # Examples
///
/// ```rust,ignore
/// use haven::collection::DocumentId;
///
/// let id = DocumentId::new();
/// let same: DocumentId = id.to_string().parse()?;
/// assert_eq!(id, same);
/// ```
#[derive(PartialEq, Eq, Ord, PartialOrd, Hash, Clone, Copy)]
pub struct DocumentId {
    id_value: u64,
}

impl DocumentId {
    /// Generates a new unique `DocumentId`.
    pub fn new() -> Self {
        DocumentId {
            id_value: ID_GENERATOR.get_id(),
        }
    }

    /// Creates a `DocumentId` from a specific value in [10^18, 10^19).
    pub fn create_id(id_value: u64) -> HavenResult<DocumentId> {
        DocumentId::valid_id(id_value)?;
        Ok(DocumentId { id_value })
    }

    /// Gets the numeric value of this id.
    pub fn id_value(&self) -> u64 {
        self.id_value
    }

    pub(crate) fn valid_id(id_value: u64) -> HavenResult<()> {
        if id_value >= *MAX_VALUE {
            log::error!("Id value {} is too large", id_value);
            return Err(HavenError::new(
                &format!("Id value must be less than 10^19, got {}", id_value),
                ErrorKind::InvalidOperation,
            ));
        } else if id_value < *MIN_VALUE {
            log::error!("Id value {} is too small", id_value);
            return Err(HavenError::new(
                &format!("Id value must be at least 10^18, got {}", id_value),
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        DocumentId::new()
    }
}

impl Debug for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentId({})", self.id_value)
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id_value)
    }
}

impl FromStr for DocumentId {
    type Err = HavenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id_value = s.trim().parse::<u64>().map_err(|e| {
            log::error!("Invalid document id {}: {}", s, e);
            HavenError::new(
                &format!("Invalid document id {}: {}", s, e),
                ErrorKind::InvalidOperation,
            )
        })?;
        DocumentId::create_id(id_value)
    }
}
