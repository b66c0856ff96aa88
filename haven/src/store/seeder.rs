use crate::collection::Database;
use crate::errors::HavenResult;
use std::sync::Arc;

/// Populates a freshly built embedded store.
///
/// The seeder runs once per store build: on first fallback and again after a
/// seed-version change discards the previous store.
pub trait Seeder: Send + Sync {
    fn seed(&self, database: &Database) -> HavenResult<()>;
}

impl<F> Seeder for F
where
    F: Fn(&Database) -> HavenResult<()> + Send + Sync,
{
    fn seed(&self, database: &Database) -> HavenResult<()> {
        self(database)
    }
}

/// A shared seeder reference.
pub type SeederRef = Arc<dyn Seeder>;
