use super::Collection;
use crate::errors::HavenResult;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Which path produced a [Database] handle. Diagnostic only: application
/// code works the same against either.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Remote,
    Embedded,
}

impl Display for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Remote => write!(f, "remote"),
            Backend::Embedded => write!(f, "embedded"),
        }
    }
}

/// Trait defining the interface for a database handle.
///
/// Implemented by the embedded store and by remote driver adapters.
pub trait DatabaseProvider: Send + Sync {
    /// Returns the database name.
    fn name(&self) -> String;

    /// Returns which path this database came from.
    fn backend(&self) -> Backend;

    /// Returns the named collection, creating it lazily on first reference.
    fn collection(&self, name: &str) -> HavenResult<Collection>;

    /// Lists the collections referenced so far.
    fn list_collection_names(&self) -> HavenResult<Vec<String>>;

    /// Releases the resources behind this handle.
    fn close(&self) -> HavenResult<()>;
}

/// A uniform database handle.
///
/// Clones share the same underlying provider.
#[derive(Clone)]
pub struct Database {
    inner: Arc<dyn DatabaseProvider>,
}

impl Database {
    pub fn new<T: DatabaseProvider + 'static>(inner: T) -> Self {
        Database {
            inner: Arc::new(inner),
        }
    }

    pub fn name(&self) -> String {
        self.inner.name()
    }

    pub fn backend(&self) -> Backend {
        self.inner.backend()
    }

    pub fn collection(&self, name: &str) -> HavenResult<Collection> {
        self.inner.collection(name)
    }

    pub fn list_collection_names(&self) -> HavenResult<Vec<String>> {
        self.inner.list_collection_names()
    }

    pub fn close(&self) -> HavenResult<()> {
        self.inner.close()
    }

    /// Checks whether two handles share the same underlying database.
    pub fn ptr_eq(&self, other: &Database) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.inner.name())
            .field("backend", &self.inner.backend())
            .finish()
    }
}
