use super::EmbeddedCollection;
use crate::collection::{Backend, Collection, DatabaseProvider};
use crate::errors::{ErrorKind, HavenError, HavenResult};
use dashmap::DashMap;
use std::sync::Arc;

/// In-process database holding named [EmbeddedCollection]s.
///
/// Collections are created lazily on first reference and live as long as the
/// database. The store is not durable: closing it only logs, and data is lost
/// with the process.
#[derive(Clone)]
pub struct EmbeddedDatabase {
    inner: Arc<EmbeddedDatabaseInner>,
}

impl EmbeddedDatabase {
    pub fn new(name: &str, seed_version: u32) -> Self {
        EmbeddedDatabase {
            inner: Arc::new(EmbeddedDatabaseInner {
                name: name.to_string(),
                seed_version,
                collections: DashMap::new(),
            }),
        }
    }

    /// The seed version this store was built for.
    pub fn seed_version(&self) -> u32 {
        self.inner.seed_version
    }
}

impl DatabaseProvider for EmbeddedDatabase {
    fn name(&self) -> String {
        self.inner.name.clone()
    }

    fn backend(&self) -> Backend {
        Backend::Embedded
    }

    fn collection(&self, name: &str) -> HavenResult<Collection> {
        if name.is_empty() {
            log::error!("Collection name cannot be empty");
            return Err(HavenError::new(
                "Collection name cannot be empty",
                ErrorKind::InvalidOperation,
            ));
        }

        let collection = self
            .inner
            .collections
            .entry(name.to_string())
            .or_insert_with(|| Collection::new(EmbeddedCollection::new(name)))
            .clone();
        Ok(collection)
    }

    fn list_collection_names(&self) -> HavenResult<Vec<String>> {
        let mut names: Vec<String> = self
            .inner
            .collections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        Ok(names)
    }

    fn close(&self) -> HavenResult<()> {
        log::debug!("Embedded database {} closed", self.inner.name);
        Ok(())
    }
}

struct EmbeddedDatabaseInner {
    name: String,
    seed_version: u32,
    collections: DashMap<String, Collection>,
}
