use super::{EmbeddedDatabase, SeederRef};
use crate::collection::Database;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Holds the embedded store built for each database name, tagged with the
/// seed version it was built for.
///
/// Asking for a store with the version it was built for returns the same
/// handle. Asking with a different version discards the old store and
/// builds (and seeds) a new one. Clones share the same cache, so several
/// connection managers in one process can share their fallback store.
#[derive(Clone, Default)]
pub struct EmbeddedStoreCache {
    stores: Arc<Mutex<HashMap<String, CachedStore>>>,
}

struct CachedStore {
    seed_version: u32,
    database: Database,
}

impl EmbeddedStoreCache {
    pub fn new() -> Self {
        EmbeddedStoreCache::default()
    }

    /// Returns the store for `name`, building and seeding it if there is
    /// none or if it was built for another seed version.
    ///
    /// The store is built and seeded without holding the cache lock, so a
    /// seeder may use the cache itself. When two callers race to build the
    /// same version, the first one to finish wins and both get its store.
    /// A seeding failure is logged and the (partially seeded) store is still
    /// returned.
    pub fn get_or_build(
        &self,
        name: &str,
        seed_version: u32,
        seeder: Option<&SeederRef>,
    ) -> Database {
        if let Some(cached) = self.lookup(name, seed_version) {
            return cached;
        }

        let database = Database::new(EmbeddedDatabase::new(name, seed_version));
        if let Some(seeder) = seeder {
            match seeder.seed(&database) {
                Ok(()) => log::info!("Seeded embedded store {} at version {}", name, seed_version),
                Err(e) => log::warn!("Seeding embedded store {} failed: {}", name, e),
            }
        }

        let mut stores = self.stores.lock();
        if let Some(cached) = stores.get(name) {
            if cached.seed_version == seed_version {
                return cached.database.clone();
            }
        }
        stores.insert(
            name.to_string(),
            CachedStore {
                seed_version,
                database: database.clone(),
            },
        );
        database
    }

    fn lookup(&self, name: &str, seed_version: u32) -> Option<Database> {
        let stores = self.stores.lock();
        let cached = stores.get(name)?;
        if cached.seed_version == seed_version {
            return Some(cached.database.clone());
        }
        log::info!(
            "Seed version of embedded store {} changed from {} to {}, rebuilding",
            name,
            cached.seed_version,
            seed_version
        );
        None
    }

    /// Returns the seed version of the cached store for `name`, if any.
    pub fn seed_version(&self, name: &str) -> Option<u32> {
        self.stores.lock().get(name).map(|c| c.seed_version)
    }
}
