use super::{ConnectOptions, ConnectionState, RemoteConnector};
use crate::collection::Database;
use crate::dns::{DohResolver, LookupHook, SrvExpander};
use crate::errors::{ErrorKind, HavenError, HavenResult};
use crate::haven_builder::HavenBuilder;
use crate::haven_config::HavenConfig;
use crate::store::EmbeddedStoreCache;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type PendingAttempt = Shared<BoxFuture<'static, Database>>;

enum Slot {
    Unresolved,
    Pending(PendingAttempt),
    Resolved(Database),
}

/// The single entry point to the data layer.
///
/// [`ConnectionManager::get_database`] tries the remote database with short
/// timeouts and falls back to the embedded store when the remote path fails.
/// The first caller starts the attempt; every caller arriving while it is in
/// flight waits on the same attempt and gets the same handle.
///
/// When no connector is configured and the `mongodb` feature is enabled, the
/// bundled driver connector is used. With neither, the manager goes straight
/// to the embedded store.
///
/// A remote connection is memoized for the life of the manager. After a
/// fallback the decision is forgotten, so a later call tries the remote path
/// again; the embedded store itself is cached, so every fallback returns the
/// same handle. Disable `retry_remote_after_fallback` to pin the fallback.
///
/// # Examples
///
/// ```rust,ignore
/// use haven::connection::ConnectionManager;
///
/// let manager = ConnectionManager::builder()
///     .database_uri("mongodb+srv://cluster0.abc.mongodb.net/")
///     .database_name("stories")
///     .remote_connector(my_driver_connector)
///     .seeder(|db: &Database| seed_demo_content(db))
///     .open()?;
///
/// let db = manager.get_database().await;
/// let stories = db.collection("stories")?;
/// ```
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ConnectionManagerInner>,
}

struct ConnectionManagerInner {
    config: HavenConfig,
    connector: Option<Arc<dyn RemoteConnector>>,
    lookup: LookupHook,
    expander: SrvExpander,
    store_cache: EmbeddedStoreCache,
    slot: tokio::sync::Mutex<Slot>,
    state: RwLock<ConnectionState>,
    remote_attempts: AtomicUsize,
}

impl ConnectionManager {
    /// Creates a manager from `config`. No connection is made until the
    /// first [`ConnectionManager::get_database`] call.
    pub fn new(config: HavenConfig) -> HavenResult<Self> {
        let doh = match config.doh_transport() {
            Some(transport) => DohResolver::with_transport(
                config.doh_endpoint(),
                config.doh_timeout(),
                transport.clone(),
            )?,
            None => DohResolver::new(config.doh_endpoint(), config.doh_timeout())?,
        };
        let lookup = LookupHook::new(doh.clone(), config.managed_domain_suffix());
        let expander = SrvExpander::new(doh, config.srv_service());
        let store_cache = config.store_cache().cloned().unwrap_or_default();
        let connector = config.remote_connector().cloned().or_else(default_connector);

        Ok(ConnectionManager {
            inner: Arc::new(ConnectionManagerInner {
                config,
                connector,
                lookup,
                expander,
                store_cache,
                slot: tokio::sync::Mutex::new(Slot::Unresolved),
                state: RwLock::new(ConnectionState::Unresolved),
                remote_attempts: AtomicUsize::new(0),
            }),
        })
    }

    pub fn builder() -> HavenBuilder {
        HavenBuilder::new()
    }

    pub fn config(&self) -> &HavenConfig {
        &self.inner.config
    }

    /// Returns the current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.read()
    }

    /// Number of remote connection attempts started so far.
    pub fn remote_attempts(&self) -> usize {
        self.inner.remote_attempts.load(Ordering::SeqCst)
    }

    /// The host resolution handed to remote connectors.
    pub fn lookup_hook(&self) -> &LookupHook {
        &self.inner.lookup
    }

    /// Returns a working database handle, remote if reachable and embedded
    /// otherwise. Never fails.
    pub async fn get_database(&self) -> Database {
        let pending = {
            let mut slot = self.inner.slot.lock().await;
            match &*slot {
                Slot::Resolved(database) => return database.clone(),
                Slot::Pending(attempt) => attempt.clone(),
                Slot::Unresolved => {
                    let inner = self.inner.clone();
                    let attempt = inner.attempt().boxed().shared();
                    *slot = Slot::Pending(attempt.clone());
                    *self.inner.state.write() = ConnectionState::Pending;
                    attempt
                }
            }
        };
        pending.await
    }

    /// Forgets the memoized decision and closes a memoized remote handle.
    pub async fn close(&self) -> HavenResult<()> {
        let previous = {
            let mut slot = self.inner.slot.lock().await;
            *self.inner.state.write() = ConnectionState::Unresolved;
            std::mem::replace(&mut *slot, Slot::Unresolved)
        };

        if let Slot::Resolved(database) = previous {
            log::info!(
                "Closing {} database {}",
                database.backend(),
                database.name()
            );
            database.close()?;
        }
        Ok(())
    }
}

#[cfg(feature = "mongodb")]
fn default_connector() -> Option<Arc<dyn RemoteConnector>> {
    Some(Arc::new(super::MongoConnector::new()))
}

#[cfg(not(feature = "mongodb"))]
fn default_connector() -> Option<Arc<dyn RemoteConnector>> {
    None
}

impl ConnectionManagerInner {
    async fn attempt(self: Arc<Self>) -> Database {
        let outcome = match (&self.connector, self.config.database_uri()) {
            (Some(connector), Some(uri)) => {
                Some(self.connect_remote(connector.clone(), uri.to_string()).await)
            }
            _ => None,
        };

        let (database, state, memoize) = match outcome {
            Some(Ok(database)) => {
                log::info!(
                    "Connected to remote database {}",
                    self.config.database_name()
                );
                (database, ConnectionState::ConnectedRemote, true)
            }
            Some(Err(e)) => {
                log::warn!(
                    "Remote database unavailable, falling back to embedded store: {}",
                    e
                );
                let retry = self.config.retry_remote_after_fallback();
                (self.embedded().await, ConnectionState::ConnectedEmbedded, !retry)
            }
            None => {
                log::info!("No remote database configured, using embedded store");
                (self.embedded().await, ConnectionState::ConnectedEmbedded, true)
            }
        };

        let mut slot = self.slot.lock().await;
        // close() may have reset the slot while the attempt was in flight
        if matches!(*slot, Slot::Pending(_)) {
            *slot = if memoize {
                Slot::Resolved(database.clone())
            } else {
                Slot::Unresolved
            };
            *self.state.write() = state;
        }
        database
    }

    async fn connect_remote(
        &self,
        connector: Arc<dyn RemoteConnector>,
        uri: String,
    ) -> HavenResult<Database> {
        self.remote_attempts.fetch_add(1, Ordering::SeqCst);
        let budget = self.config.attempt_timeout();
        log::info!(
            "Connecting to remote database {} (timeout {:?})",
            self.config.database_name(),
            budget
        );

        let attempt = async {
            let uri = match self.expander.expand(&uri).await {
                Ok(expanded) => expanded,
                Err(e) => {
                    log::warn!("SRV expansion failed, using connection string as given: {}", e);
                    uri.clone()
                }
            };

            let options = ConnectOptions {
                uri,
                database_name: self.config.database_name().to_string(),
                lookup: self.lookup.clone(),
                connect_timeout: self.config.connect_timeout(),
                selection_timeout: self.config.selection_timeout(),
            };
            connector.connect(options).await
        };

        match tokio::time::timeout(budget, attempt).await {
            Ok(Ok(database)) => Ok(database),
            Ok(Err(e)) => {
                log::error!("Remote connection failed: {}", e);
                Err(HavenError::new_with_cause(
                    "Remote connection failed",
                    ErrorKind::ConnectionFailure,
                    e,
                ))
            }
            Err(_) => {
                log::error!("Remote connection timed out after {:?}", budget);
                Err(HavenError::new(
                    &format!("Remote connection timed out after {:?}", budget),
                    ErrorKind::ConnectionFailure,
                ))
            }
        }
    }

    async fn embedded(&self) -> Database {
        let cache = self.store_cache.clone();
        let name = self.config.database_name().to_string();
        let seed_version = self.config.seed_version();
        let seeder = self.config.seeder().cloned();

        // seeders may do blocking work
        let build = {
            let cache = cache.clone();
            let name = name.clone();
            tokio::task::spawn_blocking(move || {
                cache.get_or_build(&name, seed_version, seeder.as_ref())
            })
        };
        match build.await {
            Ok(database) => database,
            Err(e) => {
                log::error!("Building embedded store {} failed: {}", name, e);
                cache.get_or_build(&name, seed_version, None)
            }
        }
    }
}
