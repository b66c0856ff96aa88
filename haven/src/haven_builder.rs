use crate::connection::{ConnectionManager, RemoteConnector};
use crate::dns::DohTransport;
use crate::errors::{HavenError, HavenResult};
use crate::haven_config::HavenConfig;
use crate::store::{EmbeddedStoreCache, Seeder};
use std::sync::Arc;
use std::time::Duration;

/// Builder for a [ConnectionManager].
///
/// Invalid settings do not fail immediately; the first error is captured and
/// returned from [HavenBuilder::build] or [HavenBuilder::open].
///
/// # Examples
///
/// ```rust,ignore
/// use haven::connection::ConnectionManager;
///
/// let manager = ConnectionManager::builder()
///     .database_uri("mongodb+srv://cluster0.abc.mongodb.net/")
///     .database_name("stories")
///     .seed_version(2)
///     .open()?;
/// ```
#[derive(Default)]
pub struct HavenBuilder {
    error: Option<HavenError>,
    config: HavenConfig,
}

impl HavenBuilder {
    /// Creates a builder with the default configuration.
    pub fn new() -> Self {
        HavenBuilder {
            error: None,
            config: HavenConfig::new(),
        }
    }

    /// Starts from an existing configuration, such as one read with
    /// [HavenConfig::from_env].
    pub fn from_config(config: HavenConfig) -> Self {
        HavenBuilder { error: None, config }
    }

    fn apply<F>(mut self, setter: F) -> Self
    where
        F: FnOnce(&mut HavenConfig) -> HavenResult<()>,
    {
        if self.error.is_none() {
            if let Err(e) = setter(&mut self.config) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Sets the remote connection string (`mongodb://` or `mongodb+srv://`).
    pub fn database_uri(self, uri: &str) -> Self {
        self.apply(|config| config.set_database_uri(uri))
    }

    pub fn database_name(self, name: &str) -> Self {
        self.apply(|config| config.set_database_name(name))
    }

    pub fn doh_endpoint(self, endpoint: &str) -> Self {
        self.apply(|config| config.set_doh_endpoint(endpoint))
    }

    pub fn doh_timeout(self, timeout: Duration) -> Self {
        self.apply(|config| config.set_doh_timeout(timeout))
    }

    pub fn connect_timeout(self, timeout: Duration) -> Self {
        self.apply(|config| config.set_connect_timeout(timeout))
    }

    pub fn selection_timeout(self, timeout: Duration) -> Self {
        self.apply(|config| config.set_selection_timeout(timeout))
    }

    pub fn managed_domain_suffix(self, suffix: &str) -> Self {
        self.apply(|config| config.set_managed_domain_suffix(suffix))
    }

    pub fn srv_service(self, service: &str) -> Self {
        self.apply(|config| config.set_srv_service(service))
    }

    pub fn seed_version(self, version: u32) -> Self {
        self.apply(|config| config.set_seed_version(version))
    }

    pub fn retry_remote_after_fallback(self, retry: bool) -> Self {
        self.apply(|config| {
            config.set_retry_remote_after_fallback(retry);
            Ok(())
        })
    }

    /// Sets the seeder that populates a freshly built embedded store.
    pub fn seeder<S: Seeder + 'static>(self, seeder: S) -> Self {
        self.apply(|config| {
            config.set_seeder(seeder);
            Ok(())
        })
    }

    /// Plugs in the remote database driver.
    pub fn remote_connector<C: RemoteConnector + 'static>(self, connector: C) -> Self {
        self.apply(|config| {
            config.set_remote_connector(connector);
            Ok(())
        })
    }

    pub fn doh_transport(self, transport: Arc<dyn DohTransport>) -> Self {
        self.apply(|config| {
            config.set_doh_transport(transport);
            Ok(())
        })
    }

    pub fn store_cache(self, cache: EmbeddedStoreCache) -> Self {
        self.apply(|config| {
            config.set_store_cache(cache);
            Ok(())
        })
    }

    /// Returns the configuration, or the first error captured while
    /// building it.
    pub fn build(self) -> HavenResult<HavenConfig> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.config),
        }
    }

    /// Builds the configuration and creates a [ConnectionManager] from it.
    pub fn open(self) -> HavenResult<ConnectionManager> {
        let config = self.build()?;
        log::debug!("Opening connection manager with {:?}", config);
        ConnectionManager::new(config)
    }
}
