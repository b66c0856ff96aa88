//! Configuration for the resilient data layer.

use crate::common::*;
use crate::connection::RemoteConnector;
use crate::dns::{is_srv_uri, DohTransport};
use crate::errors::{ErrorKind, HavenError, HavenResult};
use crate::store::{EmbeddedStoreCache, Seeder, SeederRef};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Settings for a [`crate::connection::ConnectionManager`].
///
/// Usually built with [`crate::haven_builder::HavenBuilder`] or read from
/// the environment with [`HavenConfig::from_env`].
///
/// # Examples
///
/// ```rust,ignore
/// use haven::haven_config::HavenConfig;
///
/// let mut config = HavenConfig::new();
/// config.set_database_uri("mongodb+srv://cluster0.abc.mongodb.net/app")?;
/// config.set_seed_version(3)?;
/// ```
#[derive(Clone)]
pub struct HavenConfig {
    database_uri: Option<String>,
    database_name: String,
    doh_endpoint: String,
    doh_timeout: Duration,
    connect_timeout: Duration,
    selection_timeout: Duration,
    managed_domain_suffix: String,
    srv_service: String,
    seed_version: u32,
    retry_remote_after_fallback: bool,
    seeder: Option<SeederRef>,
    remote_connector: Option<Arc<dyn RemoteConnector>>,
    doh_transport: Option<Arc<dyn DohTransport>>,
    store_cache: Option<EmbeddedStoreCache>,
}

impl Default for HavenConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl HavenConfig {
    /// Creates a configuration with default values and no remote database.
    pub fn new() -> Self {
        HavenConfig {
            database_uri: None,
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            doh_endpoint: DEFAULT_DOH_ENDPOINT.to_string(),
            doh_timeout: Duration::from_millis(DEFAULT_DOH_TIMEOUT_MS),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            selection_timeout: Duration::from_millis(DEFAULT_SELECTION_TIMEOUT_MS),
            managed_domain_suffix: DEFAULT_MANAGED_DOMAIN_SUFFIX.to_string(),
            srv_service: DEFAULT_SRV_SERVICE.to_string(),
            seed_version: INITIAL_SEED_VERSION,
            retry_remote_after_fallback: true,
            seeder: None,
            remote_connector: None,
            doh_transport: None,
            store_cache: None,
        }
    }

    /// Reads `HAVEN_DATABASE_URI`, `HAVEN_DATABASE_NAME`, `HAVEN_DOH_ENDPOINT`
    /// and `HAVEN_SEED_VERSION`. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if a set variable holds an invalid value.
    pub fn from_env() -> HavenResult<Self> {
        HavenConfig::from_vars(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_vars<F>(lookup: F) -> HavenResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut config = HavenConfig::new();
        if let Some(uri) = var(ENV_DATABASE_URI) {
            config.set_database_uri(&uri)?;
        }
        if let Some(name) = var(ENV_DATABASE_NAME) {
            config.set_database_name(&name)?;
        }
        if let Some(endpoint) = var(ENV_DOH_ENDPOINT) {
            config.set_doh_endpoint(&endpoint)?;
        }
        if let Some(version) = var(ENV_SEED_VERSION) {
            let version = version.parse::<u32>().map_err(|e| {
                log::error!("Invalid {} value {}: {}", ENV_SEED_VERSION, version, e);
                HavenError::new(
                    &format!("Invalid {} value {}: {}", ENV_SEED_VERSION, version, e),
                    ErrorKind::ConfigurationError,
                )
            })?;
            config.set_seed_version(version)?;
        }
        Ok(config)
    }

    /// Returns the remote connection string, if one is configured.
    pub fn database_uri(&self) -> Option<&str> {
        self.database_uri.as_deref()
    }

    /// Sets the remote connection string. Accepts `mongodb://` and
    /// `mongodb+srv://` URIs.
    pub fn set_database_uri(&mut self, uri: &str) -> HavenResult<()> {
        let uri = uri.trim();
        let direct_prefix = format!("{}://", DIRECT_SCHEME);
        let is_direct = uri
            .get(..direct_prefix.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(&direct_prefix));
        if !is_direct && !is_srv_uri(uri) {
            log::error!("Unsupported connection string scheme");
            return Err(HavenError::new(
                &format!(
                    "Connection string must start with {}:// or {}://",
                    DIRECT_SCHEME, SRV_SCHEME
                ),
                ErrorKind::InvalidUri,
            ));
        }
        self.database_uri = Some(uri.to_string());
        Ok(())
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn set_database_name(&mut self, name: &str) -> HavenResult<()> {
        if name.trim().is_empty() {
            log::error!("Database name cannot be empty");
            return Err(HavenError::new(
                "Database name cannot be empty",
                ErrorKind::ConfigurationError,
            ));
        }
        self.database_name = name.trim().to_string();
        Ok(())
    }

    pub fn doh_endpoint(&self) -> &str {
        &self.doh_endpoint
    }

    pub fn set_doh_endpoint(&mut self, endpoint: &str) -> HavenResult<()> {
        let url = Url::parse(endpoint).map_err(|e| {
            log::error!("Invalid DNS-over-HTTPS endpoint {}: {}", endpoint, e);
            HavenError::new(
                &format!("Invalid DNS-over-HTTPS endpoint {}: {}", endpoint, e),
                ErrorKind::ConfigurationError,
            )
        })?;
        if url.scheme() != "https" && url.scheme() != "http" {
            log::error!("DNS-over-HTTPS endpoint must use https");
            return Err(HavenError::new(
                &format!("DNS-over-HTTPS endpoint {} must use https", endpoint),
                ErrorKind::ConfigurationError,
            ));
        }
        self.doh_endpoint = endpoint.to_string();
        Ok(())
    }

    pub fn doh_timeout(&self) -> Duration {
        self.doh_timeout
    }

    pub fn set_doh_timeout(&mut self, timeout: Duration) -> HavenResult<()> {
        self.doh_timeout = non_zero("DoH timeout", timeout)?;
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn set_connect_timeout(&mut self, timeout: Duration) -> HavenResult<()> {
        self.connect_timeout = non_zero("Connect timeout", timeout)?;
        Ok(())
    }

    pub fn selection_timeout(&self) -> Duration {
        self.selection_timeout
    }

    pub fn set_selection_timeout(&mut self, timeout: Duration) -> HavenResult<()> {
        self.selection_timeout = non_zero("Server selection timeout", timeout)?;
        Ok(())
    }

    /// The bound on a whole remote connection attempt.
    pub fn attempt_timeout(&self) -> Duration {
        self.connect_timeout + self.selection_timeout
    }

    pub fn managed_domain_suffix(&self) -> &str {
        &self.managed_domain_suffix
    }

    pub fn set_managed_domain_suffix(&mut self, suffix: &str) -> HavenResult<()> {
        let suffix = suffix.trim().trim_start_matches('.');
        if suffix.is_empty() {
            log::error!("Managed domain suffix cannot be empty");
            return Err(HavenError::new(
                "Managed domain suffix cannot be empty",
                ErrorKind::ConfigurationError,
            ));
        }
        self.managed_domain_suffix = format!(".{}", suffix.to_ascii_lowercase());
        Ok(())
    }

    pub fn srv_service(&self) -> &str {
        &self.srv_service
    }

    pub fn set_srv_service(&mut self, service: &str) -> HavenResult<()> {
        let service = service.trim().trim_start_matches('_');
        if service.is_empty() {
            log::error!("SRV service name cannot be empty");
            return Err(HavenError::new(
                "SRV service name cannot be empty",
                ErrorKind::ConfigurationError,
            ));
        }
        self.srv_service = service.to_string();
        Ok(())
    }

    pub fn seed_version(&self) -> u32 {
        self.seed_version
    }

    /// Sets the expected seed version of the embedded store. A cached store
    /// built for another version is rebuilt on the next fallback.
    pub fn set_seed_version(&mut self, version: u32) -> HavenResult<()> {
        if version < INITIAL_SEED_VERSION {
            log::error!("Seed version must be at least {}", INITIAL_SEED_VERSION);
            return Err(HavenError::new(
                &format!("Seed version must be at least {}", INITIAL_SEED_VERSION),
                ErrorKind::ConfigurationError,
            ));
        }
        self.seed_version = version;
        Ok(())
    }

    /// Whether a later call may retry the remote path after a fallback.
    pub fn retry_remote_after_fallback(&self) -> bool {
        self.retry_remote_after_fallback
    }

    pub fn set_retry_remote_after_fallback(&mut self, retry: bool) {
        self.retry_remote_after_fallback = retry;
    }

    pub fn seeder(&self) -> Option<&SeederRef> {
        self.seeder.as_ref()
    }

    pub fn set_seeder<S: Seeder + 'static>(&mut self, seeder: S) {
        self.seeder = Some(Arc::new(seeder));
    }

    pub fn remote_connector(&self) -> Option<&Arc<dyn RemoteConnector>> {
        self.remote_connector.as_ref()
    }

    pub fn set_remote_connector<C: RemoteConnector + 'static>(&mut self, connector: C) {
        self.remote_connector = Some(Arc::new(connector));
    }

    pub fn doh_transport(&self) -> Option<&Arc<dyn DohTransport>> {
        self.doh_transport.as_ref()
    }

    /// Replaces the HTTPS transport used for DNS-over-HTTPS queries.
    pub fn set_doh_transport(&mut self, transport: Arc<dyn DohTransport>) {
        self.doh_transport = Some(transport);
    }

    pub fn store_cache(&self) -> Option<&EmbeddedStoreCache> {
        self.store_cache.as_ref()
    }

    /// Shares an embedded store cache with other managers.
    pub fn set_store_cache(&mut self, cache: EmbeddedStoreCache) {
        self.store_cache = Some(cache);
    }
}

impl Debug for HavenConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HavenConfig")
            .field("database_uri", &self.database_uri.as_ref().map(|_| "<redacted>"))
            .field("database_name", &self.database_name)
            .field("doh_endpoint", &self.doh_endpoint)
            .field("doh_timeout", &self.doh_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("selection_timeout", &self.selection_timeout)
            .field("managed_domain_suffix", &self.managed_domain_suffix)
            .field("srv_service", &self.srv_service)
            .field("seed_version", &self.seed_version)
            .field("retry_remote_after_fallback", &self.retry_remote_after_fallback)
            .field("has_seeder", &self.seeder.is_some())
            .field("has_remote_connector", &self.remote_connector.is_some())
            .finish()
    }
}

fn non_zero(what: &str, timeout: Duration) -> HavenResult<Duration> {
    if timeout.is_zero() {
        log::error!("{} must be greater than zero", what);
        return Err(HavenError::new(
            &format!("{} must be greater than zero", what),
            ErrorKind::ConfigurationError,
        ));
    }
    Ok(timeout)
}
