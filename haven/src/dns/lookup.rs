use super::resolve::literal_address;
use super::{DohResolver, GaiResolver, ResolvedAddr, Resolve, Resolving};
use crate::common::DEFAULT_MANAGED_DOMAIN_SUFFIX;
use crate::errors::{ErrorKind, HavenError, HavenResult};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

/// Host resolution for the remote driver's sockets.
///
/// Hosts under the managed-domain suffix are resolved through DNS-over-HTTPS
/// first; on any DoH failure, or when no A record is found, they fall back to
/// the platform resolver. Every other host goes straight to the platform
/// resolver. Literal IP addresses are returned as-is.
#[derive(Clone)]
pub struct LookupHook {
    inner: Arc<LookupHookInner>,
}

struct LookupHookInner {
    doh: DohResolver,
    platform: Arc<dyn Resolve>,
    managed_suffix: String,
}

impl LookupHook {
    pub fn new(doh: DohResolver, managed_suffix: &str) -> Self {
        LookupHook::with_platform(doh, managed_suffix, Arc::new(GaiResolver::new()))
    }

    /// Creates a hook with a custom platform resolver.
    pub fn with_platform(doh: DohResolver, managed_suffix: &str, platform: Arc<dyn Resolve>) -> Self {
        let suffix = managed_suffix.trim().to_ascii_lowercase();
        let managed_suffix = if suffix.is_empty() {
            DEFAULT_MANAGED_DOMAIN_SUFFIX.to_string()
        } else if suffix.starts_with('.') {
            suffix
        } else {
            format!(".{}", suffix)
        };

        LookupHook {
            inner: Arc::new(LookupHookInner {
                doh,
                platform,
                managed_suffix,
            }),
        }
    }

    pub fn managed_suffix(&self) -> &str {
        &self.inner.managed_suffix
    }

    /// Checks whether `host` is under the managed-domain suffix.
    pub fn is_managed(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        host.ends_with(&self.inner.managed_suffix)
    }

    /// Resolves `host` to its first address.
    pub async fn lookup_one(&self, host: &str) -> HavenResult<ResolvedAddr> {
        let addrs = self.resolve_host(host).await?;
        addrs.into_iter().next().ok_or_else(|| {
            log::error!("No address found for {}", host);
            HavenError::new(
                &format!("No address found for {}", host),
                ErrorKind::ResolutionFailure,
            )
        })
    }

    /// Resolves `host` to all of its addresses.
    pub async fn lookup_all(&self, host: &str) -> HavenResult<Vec<ResolvedAddr>> {
        self.resolve_host(host).await
    }

    /// Opens a TCP connection to `host:port` through this hook: the host is
    /// resolved as in [LookupHook::lookup_all] and each address is tried in
    /// turn, each bounded by `timeout`.
    pub async fn connect(&self, host: &str, port: u16, timeout: Duration) -> HavenResult<TcpStream> {
        let addrs = self.resolve_host(host).await?;

        let mut last_error = None;
        for addr in addrs {
            let target = SocketAddr::new(addr.address, port);
            match tokio::time::timeout(timeout, TcpStream::connect(target)).await {
                Ok(Ok(stream)) => {
                    log::debug!("Connected to {} at {}", host, target);
                    return Ok(stream);
                }
                Ok(Err(e)) => {
                    log::debug!("Connecting to {} at {} failed: {}", host, target, e);
                    last_error = Some(e.to_string());
                }
                Err(_) => {
                    log::debug!("Connecting to {} at {} timed out", host, target);
                    last_error = Some(format!("timed out after {:?}", timeout));
                }
            }
        }

        let reason = last_error.unwrap_or_else(|| "no address".to_string());
        log::error!("Could not connect to {}:{}: {}", host, port, reason);
        Err(HavenError::new(
            &format!("Could not connect to {}:{}: {}", host, port, reason),
            ErrorKind::ConnectionFailure,
        ))
    }

    async fn resolve_host(&self, host: &str) -> HavenResult<Vec<ResolvedAddr>> {
        if let Some(address) = literal_address(host) {
            return Ok(vec![ResolvedAddr::new(address)]);
        }

        if self.is_managed(host) {
            match self.inner.doh.resolve_a(host).await {
                Ok(Some(address)) => {
                    log::debug!("Resolved managed host {} to {} via DoH", host, address);
                    return Ok(vec![ResolvedAddr::new(IpAddr::V4(address))]);
                }
                Ok(None) => {
                    log::warn!("DoH found no A record for {}, using platform resolver", host);
                }
                Err(e) => {
                    log::warn!("DoH lookup of {} failed, using platform resolver: {}", host, e);
                }
            }
        }

        self.inner.platform.resolve(host).await
    }
}

impl Resolve for LookupHook {
    fn resolve(&self, host: &str) -> Resolving {
        let hook = self.clone();
        let host = host.to_string();
        Box::pin(async move { hook.resolve_host(&host).await })
    }
}
