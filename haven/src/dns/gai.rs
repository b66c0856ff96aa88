use super::{ResolvedAddr, Resolve, Resolving};
use crate::errors::{ErrorKind, HavenError};
use std::net::ToSocketAddrs;

/// Platform resolver using `getaddrinfo` on tokio's blocking pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct GaiResolver;

impl GaiResolver {
    pub fn new() -> Self {
        GaiResolver
    }
}

impl Resolve for GaiResolver {
    fn resolve(&self, host: &str) -> Resolving {
        let host = host.to_string();
        Box::pin(async move {
            let lookup_host = host.clone();
            let addrs = tokio::task::spawn_blocking(move || {
                (lookup_host.as_str(), 0u16)
                    .to_socket_addrs()
                    .map(|iter| iter.collect::<Vec<_>>())
            })
            .await
            .map_err(|e| {
                log::error!("Platform resolution task for {} failed: {}", host, e);
                HavenError::new(
                    &format!("Platform resolution task for {} failed: {}", host, e),
                    ErrorKind::InternalError,
                )
            })?
            .map_err(|e| {
                log::error!("Platform resolution of {} failed: {}", host, e);
                HavenError::new(
                    &format!("Platform resolution of {} failed: {}", host, e),
                    ErrorKind::ResolutionFailure,
                )
            })?;

            let mut resolved: Vec<ResolvedAddr> = Vec::with_capacity(addrs.len());
            for addr in addrs {
                let entry = ResolvedAddr::new(addr.ip());
                if !resolved.contains(&entry) {
                    resolved.push(entry);
                }
            }

            if resolved.is_empty() {
                log::error!("Platform resolution of {} returned no addresses", host);
                return Err(HavenError::new(
                    &format!("Platform resolution of {} returned no addresses", host),
                    ErrorKind::ResolutionFailure,
                ));
            }

            log::debug!("Resolved {} to {} address(es) via getaddrinfo", host, resolved.len());
            Ok(resolved)
        })
    }
}
