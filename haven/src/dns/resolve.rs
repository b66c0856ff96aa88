use crate::errors::HavenResult;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::Arc;

/// One resolved address with its address family (4 or 6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResolvedAddr {
    pub address: IpAddr,
    pub family: u8,
}

impl ResolvedAddr {
    pub fn new(address: IpAddr) -> Self {
        let family = if address.is_ipv4() { 4 } else { 6 };
        ResolvedAddr { address, family }
    }
}

impl From<IpAddr> for ResolvedAddr {
    fn from(address: IpAddr) -> Self {
        ResolvedAddr::new(address)
    }
}

impl Display for ResolvedAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (IPv{})", self.address, self.family)
    }
}

/// The future returned by a [Resolve] implementation.
pub type Resolving = Pin<Box<dyn Future<Output = HavenResult<Vec<ResolvedAddr>>> + Send>>;

/// Host name resolution as consumed by socket layers.
///
/// A successful resolution yields at least one address.
pub trait Resolve: Send + Sync {
    fn resolve(&self, host: &str) -> Resolving;
}

impl<R: Resolve + ?Sized> Resolve for Arc<R> {
    fn resolve(&self, host: &str) -> Resolving {
        (**self).resolve(host)
    }
}

/// Parses `host` as a literal IP address, accepting bracketed IPv6.
pub(crate) fn literal_address(host: &str) -> Option<IpAddr> {
    let trimmed = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    trimmed.parse::<IpAddr>().ok()
}
