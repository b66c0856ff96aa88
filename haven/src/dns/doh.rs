use super::{decode_txt, DohResponse, DohTransport, HttpsTransport, RecordType, SrvRecord};
use crate::common::{DEFAULT_DOH_ENDPOINT, DEFAULT_DOH_TIMEOUT_MS, MAX_CNAME_HOPS};
use crate::errors::{ErrorKind, HavenError, HavenResult};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// DNS-over-HTTPS resolver speaking the DNS JSON protocol.
///
/// Every query is an HTTPS GET `<endpoint>?name=<name>&type=<type>` bounded
/// by a hard timeout. Queries are never retried; a network error, timeout,
/// non-2xx status or malformed body rejects the operation as a whole.
/// A non-zero DNS status (such as NXDOMAIN) is an empty answer set.
///
/// ```rust,ignore
/// let resolver = DohResolver::new("https://cloudflare-dns.com/dns-query", Duration::from_secs(6))?;
/// let hosts = resolver.resolve_srv("_mongodb._tcp.cluster0.abc.mongodb.net").await?;
/// let options = resolver.resolve_txt("cluster0.abc.mongodb.net").await?;
/// let address = resolver.resolve_a("shard-00-00.abc.mongodb.net").await?;
/// ```
#[derive(Clone)]
pub struct DohResolver {
    inner: Arc<DohResolverInner>,
}

struct DohResolverInner {
    endpoint: Url,
    timeout: Duration,
    max_cname_hops: usize,
    transport: Arc<dyn DohTransport>,
}

impl DohResolver {
    /// Creates a resolver using the HTTPS transport.
    pub fn new(endpoint: &str, timeout: Duration) -> HavenResult<Self> {
        let transport = HttpsTransport::new()?;
        DohResolver::with_transport(endpoint, timeout, Arc::new(transport))
    }

    /// Creates a resolver issuing its requests through `transport`.
    pub fn with_transport(
        endpoint: &str,
        timeout: Duration,
        transport: Arc<dyn DohTransport>,
    ) -> HavenResult<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            log::error!("Invalid DNS-over-HTTPS endpoint {}: {}", endpoint, e);
            HavenError::new(
                &format!("Invalid DNS-over-HTTPS endpoint {}: {}", endpoint, e),
                ErrorKind::ConfigurationError,
            )
        })?;

        Ok(DohResolver {
            inner: Arc::new(DohResolverInner {
                endpoint,
                timeout,
                max_cname_hops: MAX_CNAME_HOPS,
                transport,
            }),
        })
    }

    /// Creates a resolver with the public endpoint and default timeout.
    pub fn with_defaults() -> HavenResult<Self> {
        DohResolver::new(
            DEFAULT_DOH_ENDPOINT,
            Duration::from_millis(DEFAULT_DOH_TIMEOUT_MS),
        )
    }

    /// Sets the maximum number of queries `resolve_a` issues while
    /// following a CNAME chain.
    pub fn with_max_cname_hops(self, hops: usize) -> Self {
        let inner = &self.inner;
        DohResolver {
            inner: Arc::new(DohResolverInner {
                endpoint: inner.endpoint.clone(),
                timeout: inner.timeout,
                max_cname_hops: hops.max(1),
                transport: inner.transport.clone(),
            }),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Issues one query and parses its response.
    pub async fn query(&self, name: &str, record_type: RecordType) -> HavenResult<DohResponse> {
        let mut url = self.inner.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("name", name)
            .append_pair("type", record_type.as_str());

        log::debug!("DoH query {} {}", record_type, name);
        let response = tokio::time::timeout(self.inner.timeout, self.inner.transport.get(url))
            .await
            .map_err(|_| {
                log::error!("DoH query {} {} timed out", record_type, name);
                HavenError::new(
                    &format!(
                        "DoH query {} {} timed out after {:?}",
                        record_type, name, self.inner.timeout
                    ),
                    ErrorKind::ResolutionFailure,
                )
            })?
            .map_err(|e| {
                log::error!("DoH query {} {} failed: {}", record_type, name, e);
                HavenError::new_with_cause(
                    &format!("DoH query {} {} failed", record_type, name),
                    ErrorKind::ResolutionFailure,
                    e,
                )
            })?;

        if !(200..300).contains(&response.status) {
            log::error!(
                "DoH query {} {} returned HTTP {}",
                record_type,
                name,
                response.status
            );
            return Err(HavenError::new(
                &format!(
                    "DoH query {} {} returned HTTP {}",
                    record_type, name, response.status
                ),
                ErrorKind::ResolutionFailure,
            ));
        }

        DohResponse::parse(&response.body)
    }

    /// Resolves `host` to an IPv4 address, following CNAME answers.
    ///
    /// At most `max_cname_hops` queries are issued. Returns `None` when the
    /// name has no A record or the chain does not end within the bound.
    pub async fn resolve_a(&self, host: &str) -> HavenResult<Option<Ipv4Addr>> {
        let mut name = host.trim_end_matches('.').to_string();
        for _ in 0..self.inner.max_cname_hops {
            let response = self.query(&name, RecordType::A).await?;

            // servers usually return the whole chain, terminal A record included
            if let Some(address) = response
                .answers(RecordType::A)
                .find_map(|a| a.data.trim().parse::<Ipv4Addr>().ok())
            {
                log::debug!("Resolved {} to {} via DoH", host, address);
                return Ok(Some(address));
            }

            let next = response
                .answers(RecordType::Cname)
                .next()
                .map(|cname| cname.data.trim().trim_end_matches('.').to_string());
            match next {
                Some(next) => {
                    log::debug!("Following CNAME {} -> {}", name, next);
                    name = next;
                }
                None => return Ok(None),
            }
        }

        log::debug!(
            "CNAME chain for {} did not end within {} queries",
            host,
            self.inner.max_cname_hops
        );
        Ok(None)
    }

    /// Resolves the SRV records of `name`, skipping malformed answers.
    pub async fn resolve_srv(&self, name: &str) -> HavenResult<Vec<SrvRecord>> {
        let response = self.query(name, RecordType::Srv).await?;
        let records = response
            .answers(RecordType::Srv)
            .filter_map(|a| {
                let record = SrvRecord::parse(&a.data);
                if record.is_none() {
                    log::debug!("Skipping malformed SRV data {:?} for {}", a.data, name);
                }
                record
            })
            .collect::<Vec<_>>();
        Ok(records)
    }

    /// Resolves the TXT records of `name`, unquoted and with multi-string
    /// records joined.
    pub async fn resolve_txt(&self, name: &str) -> HavenResult<Vec<String>> {
        let response = self.query(name, RecordType::Txt).await?;
        Ok(response
            .answers(RecordType::Txt)
            .map(|a| decode_txt(&a.data))
            .collect())
    }
}
