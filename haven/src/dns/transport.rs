use crate::common::DNS_JSON_CONTENT_TYPE;
use crate::errors::{ErrorKind, HavenError, HavenResult};
use bytes::Bytes;
use http::header::{ACCEPT, HOST};
use http::{Method, Request};
use http_body_util::{BodyExt, Empty};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use url::Url;

/// A raw HTTP response from a DNS-over-HTTPS endpoint.
#[derive(Clone, Debug)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

/// The future returned by a [DohTransport].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = HavenResult<TransportResponse>> + Send + 'a>>;

/// Issues the HTTP GET behind every DNS-over-HTTPS query.
///
/// Implementations send `accept: application/dns-json` and return the raw
/// status and body; interpreting them is left to the resolver. Timeouts are
/// applied by the caller.
pub trait DohTransport: Send + Sync {
    fn get(&self, url: Url) -> TransportFuture<'_>;
}

/// HTTP/1.1 transport over tokio, rustls and hyper.
///
/// Each query opens a fresh connection; `https` endpoints are verified
/// against the bundled web PKI roots. Plain `http` endpoints are accepted for
/// local resolver proxies.
#[derive(Clone)]
pub struct HttpsTransport {
    connector: TlsConnector,
}

impl HttpsTransport {
    pub fn new() -> HavenResult<Self> {
        let mut root_store = RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| {
                log::error!("Failed to configure TLS: {}", e);
                HavenError::new(
                    &format!("Failed to configure TLS: {}", e),
                    ErrorKind::ConfigurationError,
                )
            })?
            .with_root_certificates(root_store)
            .with_no_client_auth();

        Ok(HttpsTransport {
            connector: TlsConnector::from(Arc::new(config)),
        })
    }
}

impl DohTransport for HttpsTransport {
    fn get(&self, url: Url) -> TransportFuture<'_> {
        Box::pin(async move {
            let host = url
                .host_str()
                .ok_or_else(|| {
                    log::error!("DNS-over-HTTPS endpoint {} has no host", url);
                    HavenError::new(
                        &format!("DNS-over-HTTPS endpoint {} has no host", url),
                        ErrorKind::InvalidUri,
                    )
                })?
                .to_string();
            let port = url.port_or_known_default().unwrap_or(443);
            let tcp = TcpStream::connect((host.as_str(), port)).await?;

            match url.scheme() {
                "https" => {
                    let server_name = ServerName::try_from(host.clone()).map_err(|e| {
                        log::error!("Invalid TLS server name {}: {}", host, e);
                        HavenError::new(
                            &format!("Invalid TLS server name {}: {}", host, e),
                            ErrorKind::InvalidUri,
                        )
                    })?;
                    let stream = self.connector.connect(server_name, tcp).await?;
                    send_get(stream, &url, &host).await
                }
                "http" => send_get(tcp, &url, &host).await,
                other => {
                    log::error!("Unsupported DNS-over-HTTPS scheme {}", other);
                    Err(HavenError::new(
                        &format!("Unsupported DNS-over-HTTPS scheme {}", other),
                        ErrorKind::InvalidUri,
                    ))
                }
            }
        })
    }
}

async fn send_get<S>(stream: S, url: &Url, host: &str) -> HavenResult<TransportResponse>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = http1::handshake(TokioIo::new(stream)).await?;
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            log::debug!("DNS-over-HTTPS connection closed with error: {}", e);
        }
    });

    let target = match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    };

    let request = Request::builder()
        .method(Method::GET)
        .uri(target)
        .header(HOST, host)
        .header(ACCEPT, DNS_JSON_CONTENT_TYPE)
        .body(Empty::<Bytes>::new())?;

    let response = sender.send_request(request).await?;
    let status = response.status().as_u16();
    let body = response.into_body().collect().await?.to_bytes();
    Ok(TransportResponse { status, body })
}
