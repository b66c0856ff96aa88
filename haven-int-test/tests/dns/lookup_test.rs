use haven::dns::{LookupHook, Resolve, ResolvedAddr, Resolving};
use haven::errors::{ErrorKind, HavenError};
use haven_int_test::test_util::{doh_resolver, StaticDohTransport};
use parking_lot::Mutex;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::time::Duration;

const PLATFORM: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 44));

/// Platform resolver that records hosts and answers from a fixed table.
#[derive(Default)]
struct RecordingPlatform {
    hosts: Mutex<Vec<String>>,
    broken: bool,
}

impl Resolve for RecordingPlatform {
    fn resolve(&self, host: &str) -> Resolving {
        self.hosts.lock().push(host.to_string());
        let broken = self.broken;
        Box::pin(async move {
            if broken {
                Err(HavenError::new("platform lookup failed", ErrorKind::ResolutionFailure))
            } else {
                Ok(vec![ResolvedAddr::new(PLATFORM)])
            }
        })
    }
}

fn hook(transport: StaticDohTransport) -> (LookupHook, Arc<StaticDohTransport>, Arc<RecordingPlatform>) {
    let transport = Arc::new(transport);
    let platform = Arc::new(RecordingPlatform::default());
    let hook = LookupHook::with_platform(
        doh_resolver(transport.clone()).unwrap(),
        "mongodb.net",
        platform.clone(),
    );
    (hook, transport, platform)
}

#[tokio::test]
async fn test_managed_host_through_cname_chain() {
    let (hook, transport, platform) = hook(
        StaticDohTransport::new()
            .answer(
                "stories-shard-00-00.k2x9q.mongodb.net",
                "A",
                &[(5, "pl-0-eu-west-1.k2x9q.mongodb.net.")],
            )
            .answer(
                "pl-0-eu-west-1.k2x9q.mongodb.net",
                "A",
                &[(5, "ec2-34-1-2-3.compute.amazonaws.com.")],
            )
            .answer(
                "ec2-34-1-2-3.compute.amazonaws.com",
                "A",
                &[(1, "34.1.2.3")],
            ),
    );

    let addr = hook
        .lookup_one("stories-shard-00-00.k2x9q.mongodb.net")
        .await
        .unwrap();
    assert_eq!(addr.address, IpAddr::V4(Ipv4Addr::new(34, 1, 2, 3)));
    assert_eq!(addr.family, 4);
    assert_eq!(transport.queries().len(), 3);
    assert!(platform.hosts.lock().is_empty());
}

#[tokio::test]
async fn test_managed_host_falls_back_without_a_record() {
    let (hook, transport, platform) = hook(StaticDohTransport::new());

    let addr = hook.lookup_one("missing.mongodb.net").await.unwrap();
    assert_eq!(addr.address, PLATFORM);
    assert_eq!(transport.queries(), vec!["missing.mongodb.net/A"]);
    assert_eq!(*platform.hosts.lock(), vec!["missing.mongodb.net"]);
}

#[tokio::test]
async fn test_managed_host_falls_back_on_doh_error() {
    let (hook, _, platform) = hook(StaticDohTransport::new().raw(
        "node.mongodb.net",
        "A",
        503,
        "unavailable",
    ));

    let addrs = hook.lookup_all("node.mongodb.net").await.unwrap();
    assert_eq!(addrs, vec![ResolvedAddr::new(PLATFORM)]);
    assert_eq!(platform.hosts.lock().len(), 1);
}

#[tokio::test]
async fn test_unmanaged_host_skips_doh() {
    let (hook, transport, platform) = hook(StaticDohTransport::new());

    assert!(!hook.is_managed("db.internal"));
    assert!(!hook.is_managed("mongodb.net.evil.test"));
    let addr = hook.lookup_one("db.internal").await.unwrap();
    assert_eq!(addr.address, PLATFORM);
    assert!(transport.queries().is_empty());
    assert_eq!(*platform.hosts.lock(), vec!["db.internal"]);
}

#[tokio::test]
async fn test_literal_addresses_resolve_directly() {
    let (hook, transport, platform) = hook(StaticDohTransport::new());

    let v4 = hook.lookup_one("10.1.2.3").await.unwrap();
    assert_eq!(v4.address, IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3)));
    let v6 = hook.lookup_one("[::1]").await.unwrap();
    assert_eq!(v6.address, IpAddr::V6(Ipv6Addr::LOCALHOST));
    assert_eq!(v6.family, 6);

    assert!(transport.queries().is_empty());
    assert!(platform.hosts.lock().is_empty());
}

#[tokio::test]
async fn test_platform_failure_surfaces() {
    let transport = Arc::new(StaticDohTransport::new());
    let platform = Arc::new(RecordingPlatform {
        hosts: Mutex::new(Vec::new()),
        broken: true,
    });
    let hook = LookupHook::with_platform(doh_resolver(transport).unwrap(), ".mongodb.net", platform);

    let err = hook.lookup_one("node.mongodb.net").await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::ResolutionFailure);
}

#[tokio::test]
async fn test_hook_as_resolver() {
    let (hook, _, _) = hook(StaticDohTransport::new().answer(
        "node.mongodb.net",
        "A",
        &[(1, "34.9.8.7")],
    ));
    let resolver: Arc<dyn Resolve> = Arc::new(hook);

    let addrs = resolver.resolve("node.mongodb.net.").await.unwrap();
    assert_eq!(addrs.len(), 1);
    assert_eq!(addrs[0].address, IpAddr::V4(Ipv4Addr::new(34, 9, 8, 7)));
}

#[tokio::test]
async fn test_connect_dials_the_address_from_doh() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (hook, transport, platform) = hook(StaticDohTransport::new().answer(
        "shard-00-00.k2x9q.mongodb.net",
        "A",
        &[(1, "127.0.0.1")],
    ));

    let accepting = tokio::spawn(async move { listener.accept().await.map(|(_, peer)| peer) });
    let stream = hook
        .connect("shard-00-00.k2x9q.mongodb.net", port, Duration::from_secs(2))
        .await
        .unwrap();

    assert_eq!(stream.peer_addr().unwrap().ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
    assert_eq!(stream.peer_addr().unwrap().port(), port);
    let peer = accepting.await.unwrap().unwrap();
    assert_eq!(peer, stream.local_addr().unwrap());
    assert_eq!(transport.queries(), vec!["shard-00-00.k2x9q.mongodb.net/A"]);
    assert!(platform.hosts.lock().is_empty());
}

#[tokio::test]
async fn test_connect_to_closed_port_fails() {
    let port = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let (hook, _, _) = hook(StaticDohTransport::new().answer(
        "shard-00-01.k2x9q.mongodb.net",
        "A",
        &[(1, "127.0.0.1")],
    ));

    let err = hook
        .connect("shard-00-01.k2x9q.mongodb.net", port, Duration::from_secs(2))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::ConnectionFailure);
}
