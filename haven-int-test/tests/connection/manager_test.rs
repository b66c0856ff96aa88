use haven::collection::{Backend, Collection, Database, DatabaseProvider};
use haven::connection::{ConnectOptions, ConnectionManager, ConnectionState};
use haven::doc;
use haven::errors::{HavenError, HavenResult};
use haven::store::{EmbeddedDatabase, EmbeddedStoreCache};
use haven_int_test::test_util::{DoomedConnector, StaticDohTransport};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DIRECT_URI: &str = "mongodb://db-1.stories.internal:27017/library";

/// A driver-backed database stand-in.
struct RemoteLibrary {
    inner: EmbeddedDatabase,
}

impl DatabaseProvider for RemoteLibrary {
    fn name(&self) -> String {
        self.inner.name()
    }

    fn backend(&self) -> Backend {
        Backend::Remote
    }

    fn collection(&self, name: &str) -> HavenResult<Collection> {
        self.inner.collection(name)
    }

    fn list_collection_names(&self) -> HavenResult<Vec<String>> {
        self.inner.list_collection_names()
    }

    fn close(&self) -> HavenResult<()> {
        Ok(())
    }
}

fn doomed_manager(delay: Duration, retry: bool) -> (ConnectionManager, DoomedConnector) {
    let connector = DoomedConnector::new(delay);
    let probe = connector.clone();
    let manager = ConnectionManager::builder()
        .database_uri(DIRECT_URI)
        .database_name("library")
        .retry_remote_after_fallback(retry)
        .doh_transport(Arc::new(StaticDohTransport::new()))
        .remote_connector(connector)
        .open()
        .unwrap();
    (manager, probe)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_attempt() {
    let (manager, probe) = doomed_manager(Duration::from_millis(100), true);

    let handles = (0..50)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.get_database().await })
        })
        .collect::<Vec<_>>();

    let mut databases = Vec::new();
    for handle in handles {
        databases.push(handle.await.unwrap());
    }

    assert_eq!(probe.attempts().load(Ordering::SeqCst), 1);
    assert_eq!(manager.remote_attempts(), 1);
    let first = &databases[0];
    assert_eq!(first.backend(), Backend::Embedded);
    assert!(databases.iter().all(|db| db.ptr_eq(first)));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_share_one_timed_out_attempt() {
    let connector = DoomedConnector::new(Duration::from_secs(3600));
    let probe = connector.clone();
    let manager = ConnectionManager::builder()
        .database_uri(DIRECT_URI)
        .database_name("library")
        .connect_timeout(Duration::from_millis(1500))
        .selection_timeout(Duration::from_millis(1500))
        .doh_transport(Arc::new(StaticDohTransport::new()))
        .remote_connector(connector)
        .open()
        .unwrap();
    let deadline = manager.config().attempt_timeout();
    assert_eq!(deadline, Duration::from_secs(3));

    let started = tokio::time::Instant::now();
    let handles = (0..50)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.get_database().await })
        })
        .collect::<Vec<_>>();

    let mut databases = Vec::new();
    for handle in handles {
        databases.push(handle.await.unwrap());
    }
    let elapsed = started.elapsed();

    assert!(elapsed >= deadline);
    assert!(elapsed < Duration::from_secs(3600));
    assert_eq!(probe.attempts().load(Ordering::SeqCst), 1);
    let first = &databases[0];
    assert_eq!(first.backend(), Backend::Embedded);
    assert!(databases.iter().all(|db| db.ptr_eq(first)));
    assert_eq!(manager.state(), ConnectionState::ConnectedEmbedded);
}

#[tokio::test]
async fn test_fallback_is_retried_on_next_call() {
    let (manager, probe) = doomed_manager(Duration::from_millis(5), true);

    let first = manager.get_database().await;
    assert_eq!(manager.state(), ConnectionState::ConnectedEmbedded);
    first
        .collection("stories")
        .unwrap()
        .insert_one(&doc! { "slug": "offline-draft" })
        .unwrap();

    let second = manager.get_database().await;
    assert_eq!(probe.attempts().load(Ordering::SeqCst), 2);
    // the embedded store survives between attempts
    assert!(first.ptr_eq(&second));
    assert_eq!(
        second
            .collection("stories")
            .unwrap()
            .count_documents(doc! {})
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_fallback_is_pinned_without_retry() {
    let (manager, probe) = doomed_manager(Duration::from_millis(5), false);

    let first = manager.get_database().await;
    let second = manager.get_database().await;
    assert_eq!(probe.attempts().load(Ordering::SeqCst), 1);
    assert!(first.ptr_eq(&second));
}

#[tokio::test]
async fn test_slow_remote_is_abandoned() {
    let connector = DoomedConnector::new(Duration::from_secs(30));
    let probe = connector.clone();
    let manager = ConnectionManager::builder()
        .database_uri(DIRECT_URI)
        .connect_timeout(Duration::from_millis(40))
        .selection_timeout(Duration::from_millis(40))
        .doh_transport(Arc::new(StaticDohTransport::new()))
        .remote_connector(connector)
        .open()
        .unwrap();

    let started = std::time::Instant::now();
    let database = manager.get_database().await;
    assert_eq!(database.backend(), Backend::Embedded);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(probe.attempts().load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_remote_connection_is_memoized() {
    let uris = Arc::new(Mutex::new(Vec::new()));
    let recorded = uris.clone();
    let manager = ConnectionManager::builder()
        .database_uri(DIRECT_URI)
        .database_name("library")
        .doh_transport(Arc::new(StaticDohTransport::new()))
        .remote_connector(move |options: ConnectOptions| {
            recorded.lock().push(options.uri.clone());
            let name = options.database_name.clone();
            async move {
                Ok::<_, HavenError>(Database::new(RemoteLibrary {
                    inner: EmbeddedDatabase::new(&name, 1),
                }))
            }
        })
        .open()
        .unwrap();

    let first = manager.get_database().await;
    let second = manager.get_database().await;
    assert_eq!(first.backend(), Backend::Remote);
    assert_eq!(first.name(), "library");
    assert!(first.ptr_eq(&second));
    assert_eq!(manager.state(), ConnectionState::ConnectedRemote);
    assert_eq!(*uris.lock(), vec![DIRECT_URI]);

    manager.close().await.unwrap();
    assert_eq!(manager.state(), ConnectionState::Unresolved);
    let third = manager.get_database().await;
    assert!(!third.ptr_eq(&first));
    assert_eq!(uris.lock().len(), 2);
}

#[tokio::test]
async fn test_srv_uri_is_expanded_before_connecting() {
    let transport = StaticDohTransport::new()
        .answer(
            "_mongodb._tcp.stories.k2x9q.mongodb.net",
            "SRV",
            &[(33, "0 0 27017 stories-shard-00-00.k2x9q.mongodb.net.")],
        )
        .answer(
            "stories.k2x9q.mongodb.net",
            "TXT",
            &[(16, "\"replicaSet=atlas-rs0\"")],
        );
    let connector = DoomedConnector::new(Duration::from_millis(1));
    let probe = connector.clone();
    let manager = ConnectionManager::builder()
        .database_uri("mongodb+srv://stories.k2x9q.mongodb.net/library")
        .doh_transport(Arc::new(transport))
        .remote_connector(connector)
        .open()
        .unwrap();

    manager.get_database().await;
    assert_eq!(
        *probe.uris().lock(),
        vec!["mongodb://stories-shard-00-00.k2x9q.mongodb.net:27017/library?replicaSet=atlas-rs0&tls=true"]
    );
}

#[tokio::test]
async fn test_failed_expansion_connects_with_original_uri() {
    let connector = DoomedConnector::new(Duration::from_millis(1));
    let probe = connector.clone();
    let uri = "mongodb+srv://unknown.mongodb.net/library";
    let manager = ConnectionManager::builder()
        .database_uri(uri)
        .doh_transport(Arc::new(StaticDohTransport::new()))
        .remote_connector(connector)
        .open()
        .unwrap();

    let database = manager.get_database().await;
    assert_eq!(database.backend(), Backend::Embedded);
    assert_eq!(*probe.uris().lock(), vec![uri]);
}

#[tokio::test]
async fn test_shared_store_cache_rebuilds_on_seed_version_change() {
    let cache = EmbeddedStoreCache::new();
    let seeded = Arc::new(AtomicUsize::new(0));

    let open = |version: u32| {
        let seeded = seeded.clone();
        ConnectionManager::builder()
            .database_name("library")
            .seed_version(version)
            .store_cache(cache.clone())
            .doh_transport(Arc::new(StaticDohTransport::new()))
            .seeder(move |db: &Database| -> HavenResult<()> {
                seeded.fetch_add(1, Ordering::SeqCst);
                db.collection("stories")?
                    .insert_one(&doc! { "slug": "welcome", "seed": version })?;
                Ok(())
            })
            .open()
            .unwrap()
    };

    let v1 = open(1).get_database().await;
    let v1_again = open(1).get_database().await;
    assert!(v1.ptr_eq(&v1_again));
    assert_eq!(seeded.load(Ordering::SeqCst), 1);

    let v2 = open(2).get_database().await;
    assert!(!v2.ptr_eq(&v1));
    assert_eq!(seeded.load(Ordering::SeqCst), 2);
    assert_eq!(cache.seed_version("library"), Some(2));

    let stories = v2.collection("stories").unwrap();
    let welcome = stories.find_one(doc! { "slug": "welcome" }).unwrap().unwrap();
    assert_eq!(welcome.get("seed").and_then(|v| v.as_i64()), Some(2));
    assert_eq!(stories.count_documents(doc! {}).unwrap(), 1);
}
