use bytes::Bytes;
use chrono::{DateTime, Utc};
use haven::collection::{Collection, Database, Document};
use haven::connection::{ConnectOptions, Connecting, RemoteConnector};
use haven::dns::{DohResolver, DohTransport, TransportFuture, TransportResponse};
use haven::doc;
use haven::errors::{ErrorKind, HavenError, HavenResult};
use haven::store::EmbeddedDatabase;
use parking_lot::Mutex;
use std::backtrace::Backtrace;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Runs `test` between `before` and `after`, reporting failures and panics
/// with the test context they happened in. `after` runs even when the test
/// fails.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> HavenResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> HavenResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> HavenResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    let start_time = Instant::now();
    let result = std::panic::catch_unwind(|| {
        let backtrace = Backtrace::capture();
        match before() {
            Ok(ctx) => match test(ctx.clone()) {
                Ok(_) => after(ctx)
                    .map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
                Err(e) => {
                    let _ = after(ctx);
                    Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                }
            },
            Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
        }
    });

    let (error, backtrace) = match result {
        Ok(Ok(_)) => return,
        Ok(Err((e, bt))) => (e, bt),
        Err(panic_err) => {
            let message = if let Some(s) = panic_err.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_err.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            (format!("Panic: {}", message), String::new())
        }
    };

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {:?}", start_time.elapsed());
    eprintln!("Error: {}", error);
    if !backtrace.is_empty() && !backtrace.contains("disabled") {
        eprintln!("\nBacktrace:\n{}", backtrace);
    }
    eprintln!("=====================================================\n");
    panic!("{}", error);
}

#[derive(Clone)]
pub struct TestContext {
    name: String,
    db: Database,
}

impl TestContext {
    pub fn new(name: String, db: Database) -> Self {
        Self { name, db }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn db(&self) -> Database {
        self.db.clone()
    }

    pub fn collection(&self, name: &str) -> HavenResult<Collection> {
        self.db.collection(name)
    }
}

pub fn random_name() -> String {
    format!("haven-test-{}", uuid::Uuid::new_v4())
}

/// Creates a context around a fresh embedded database.
pub fn create_test_context() -> HavenResult<TestContext> {
    let name = random_name();
    let db = Database::new(EmbeddedDatabase::new(&name, 1));
    Ok(TestContext::new(name, db))
}

/// Drops every collection the test touched.
pub fn cleanup(ctx: TestContext) -> HavenResult<()> {
    let db = ctx.db();
    for name in db.list_collection_names()? {
        db.collection(&name)?.drop()?;
    }
    db.close()
}

pub fn published_at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

pub fn create_story_docs() -> Vec<Document> {
    let story1 = doc! {
        "slug": "harbor-lights",
        "name": "Harbor Lights",
        "summary": "A lighthouse keeper counts the ships that never arrive",
        "tags": ["sea", "mystery"],
        "status": "published",
        "views": 120,
        "published_at": (published_at("2023-03-14T09:30:00Z")),
        "author": { "name": "Ines", "country": "PT" },
    };

    let story2 = doc! {
        "slug": "glass-orchard",
        "name": "The Glass Orchard",
        "summary": "Fruit that rings like bells",
        "tags": ["fable"],
        "status": "draft",
        "views": 15,
        "published_at": (published_at("2021-11-02T18:00:00Z")),
        "author": { "name": "Tomas", "country": "CZ" },
    };

    let story3 = doc! {
        "slug": "salt-roads",
        "name": "Salt Roads",
        "summary": "Caravans cross a desert that remembers",
        "tags": ["desert", "Mystery"],
        "status": "published",
        "views": 87,
        "published_at": (published_at("2024-07-21T06:45:00Z")),
        "author": { "name": "Amara", "country": "NG" },
    };

    vec![story1, story2, story3]
}

pub fn insert_story_docs(collection: &Collection) -> HavenResult<()> {
    collection.insert_many(&create_story_docs())?;
    Ok(())
}

pub fn is_sorted<T: PartialOrd>(iterable: impl IntoIterator<Item = T>, ascending: bool) -> bool {
    let mut iter = iterable.into_iter();
    if let Some(mut prev) = iter.next() {
        for current in iter {
            let in_order = if ascending {
                prev <= current
            } else {
                prev >= current
            };
            if !in_order {
                return false;
            }
            prev = current;
        }
    }
    true
}

/// An in-memory DNS JSON endpoint. Unknown names answer NXDOMAIN.
#[derive(Default)]
pub struct StaticDohTransport {
    bodies: HashMap<String, (u16, String)>,
    queries: Mutex<Vec<String>>,
}

impl StaticDohTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `name`/`record_type` with the given `(type code, data)` pairs.
    pub fn answer(mut self, name: &str, record_type: &str, answers: &[(u16, &str)]) -> Self {
        let answers = answers
            .iter()
            .map(|(code, data)| {
                serde_json::json!({ "name": format!("{}.", name), "type": code, "TTL": 300, "data": data })
            })
            .collect::<Vec<_>>();
        let body = serde_json::json!({ "Status": 0, "Answer": answers }).to_string();
        self.bodies
            .insert(format!("{}/{}", name, record_type), (200, body));
        self
    }

    /// Answers `name`/`record_type` with a raw HTTP status and body.
    pub fn raw(mut self, name: &str, record_type: &str, status: u16, body: &str) -> Self {
        self.bodies.insert(
            format!("{}/{}", name, record_type),
            (status, body.to_string()),
        );
        self
    }

    /// The `name/type` of every query received, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

impl DohTransport for StaticDohTransport {
    fn get(&self, url: Url) -> TransportFuture<'_> {
        Box::pin(async move {
            let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
            let key = format!(
                "{}/{}",
                params.get("name").cloned().unwrap_or_default(),
                params.get("type").cloned().unwrap_or_default()
            );
            self.queries.lock().push(key.clone());
            let (status, body) = self
                .bodies
                .get(&key)
                .cloned()
                .unwrap_or((200, r#"{"Status":3}"#.to_string()));
            Ok(TransportResponse {
                status,
                body: Bytes::from(body),
            })
        })
    }
}

pub fn doh_resolver(transport: Arc<StaticDohTransport>) -> HavenResult<DohResolver> {
    DohResolver::with_transport(
        "https://dns.test/dns-query",
        Duration::from_millis(500),
        transport,
    )
}

/// A remote connector that never reaches its server. Records every attempt;
/// clones share the records.
#[derive(Clone)]
pub struct DoomedConnector {
    delay: Duration,
    attempts: Arc<AtomicUsize>,
    uris: Arc<Mutex<Vec<String>>>,
}

impl DoomedConnector {
    pub fn new(delay: Duration) -> Self {
        DoomedConnector {
            delay,
            attempts: Arc::new(AtomicUsize::new(0)),
            uris: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn attempts(&self) -> Arc<AtomicUsize> {
        self.attempts.clone()
    }

    pub fn uris(&self) -> Arc<Mutex<Vec<String>>> {
        self.uris.clone()
    }
}

impl RemoteConnector for DoomedConnector {
    fn connect(&self, options: ConnectOptions) -> Connecting {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.uris.lock().push(options.uri.clone());
        let delay = self.delay;
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Err(HavenError::new(
                "Server selection timed out",
                ErrorKind::ConnectionFailure,
            ))
        })
    }
}

