//! A [RemoteConnector] backed by the `mongodb` driver.
//!
//! The driver dials sockets with its own resolver, so the lookup hook is
//! applied before the client is built: every seed host is resolved through
//! the hook and must accept a TCP connection within the connect timeout.
//! When none does, the attempt fails at once and the manager falls back.

use super::{ConnectOptions, Connecting, RemoteConnector};
use crate::collection::{
    Backend, Collection, CollectionProvider, CursorSource, Database, DatabaseProvider,
    DeleteResult, Document, DocumentCursor, FindOptions, InsertManyResult, InsertOneResult,
    ReturnDocument, Update, UpdateResult,
};
use crate::common::{SortOrder, Value, DOC_ID};
use crate::errors::{ErrorKind, HavenError, HavenResult};
use crate::filter::Filter;
use crate::index::{IndexDescriptor, IndexOptions};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Bson};
use mongodb::options::{ClientOptions, ServerAddress};
use mongodb::{Client, IndexModel};
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::runtime::{Handle, RuntimeFlavor};

const DEFAULT_PORT: u16 = 27017;
const APP_NAME: &str = "haven";

/// Connects to a MongoDB deployment through the official driver.
#[derive(Clone, Copy, Debug, Default)]
pub struct MongoConnector;

impl MongoConnector {
    pub fn new() -> Self {
        MongoConnector
    }
}

impl RemoteConnector for MongoConnector {
    fn connect(&self, options: ConnectOptions) -> Connecting {
        Box::pin(connect(options))
    }
}

async fn connect(options: ConnectOptions) -> HavenResult<Database> {
    let mut client_options = ClientOptions::parse(&options.uri)
        .await
        .map_err(|e| driver_error("Invalid connection string", ErrorKind::InvalidUri, e))?;

    ensure_reachable(&options, &client_options.hosts).await?;

    client_options.connect_timeout = Some(options.connect_timeout);
    client_options.server_selection_timeout = Some(options.selection_timeout);
    if client_options.app_name.is_none() {
        client_options.app_name = Some(APP_NAME.to_string());
    }

    let client = Client::with_options(client_options)
        .map_err(|e| driver_error("Could not create client", ErrorKind::ConnectionFailure, e))?;
    let database = client.database(&options.database_name);
    database
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| driver_error("Server did not answer ping", ErrorKind::ConnectionFailure, e))?;

    log::info!("MongoDB deployment for {} answered ping", options.database_name);
    Ok(Database::new(MongoDatabase {
        inner: Arc::new(MongoDatabaseInner {
            name: options.database_name,
            database,
            handle: Handle::current(),
        }),
    }))
}

async fn ensure_reachable(options: &ConnectOptions, hosts: &[ServerAddress]) -> HavenResult<()> {
    let probes = hosts
        .iter()
        .filter_map(|address| match address {
            ServerAddress::Tcp { host, port } => Some((host.clone(), port.unwrap_or(DEFAULT_PORT))),
            _ => None,
        })
        .map(|(host, port)| {
            let lookup = options.lookup.clone();
            let timeout = options.connect_timeout;
            Box::pin(async move { lookup.connect(&host, port, timeout).await })
        })
        .collect::<Vec<_>>();

    // a deployment reached through unix sockets only has nothing to probe
    if probes.is_empty() {
        return Ok(());
    }

    futures::future::select_ok(probes).await.map(|_| ())
}

fn driver_error(context: &str, kind: ErrorKind, e: mongodb::error::Error) -> HavenError {
    let message = e.to_string();
    // E11000 is the server's duplicate key error
    let kind = if message.contains("E11000") {
        ErrorKind::DuplicateKey
    } else {
        kind
    };
    log::error!("{}: {}", context, message);
    HavenError::new(&format!("{}: {}", context, message), kind)
}

/// Runs a driver future to completion from the synchronous collection API.
fn block_on<F: IntoFuture>(fallback: &Handle, future: F) -> HavenResult<F::Output> {
    let future = future.into_future();
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::CurrentThread => {
            log::error!("Remote collections cannot block a current-thread runtime");
            Err(HavenError::new(
                "Remote collections need a multi-threaded runtime",
                ErrorKind::InvalidOperation,
            ))
        }
        Ok(handle) => Ok(tokio::task::block_in_place(|| handle.block_on(future))),
        Err(_) => Ok(fallback.block_on(future)),
    }
}

#[derive(Clone)]
struct MongoDatabase {
    inner: Arc<MongoDatabaseInner>,
}

struct MongoDatabaseInner {
    name: String,
    database: mongodb::Database,
    handle: Handle,
}

impl DatabaseProvider for MongoDatabase {
    fn name(&self) -> String {
        self.inner.name.clone()
    }

    fn backend(&self) -> Backend {
        Backend::Remote
    }

    fn collection(&self, name: &str) -> HavenResult<Collection> {
        Ok(Collection::new(MongoCollection {
            name: name.to_string(),
            collection: self.inner.database.collection::<bson::Document>(name),
            handle: self.inner.handle.clone(),
        }))
    }

    fn list_collection_names(&self) -> HavenResult<Vec<String>> {
        block_on(&self.inner.handle, self.inner.database.list_collection_names())?
            .map_err(|e| driver_error("Listing collections failed", ErrorKind::InternalError, e))
    }

    fn close(&self) -> HavenResult<()> {
        // the driver closes its pools once the last client handle is dropped
        log::info!("Released remote database {}", self.inner.name);
        Ok(())
    }
}

struct MongoCollection {
    name: String,
    collection: mongodb::Collection<bson::Document>,
    handle: Handle,
}

impl MongoCollection {
    fn run<F, T>(&self, context: &str, future: F) -> HavenResult<T>
    where
        F: IntoFuture<Output = mongodb::error::Result<T>>,
    {
        block_on(&self.handle, future)?.map_err(|e| {
            driver_error(
                &format!("{} on {}", context, self.name),
                ErrorKind::InternalError,
                e,
            )
        })
    }
}

impl CollectionProvider for MongoCollection {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn create_index(&self, fields: &[&str], options: &IndexOptions) -> HavenResult<String> {
        let mut keys = bson::Document::new();
        for field in fields {
            keys.insert(*field, 1);
        }
        let model = IndexModel::builder()
            .keys(keys)
            .options(
                mongodb::options::IndexOptions::builder()
                    .unique(options.is_unique())
                    .build(),
            )
            .build();
        let created = self.run("Creating index", self.collection.create_index(model))?;
        Ok(created.index_name)
    }

    fn list_indexes(&self) -> HavenResult<Vec<IndexDescriptor>> {
        let models = self.run("Listing indexes", async {
            match self.collection.list_indexes().await {
                Ok(cursor) => cursor.try_collect::<Vec<IndexModel>>().await,
                Err(e) => Err(e),
            }
        })?;
        Ok(models
            .iter()
            .map(|model| {
                let fields = model.keys.keys().map(String::as_str).collect::<Vec<_>>();
                let unique = model.options.as_ref().and_then(|o| o.unique).unwrap_or(false);
                if fields == [DOC_ID] {
                    IndexDescriptor::id_index()
                } else {
                    IndexDescriptor::new(&fields, unique)
                }
            })
            .collect())
    }

    fn insert_one(&self, document: &Document) -> HavenResult<InsertOneResult> {
        let mut document = document.clone();
        let inserted_id = document.ensure_id();
        self.run("Insert", self.collection.insert_one(to_bson_document(&document)))?;
        Ok(InsertOneResult { inserted_id })
    }

    fn insert_many(&self, documents: &[Document]) -> HavenResult<InsertManyResult> {
        let mut inserted_ids = Vec::with_capacity(documents.len());
        let mut batch = Vec::with_capacity(documents.len());
        for document in documents {
            let mut document = document.clone();
            inserted_ids.push(document.ensure_id());
            batch.push(to_bson_document(&document));
        }
        if !batch.is_empty() {
            self.run("Insert", self.collection.insert_many(batch))?;
        }
        Ok(InsertManyResult { inserted_ids })
    }

    fn find_one(&self, filter: &Filter) -> HavenResult<Option<Document>> {
        let found = self.run("Find", self.collection.find_one(to_bson_document(&filter.to_document())))?;
        Ok(found.as_ref().map(from_bson_document))
    }

    fn find(&self, filter: &Filter) -> HavenResult<DocumentCursor> {
        Ok(DocumentCursor::new(RemoteFind {
            name: self.name.clone(),
            collection: self.collection.clone(),
            filter: to_bson_document(&filter.to_document()),
            handle: self.handle.clone(),
        }))
    }

    fn update_one(&self, filter: &Filter, update: &Update) -> HavenResult<UpdateResult> {
        let result = self.run(
            "Update",
            self.collection.update_one(
                to_bson_document(&filter.to_document()),
                to_bson_document(&update.to_document()),
            ),
        )?;
        Ok(UpdateResult {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        })
    }

    fn delete_one(&self, filter: &Filter) -> HavenResult<DeleteResult> {
        let result = self.run(
            "Delete",
            self.collection.delete_one(to_bson_document(&filter.to_document())),
        )?;
        Ok(DeleteResult {
            deleted_count: result.deleted_count,
        })
    }

    fn find_one_and_update(
        &self,
        filter: &Filter,
        update: &Update,
        return_document: ReturnDocument,
    ) -> HavenResult<Option<Document>> {
        let return_document = match return_document {
            ReturnDocument::Before => mongodb::options::ReturnDocument::Before,
            ReturnDocument::After => mongodb::options::ReturnDocument::After,
        };
        let found = self.run(
            "Find and update",
            self.collection
                .find_one_and_update(
                    to_bson_document(&filter.to_document()),
                    to_bson_document(&update.to_document()),
                )
                .return_document(return_document),
        )?;
        Ok(found.as_ref().map(from_bson_document))
    }

    fn count_documents(&self, filter: &Filter) -> HavenResult<u64> {
        self.run(
            "Count",
            self.collection.count_documents(to_bson_document(&filter.to_document())),
        )
    }

    fn drop_collection(&self) -> HavenResult<()> {
        self.run("Drop", self.collection.drop())
    }
}

/// Pushes sort, skip and limit down to the server.
struct RemoteFind {
    name: String,
    collection: mongodb::Collection<bson::Document>,
    filter: bson::Document,
    handle: Handle,
}

impl CursorSource for RemoteFind {
    fn fetch(self: Box<Self>, options: &FindOptions) -> HavenResult<Vec<Document>> {
        let mut find = self.collection.find(self.filter.clone()).skip(options.skip_count());
        if let Some(spec) = options.sort_spec() {
            let direction = match spec.order() {
                SortOrder::Ascending => 1,
                SortOrder::Descending => -1,
            };
            let mut sort = bson::Document::new();
            sort.insert(spec.field(), direction);
            find = find.sort(sort);
        }
        if let Some(limit) = options.limit_count() {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let found = block_on(&self.handle, async {
            match find.await {
                Ok(cursor) => cursor.try_collect::<Vec<bson::Document>>().await,
                Err(e) => Err(e),
            }
        })?
        .map_err(|e| driver_error(&format!("Find on {}", self.name), ErrorKind::InternalError, e))?;
        log::debug!("Fetched {} documents from {}", found.len(), self.name);
        Ok(found.iter().map(from_bson_document).collect())
    }
}

pub(crate) fn to_bson_document(document: &Document) -> bson::Document {
    let mut converted = bson::Document::new();
    for (key, value) in document.iter() {
        converted.insert(key.clone(), to_bson(value));
    }
    converted
}

pub(crate) fn to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::I64(i) => Bson::Int64(*i),
        Value::F64(f) => Bson::Double(*f),
        Value::String(s) => Bson::String(s.clone()),
        Value::Array(items) => Bson::Array(items.iter().map(to_bson).collect()),
        Value::Document(doc) => Bson::Document(to_bson_document(doc)),
        // snowflake ids fit in 63 bits
        Value::Id(id) => Bson::Int64(id.id_value() as i64),
        Value::DateTime(instant) => Bson::DateTime(bson::DateTime::from_millis(instant.timestamp_millis())),
    }
}

pub(crate) fn from_bson_document(document: &bson::Document) -> Document {
    let mut converted = Document::new();
    for (key, value) in document.iter() {
        converted.insert_raw(key.clone(), from_bson(value));
    }
    converted
}

pub(crate) fn from_bson(value: &Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(i) => Value::I64(i64::from(*i)),
        Bson::Int64(i) => Value::I64(*i),
        Bson::Double(f) => Value::F64(*f),
        Bson::String(s) => Value::String(s.clone()),
        Bson::Array(items) => Value::Array(items.iter().map(from_bson).collect()),
        Bson::Document(doc) => Value::Document(from_bson_document(doc)),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(instant) => DateTime::<Utc>::from_timestamp_millis(instant.timestamp_millis())
            .map(Value::DateTime)
            .unwrap_or(Value::Null),
        other => Value::String(other.to_string()),
    }
}
