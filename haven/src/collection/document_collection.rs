use super::{
    DeleteResult, Document, DocumentCursor, InsertManyResult, InsertOneResult, IntoUpdate,
    ReturnDocument, Update, UpdateResult,
};
use crate::errors::HavenResult;
use crate::filter::{Filter, IntoFilter};
use crate::index::{IndexDescriptor, IndexOptions};
use std::sync::Arc;

/// Trait defining the interface for a document collection.
///
/// The embedded store implements it, and a remote driver adapter implements
/// it on top of its own client. Filters and updates arrive already parsed.
/// Every document crossing this boundary is an independent copy: inserted
/// documents are copied in and returned documents are copied out.
pub trait CollectionProvider: Send + Sync {
    /// Returns the name of this collection.
    fn name(&self) -> String;

    /// Declares an index over `fields` and returns its name, e.g.
    /// `slug_1` or `story_id_1_locale_1`.
    ///
    /// Re-declaring an index over the same fields returns the existing name.
    /// Declaring a unique index over documents that already violate it fails
    /// with [crate::errors::ErrorKind::DuplicateKey].
    fn create_index(&self, fields: &[&str], options: &IndexOptions) -> HavenResult<String>;

    /// Lists the declared indexes, including the implicit `_id_` index.
    fn list_indexes(&self) -> HavenResult<Vec<IndexDescriptor>>;

    /// Inserts a copy of `document`, assigning an `_id` if it has none.
    fn insert_one(&self, document: &Document) -> HavenResult<InsertOneResult>;

    /// Inserts copies of `documents`. Either all are inserted or none are.
    fn insert_many(&self, documents: &[Document]) -> HavenResult<InsertManyResult>;

    /// Returns a copy of the first matching document.
    fn find_one(&self, filter: &Filter) -> HavenResult<Option<Document>>;

    /// Returns a cursor over copies of all matching documents.
    fn find(&self, filter: &Filter) -> HavenResult<DocumentCursor>;

    /// Applies `update` to the first matching document.
    fn update_one(&self, filter: &Filter, update: &Update) -> HavenResult<UpdateResult>;

    /// Deletes the first matching document.
    fn delete_one(&self, filter: &Filter) -> HavenResult<DeleteResult>;

    /// Applies `update` to the first matching document and returns the
    /// requested snapshot of it.
    fn find_one_and_update(
        &self,
        filter: &Filter,
        update: &Update,
        return_document: ReturnDocument,
    ) -> HavenResult<Option<Document>>;

    /// Counts matching documents.
    fn count_documents(&self, filter: &Filter) -> HavenResult<u64>;

    /// Removes every document and index declaration.
    fn drop_collection(&self) -> HavenResult<()>;
}

/// A handle to a named collection, backed by either the embedded store or a
/// remote driver.
///
/// Query and update arguments accept either query documents or parsed
/// [Filter]/[Update] values; documents are parsed once here.
///
/// ```rust,ignore
/// let stories = db.collection("stories")?;
/// stories.create_index(&["slug"], &unique_index())?;
/// stories.insert_one(&doc! { "slug": "harbor-lights", "status": "draft" })?;
/// stories.update_one(
///     &doc! { "slug": "harbor-lights" },
///     &doc! { "$set": { "status": "published" } },
/// )?;
/// ```
#[derive(Clone)]
pub struct Collection {
    inner: Arc<dyn CollectionProvider>,
}

impl Collection {
    /// Creates a new `Collection` from a provider implementation.
    pub fn new<T: CollectionProvider + 'static>(inner: T) -> Self {
        Collection {
            inner: Arc::new(inner),
        }
    }

    pub fn from_provider(inner: Arc<dyn CollectionProvider>) -> Self {
        Collection { inner }
    }

    pub fn name(&self) -> String {
        self.inner.name()
    }

    pub fn create_index(&self, fields: &[&str], options: &IndexOptions) -> HavenResult<String> {
        self.inner.create_index(fields, options)
    }

    pub fn list_indexes(&self) -> HavenResult<Vec<IndexDescriptor>> {
        self.inner.list_indexes()
    }

    pub fn insert_one(&self, document: &Document) -> HavenResult<InsertOneResult> {
        self.inner.insert_one(document)
    }

    pub fn insert_many(&self, documents: &[Document]) -> HavenResult<InsertManyResult> {
        self.inner.insert_many(documents)
    }

    pub fn find_one<F: IntoFilter>(&self, filter: F) -> HavenResult<Option<Document>> {
        self.inner.find_one(&filter.into_filter()?)
    }

    pub fn find<F: IntoFilter>(&self, filter: F) -> HavenResult<DocumentCursor> {
        self.inner.find(&filter.into_filter()?)
    }

    pub fn update_one<F: IntoFilter, U: IntoUpdate>(
        &self,
        filter: F,
        update: U,
    ) -> HavenResult<UpdateResult> {
        let filter = filter.into_filter()?;
        let update = update.into_update()?;
        self.inner.update_one(&filter, &update)
    }

    pub fn delete_one<F: IntoFilter>(&self, filter: F) -> HavenResult<DeleteResult> {
        self.inner.delete_one(&filter.into_filter()?)
    }

    pub fn find_one_and_update<F: IntoFilter, U: IntoUpdate>(
        &self,
        filter: F,
        update: U,
        return_document: ReturnDocument,
    ) -> HavenResult<Option<Document>> {
        let filter = filter.into_filter()?;
        let update = update.into_update()?;
        self.inner.find_one_and_update(&filter, &update, return_document)
    }

    pub fn count_documents<F: IntoFilter>(&self, filter: F) -> HavenResult<u64> {
        self.inner.count_documents(&filter.into_filter()?)
    }

    /// Removes every document and index declaration.
    pub fn drop(&self) -> HavenResult<()> {
        self.inner.drop_collection()
    }

    /// Returns the underlying provider.
    pub fn provider(&self) -> &Arc<dyn CollectionProvider> {
        &self.inner
    }
}
