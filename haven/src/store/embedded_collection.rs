use crate::collection::{
    CollectionProvider, DeleteResult, Document, DocumentCursor, InsertManyResult,
    InsertOneResult, ReturnDocument, Update, UpdateResult,
};
use crate::common::Value;
use crate::errors::{ErrorKind, HavenError, HavenResult};
use crate::filter::Filter;
use crate::index::{IndexDescriptor, IndexOptions, UniqueIndex};
use parking_lot::RwLock;
use std::sync::Arc;

/// In-process implementation of a document collection.
///
/// Documents are kept in insertion order. Every document crossing the
/// boundary is deep-copied: arguments are cloned on the way in and results
/// are cloned on the way out, so callers never share state with the store.
///
/// One read-write lock guards the documents and indexes together, making
/// each operation atomic with respect to the others. Unique indexes,
/// including the implicit one on `_id`, are checked before any write is
/// applied, so a rejected write leaves the collection untouched.
#[derive(Clone)]
pub struct EmbeddedCollection {
    inner: Arc<EmbeddedCollectionInner>,
}

impl EmbeddedCollection {
    pub fn new(name: &str) -> Self {
        EmbeddedCollection {
            inner: Arc::new(EmbeddedCollectionInner::new(name)),
        }
    }
}

impl CollectionProvider for EmbeddedCollection {
    fn name(&self) -> String {
        self.inner.name.clone()
    }

    fn create_index(&self, fields: &[&str], options: &IndexOptions) -> HavenResult<String> {
        self.inner.create_index(fields, options)
    }

    fn list_indexes(&self) -> HavenResult<Vec<IndexDescriptor>> {
        Ok(self.inner.list_indexes())
    }

    fn insert_one(&self, document: &Document) -> HavenResult<InsertOneResult> {
        let inserted_id = self.inner.insert(document.clone())?;
        Ok(InsertOneResult { inserted_id })
    }

    fn insert_many(&self, documents: &[Document]) -> HavenResult<InsertManyResult> {
        let inserted_ids = self.inner.insert_all(documents.to_vec())?;
        Ok(InsertManyResult { inserted_ids })
    }

    fn find_one(&self, filter: &Filter) -> HavenResult<Option<Document>> {
        Ok(self.inner.find_first(filter))
    }

    fn find(&self, filter: &Filter) -> HavenResult<DocumentCursor> {
        Ok(DocumentCursor::from_documents(self.inner.find_all(filter)))
    }

    fn update_one(&self, filter: &Filter, update: &Update) -> HavenResult<UpdateResult> {
        let outcome = self.inner.update_first(filter, update)?;
        Ok(match outcome {
            None => UpdateResult::default(),
            Some(outcome) => UpdateResult {
                matched_count: 1,
                modified_count: if outcome.modified { 1 } else { 0 },
            },
        })
    }

    fn delete_one(&self, filter: &Filter) -> HavenResult<DeleteResult> {
        let deleted = self.inner.delete_first(filter);
        Ok(DeleteResult {
            deleted_count: if deleted { 1 } else { 0 },
        })
    }

    fn find_one_and_update(
        &self,
        filter: &Filter,
        update: &Update,
        return_document: ReturnDocument,
    ) -> HavenResult<Option<Document>> {
        let outcome = self.inner.update_first(filter, update)?;
        Ok(outcome.map(|outcome| match return_document {
            ReturnDocument::Before => outcome.before,
            ReturnDocument::After => outcome.after,
        }))
    }

    fn count_documents(&self, filter: &Filter) -> HavenResult<u64> {
        Ok(self.inner.count(filter))
    }

    fn drop_collection(&self) -> HavenResult<()> {
        self.inner.clear();
        Ok(())
    }
}

struct UpdateOutcome {
    before: Document,
    after: Document,
    modified: bool,
}

struct CollectionState {
    documents: Vec<Document>,
    // declaration order, excluding the implicit _id index
    declared: Vec<IndexDescriptor>,
    // the _id index first, then every declared unique index
    unique: Vec<UniqueIndex>,
}

impl CollectionState {
    fn new() -> Self {
        CollectionState {
            documents: Vec::new(),
            declared: Vec::new(),
            unique: vec![UniqueIndex::new(IndexDescriptor::id_index())],
        }
    }

    fn position(&self, filter: &Filter) -> Option<usize> {
        self.documents.iter().position(|doc| filter.matches(doc))
    }
}

struct EmbeddedCollectionInner {
    name: String,
    state: RwLock<CollectionState>,
}

impl EmbeddedCollectionInner {
    fn new(name: &str) -> Self {
        EmbeddedCollectionInner {
            name: name.to_string(),
            state: RwLock::new(CollectionState::new()),
        }
    }

    fn create_index(&self, fields: &[&str], options: &IndexOptions) -> HavenResult<String> {
        if fields.is_empty() || fields.iter().any(|f| f.is_empty()) {
            log::error!("Index fields must be non-empty for collection {}", self.name);
            return Err(HavenError::new(
                "Index fields must be non-empty",
                ErrorKind::InvalidOperation,
            ));
        }

        let mut state = self.state.write();
        if let Some(existing) = state.declared.iter().find(|d| d.covers(fields)) {
            if existing.is_unique() != options.is_unique() {
                log::error!(
                    "Index {} already exists on {} with different options",
                    existing.name(),
                    self.name
                );
                return Err(HavenError::new(
                    &format!("Index {} already exists with different options", existing.name()),
                    ErrorKind::InvalidOperation,
                ));
            }
            return Ok(existing.name().to_string());
        }

        let descriptor = IndexDescriptor::new(fields, options.is_unique());
        if descriptor.is_unique() {
            let index = UniqueIndex::build(descriptor.clone(), &self.name, &state.documents)?;
            state.unique.push(index);
        }

        log::debug!("Created index {} on collection {}", descriptor.name(), self.name);
        let name = descriptor.name().to_string();
        state.declared.push(descriptor);
        Ok(name)
    }

    fn list_indexes(&self) -> Vec<IndexDescriptor> {
        let state = self.state.read();
        let mut indexes = Vec::with_capacity(state.declared.len() + 1);
        indexes.push(IndexDescriptor::id_index());
        indexes.extend(state.declared.iter().cloned());
        indexes
    }

    fn insert(&self, mut document: Document) -> HavenResult<Value> {
        let id = document.ensure_id();
        let mut state = self.state.write();
        for index in state.unique.iter() {
            index.check(&self.name, &document, None)?;
        }
        for index in state.unique.iter_mut() {
            index.add(&document);
        }
        state.documents.push(document);
        Ok(id)
    }

    fn insert_all(&self, documents: Vec<Document>) -> HavenResult<Vec<Value>> {
        let mut state = self.state.write();
        let start = state.documents.len();
        let mut ids = Vec::with_capacity(documents.len());

        for mut document in documents {
            let id = document.ensure_id();
            let checked = state
                .unique
                .iter()
                .try_for_each(|index| index.check(&self.name, &document, None));

            if let Err(e) = checked {
                // roll back the part of the batch already applied
                let inserted: Vec<Document> = state.documents.drain(start..).collect();
                for doc in inserted.iter() {
                    for index in state.unique.iter_mut() {
                        index.remove(doc);
                    }
                }
                return Err(e);
            }

            for index in state.unique.iter_mut() {
                index.add(&document);
            }
            state.documents.push(document);
            ids.push(id);
        }
        Ok(ids)
    }

    fn find_first(&self, filter: &Filter) -> Option<Document> {
        let state = self.state.read();
        state.documents.iter().find(|doc| filter.matches(doc)).cloned()
    }

    fn find_all(&self, filter: &Filter) -> Vec<Document> {
        let state = self.state.read();
        state
            .documents
            .iter()
            .filter(|doc| filter.matches(doc))
            .cloned()
            .collect()
    }

    fn count(&self, filter: &Filter) -> u64 {
        let state = self.state.read();
        state.documents.iter().filter(|doc| filter.matches(doc)).count() as u64
    }

    fn update_first(&self, filter: &Filter, update: &Update) -> HavenResult<Option<UpdateOutcome>> {
        let mut state = self.state.write();
        let position = match state.position(filter) {
            Some(position) => position,
            None => return Ok(None),
        };

        let before = state.documents[position].clone();
        let mut after = before.clone();
        let modified = update.apply(&mut after)?;
        if !modified {
            return Ok(Some(UpdateOutcome {
                before,
                after,
                modified,
            }));
        }

        for index in state.unique.iter() {
            index.check(&self.name, &after, before.id())?;
        }
        for index in state.unique.iter_mut() {
            index.remove(&before);
            index.add(&after);
        }
        state.documents[position] = after.clone();

        Ok(Some(UpdateOutcome {
            before,
            after,
            modified,
        }))
    }

    fn delete_first(&self, filter: &Filter) -> bool {
        let mut state = self.state.write();
        match state.position(filter) {
            Some(position) => {
                let removed = state.documents.remove(position);
                for index in state.unique.iter_mut() {
                    index.remove(&removed);
                }
                true
            }
            None => false,
        }
    }

    fn clear(&self) {
        let mut state = self.state.write();
        *state = CollectionState::new();
        log::debug!("Dropped collection {}", self.name);
    }
}
