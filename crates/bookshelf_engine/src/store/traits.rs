/* 📖 # Why create a DocumentStore trait?

The handlers only need the collection contract: list, get, insert, update and remove,
keyed by collection and integer id. Whether documents live in memory only or are
written back to a JSON file after every change is the store's business.

1. **InMemoryStore**: isolated state for tests, and the working set of the file store
2. **JsonFileStore**: the persisted database the binary serves

Every server gets its own injected store instance, so tests never share state.
*/

use std::sync::Arc;

use parking_lot::RwLock;

use bookshelf_base::BookshelfResult;

use crate::document::{Collection, Document, DocumentId};

/// Trait for document storage implementations.
///
/// "Not found" is never an error: lookups and mutations by id return `Ok(None)`.
/// Errors are reserved for failures of the store itself, such as a failed write.
pub trait DocumentStore: Send + Sync + 'static {
    /// All documents of a collection, in insertion order.
    fn list(&self, collection: Collection) -> BookshelfResult<Vec<Document>>;

    /// Look up a document by id.
    fn get(&self, collection: Collection, id: DocumentId) -> BookshelfResult<Option<Document>>;

    /// Assign the next id, store `fields` under it and return the stored document.
    ///
    /// An `id` field in `fields` is ignored.
    fn insert(&mut self, collection: Collection, fields: Document) -> BookshelfResult<Document>;

    /// Shallow-merge `patch` over the document with the given id.
    ///
    /// # Returns
    /// * `Ok(Some(doc))` - The merged document
    /// * `Ok(None)` - If no document with that id exists
    fn update(
        &mut self,
        collection: Collection,
        id: DocumentId,
        patch: &Document,
    ) -> BookshelfResult<Option<Document>>;

    /// Remove a document by id, returning it if it existed.
    fn remove(&mut self, collection: Collection, id: DocumentId)
    -> BookshelfResult<Option<Document>>;

    /// Number of documents in a collection.
    fn len(&self, collection: Collection) -> BookshelfResult<usize>;
}

/// A thread-safe handle to a document store.
///
/// Cloning is cheap (Arc). Reads share the lock; every mutation takes the write lock, so
/// mutations are serialized across all collections and id assignment never races.
#[derive(Clone)]
pub struct StoreHandle(Arc<RwLock<dyn DocumentStore>>);

impl StoreHandle {
    /// Create a new StoreHandle wrapping the given store implementation.
    pub fn new<S: DocumentStore>(store: S) -> Self {
        Self(Arc::new(RwLock::new(store)))
    }

    /// See [`DocumentStore::list`].
    pub fn list(&self, collection: Collection) -> BookshelfResult<Vec<Document>> {
        self.0.read().list(collection)
    }

    /// See [`DocumentStore::get`].
    pub fn get(&self, collection: Collection, id: DocumentId) -> BookshelfResult<Option<Document>> {
        self.0.read().get(collection, id)
    }

    /// Check if a document exists.
    pub fn contains(&self, collection: Collection, id: DocumentId) -> BookshelfResult<bool> {
        Ok(self.0.read().get(collection, id)?.is_some())
    }

    /// See [`DocumentStore::insert`].
    pub fn insert(&self, collection: Collection, fields: Document) -> BookshelfResult<Document> {
        self.0.write().insert(collection, fields)
    }

    /// See [`DocumentStore::update`].
    pub fn update(
        &self,
        collection: Collection,
        id: DocumentId,
        patch: &Document,
    ) -> BookshelfResult<Option<Document>> {
        self.0.write().update(collection, id, patch)
    }

    /// See [`DocumentStore::remove`].
    pub fn remove(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> BookshelfResult<Option<Document>> {
        self.0.write().remove(collection, id)
    }

    /// See [`DocumentStore::len`].
    pub fn len(&self, collection: Collection) -> BookshelfResult<usize> {
        self.0.read().len(collection)
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle").finish_non_exhaustive()
    }
}
