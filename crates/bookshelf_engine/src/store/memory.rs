/* 📖 # Why track a high-water mark next to the documents?

Ids are assigned as "largest id so far plus one". Computing that from the current
documents alone would hand out the id of a just-deleted last document again, so each
collection remembers the largest id it has ever assigned (or loaded) and counts on from there.
*/

use std::collections::HashMap;

use bookshelf_base::BookshelfResult;

use crate::document::{Collection, Document, DocumentId};
use crate::store::traits::DocumentStore;

/// The documents of one collection plus the largest id it has ever held.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionData {
    documents: Vec<Document>,
    last_id: DocumentId,
}

impl CollectionData {
    /// Wrap existing documents; the high-water mark starts at their largest id.
    pub fn from_documents(documents: Vec<Document>) -> Self {
        let last_id = documents
            .iter()
            .filter_map(Document::id)
            .max()
            .unwrap_or_default();
        Self { documents, last_id }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn last_id(&self) -> DocumentId {
        self.last_id
    }

    fn position(&self, id: DocumentId) -> Option<usize> {
        self.documents.iter().position(|doc| doc.id() == Some(id))
    }
}

/// An in-memory document store holding the four collections.
///
/// # Example
///
/// ```
/// use bookshelf_engine::{Collection, Document, DocumentStore, InMemoryStore};
/// use serde_json::json;
///
/// let mut store = InMemoryStore::new();
/// let fields = Document::from_value(json!({"name": "Smiths"})).unwrap();
/// let household = store.insert(Collection::Households, fields).unwrap();
///
/// assert_eq!(household.id().unwrap().value(), 1);
/// assert_eq!(store.len(Collection::Households).unwrap(), 1);
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    collections: HashMap<Collection, CollectionData>,
}

impl InMemoryStore {
    /// Create a store with four empty collections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents of one collection.
    pub fn with_collection(mut self, collection: Collection, documents: Vec<Document>) -> Self {
        self.collections
            .insert(collection, CollectionData::from_documents(documents));
        self
    }

    /// The current state of a collection.
    pub fn collection(&self, collection: Collection) -> CollectionData {
        self.collections
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace a collection wholesale, e.g. with a previously captured state.
    pub fn replace_collection(&mut self, collection: Collection, data: CollectionData) {
        self.collections.insert(collection, data);
    }

    fn data(&self, collection: Collection) -> Option<&CollectionData> {
        self.collections.get(&collection)
    }

    fn data_mut(&mut self, collection: Collection) -> &mut CollectionData {
        self.collections.entry(collection).or_default()
    }
}

impl DocumentStore for InMemoryStore {
    fn list(&self, collection: Collection) -> BookshelfResult<Vec<Document>> {
        Ok(self
            .data(collection)
            .map(|data| data.documents.clone())
            .unwrap_or_default())
    }

    fn get(&self, collection: Collection, id: DocumentId) -> BookshelfResult<Option<Document>> {
        Ok(self.data(collection).and_then(|data| {
            data.position(id)
                .map(|index| data.documents[index].clone())
        }))
    }

    fn insert(&mut self, collection: Collection, fields: Document) -> BookshelfResult<Document> {
        let data = self.data_mut(collection);
        let Some(id) = data.last_id.next() else {
            bookshelf_base::bail!("No ids left in '{}'", collection);
        };
        let mut doc = Document::with_id(id);
        doc.merge(&fields);
        data.documents.push(doc.clone());
        data.last_id = id;
        Ok(doc)
    }

    fn update(
        &mut self,
        collection: Collection,
        id: DocumentId,
        patch: &Document,
    ) -> BookshelfResult<Option<Document>> {
        let data = self.data_mut(collection);
        let Some(index) = data.position(id) else {
            return Ok(None);
        };
        let doc = &mut data.documents[index];
        doc.merge(patch);
        Ok(Some(doc.clone()))
    }

    fn remove(
        &mut self,
        collection: Collection,
        id: DocumentId,
    ) -> BookshelfResult<Option<Document>> {
        let data = self.data_mut(collection);
        Ok(data
            .position(id)
            .map(|index| data.documents.remove(index)))
    }

    fn len(&self, collection: Collection) -> BookshelfResult<usize> {
        Ok(self.data(collection).map_or(0, |data| data.documents.len()))
    }
}
