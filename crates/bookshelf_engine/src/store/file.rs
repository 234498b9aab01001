/* 📖 # How does the JSON file store stay consistent?

The whole database is one JSON object with an array per collection:

```json
{ "books": [], "households": [], "users": [], "wishlists": [] }
```

All documents are held in an [`InMemoryStore`]; after every change the complete object is
written back through the PAL, which replaces the file atomically. If that write fails the
changed collection is put back the way it was before the change and the error is returned,
so clients never observe a mutation that is not on disk.

Top-level keys other than the four collections are carried along untouched.
*/

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use bookshelf_base::{BookshelfResult, FilePath, PalHandle, ResultExt};

use crate::document::{Collection, Document, DocumentId};
use crate::store::memory::{CollectionData, InMemoryStore};
use crate::store::traits::DocumentStore;

/// A document store persisted to a single JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    pal: PalHandle,
    path: FilePath,
    inner: InMemoryStore,
    extras: Map<String, Value>,
}

impl JsonFileStore {
    /// Load the database at `path`, or start empty if the file does not exist yet.
    ///
    /// The file is only created once the first mutation happens.
    pub fn open(pal: PalHandle, path: FilePath) -> BookshelfResult<Self> {
        let mut store = Self {
            pal,
            path,
            inner: InMemoryStore::new(),
            extras: Map::new(),
        };
        if store.pal.file_exists(&store.path)? {
            store
                .load()
                .with_context(|| format!("Failed to load database '{}'", store.path))?;
        } else {
            info!(path = %store.path, "database file not found, starting empty");
        }
        Ok(store)
    }

    pub fn path(&self) -> &FilePath {
        &self.path
    }

    fn load(&mut self) -> BookshelfResult<()> {
        let contents = self.pal.read_file_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(());
        }
        let Value::Object(mut root) = serde_json::from_str::<Value>(&contents)? else {
            bookshelf_base::bail!("Database must be a JSON object");
        };

        for collection in Collection::ALL {
            let documents = match root.shift_remove(collection.name()) {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items
                    .into_iter()
                    .map(|item| {
                        Document::from_value(item).ok_or_else(|| {
                            bookshelf_base::err!(
                                "Entries of '{}' must be JSON objects",
                                collection
                            )
                        })
                    })
                    .collect::<BookshelfResult<Vec<_>>>()?,
                Some(_) => bookshelf_base::bail!("'{}' must be a JSON array", collection),
            };
            debug!(collection = %collection, count = documents.len(), "loaded collection");
            self.inner
                .replace_collection(collection, CollectionData::from_documents(documents));
        }
        self.extras = root;
        Ok(())
    }

    fn to_json(&self) -> Value {
        let mut root = Map::new();
        for collection in Collection::ALL {
            let documents = self
                .inner
                .collection(collection)
                .documents()
                .iter()
                .cloned()
                .map(Document::into_value)
                .collect();
            root.insert(collection.name().to_string(), Value::Array(documents));
        }
        for (key, value) in &self.extras {
            root.insert(key.clone(), value.clone());
        }
        Value::Object(root)
    }

    fn persist(&self) -> BookshelfResult<()> {
        let bytes = serde_json::to_vec_pretty(&self.to_json())?;
        self.pal.write_file(&self.path, &bytes)
    }

    /// Apply a change to one collection and write the database.
    ///
    /// Nothing is written when the change reports no effect (`None`). A failed write puts
    /// the collection back to its previous state.
    fn mutate<T>(
        &mut self,
        collection: Collection,
        change: impl FnOnce(&mut InMemoryStore) -> BookshelfResult<Option<T>>,
    ) -> BookshelfResult<Option<T>> {
        let snapshot = self.inner.collection(collection);
        let Some(result) = change(&mut self.inner)? else {
            return Ok(None);
        };
        if let Err(error) = self.persist() {
            warn!(path = %self.path, collection = %collection, "failed to persist, rolling back");
            self.inner.replace_collection(collection, snapshot);
            return Err(Box::new(
                error.context(format!("Failed to write database '{}'", self.path)),
            ));
        }
        Ok(Some(result))
    }
}

impl DocumentStore for JsonFileStore {
    fn list(&self, collection: Collection) -> BookshelfResult<Vec<Document>> {
        self.inner.list(collection)
    }

    fn get(&self, collection: Collection, id: DocumentId) -> BookshelfResult<Option<Document>> {
        self.inner.get(collection, id)
    }

    fn insert(&mut self, collection: Collection, fields: Document) -> BookshelfResult<Document> {
        self.mutate(collection, |inner| inner.insert(collection, fields).map(Some))?
            .ok_or_else(|| bookshelf_base::err!("Insert into '{}' had no effect", collection))
    }

    fn update(
        &mut self,
        collection: Collection,
        id: DocumentId,
        patch: &Document,
    ) -> BookshelfResult<Option<Document>> {
        self.mutate(collection, |inner| inner.update(collection, id, patch))
    }

    fn remove(
        &mut self,
        collection: Collection,
        id: DocumentId,
    ) -> BookshelfResult<Option<Document>> {
        self.mutate(collection, |inner| inner.remove(collection, id))
    }

    fn len(&self, collection: Collection) -> BookshelfResult<usize> {
        self.inner.len(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_base::{MockPal, RealPal};
    use expect_test::expect;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    fn db_path() -> FilePath {
        FilePath::from("db.json")
    }

    fn open_with(contents: &str) -> (MockPal, JsonFileStore) {
        let mock = MockPal::new();
        mock.add_file(db_path(), contents.as_bytes().to_vec());
        let store = JsonFileStore::open(PalHandle::new(mock.clone()), db_path()).unwrap();
        (mock, store)
    }

    fn saved(mock: &MockPal) -> Value {
        serde_json::from_slice(&mock.file_contents(&db_path()).unwrap()).unwrap()
    }

    #[test]
    fn test_missing_file_starts_empty_and_is_written_on_first_change() {
        let mock = MockPal::new();
        let mut store = JsonFileStore::open(PalHandle::new(mock.clone()), db_path()).unwrap();
        assert_eq!(store.len(Collection::Books).unwrap(), 0);
        assert!(mock.file_contents(&db_path()).is_none());

        store
            .insert(Collection::Books, doc(json!({"title": "Dune"})))
            .unwrap();

        expect![[r#"
            {
              "books": [
                {
                  "id": 1,
                  "title": "Dune"
                }
              ],
              "households": [],
              "users": [],
              "wishlists": []
            }"#]]
        .assert_eq(&String::from_utf8(mock.file_contents(&db_path()).unwrap()).unwrap());
    }

    #[test]
    fn test_load_fills_missing_collections_and_keeps_unknown_keys() {
        let (mock, mut store) =
            open_with(r#"{"users": [{"id": 3, "name": "Ada"}], "meta": {"version": 2}}"#);
        assert_eq!(store.len(Collection::Users).unwrap(), 1);
        assert_eq!(store.len(Collection::Books).unwrap(), 0);

        let user = store.insert(Collection::Users, Document::new()).unwrap();
        assert_eq!(user.id(), Some(DocumentId::new(4)));

        let saved = saved(&mock);
        assert_eq!(saved["meta"], json!({"version": 2}));
        assert_eq!(saved["users"], json!([{"id": 3, "name": "Ada"}, {"id": 4}]));
        assert_eq!(saved["wishlists"], json!([]));
    }

    #[test]
    fn test_empty_file_is_an_empty_database() {
        let (_mock, store) = open_with("  \n");
        for collection in Collection::ALL {
            assert_eq!(store.len(collection).unwrap(), 0);
        }
    }

    #[test]
    fn test_malformed_database_is_reported() {
        let mock = MockPal::new();
        mock.add_file(db_path(), b"[1, 2]".to_vec());
        let error = JsonFileStore::open(PalHandle::new(mock.clone()), db_path()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Failed to load database 'db.json': Database must be a JSON object"
        );

        mock.add_file(db_path(), br#"{"books": {"id": 1}}"#.to_vec());
        let error = JsonFileStore::open(PalHandle::new(mock.clone()), db_path()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Failed to load database 'db.json': 'books' must be a JSON array"
        );

        mock.add_file(db_path(), b"{books".to_vec());
        assert!(JsonFileStore::open(PalHandle::new(mock), db_path()).is_err());
    }

    #[test]
    fn test_update_and_remove_are_persisted() {
        let (mock, mut store) = open_with(r#"{"books": [{"id": 1, "title": "Dune"}]}"#);

        store
            .update(
                Collection::Books,
                DocumentId::new(1),
                &doc(json!({"author": "Herbert"})),
            )
            .unwrap()
            .unwrap();
        assert_eq!(
            saved(&mock)["books"],
            json!([{"id": 1, "title": "Dune", "author": "Herbert"}])
        );

        store.remove(Collection::Books, DocumentId::new(1)).unwrap();
        assert_eq!(saved(&mock)["books"], json!([]));
    }

    #[test]
    fn test_no_write_when_nothing_changed() {
        let (mock, mut store) = open_with(r#"{"books": []}"#);
        assert!(
            store
                .remove(Collection::Books, DocumentId::new(8))
                .unwrap()
                .is_none()
        );
        assert_eq!(mock.file_contents(&db_path()), Some(br#"{"books": []}"#.to_vec()));
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let (mock, mut store) = open_with(r#"{"books": [{"id": 1, "title": "Dune"}]}"#);
        mock.set_fail_writes(true);

        assert!(
            store
                .insert(Collection::Books, doc(json!({"title": "Emma"})))
                .is_err()
        );
        assert!(
            store
                .update(Collection::Books, DocumentId::new(1), &doc(json!({"title": "X"})))
                .is_err()
        );
        assert!(store.remove(Collection::Books, DocumentId::new(1)).is_err());

        assert_eq!(
            store.list(Collection::Books).unwrap(),
            vec![doc(json!({"id": 1, "title": "Dune"}))]
        );

        mock.set_fail_writes(false);
        let book = store
            .insert(Collection::Books, doc(json!({"title": "Emma"})))
            .unwrap();
        assert_eq!(book.id(), Some(DocumentId::new(2)));
    }

    #[test]
    fn test_real_file_survives_reopen() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let pal = PalHandle::new(RealPal::new(temp_dir.path().to_path_buf()));
        let path = FilePath::from("db.test.json");

        let mut store = JsonFileStore::open(pal.clone(), path.clone()).unwrap();
        store
            .insert(Collection::Wishlists, doc(json!({"items": ["Dune"]})))
            .unwrap();
        drop(store);

        let reopened = JsonFileStore::open(pal, path).unwrap();
        assert_eq!(
            reopened.list(Collection::Wishlists).unwrap(),
            vec![doc(json!({"id": 1, "items": ["Dune"]}))]
        );
    }
}
