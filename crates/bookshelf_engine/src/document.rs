/* 📖 # Why are documents open JSON maps instead of typed structs?

Only two things about a document are enforced: the store-assigned integer `id`, and a
`title` on books at creation time. Everything else is whatever the client sent, so a
document is a JSON object with a few typed accessors on top. With serde_json's
`preserve_order` feature the fields come back out in the order they went in.
*/

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The field holding a document's identifier.
pub const ID_FIELD: &str = "id";

/// The fixed set of collections served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Books,
    Households,
    Users,
    Wishlists,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Books,
        Collection::Households,
        Collection::Users,
        Collection::Wishlists,
    ];

    /// Name used in URLs and as the key in the persisted database.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Books => "books",
            Self::Households => "households",
            Self::Users => "users",
            Self::Wishlists => "wishlists",
        }
    }

    /// Singular noun used in not-found messages.
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Books => "Book",
            Self::Households => "Household",
            Self::Users => "User",
            Self::Wishlists => "Wishlist",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Integer identifier, unique within a collection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct DocumentId(u64);

impl DocumentId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Parse a path segment as a base-10 id.
    ///
    /// Only plain ASCII digits are accepted; anything else cannot name a stored document.
    pub fn parse(segment: &str) -> Option<Self> {
        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        segment.parse().ok().map(Self)
    }

    /// The id after this one, or None once the id space is used up.
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single record: a JSON object carrying an `id` plus arbitrary fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap a JSON value; returns None unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// A fresh document carrying only `id`.
    pub fn with_id(id: DocumentId) -> Self {
        let mut doc = Self::new();
        doc.0.insert(ID_FIELD.to_string(), Value::from(id.value()));
        doc
    }

    /// The document id, if the `id` field holds a non-negative integer.
    pub fn id(&self) -> Option<DocumentId> {
        self.0
            .get(ID_FIELD)
            .and_then(Value::as_u64)
            .map(DocumentId)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.shift_remove(field)
    }

    /// True if `field` is present and truthy: not null, false, 0 or an empty string.
    pub fn has_truthy(&self, field: &str) -> bool {
        self.0.get(field).is_some_and(is_truthy)
    }

    /// Shallow merge: every top-level field of `patch` overwrites ours, other fields stay.
    /// The `id` field is never taken from a patch.
    pub fn merge(&mut self, patch: &Document) {
        for (key, value) in &patch.0 {
            if key != ID_FIELD {
                self.0.insert(key.clone(), value.clone());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    #[test]
    fn test_collection_names_round_trip() {
        for collection in Collection::ALL {
            assert_eq!(Collection::from_name(collection.name()), Some(collection));
        }
        assert_eq!(Collection::from_name("authors"), None);
        assert_eq!(Collection::Wishlists.noun(), "Wishlist");
    }

    #[test]
    fn test_document_id_parse() {
        assert_eq!(DocumentId::parse("42"), Some(DocumentId::new(42)));
        assert_eq!(DocumentId::parse("007"), Some(DocumentId::new(7)));
        assert_eq!(DocumentId::parse("abc"), None);
        assert_eq!(DocumentId::parse("5abc"), None);
        assert_eq!(DocumentId::parse("-1"), None);
        assert_eq!(DocumentId::parse("+1"), None);
        assert_eq!(DocumentId::parse(""), None);
        assert_eq!(DocumentId::parse("99999999999999999999999"), None);
    }

    #[test]
    fn test_next_id_stops_at_the_end_of_the_range() {
        assert_eq!(DocumentId::new(41).next(), Some(DocumentId::new(42)));
        assert_eq!(DocumentId::new(u64::MAX).next(), None);
    }

    #[test]
    fn test_id_requires_integer() {
        assert_eq!(doc(json!({"id": 3})).id(), Some(DocumentId::new(3)));
        assert_eq!(doc(json!({"id": "3"})).id(), None);
        assert_eq!(doc(json!({"id": -3})).id(), None);
        assert_eq!(doc(json!({})).id(), None);
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(Document::from_value(json!([1, 2])).is_none());
        assert!(Document::from_value(json!("text")).is_none());
        assert!(Document::from_value(json!(null)).is_none());
    }

    #[test]
    fn test_merge_keeps_absent_fields_and_id() {
        let mut book = doc(json!({"id": 5, "title": "Dune", "year": 1965}));
        book.merge(&doc(json!({"id": 99, "author": "Herbert", "year": 1966})));

        assert_eq!(
            book.into_value(),
            json!({"id": 5, "title": "Dune", "year": 1966, "author": "Herbert"})
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let patch = doc(json!({"name": "Smiths"}));
        let mut once = doc(json!({"id": 1, "size": 4}));
        once.merge(&patch);
        let mut twice = once.clone();
        twice.merge(&patch);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_truthiness() {
        let d = doc(json!({
            "empty": "", "zero": 0, "null": null, "no": false,
            "text": "Dune", "one": 1, "list": [], "yes": true
        }));
        for field in ["empty", "zero", "null", "no", "missing"] {
            assert!(!d.has_truthy(field), "{field} should be falsy");
        }
        for field in ["text", "one", "list", "yes"] {
            assert!(d.has_truthy(field), "{field} should be truthy");
        }
    }
}
