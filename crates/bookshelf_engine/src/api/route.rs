use percent_encoding::percent_decode_str;

use crate::document::{Collection, DocumentId};

/// What a request path addresses: a whole collection or one item in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Collection,
    /// The percent-decoded `:id` segment; it only names a document if it parses as an id.
    Item(String),
}

/// A request path matched against the collection resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub collection: Collection,
    pub target: Target,
}

impl Route {
    /// Match `/coll` or `/coll/:id`, with an optional trailing slash.
    ///
    /// `path` must not contain the query string. Returns None for every other path.
    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path.strip_prefix('/')?;
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        let mut segments = trimmed.split('/');
        let collection = Collection::from_name(segments.next()?)?;
        let target = match (segments.next(), segments.next()) {
            (None, _) => Target::Collection,
            (Some(id), None) if !id.is_empty() => Target::Item(decode_segment(id)),
            _ => return None,
        };
        Some(Self { collection, target })
    }

    /// The addressed id, if this is an item route whose segment is a valid id.
    pub fn id(&self) -> Option<DocumentId> {
        match &self.target {
            Target::Item(raw) => DocumentId::parse(raw),
            Target::Collection => None,
        }
    }

    pub fn is_item(&self) -> bool {
        matches!(self.target, Target::Item(_))
    }
}

/// Segments that do not decode to UTF-8 are kept as sent.
fn decode_segment(segment: &str) -> String {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_routes() {
        for path in ["/books", "/books/"] {
            assert_eq!(
                Route::parse(path),
                Some(Route {
                    collection: Collection::Books,
                    target: Target::Collection,
                })
            );
        }
    }

    #[test]
    fn test_item_routes_keep_segment() {
        let route = Route::parse("/users/7").unwrap();
        assert_eq!(route.collection, Collection::Users);
        assert_eq!(route.id(), Some(DocumentId::new(7)));

        let route = Route::parse("/wishlists/abc/").unwrap();
        assert_eq!(route.target, Target::Item("abc".to_string()));
        assert!(route.is_item());
        assert_eq!(route.id(), None);
    }

    #[test]
    fn test_item_segment_is_percent_decoded() {
        let route = Route::parse("/books/%31").unwrap();
        assert_eq!(route.target, Target::Item("1".to_string()));
        assert_eq!(route.id(), Some(DocumentId::new(1)));

        let route = Route::parse("/books/%34%32/").unwrap();
        assert_eq!(route.id(), Some(DocumentId::new(42)));

        let route = Route::parse("/books/%FF").unwrap();
        assert_eq!(route.target, Target::Item("%FF".to_string()));
        assert_eq!(route.id(), None);
        assert_eq!(Route::parse("/book%73/1"), None);
    }

    #[test]
    fn test_unrouted_paths() {
        for path in [
            "",
            "/",
            "/unknown/path",
            "/books/1/extra",
            "/books//",
            "//books",
            "books",
            "/Books",
        ] {
            assert_eq!(Route::parse(path), None, "{path:?} should not route");
        }
    }
}
