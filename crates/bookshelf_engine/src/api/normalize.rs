/* 📖 # What does normalization do to a request?

It turns the raw request into a [`NormalizedRequest`]: the route, the parsed JSON body and
the method handlers dispatch on. Per method:

- **POST**: creating a book requires a truthy `title`, otherwise the request ends with
  500 `{"error":"Title cannot be null"}`. The body is then stamped with `createdAt` and
  `updatedAt`.
- **PUT**: the body is stamped with `updatedAt` and the method becomes PATCH. A PUT is
  always a merge, never a replace.
- anything else passes through.

The original method is kept next to the effective one; the renderer decides on it.
*/

use serde_json::Value;
use tracing::debug;

use bookshelf_base::pal::http::{HttpMethod, HttpRequest, HttpResponse, HttpStatusCode};

use crate::api::route::{Route, Target};
use crate::api::error_body;
use crate::clock::Clock;
use crate::document::{Collection, Document};

pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

/// A request ready for the resource handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRequest {
    /// The method handlers dispatch on (PUT has become PATCH).
    pub method: HttpMethod,
    /// The method the client sent.
    pub original_method: HttpMethod,
    pub route: Option<Route>,
    pub body: Document,
}

/// Result of the normalization stage.
#[derive(Debug)]
pub enum Normalized {
    Proceed(NormalizedRequest),
    /// The request ends here with this response.
    Reject(HttpResponse),
}

/// Normalize a request that has passed authorization.
pub fn normalize(request: &HttpRequest, route: Option<Route>, clock: &dyn Clock) -> Normalized {
    let original_method = request.method();
    let mut body = Document::new();
    if route.is_some() && carries_body(original_method) {
        match parse_body(request) {
            Ok(parsed) => body = parsed,
            Err(response) => return Normalized::Reject(response),
        }
    }

    let mut method = original_method;
    match original_method {
        HttpMethod::Post => {
            if is_book_creation(route.as_ref()) && !body.has_truthy("title") {
                debug!("rejecting book without title");
                return Normalized::Reject(error_body(
                    HttpStatusCode::InternalServerError,
                    "Title cannot be null",
                ));
            }
            let now = clock.timestamp();
            body.insert(CREATED_AT, now.clone());
            body.insert(UPDATED_AT, now);
        }
        HttpMethod::Put => {
            body.insert(UPDATED_AT, clock.timestamp());
            method = HttpMethod::Patch;
        }
        _ => {}
    }

    Normalized::Proceed(NormalizedRequest {
        method,
        original_method,
        route,
        body,
    })
}

fn carries_body(method: HttpMethod) -> bool {
    matches!(
        method,
        HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch
    )
}

fn is_book_creation(route: Option<&Route>) -> bool {
    matches!(
        route,
        Some(Route {
            collection: Collection::Books,
            target: Target::Collection,
        })
    )
}

/// An empty body is an empty object; anything but a JSON object is rejected with 400.
fn parse_body(request: &HttpRequest) -> Result<Document, HttpResponse> {
    let bytes = request.body().as_bytes();
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Document::new());
    }
    let value: Value = serde_json::from_slice(bytes).map_err(|e| {
        debug!(error = %e, "unparseable request body");
        error_body(HttpStatusCode::BadRequest, "Invalid JSON body")
    })?;
    Document::from_value(value).ok_or_else(|| {
        error_body(
            HttpStatusCode::BadRequest,
            "Request body must be a JSON object",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    const NOW: &str = "2024-03-01T12:30:00.000Z";

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap())
    }

    fn run(method: HttpMethod, path: &str, body: &str) -> Normalized {
        let request = HttpRequest::new(method, path).with_body(body);
        normalize(&request, Route::parse(path), &clock())
    }

    fn proceed(normalized: Normalized) -> NormalizedRequest {
        match normalized {
            Normalized::Proceed(request) => request,
            Normalized::Reject(response) => panic!("unexpected rejection: {:?}", response),
        }
    }

    fn reject(normalized: Normalized) -> HttpResponse {
        match normalized {
            Normalized::Reject(response) => response,
            Normalized::Proceed(request) => panic!("unexpected success: {:?}", request),
        }
    }

    #[test]
    fn test_post_stamps_both_timestamps() {
        let request = proceed(run(HttpMethod::Post, "/books", r#"{"title":"Dune"}"#));
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(
            request.body.into_value(),
            json!({"title": "Dune", "createdAt": NOW, "updatedAt": NOW})
        );
    }

    #[test]
    fn test_post_book_without_title_is_rejected() {
        for body in [
            "",
            "{}",
            r#"{"title":""}"#,
            r#"{"title":null}"#,
            r#"{"title":0}"#,
            r#"{"title":false}"#,
        ] {
            let response = reject(run(HttpMethod::Post, "/books/", body));
            assert_eq!(response.status(), HttpStatusCode::InternalServerError);
            assert_eq!(
                response.body().as_string().unwrap(),
                r#"{"error":"Title cannot be null"}"#
            );
        }
    }

    #[test]
    fn test_title_only_required_for_books() {
        let request = proceed(run(HttpMethod::Post, "/users", "{}"));
        assert_eq!(
            request.body.into_value(),
            json!({"createdAt": NOW, "updatedAt": NOW})
        );
    }

    #[test]
    fn test_put_becomes_patch_with_updated_at() {
        let request = proceed(run(HttpMethod::Put, "/books/5", r#"{"author":"X"}"#));
        assert_eq!(request.method, HttpMethod::Patch);
        assert_eq!(request.original_method, HttpMethod::Put);
        assert_eq!(
            request.body.into_value(),
            json!({"author": "X", "updatedAt": NOW})
        );
    }

    #[test]
    fn test_other_methods_pass_through() {
        let request = proceed(run(HttpMethod::Patch, "/wishlists/2", r#"{"items":[]}"#));
        assert_eq!(request.method, HttpMethod::Patch);
        assert_eq!(request.body.into_value(), json!({"items": []}));

        let request = proceed(run(HttpMethod::Delete, "/books/2", "not json"));
        assert_eq!(request.method, HttpMethod::Delete);
        assert!(request.body.is_empty());
    }

    #[test]
    fn test_bad_bodies_are_rejected() {
        let response = reject(run(HttpMethod::Patch, "/users/1", "{oops"));
        assert_eq!(response.status(), HttpStatusCode::BadRequest);
        assert_eq!(
            response.body().as_string().unwrap(),
            r#"{"error":"Invalid JSON body"}"#
        );

        let response = reject(run(HttpMethod::Post, "/households", "[1,2]"));
        assert_eq!(response.status(), HttpStatusCode::BadRequest);
        assert_eq!(
            response.body().as_string().unwrap(),
            r#"{"error":"Request body must be a JSON object"}"#
        );
    }

    #[test]
    fn test_unrouted_body_is_not_inspected() {
        let request = proceed(run(HttpMethod::Post, "/unknown", "{oops"));
        assert_eq!(request.route, None);
    }
}
