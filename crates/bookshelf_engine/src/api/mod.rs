/* 📖 # How does a request travel through the API?

```text
HttpRequest -> route -> auth guard -> normalizer -> handler -> renderer -> HttpResponse
```

Each stage may end the request early: the guard with 401, the normalizer with 400 or the
missing-title 500, a handler with a not-found response. [`ApiService`] wires the stages
together and is what the HTTP server calls.
*/

pub mod auth;
pub mod handlers;
pub mod normalize;
pub mod render;
pub mod route;
pub mod service;

use serde_json::json;

use bookshelf_base::pal::http::{HttpResponse, HttpStatusCode};

pub use auth::{AuthDecision, AuthGuard, requires_auth};
pub use normalize::{Normalized, NormalizedRequest, normalize};
pub use route::{Route, Target};
pub use service::ApiService;

/// A JSON response `{"error": message}`.
pub(crate) fn error_body(status: HttpStatusCode, message: &str) -> HttpResponse {
    HttpResponse::json(status, json!({ "error": message }).to_string())
}

/// A JSON response `{"message": message}`.
pub(crate) fn message_body(status: HttpStatusCode, message: &str) -> HttpResponse {
    HttpResponse::json(status, json!({ "message": message }).to_string())
}
