/* 📖 # Which requests need credentials?

The policy is a table of `(collection, methods)` pairs. A request is gated when its path
routes to one of the listed collections and its method is in the list:

| Collection | Gated methods        |
|------------|----------------------|
| books      | DELETE, PUT, PATCH   |
| users      | DELETE               |

Everything else, including every GET and POST and all of households and wishlists, passes
without a look at the headers. Paths that route nowhere are never gated; they end in the
404 catch-all.

Gated requests must carry `Authorization: Basic base64(user:password)` matching the
configured admin credentials. The password comparison runs in constant time.
*/

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use bookshelf_base::pal::http::{HttpMethod, HttpRequest};

use crate::api::route::Route;
use crate::config::Credentials;
use crate::document::Collection;

const GATED: &[(Collection, &[HttpMethod])] = &[
    (
        Collection::Books,
        &[HttpMethod::Delete, HttpMethod::Put, HttpMethod::Patch],
    ),
    (Collection::Users, &[HttpMethod::Delete]),
];

/// Outcome of the authorization stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    /// The route is not gated.
    Open,
    /// Gated, and the credentials matched.
    Authorized,
    /// Gated, and the credentials were missing, malformed or wrong.
    Unauthorized,
}

impl AuthDecision {
    pub fn allows(&self) -> bool {
        !matches!(self, AuthDecision::Unauthorized)
    }
}

/// Whether `method` on `collection` requires credentials.
pub fn requires_auth(collection: Collection, method: HttpMethod) -> bool {
    GATED
        .iter()
        .any(|(gated, methods)| *gated == collection && methods.contains(&method))
}

/// Checks gated requests against a single credential pair.
#[derive(Debug, Clone)]
pub struct AuthGuard {
    credentials: Credentials,
}

impl AuthGuard {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// Decide whether `request`, routed to `route`, may proceed.
    pub fn check(&self, route: Option<&Route>, request: &HttpRequest) -> AuthDecision {
        let Some(route) = route else {
            return AuthDecision::Open;
        };
        if !requires_auth(route.collection, request.method()) {
            return AuthDecision::Open;
        }

        let presented = request
            .headers()
            .get("authorization")
            .and_then(parse_basic);
        match presented {
            Some((username, password)) if self.matches(&username, &password) => {
                debug!(collection = %route.collection, "credentials accepted");
                AuthDecision::Authorized
            }
            Some(_) => {
                warn!(
                    collection = %route.collection,
                    method = %request.method(),
                    "wrong credentials"
                );
                AuthDecision::Unauthorized
            }
            None => {
                warn!(
                    collection = %route.collection,
                    method = %request.method(),
                    "missing or malformed credentials"
                );
                AuthDecision::Unauthorized
            }
        }
    }

    fn matches(&self, username: &str, password: &str) -> bool {
        let password_ok: bool = password
            .as_bytes()
            .ct_eq(self.credentials.password.as_bytes())
            .into();
        username == self.credentials.username && password_ok
    }
}

/// Decode `Basic base64(user:password)`, splitting at the first colon.
fn parse_basic(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = BASE64_STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(user_and_password: &str) -> String {
        format!("Basic {}", BASE64_STANDARD.encode(user_and_password))
    }

    fn guard() -> AuthGuard {
        AuthGuard::new(Credentials::new("admin", "admin_test"))
    }

    fn check(method: HttpMethod, path: &str, authorization: Option<&str>) -> AuthDecision {
        let mut request = HttpRequest::new(method, path);
        if let Some(value) = authorization {
            request = request.with_header("Authorization", value);
        }
        guard().check(Route::parse(path).as_ref(), &request)
    }

    #[test]
    fn test_policy_table() {
        use HttpMethod::*;
        let gated = [
            (Collection::Books, Delete),
            (Collection::Books, Put),
            (Collection::Books, Patch),
            (Collection::Users, Delete),
        ];
        for collection in Collection::ALL {
            for method in [Get, Post, Put, Patch, Delete, Head, Options] {
                assert_eq!(
                    requires_auth(collection, method),
                    gated.contains(&(collection, method)),
                    "{method} {collection}"
                );
            }
        }
    }

    #[test]
    fn test_open_routes_ignore_headers() {
        assert_eq!(check(HttpMethod::Get, "/books/1", None), AuthDecision::Open);
        assert_eq!(check(HttpMethod::Post, "/books", None), AuthDecision::Open);
        assert_eq!(
            check(HttpMethod::Delete, "/households/1", Some("garbage")),
            AuthDecision::Open
        );
        assert_eq!(check(HttpMethod::Put, "/users/1", None), AuthDecision::Open);
        assert_eq!(
            check(HttpMethod::Delete, "/unknown/books", None),
            AuthDecision::Open
        );
    }

    #[test]
    fn test_valid_credentials() {
        let header = basic("admin:admin_test");
        assert_eq!(
            check(HttpMethod::Delete, "/books/3", Some(&header)),
            AuthDecision::Authorized
        );
        assert_eq!(
            check(HttpMethod::Delete, "/users/7", Some(&header)),
            AuthDecision::Authorized
        );
        let lowercase = header.replacen("Basic", "basic", 1);
        assert_eq!(
            check(HttpMethod::Patch, "/books/3", Some(&lowercase)),
            AuthDecision::Authorized
        );
    }

    #[test]
    fn test_rejected_credentials() {
        for header in [
            basic("admin:admin"),
            basic("root:admin_test"),
            basic("admin:admin_test:extra"),
            basic("admin"),
            basic(""),
            "Bearer abc".to_string(),
            "Basic !!!not-base64".to_string(),
            "Basic".to_string(),
        ] {
            assert_eq!(
                check(HttpMethod::Put, "/books/3", Some(&header)),
                AuthDecision::Unauthorized,
                "{header:?} should be rejected"
            );
        }
        assert_eq!(
            check(HttpMethod::Delete, "/books/3", None),
            AuthDecision::Unauthorized
        );
        assert!(!AuthDecision::Unauthorized.allows());
        assert!(AuthDecision::Open.allows());
    }
}
