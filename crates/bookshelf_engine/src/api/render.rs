/* 📖 # What does the renderer add?

Handlers produce a status and a JSON payload; the renderer turns them into the response:

- DELETE always answers 204 with an empty body.
- A successful POST (201) gets a self-link to the new document:
  `"links": [{"rel": "self", "href": "http://host/books/7"}]`.
- With `?callback=name` the payload is wrapped as JSONP, otherwise it is plain JSON.

The self-link is built from `X-Forwarded-Proto` (default `http`), the `Host` header
(default: the server's own address) and the request path without query or trailing slash.
*/

use serde_json::{Value, json};

use bookshelf_base::pal::http::{HttpMethod, HttpRequest, HttpResponse, HttpStatusCode};

use crate::document::ID_FIELD;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const JSONP_CONTENT_TYPE: &str = "text/javascript; charset=utf-8";

/// Request details the renderer needs.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub method: HttpMethod,
    pub protocol: String,
    pub host: String,
    pub path: String,
    pub callback: Option<String>,
}

impl RenderContext {
    /// Collect the renderer inputs from a raw request. `fallback_host` is used when the
    /// request has no `Host` header.
    pub fn from_request(request: &HttpRequest, fallback_host: &str) -> Self {
        let headers = request.headers();
        let protocol = headers
            .get("x-forwarded-proto")
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|proto| !proto.is_empty())
            .unwrap_or("http")
            .to_string();
        let host = headers
            .get("host")
            .filter(|host| !host.is_empty())
            .unwrap_or(fallback_host)
            .to_string();
        Self {
            method: request.method(),
            protocol,
            host,
            path: request.path_without_query().to_string(),
            callback: request
                .query_param("callback")
                .filter(|name| is_valid_callback(name))
                .map(str::to_string),
        }
    }

    /// The absolute URL of the request, without query or trailing slash.
    pub fn request_url(&self) -> String {
        let path = self.path.trim_end_matches('/');
        format!("{}://{}{}", self.protocol, self.host, path)
    }
}

/// Finish a handler result.
pub fn render(context: &RenderContext, status: HttpStatusCode, mut payload: Value) -> HttpResponse {
    if context.method == HttpMethod::Delete {
        return HttpResponse::no_content();
    }

    if context.method == HttpMethod::Post && status == HttpStatusCode::Created {
        add_self_link(context, &mut payload);
    }

    let json = payload.to_string();
    match &context.callback {
        Some(callback) => HttpResponse::new(status)
            .with_content_type(JSONP_CONTENT_TYPE)
            .with_body(wrap_jsonp(callback, &json)),
        None => HttpResponse::json(status, json),
    }
}

fn add_self_link(context: &RenderContext, payload: &mut Value) {
    let Value::Object(fields) = payload else {
        return;
    };
    let id = match fields.get(ID_FIELD) {
        Some(Value::Number(id)) => id.to_string(),
        Some(Value::String(id)) => id.clone(),
        _ => return,
    };
    let href = format!("{}/{}", context.request_url(), id);
    fields.insert("links".to_string(), json!([{"rel": "self", "href": href}]));
}

fn wrap_jsonp(callback: &str, json: &str) -> String {
    // U+2028 and U+2029 are valid in JSON strings but end a line in JavaScript.
    let json = json.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029");
    format!("/**/ typeof {callback} === 'function' && {callback}({json});")
}

fn is_valid_callback(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.' | '[' | ']'))
}
