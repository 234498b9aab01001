/* 📖 # How do the resource handlers respond?

All four collections share the same five operations:

| Operation | Request            | Success                | Unknown id                            |
|-----------|--------------------|------------------------|---------------------------------------|
| List      | GET `/coll`        | 200, all documents     |                                       |
| Get       | GET `/coll/:id`    | 200, the document      | 404 `{"message":"<Noun> not found"}`  |
| Create    | POST `/coll`       | 201, the new document  |                                       |
| Patch     | PATCH `/coll/:id`  | 200, merged document   | 404 `{"error":"<Noun> not found"}`    |
| Delete    | DELETE `/coll/:id` | 204                    | 404 `{"message":"<Noun> not found"}`  |

PUT never reaches this layer, normalization turned it into PATCH. Successful results are
handed to the renderer; not-found answers are complete responses already. An `:id` that is
not a plain number can't name a document and takes the not-found branch.
*/

use serde_json::Value;
use tracing::debug;

use bookshelf_base::BookshelfResult;
use bookshelf_base::pal::http::{HttpMethod, HttpResponse, HttpStatusCode};

use crate::api::normalize::NormalizedRequest;
use crate::api::route::{Route, Target};
use crate::api::{error_body, message_body};
use crate::document::{Collection, Document};
use crate::store::StoreHandle;

/// What a handler produced.
#[derive(Debug)]
pub enum HandlerOutcome {
    /// A finished response that skips rendering.
    Direct(HttpResponse),
    /// A payload for the renderer.
    Render {
        status: HttpStatusCode,
        payload: Value,
    },
}

impl HandlerOutcome {
    fn render(status: HttpStatusCode, payload: Value) -> Self {
        Self::Render { status, payload }
    }
}

/// Dispatch a normalized request to the matching collection operation.
pub fn handle(store: &StoreHandle, request: &NormalizedRequest) -> BookshelfResult<HandlerOutcome> {
    let Some(route) = &request.route else {
        return Ok(HandlerOutcome::Direct(HttpResponse::not_found()));
    };
    let collection = route.collection;

    match (request.method, &route.target) {
        (HttpMethod::Get, Target::Collection) => list(store, collection),
        (HttpMethod::Get, Target::Item(_)) => get(store, route),
        (HttpMethod::Post, Target::Collection) => create(store, collection, &request.body),
        (HttpMethod::Patch, Target::Item(_)) => patch(store, route, &request.body),
        (HttpMethod::Delete, Target::Item(_)) => delete(store, route),
        (method, _) => {
            debug!(%method, %collection, "no operation for method");
            Ok(HandlerOutcome::Direct(HttpResponse::not_found()))
        }
    }
}

fn list(store: &StoreHandle, collection: Collection) -> BookshelfResult<HandlerOutcome> {
    let documents = store
        .list(collection)?
        .into_iter()
        .map(Document::into_value)
        .collect();
    Ok(HandlerOutcome::render(
        HttpStatusCode::Ok,
        Value::Array(documents),
    ))
}

fn get(store: &StoreHandle, route: &Route) -> BookshelfResult<HandlerOutcome> {
    let found = match route.id() {
        Some(id) => store.get(route.collection, id)?,
        None => None,
    };
    Ok(match found {
        Some(doc) => HandlerOutcome::render(HttpStatusCode::Ok, doc.into_value()),
        None => HandlerOutcome::Direct(not_found_message(route.collection)),
    })
}

fn create(
    store: &StoreHandle,
    collection: Collection,
    body: &Document,
) -> BookshelfResult<HandlerOutcome> {
    let created = store.insert(collection, body.clone())?;
    debug!(%collection, id = ?created.id(), "created document");
    Ok(HandlerOutcome::render(
        HttpStatusCode::Created,
        created.into_value(),
    ))
}

fn patch(store: &StoreHandle, route: &Route, body: &Document) -> BookshelfResult<HandlerOutcome> {
    let Some(id) = route.id() else {
        return Ok(HandlerOutcome::Direct(not_found_error(route.collection)));
    };
    if !store.contains(route.collection, id)? {
        return Ok(HandlerOutcome::Direct(not_found_error(route.collection)));
    }
    // A concurrent delete may land between the check and the merge.
    Ok(match store.update(route.collection, id, body)? {
        Some(doc) => HandlerOutcome::render(HttpStatusCode::Ok, doc.into_value()),
        None => HandlerOutcome::Direct(not_found_error(route.collection)),
    })
}

fn delete(store: &StoreHandle, route: &Route) -> BookshelfResult<HandlerOutcome> {
    let removed = match route.id() {
        Some(id) => store.remove(route.collection, id)?,
        None => None,
    };
    Ok(match removed {
        Some(_) => HandlerOutcome::render(
            HttpStatusCode::NoContent,
            Value::Object(Default::default()),
        ),
        None => HandlerOutcome::Direct(not_found_message(route.collection)),
    })
}

fn not_found_message(collection: Collection) -> HttpResponse {
    message_body(
        HttpStatusCode::NotFound,
        &format!("{} not found", collection.noun()),
    )
}

fn not_found_error(collection: Collection) -> HttpResponse {
    error_body(
        HttpStatusCode::NotFound,
        &format!("{} not found", collection.noun()),
    )
}
