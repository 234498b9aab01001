use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use bookshelf_base::BookshelfResult;
use bookshelf_base::pal::http::{HttpRequest, HttpResponse, HttpService};

use crate::api::auth::AuthGuard;
use crate::api::handlers::{self, HandlerOutcome};
use crate::api::normalize::{Normalized, normalize};
use crate::api::render::{RenderContext, render};
use crate::api::route::Route;
use crate::clock::{Clock, SystemClock};
use crate::config::ServerConfig;
use crate::store::StoreHandle;

/// The HTTP service serving the four collections.
#[derive(Debug, Clone)]
pub struct ApiService {
    store: StoreHandle,
    guard: AuthGuard,
    clock: Arc<dyn Clock>,
    fallback_host: String,
}

impl ApiService {
    pub fn new(store: StoreHandle, config: &ServerConfig) -> Self {
        Self {
            store,
            guard: AuthGuard::new(config.credentials.clone()),
            clock: Arc::new(SystemClock),
            fallback_host: config.public_address(),
        }
    }

    /// Use `clock` for `createdAt`/`updatedAt` stamps.
    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    fn process(&self, request: &HttpRequest) -> BookshelfResult<HttpResponse> {
        let route = Route::parse(request.path_without_query());

        let decision = self.guard.check(route.as_ref(), request);
        if !decision.allows() {
            return Ok(HttpResponse::unauthorized());
        }

        let normalized = match normalize(request, route, self.clock.as_ref()) {
            Normalized::Proceed(normalized) => normalized,
            Normalized::Reject(response) => return Ok(response),
        };
        debug!(method = %normalized.method, ?decision, "dispatching");

        match handlers::handle(&self.store, &normalized)? {
            HandlerOutcome::Direct(response) => Ok(response),
            HandlerOutcome::Render { status, payload } => {
                let context = RenderContext::from_request(request, &self.fallback_host);
                Ok(render(&context, status, payload))
            }
        }
    }
}

impl HttpService for ApiService {
    fn handle_request(&self, request: HttpRequest) -> BookshelfResult<HttpResponse> {
        let started = Instant::now();
        let result = self.process(&request);
        let status = match &result {
            Ok(response) => response.status().as_u16(),
            Err(_) => 500,
        };
        info!(
            method = %request.method(),
            path = request.path(),
            status,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "request"
        );
        result
    }
}
