use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info_span, instrument, warn};

use crate::{BookshelfError, BookshelfResult};

use super::FilePath;
use super::http::{
    HttpMethod, HttpRequest, HttpResponse, HttpServerConfig, HttpServerHandle, HttpService,
};
use super::traits::Pal;

/* 📖 # Why std::fs and tiny_http instead of an async stack?

The server does a bounded amount of work per request: parse JSON, touch an in-memory
collection, rewrite one small file. tiny_http gives us a blocking accept loop and we spawn
a thread per request, which keeps unrelated requests from blocking each other without
pulling in an async runtime.
*/

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Concrete PAL implementation using the real filesystem and a tiny_http server.
///
/// All file paths are resolved relative to a configured base directory.
#[derive(Debug)]
pub struct RealPal {
    base_dir: PathBuf,
}

impl RealPal {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn resolve_path(&self, path: &FilePath) -> PathBuf {
        self.base_dir.join(path.as_path())
    }
}

impl Pal for RealPal {
    #[instrument(skip(self), fields(path = %path))]
    fn file_exists(&self, path: &FilePath) -> BookshelfResult<bool> {
        let resolved = self.resolve_path(path);
        let exists = resolved.exists();
        debug!(exists, resolved = %resolved.display(), "checked file existence");
        Ok(exists)
    }

    #[instrument(skip(self), fields(path = %path))]
    fn read_file(&self, path: &FilePath) -> BookshelfResult<Box<dyn Read + 'static>> {
        let resolved = self.resolve_path(path);
        let file = fs::File::open(&resolved).map_err(|e| {
            debug!(error = %e, "failed to open file");
            Box::new(BookshelfError::file_error(resolved, e))
        })?;
        Ok(Box::new(file))
    }

    #[instrument(skip(self, contents), fields(path = %path, bytes = contents.len()))]
    fn write_file(&self, path: &FilePath, contents: &[u8]) -> BookshelfResult<()> {
        let resolved = self.resolve_path(path);
        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Box::new(BookshelfError::file_error(parent, e)))?;
        }

        // Write next to the target and rename over it so a crash never leaves half a file.
        let mut temp = resolved.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);
        fs::write(&temp, contents).map_err(|e| {
            debug!(error = %e, "failed to write temporary file");
            Box::new(BookshelfError::file_error(&temp, e))
        })?;
        fs::rename(&temp, &resolved).map_err(|e| {
            debug!(error = %e, "failed to move temporary file into place");
            Box::new(BookshelfError::file_error(&resolved, e))
        })?;
        debug!("file written");
        Ok(())
    }

    #[instrument(skip(self, service), fields(address = %config.address()))]
    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> BookshelfResult<HttpServerHandle> {
        let server = tiny_http::Server::http(config.address()).map_err(|e| {
            crate::err!("Failed to bind HTTP server to {}: {}", config.address(), e)
        })?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .ok_or_else(|| crate::err!("HTTP server is not listening on an IP address"))?;

        let handle = HttpServerHandle::new(port);
        let shutdown = Arc::clone(handle.shutdown_flag());
        let service: Arc<dyn HttpService> = Arc::from(service);

        let worker = thread::Builder::new()
            .name("http-accept".to_string())
            .spawn(move || {
                while !shutdown.load(Ordering::SeqCst) {
                    match server.recv_timeout(ACCEPT_POLL_INTERVAL) {
                        Ok(Some(request)) => {
                            let service = Arc::clone(&service);
                            thread::spawn(move || serve_request(service.as_ref(), request));
                        }
                        Ok(None) => {}
                        Err(e) => {
                            error!(error = %e, "failed to accept HTTP request");
                            crate::bail!("HTTP server stopped accepting requests: {}", e);
                        }
                    }
                }
                debug!("HTTP accept loop stopped");
                Ok(())
            })
            .map_err(|e| crate::err!("Failed to spawn HTTP accept thread: {}", e))?;

        debug!(port, "HTTP server started");
        Ok(handle.with_worker(worker))
    }
}

/// Convert a tiny_http request, run it through the service and send the response.
fn serve_request(service: &dyn HttpService, mut raw: tiny_http::Request) {
    let span = info_span!("http", method = %raw.method(), url = %raw.url());
    let _guard = span.enter();

    let response = dispatch(service, convert_request(&mut raw));
    if let Err(e) = raw.respond(convert_response(response)) {
        warn!(error = %e, "failed to send HTTP response");
    }
}

/// Run a converted request through the service.
///
/// Requests that could not be read completely are answered 400 without reaching the service.
fn dispatch(
    service: &dyn HttpService,
    request: BookshelfResult<Option<HttpRequest>>,
) -> HttpResponse {
    match request {
        Ok(Some(request)) => match service.handle_request(request) {
            Ok(response) => response,
            Err(e) => {
                error!(error = ?e, "request failed");
                HttpResponse::internal_error()
            }
        },
        Ok(None) => HttpResponse::not_found(),
        Err(e) => {
            warn!(error = %e, "rejecting unreadable request");
            HttpResponse::bad_request()
        }
    }
}

/// Returns None for methods the service has no use for.
fn convert_request(raw: &mut tiny_http::Request) -> BookshelfResult<Option<HttpRequest>> {
    let Some(method) = HttpMethod::parse(raw.method().as_str()) else {
        return Ok(None);
    };
    let mut request = HttpRequest::new(method, raw.url());
    for header in raw.headers() {
        request
            .headers_mut()
            .insert(header.field.as_str().as_str(), header.value.as_str());
    }
    let body = read_body(raw.as_reader())?;
    Ok(Some(request.with_body(body)))
}

fn read_body(reader: &mut dyn Read) -> BookshelfResult<Vec<u8>> {
    let mut body = Vec::new();
    reader
        .read_to_end(&mut body)
        .map_err(|e| crate::err!("Failed to read request body: {}", e))?;
    Ok(body)
}

fn convert_response(response: HttpResponse) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let status = response.status().as_u16();
    let headers: Vec<tiny_http::Header> = response
        .headers()
        .iter()
        .filter_map(|(key, value)| {
            tiny_http::Header::from_bytes(key.as_bytes(), value.as_bytes()).ok()
        })
        .collect();

    let mut converted =
        tiny_http::Response::from_data(response.into_body().into_bytes()).with_status_code(status);
    for header in headers {
        converted.add_header(header);
    }
    converted
}
