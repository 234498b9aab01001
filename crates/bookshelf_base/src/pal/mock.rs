use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use parking_lot::Mutex;

use crate::BookshelfError;
use crate::BookshelfResult;

use super::FilePath;
use super::http::{HttpRequest, HttpResponse, HttpServerConfig, HttpServerHandle, HttpService};
use super::traits::Pal;

/* 📖 # Why use HashMap for MockPal storage?

1. **Speed**: No filesystem I/O, deterministic and fast for unit tests
2. **Isolation**: every test gets its own database file
3. **Control**: writes can be made to fail to exercise the store's rollback path
*/

/// In-memory PAL implementation for testing.
///
/// # Examples
///
/// ```
/// use bookshelf_base::{MockPal, Pal, FilePath};
///
/// let mock = MockPal::new();
/// mock.add_file(FilePath::from("db.json"), b"{}".to_vec());
/// let content = mock.read_file_to_string(&FilePath::from("db.json")).unwrap();
/// assert_eq!(content, "{}");
/// ```
#[derive(Debug, Clone)]
pub struct MockPal {
    files: Arc<Mutex<HashMap<FilePath, Vec<u8>>>>,
    http_servers: Arc<Mutex<HashMap<u16, Arc<dyn HttpService>>>>,
    next_port: Arc<AtomicU16>,
    fail_writes: Arc<AtomicBool>,
}

impl MockPal {
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            http_servers: Arc::new(Mutex::new(HashMap::new())),
            next_port: Arc::new(AtomicU16::new(10000)),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Add a file to the mock storage.
    pub fn add_file(&self, path: FilePath, content: Vec<u8>) {
        self.files.lock().insert(path, content);
    }

    /// Current contents of a file, if present.
    pub fn file_contents(&self, path: &FilePath) -> Option<Vec<u8>> {
        self.files.lock().get(path).cloned()
    }

    /// Make every subsequent `write_file` fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Simulate an HTTP request to a running server.
    ///
    /// Looks up the service registered for `port` and invokes it directly, returning
    /// whatever the service returns.
    pub fn simulate_request(
        &self,
        port: u16,
        request: HttpRequest,
    ) -> BookshelfResult<HttpResponse> {
        let service = self
            .http_servers
            .lock()
            .get(&port)
            .cloned()
            .ok_or_else(|| crate::err!("No HTTP server registered on port {}", port))?;

        service.handle_request(request)
    }

    pub fn http_server_count(&self) -> usize {
        self.http_servers.lock().len()
    }
}

impl Default for MockPal {
    fn default() -> Self {
        Self::new()
    }
}

impl Pal for MockPal {
    fn file_exists(&self, path: &FilePath) -> BookshelfResult<bool> {
        Ok(self.files.lock().contains_key(path))
    }

    fn read_file(&self, path: &FilePath) -> BookshelfResult<Box<dyn Read + 'static>> {
        let content = self.files.lock().get(path).cloned().ok_or_else(|| {
            Box::new(BookshelfError::file_error(
                path.as_path(),
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ),
            ))
        })?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn write_file(&self, path: &FilePath, contents: &[u8]) -> BookshelfResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Box::new(BookshelfError::file_error(
                path.as_path(),
                std::io::Error::other("simulated write failure"),
            )));
        }
        self.files.lock().insert(path.clone(), contents.to_vec());
        Ok(())
    }

    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> BookshelfResult<HttpServerHandle> {
        let port = match config.port {
            Some(p) => p,
            None => self.next_port.fetch_add(1, Ordering::SeqCst),
        };
        self.http_servers.lock().insert(port, Arc::from(service));
        Ok(HttpServerHandle::new(port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pal::http::{HttpMethod, HttpStatusCode};

    #[test]
    fn test_read_missing_file() {
        let mock = MockPal::new();
        assert!(mock.read_file(&FilePath::from("db.json")).is_err());
        assert!(!mock.file_exists(&FilePath::from("db.json")).unwrap());
    }

    #[test]
    fn test_write_then_read() {
        let mock = MockPal::new();
        let path = FilePath::from("db.json");
        mock.write_file(&path, b"{\"books\":[]}").unwrap();

        assert!(mock.file_exists(&path).unwrap());
        assert_eq!(mock.read_file_to_string(&path).unwrap(), "{\"books\":[]}");
    }

    #[test]
    fn test_fail_writes_leaves_previous_contents() {
        let mock = MockPal::new();
        let path = FilePath::from("db.json");
        mock.add_file(path.clone(), b"old".to_vec());

        mock.set_fail_writes(true);
        assert!(mock.write_file(&path, b"new").is_err());
        assert_eq!(mock.file_contents(&path), Some(b"old".to_vec()));

        mock.set_fail_writes(false);
        mock.write_file(&path, b"new").unwrap();
        assert_eq!(mock.file_contents(&path), Some(b"new".to_vec()));
    }

    #[derive(Debug)]
    struct TestHttpService;

    impl HttpService for TestHttpService {
        fn handle_request(&self, request: HttpRequest) -> BookshelfResult<HttpResponse> {
            match request.path() {
                "/books" => Ok(HttpResponse::json(HttpStatusCode::Ok, "[]")),
                _ => Ok(HttpResponse::not_found()),
            }
        }
    }

    #[test]
    fn test_simulate_request() {
        let pal = MockPal::new();
        let handle = pal
            .start_http_server(
                Box::new(TestHttpService),
                HttpServerConfig::new("127.0.0.1").with_port(3000),
            )
            .unwrap();
        assert_eq!(handle.port(), 3000);
        assert_eq!(pal.http_server_count(), 1);

        let response = pal
            .simulate_request(3000, HttpRequest::new(HttpMethod::Get, "/books"))
            .unwrap();
        assert_eq!(response.status(), HttpStatusCode::Ok);
        assert_eq!(response.body().as_string(), Some("[]".to_string()));

        let response = pal
            .simulate_request(3000, HttpRequest::new(HttpMethod::Get, "/nope"))
            .unwrap();
        assert_eq!(response.status(), HttpStatusCode::NotFound);
    }

    #[test]
    fn test_simulate_request_invalid_port() {
        let pal = MockPal::new();
        let request = HttpRequest::new(HttpMethod::Get, "/books");
        assert!(pal.simulate_request(1, request).is_err());
    }

    #[test]
    fn test_auto_assigned_ports_are_distinct() {
        let pal = MockPal::new();
        let first = pal
            .start_http_server(Box::new(TestHttpService), HttpServerConfig::default())
            .unwrap();
        let second = pal
            .start_http_server(Box::new(TestHttpService), HttpServerConfig::default())
            .unwrap();
        assert_ne!(first.port(), second.port());
        assert_eq!(pal.http_server_count(), 2);
    }
}
