use std::io::Read;
use std::sync::Arc;

use crate::BookshelfResult;

use super::file_path::FilePath;
use super::http::{HttpServerConfig, HttpServerHandle, HttpService};

/* 📖 # Why is Pal a trait instead of a struct?

1. **Testability**: MockPal implements Pal for fast, deterministic tests without filesystem side effects
2. **Flexibility**: the document store and the binary depend on the abstraction, not on std::fs or tiny_http
*/

/// Platform Abstraction Layer (PAL) trait providing file and HTTP server operations.
///
/// Two implementations are provided:
/// - `RealPal`: the real filesystem via `std::fs` and a tiny_http server
/// - `MockPal`: in-memory files and simulated requests for testing
pub trait Pal: std::fmt::Debug + Send + Sync + 'static {
    /// Check if a file exists at the given path.
    fn file_exists(&self, path: &FilePath) -> BookshelfResult<bool>;

    /// Open a file for reading.
    fn read_file(&self, path: &FilePath) -> BookshelfResult<Box<dyn Read + 'static>>;

    /// Read entire file contents as a UTF-8 string.
    fn read_file_to_string(&self, path: &FilePath) -> BookshelfResult<String> {
        let mut reader = self.read_file(path)?;
        let mut contents = Vec::new();
        reader
            .read_to_end(&mut contents)
            .map_err(|e| Box::new(crate::BookshelfError::file_error(path.as_path(), e)))?;
        String::from_utf8(contents).map_err(|_e| crate::err!("File is not valid UTF-8: {}", path))
    }

    /// Replace the contents of a file.
    ///
    /// Readers observe either the old or the new contents, never a partial write.
    /// Missing parent directories are created.
    fn write_file(&self, path: &FilePath, contents: &[u8]) -> BookshelfResult<()>;

    /// Start an HTTP server with the given service.
    ///
    /// The server listens immediately. It stops accepting connections once the last
    /// clone of the returned handle is dropped or `shutdown()` is called.
    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> BookshelfResult<HttpServerHandle>;
}

/// Handle to a PAL implementation, enabling shared ownership.
///
/// # Examples
///
/// ```no_run
/// use bookshelf_base::{RealPal, PalHandle};
///
/// let pal = PalHandle::new(RealPal::new(".".into()));
/// let pal_clone = pal.clone(); // Cheap clone, shares the same implementation
/// ```
#[derive(Debug, Clone)]
pub struct PalHandle(Arc<dyn Pal>);

impl PalHandle {
    pub fn new(pal: impl Pal + 'static) -> Self {
        Self(Arc::new(pal))
    }
}

impl std::ops::Deref for PalHandle {
    type Target = dyn Pal;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}
