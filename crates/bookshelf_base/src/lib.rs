/* 📖 # Why have bookshelf_base as a core library?
bookshelf_base provides the error handling, tracing setup and platform abstraction
used by the engine and the binary. Keeping them here prevents circular dependencies
and lets the engine be tested against MockPal without touching disk or sockets.
*/

pub mod error;
pub mod pal;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{BookshelfError, BookshelfResult, ErrorKind, ResultExt};
pub use pal::{FilePath, MockPal, Pal, PalHandle, RealPal};
