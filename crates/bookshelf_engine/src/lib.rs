/* 📖 # What lives in bookshelf_engine?

The JSON document API: four fixed collections of open JSON documents, a store that keeps
them (optionally persisted to a JSON file) and the request pipeline that serves them over
HTTP. The engine never touches sockets or the filesystem directly; everything goes through
the PAL from bookshelf_base.
*/

pub mod api;
pub mod clock;
pub mod config;
pub mod document;
pub mod store;

pub use api::ApiService;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Credentials, Mode, ServerConfig};
pub use document::{Collection, Document, DocumentId};
pub use store::{DocumentStore, InMemoryStore, JsonFileStore, StoreHandle};
