pub mod file;
pub mod memory;
pub mod traits;

pub use file::JsonFileStore;
pub use memory::{CollectionData, InMemoryStore};
pub use traits::{DocumentStore, StoreHandle};
