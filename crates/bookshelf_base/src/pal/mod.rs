/* 📖 # What is the Platform Abstraction Layer?

The PAL is the only place that touches the filesystem or opens sockets. The engine talks to
the `Pal` trait, so the same store and service code runs against RealPal in production and
against MockPal in tests, where files live in a HashMap and HTTP requests are handed
straight to the service.
*/

mod file_path;
pub mod http;
pub mod mock;
pub mod real_pal;
mod traits;

pub use file_path::FilePath;
pub use mock::MockPal;
pub use real_pal::RealPal;
pub use traits::{Pal, PalHandle};
