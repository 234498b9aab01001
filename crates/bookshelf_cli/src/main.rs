/* 📖 # Why is the CLI minimal?

There are no arguments; everything is configured through the environment (see
`bookshelf_engine::config`). The binary loads the database, starts the server and blocks
until the server stops.

Exit codes:
- 0: the server stopped
- 1: configuration, database or server error
*/

use std::env;
use std::process;

use tracing::info;

use bookshelf_base::tracing::init_tracing;
use bookshelf_base::{BookshelfResult, PalHandle, RealPal, ResultExt};
use bookshelf_engine::{ApiService, JsonFileStore, ServerConfig, StoreHandle};

fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("Error: Failed to initialize logging: {}", e);
        process::exit(1);
    }

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> BookshelfResult<()> {
    let config = ServerConfig::from_env().context("Invalid configuration")?;
    let current_dir = env::current_dir()
        .map_err(|e| bookshelf_base::err!("Failed to get current directory: {}", e))?;

    let (base_dir, database) = config.database_location(&current_dir);
    let pal = PalHandle::new(RealPal::new(base_dir.clone()));
    let store = JsonFileStore::open(pal.clone(), database.clone())?;
    info!(
        mode = ?config.mode,
        database = %base_dir.join(database.as_path()).display(),
        "database loaded"
    );

    let service = ApiService::new(StoreHandle::new(store), &config);
    let handle = pal.start_http_server(Box::new(service), config.http_server_config())?;
    info!("Server running: {}", handle.port());

    handle.join().context("HTTP server failed")
}
