/* 📖 # How is the server configured?

Everything comes from environment variables, read once at startup:

| Variable        | Default   | Meaning                                             |
|-----------------|-----------|-----------------------------------------------------|
| `PORT`          | `3000`    | listening port                                      |
| `HOST`          | `0.0.0.0` | listening address                                   |
| `BOOKSHELF_ENV` | unset     | `test` selects test mode, anything else the default |
| `BOOKSHELF_DB`  | by mode   | path of the JSON database file                      |

The mode picks both the database file (`db.test.json` vs `db.json`) and the admin
password (`admin_test` vs `admin`). The admin username is `admin` in either mode.
*/

use std::env;
use std::path::{Path, PathBuf};

use bookshelf_base::pal::http::HttpServerConfig;
use bookshelf_base::{BookshelfResult, FilePath};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const ADMIN_USERNAME: &str = "admin";

/// Which persistence target and admin password to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Default,
    Test,
}

impl Mode {
    pub fn database_file(&self) -> &'static str {
        match self {
            Mode::Default => "db.json",
            Mode::Test => "db.test.json",
        }
    }

    pub fn admin_password(&self) -> &'static str {
        match self {
            Mode::Default => "admin",
            Mode::Test => "admin_test",
        }
    }
}

/// The single credential pair accepted on gated routes.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The admin credentials for a mode.
    pub fn admin(mode: Mode) -> Self {
        Self::new(ADMIN_USERNAME, mode.admin_password())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub mode: Mode,
    pub database: String,
    pub credentials: Credentials,
}

impl ServerConfig {
    /// Defaults for a mode.
    pub fn for_mode(mode: Mode) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            mode,
            database: mode.database_file().to_string(),
            credentials: Credentials::admin(mode),
        }
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> BookshelfResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read the configuration through a variable lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> BookshelfResult<Self> {
        let mode = match lookup("BOOKSHELF_ENV").as_deref() {
            Some("test") => Mode::Test,
            _ => Mode::Default,
        };
        let mut config = Self::for_mode(mode);

        if let Some(port) = lookup("PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| bookshelf_base::err!("Invalid PORT '{}'", port))?;
        }
        if let Some(host) = lookup("HOST").filter(|host| !host.is_empty()) {
            config.host = host;
        }
        if let Some(database) = lookup("BOOKSHELF_DB").filter(|db| !db.is_empty()) {
            config.database = database;
        }
        Ok(config)
    }

    pub fn http_server_config(&self) -> HttpServerConfig {
        HttpServerConfig::new(self.host.clone()).with_port(self.port)
    }

    /// `host:port` as clients would address the server without a Host header.
    pub fn public_address(&self) -> String {
        let host = if self.host == DEFAULT_HOST {
            "localhost"
        } else {
            self.host.as_str()
        };
        format!("{}:{}", host, self.port)
    }

    /// Split the database path into the directory a PAL should be rooted at and the file
    /// name within it. Relative paths are resolved against `current_dir`.
    pub fn database_location(&self, current_dir: &Path) -> (PathBuf, FilePath) {
        let full = current_dir.join(&self.database);
        let base = full
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| current_dir.to_path_buf());
        let file = full
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.database.clone());
        (base, FilePath::from(file))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::for_mode(Mode::Default)
    }
}
