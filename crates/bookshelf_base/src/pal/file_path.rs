use relative_path::{RelativePath, RelativePathBuf};
use std::path::Path;

/* 📖 # Why use RelativePathBuf for FilePath?

Every path handed to the PAL is resolved against the PAL's base directory. Wrapping
RelativePathBuf makes that explicit in the type, so the database file name in the config
cannot silently become an absolute path somewhere else on disk.
*/

/// Type-safe wrapper for file paths relative to the PAL base directory.
///
/// # Examples
///
/// ```
/// use bookshelf_base::FilePath;
///
/// let db = FilePath::from("data/db.json");
/// assert_eq!(db.to_string(), "data/db.json");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilePath(RelativePathBuf);

impl FilePath {
    /// Converts to a regular Path for use with std::fs operations.
    /// This returns the relative path portion without a base directory.
    pub fn as_path(&self) -> &Path {
        Path::new(self.0.as_str())
    }

    /// The containing directory, if the path has more than one component.
    pub fn parent(&self) -> Option<FilePath> {
        self.0
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .map(FilePath::from)
    }
}

impl From<&str> for FilePath {
    fn from(s: &str) -> Self {
        Self(RelativePathBuf::from(s))
    }
}

impl From<String> for FilePath {
    fn from(s: String) -> Self {
        Self(RelativePathBuf::from(s))
    }
}

impl From<&RelativePath> for FilePath {
    fn from(p: &RelativePath) -> Self {
        Self(p.to_relative_path_buf())
    }
}

impl std::fmt::Display for FilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
