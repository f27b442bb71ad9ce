use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("save file not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("nothing stored under '{key}' (expected {})", .path.display())]
    EmptySlot { key: String, path: PathBuf },

    #[error("invalid save name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("no save named '{0}'")]
    UnknownSave(String),

    #[error("catalog line {line}: {message}")]
    Catalog { line: usize, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no save file found under {}", .0.display())]
    NoSaveFile(PathBuf),

    #[error("aborted by user")]
    Aborted,

    #[error("prompt: {0}")]
    Prompt(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Attach the offending path to an I/O error.
pub(crate) trait IoContext<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io { path: path.into(), source })
    }
}
