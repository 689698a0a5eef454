use std::io;
use std::path::PathBuf;

/// Error conditions for path resolution and file-info extraction.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// A virtual path referenced a drive that is unknown or not mounted.
    #[error("invalid drive {drive}")]
    InvalidDrive {
        /// The drive number from the `n:/` prefix.
        drive: u32,
    },

    /// An underlying read failed.
    #[error("i/o error on {path}")]
    Io {
        /// The file the operation was reading.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Settings JSON could not be deserialized.
    #[error("invalid settings: {0}")]
    InvalidSettings(#[from] serde_json::Error),

    /// A configured filter pattern failed to compile.
    #[error("invalid filter pattern {pattern:?}")]
    InvalidFilter {
        /// The offending pattern text.
        pattern: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// The operation was cancelled via its [`CancellationToken`].
    ///
    /// [`CancellationToken`]: crate::CancellationToken
    #[error("operation was cancelled")]
    Cancelled,
}

impl FileError {
    /// Wrap an I/O error with the path it occurred on.
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> FileError {
        let path = path.into();
        move |source| FileError::Io { path, source }
    }
}
