use std::io;
use std::path::PathBuf;

/// Errors surfaced while opening or committing a metadata container.
///
/// Missing tags, malformed orientation values and an unbound destination are
/// not errors and never produce one of these.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The file could not be read or its metadata could not be parsed.
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file extension does not name a container we can write.
    #[error("unsupported image format: {}", .path.display())]
    UnsupportedFormat { path: PathBuf },

    /// Writing the updated metadata back to disk failed.
    #[error("failed to save metadata to {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TransferError {
    pub(crate) fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn save(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Save {
            path: path.into(),
            source,
        }
    }
}
