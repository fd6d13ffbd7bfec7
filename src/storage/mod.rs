pub mod blob;

use std::path::PathBuf;

use thiserror::Error;

pub use blob::{sanitize_filename, validate_session_id, StoredUpload, UploadStore};

/// Errors from the on-disk upload store.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The session id cannot be used as a directory name
    #[error("Invalid session id: {0}")]
    InvalidSessionId(String),

    /// Writing the upload to disk failed
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
