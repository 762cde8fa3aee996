use std::path::PathBuf;

use thiserror::Error;

/// Failure classes shared by indexing and extraction.
#[derive(Debug, Error)]
pub enum TilingError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("unsupported format: {0}")]
    FormatUnsupported(String),

    #[error("corrupted data: {0}")]
    DataCorruption(String),

    #[error("no tile index for {}, build one first", .0.display())]
    MissingIndex(PathBuf),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] las::Error),
}

pub type Result<T> = std::result::Result<T, TilingError>;
