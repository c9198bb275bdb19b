use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage file is corrupt: {path}")]
    Corrupt { path: PathBuf },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no local data directory found")]
    NoDataDir,

    #[error("storage lock poisoned")]
    Poisoned,
}
