//! Patch store errors

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("block capacity must be at least 1")]
    ZeroCapacity,

    #[error("patch shape {found:?} does not match store shape {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("patch store {} has not been created", path.display())]
    NotCreated { path: PathBuf },

    #[error("{} is not a patch store (magic bytes mismatch)", path.display())]
    BadMagic { path: PathBuf },

    #[error("unsupported patch store version {0}")]
    UnsupportedVersion(u16),

    #[error("patch store truncated: {0}")]
    Truncated(String),

    #[error("checksum mismatch in block {block}")]
    Checksum { block: usize },

    #[error("corrupt block {block}: {reason}")]
    Corrupt { block: usize, reason: String },

    #[error("failed to {action} {}", path.display())]
    File {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
