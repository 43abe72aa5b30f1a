//! Annotation codec errors

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TonalError {
    /// The stream ended in the middle of a header or record
    #[error("annotation stream truncated while reading {context}")]
    Truncated { context: &'static str },

    #[error("invalid UTF-8 in {context}")]
    Utf8 {
        context: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("string of {0} bytes does not fit a u16 length prefix")]
    StringTooLong(usize),

    #[error("contour of {0} nodes does not fit a u32 node count")]
    TooManyNodes(usize),

    #[error("failed to open annotation file {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TonalError>;
