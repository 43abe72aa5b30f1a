//! Silbido tonal annotation format library
//!
//! Decodes and encodes the binary contour annotations produced by the
//! silbido whistle detector and annotation tools.

pub mod error;
pub mod format;
pub mod reader;
pub mod writer;

pub use error::{Result, TonalError};
pub use format::{
    FeatureMask, TimeFrequencyNode, Tonal, TonalHeader, HEADER_FIXED_LEN, MAGIC,
    SYNTHETIC_GRAPH_ID, VERSION,
};
pub use reader::TonalReader;
pub use writer::{write_time_frequency_file, TonalWriter};
