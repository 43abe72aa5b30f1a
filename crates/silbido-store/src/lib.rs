//! Patch dataset store
//!
//! Append-only, chunked storage for (spectrogram, mask, positive flag)
//! training patches, with the bounded-memory block writer that fills it and
//! the shuffle and split utilities that post-process it.

pub mod block;
pub mod error;
pub mod format;
pub mod reader;
pub mod shuffle;
pub mod split;
pub mod writer;

pub use block::{BlockSink, BlockView, BlockWriter, PatchBlock};
pub use error::{Result, StoreError};
pub use format::{ArrayName, StoreHeader};
pub use reader::StoreReader;
pub use shuffle::{permutation, shuffle_store, ShuffleSummary};
pub use split::{split_store, SplitSummary, SplitWriters};
pub use writer::{StoreOptions, StoreWriter};
