//! Positive/negative split
//!
//! Streams a store block by block and routes each row to one of two
//! independent writers according to its `positive_flag`.

use crate::block::BlockWriter;
use crate::error::Result;
use crate::reader::StoreReader;
use crate::writer::{StoreOptions, StoreWriter};
use std::path::Path;

/// Rows written to each output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitSummary {
    pub positive_rows: u64,
    pub negative_rows: u64,
}

/// One buffered writer per output store
pub struct SplitWriters {
    pub positive: BlockWriter<StoreWriter>,
    pub negative: BlockWriter<StoreWriter>,
}

impl SplitWriters {
    /// Each writer gets half of `block_size` rows of buffer (at least one)
    pub fn new(
        positive_path: &Path,
        negative_path: &Path,
        block_size: usize,
        options: StoreOptions,
    ) -> Result<Self> {
        let half = (block_size / 2).max(1);
        Ok(Self {
            positive: BlockWriter::new(StoreWriter::new(positive_path, options), half)?,
            negative: BlockWriter::new(StoreWriter::new(negative_path, options), half)?,
        })
    }

    pub fn finish(self) -> Result<SplitSummary> {
        let positive = self.positive.finish()?;
        let negative = self.negative.finish()?;
        Ok(SplitSummary {
            positive_rows: positive.rows(),
            negative_rows: negative.rows(),
        })
    }
}

/// Split `input` into a positive and a negative store.
///
/// An output that receives no rows is not created.
pub fn split_store(
    input: &Path,
    positive_path: &Path,
    negative_path: &Path,
    block_size: usize,
    options: StoreOptions,
) -> Result<SplitSummary> {
    let reader = StoreReader::open(input)?;
    let mut writers = SplitWriters::new(positive_path, negative_path, block_size, options)?;

    log::info!(
        "Splitting {} rows of {} by positive flag",
        reader.len(),
        input.display()
    );

    for block in reader.blocks() {
        let block = block?;
        for index in 0..block.rows() {
            let (spectrogram, mask, positive) = block.row(index);
            let writer = if positive {
                &mut writers.positive
            } else {
                &mut writers.negative
            };
            writer.push(spectrogram, mask, positive)?;
        }
    }

    writers.finish()
}
