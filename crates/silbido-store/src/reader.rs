//! Patch store reader

use crate::block::PatchBlock;
use crate::error::{Result, StoreError};
use crate::format::{
    decode_f32, ArrayName, BlockHeader, StoreHeader, BLOCK_HEADER_LEN, CRC64, HEADER_LEN, MAGIC,
    VERSION,
};
use memmap2::Mmap;
use ndarray::{concatenate, Array1, Array3, Axis};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Location of one block inside the file
#[derive(Debug, Clone, Copy)]
struct BlockEntry {
    header: BlockHeader,
    /// Offset of the first payload byte
    payload_offset: usize,
}

pub struct StoreReader {
    path: PathBuf,
    mmap: Mmap,
    header: StoreHeader,
    blocks: Vec<BlockEntry>,
}

impl StoreReader {
    /// Open a store and index its blocks
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| StoreError::File {
            action: "open patch store",
            path: path.to_path_buf(),
            source,
        })?;

        // SAFETY: the store is only appended to by a writer owning the file;
        // readers never run while a writer of the same path is active.
        let mmap = unsafe { Mmap::map(&file)? };

        let header = StoreHeader::from_bytes(&mmap)?;
        if header.magic != MAGIC {
            return Err(StoreError::BadMagic {
                path: path.to_path_buf(),
            });
        }
        if header.version != VERSION {
            return Err(StoreError::UnsupportedVersion(header.version));
        }

        let blocks = index_blocks(&mmap, &header)?;

        log::debug!(
            "Opened patch store {}: {} rows in {} blocks",
            path.display(),
            header.num_rows,
            blocks.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            header,
            blocks,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &StoreHeader {
        &self.header
    }

    /// Rows in every array
    pub fn len(&self) -> u64 {
        self.header.num_rows
    }

    pub fn is_empty(&self) -> bool {
        self.header.num_rows == 0
    }

    /// (freq_bins, time_bins)
    pub fn shape(&self) -> (usize, usize) {
        self.header.shape()
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Decode block `index`, verifying its checksum
    pub fn read_block(&self, index: usize) -> Result<PatchBlock> {
        let entry = self.blocks.get(index).ok_or_else(|| StoreError::Corrupt {
            block: index,
            reason: format!("store has only {} blocks", self.blocks.len()),
        })?;

        let rows = entry.header.rows as usize;
        let (freq_bins, time_bins) = self.shape();

        let data_start = entry.payload_offset;
        let label_start = data_start + entry.header.data_len as usize;
        let flag_start = label_start + entry.header.label_len as usize;
        let end = flag_start + entry.header.flag_len as usize;

        let payload = &self.mmap[data_start..end];
        if CRC64.checksum(payload) != entry.header.checksum {
            return Err(StoreError::Checksum { block: index });
        }

        let patch_values = rows * freq_bins * time_bins;
        let data = self.decode_array(
            index,
            ArrayName::Data,
            &self.mmap[data_start..label_start],
            patch_values,
        )?;
        let label = self.decode_array(
            index,
            ArrayName::Label,
            &self.mmap[label_start..flag_start],
            patch_values,
        )?;
        let flags = self.decode_array(
            index,
            ArrayName::PositiveFlag,
            &self.mmap[flag_start..end],
            rows,
        )?;

        let shape_err = |e: ndarray::ShapeError| StoreError::Corrupt {
            block: index,
            reason: e.to_string(),
        };

        Ok(PatchBlock {
            data: Array3::from_shape_vec((rows, freq_bins, time_bins), data).map_err(shape_err)?,
            label: Array3::from_shape_vec((rows, freq_bins, time_bins), label).map_err(shape_err)?,
            positive_flag: Array1::from_vec(flags),
        })
    }

    /// Blocks in row order
    pub fn blocks(&self) -> impl Iterator<Item = Result<PatchBlock>> + '_ {
        (0..self.blocks.len()).map(move |index| self.read_block(index))
    }

    /// Every row in memory at once
    pub fn read_all(&self) -> Result<PatchBlock> {
        let blocks = self.blocks().collect::<Result<Vec<_>>>()?;
        if blocks.is_empty() {
            return Ok(PatchBlock::empty(self.shape()));
        }

        let join_err = |e: ndarray::ShapeError| StoreError::Corrupt {
            block: 0,
            reason: e.to_string(),
        };

        let data: Vec<_> = blocks.iter().map(|b| b.data.view()).collect();
        let label: Vec<_> = blocks.iter().map(|b| b.label.view()).collect();
        let flags: Vec<_> = blocks.iter().map(|b| b.positive_flag.view()).collect();

        Ok(PatchBlock {
            data: concatenate(Axis(0), &data).map_err(join_err)?,
            label: concatenate(Axis(0), &label).map_err(join_err)?,
            positive_flag: concatenate(Axis(0), &flags).map_err(join_err)?,
        })
    }

    /// The `positive_flag` array alone
    pub fn positive_flags(&self) -> Result<Vec<f32>> {
        let mut flags = Vec::with_capacity(self.header.num_rows as usize);
        for block in self.blocks() {
            flags.extend(block?.positive_flag.iter().copied());
        }
        Ok(flags)
    }

    fn decode_array(
        &self,
        block: usize,
        name: ArrayName,
        stored: &[u8],
        expected: usize,
    ) -> Result<Vec<f32>> {
        let bytes = if self.header.is_compressed() {
            zstd::decode_all(stored).map_err(|e| StoreError::Corrupt {
                block,
                reason: format!("{} payload: {}", name, e),
            })?
        } else {
            stored.to_vec()
        };

        let values = decode_f32(&bytes);
        if values.len() != expected || bytes.len() % 4 != 0 {
            return Err(StoreError::Corrupt {
                block,
                reason: format!(
                    "{} payload holds {} values, expected {}",
                    name,
                    values.len(),
                    expected
                ),
            });
        }
        Ok(values)
    }
}

fn index_blocks(bytes: &[u8], header: &StoreHeader) -> Result<Vec<BlockEntry>> {
    let mut blocks = Vec::with_capacity(header.num_blocks as usize);
    let mut offset = HEADER_LEN;
    let mut rows = 0u64;

    for index in 0..header.num_blocks as usize {
        let end = offset + BLOCK_HEADER_LEN;
        if end > bytes.len() {
            return Err(StoreError::Truncated(format!("block {} header", index)));
        }

        let block_header = BlockHeader::from_bytes(&bytes[offset..end], index)?;
        let payload_end = end as u64 + block_header.payload_len();
        if payload_end > bytes.len() as u64 {
            return Err(StoreError::Truncated(format!("block {} payload", index)));
        }

        blocks.push(BlockEntry {
            header: block_header,
            payload_offset: end,
        });
        rows += u64::from(block_header.rows);
        offset = payload_end as usize;
    }

    if rows != header.num_rows {
        return Err(StoreError::Corrupt {
            block: blocks.len().saturating_sub(1),
            reason: format!("blocks hold {} rows, header declares {}", rows, header.num_rows),
        });
    }

    Ok(blocks)
}
