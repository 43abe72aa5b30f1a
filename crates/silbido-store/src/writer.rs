//! Patch store writer
//!
//! The file is created by the first block. Every block is appended and
//! synced before the header is rewritten with the new row count, so a run
//! that stops early leaves a readable store holding every completed block.

use crate::block::{BlockSink, BlockView};
use crate::error::{Result, StoreError};
use crate::format::{encode_f32, BlockHeader, StoreHeader, BLOCK_HEADER_LEN, CRC64, HEADER_LEN};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Payload encoding options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Compress block payloads with zstd
    pub compress: bool,
    pub compression_level: i32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            compress: true,
            compression_level: 3,
        }
    }
}

pub struct StoreWriter {
    path: PathBuf,
    options: StoreOptions,
    file: Option<File>,
    header: Option<StoreHeader>,
    /// Byte offset just past the last complete block
    end: u64,
}

impl StoreWriter {
    /// Writer for `path`; nothing is written until the first block
    pub fn new(path: impl Into<PathBuf>, options: StoreOptions) -> Self {
        Self {
            path: path.into(),
            options,
            file: None,
            header: None,
            end: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the backing file exists yet
    pub fn is_created(&self) -> bool {
        self.file.is_some()
    }

    pub fn rows(&self) -> u64 {
        self.header.as_ref().map_or(0, |h| h.num_rows)
    }

    fn write_block(&mut self, block: BlockView<'_>) -> Result<()> {
        let (Some(file), Some(header)) = (self.file.as_mut(), self.header.as_mut()) else {
            return Err(StoreError::NotCreated {
                path: self.path.clone(),
            });
        };

        let found = block.patch_shape();
        if found != header.shape() {
            return Err(StoreError::ShapeMismatch {
                expected: header.shape(),
                found,
            });
        }

        let data = encode_payload(encode_f32(block.data.iter()), &self.options)?;
        let label = encode_payload(encode_f32(block.label.iter()), &self.options)?;
        let flags = encode_payload(encode_f32(block.positive_flag.iter()), &self.options)?;

        let mut digest = CRC64.digest();
        digest.update(&data);
        digest.update(&label);
        digest.update(&flags);

        let block_header = BlockHeader {
            rows: block.rows() as u32,
            data_len: data.len() as u64,
            label_len: label.len() as u64,
            flag_len: flags.len() as u64,
            checksum: digest.finalize(),
        };

        // Blocks go right after the last complete one; a torn earlier
        // attempt is overwritten and cut off.
        let start = self.end;
        let block_end = start + (BLOCK_HEADER_LEN as u64) + block_header.payload_len();
        let header_bytes = block_header.to_bytes();
        let parts: [&[u8]; 4] = [&header_bytes, &data, &label, &flags];
        if let Err(err) = write_at(file, start, &parts, block_end) {
            if let Err(truncate) = file.set_len(start) {
                log::warn!(
                    "Failed to drop partial block from {}: {}",
                    self.path.display(),
                    truncate
                );
            }
            return Err(err.into());
        }
        self.end = block_end;

        header.num_rows += block.rows() as u64;
        header.num_blocks += 1;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&header.to_bytes())?;
        file.sync_data()?;

        log::debug!(
            "Appended {} rows to {} ({} stored bytes, {} rows total)",
            block.rows(),
            self.path.display(),
            block_header.payload_len(),
            header.num_rows
        );
        Ok(())
    }
}

impl BlockSink for StoreWriter {
    fn create(&mut self, block: BlockView<'_>) -> Result<()> {
        let (freq_bins, time_bins) = block.patch_shape();
        let mut header = StoreHeader::new(freq_bins as u32, time_bins as u32);
        header.set_compressed(self.options.compress);

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|source| StoreError::File {
                action: "create patch store",
                path: self.path.clone(),
                source,
            })?;
        file.write_all(&header.to_bytes())?;
        self.end = HEADER_LEN as u64;

        log::info!(
            "Created patch store {} with patch shape {}x{}",
            self.path.display(),
            freq_bins,
            time_bins
        );

        self.file = Some(file);
        self.header = Some(header);
        self.write_block(block)
    }

    fn append(&mut self, block: BlockView<'_>) -> Result<()> {
        self.write_block(block)
    }
}

/// Write `parts` from `start` on and cut the file at `end`
fn write_at(file: &mut File, start: u64, parts: &[&[u8]], end: u64) -> std::io::Result<()> {
    file.seek(SeekFrom::Start(start))?;
    for part in parts {
        file.write_all(part)?;
    }
    file.set_len(end)?;
    file.sync_data()
}

fn encode_payload(bytes: Vec<u8>, options: &StoreOptions) -> Result<Vec<u8>> {
    if options.compress {
        Ok(zstd::encode_all(&bytes[..], options.compression_level)?)
    } else {
        Ok(bytes)
    }
}
