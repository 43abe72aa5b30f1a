//! Patch store (.patches) file format structures
//!
//! Little-endian. A 64 byte header is followed by blocks, one per flush.
//! Each block stores a run of rows for all three arrays (`data`, `label`,
//! `positive_flag`), so the row axis grows without bound while the other
//! dimensions stay fixed to the patch shape.

use crate::error::{Result, StoreError};
use crc::{Crc, CRC_64_ECMA_182};
use std::fmt;

/// Magic bytes for patch stores: "WPCH"
pub const MAGIC: [u8; 4] = *b"WPCH";

/// Magic bytes opening every block: "BLK0"
pub const BLOCK_MAGIC: [u8; 4] = *b"BLK0";

/// Current format version
pub const VERSION: u16 = 1;

/// Header size in bytes
pub const HEADER_LEN: usize = 64;

/// Block header size in bytes
pub const BLOCK_HEADER_LEN: usize = 40;

/// Header flag: block payloads are zstd frames
pub const FLAG_COMPRESSED: u16 = 0x1;

/// Checksum over the stored block payloads
pub const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_ECMA_182);

/// The three parallel arrays of a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayName {
    Data,
    Label,
    PositiveFlag,
}

impl ArrayName {
    pub const ALL: [ArrayName; 3] = [ArrayName::Data, ArrayName::Label, ArrayName::PositiveFlag];

    pub fn as_str(self) -> &'static str {
        match self {
            ArrayName::Data => "data",
            ArrayName::Label => "label",
            ArrayName::PositiveFlag => "positive_flag",
        }
    }
}

impl fmt::Display for ArrayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File header (64 bytes fixed size)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreHeader {
    /// Magic bytes: "WPCH"
    pub magic: [u8; 4],
    /// Format version
    pub version: u16,
    /// Flags (bit 0: compressed)
    pub flags: u16,
    /// Rows in every array
    pub num_rows: u64,
    /// Blocks following the header
    pub num_blocks: u32,
    /// Patch height
    pub freq_bins: u32,
    /// Patch width
    pub time_bins: u32,
}

impl StoreHeader {
    pub fn new(freq_bins: u32, time_bins: u32) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            flags: 0,
            num_rows: 0,
            num_blocks: 0,
            freq_bins,
            time_bins,
        }
    }

    pub fn is_compressed(&self) -> bool {
        (self.flags & FLAG_COMPRESSED) != 0
    }

    pub fn set_compressed(&mut self, compressed: bool) {
        if compressed {
            self.flags |= FLAG_COMPRESSED;
        } else {
            self.flags &= !FLAG_COMPRESSED;
        }
    }

    /// (freq_bins, time_bins)
    pub fn shape(&self) -> (usize, usize) {
        (self.freq_bins as usize, self.time_bins as usize)
    }

    /// Values per patch in `data` and `label`
    pub fn patch_len(&self) -> usize {
        self.freq_bins as usize * self.time_bins as usize
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..6].copy_from_slice(&self.version.to_le_bytes());
        buf[6..8].copy_from_slice(&self.flags.to_le_bytes());
        buf[8..16].copy_from_slice(&self.num_rows.to_le_bytes());
        buf[16..20].copy_from_slice(&self.num_blocks.to_le_bytes());
        buf[20..24].copy_from_slice(&self.freq_bins.to_le_bytes());
        buf[24..28].copy_from_slice(&self.time_bins.to_le_bytes());
        // 28..64 reserved
        buf
    }

    /// Parse a header; magic and version are checked by the caller
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_LEN {
            return Err(StoreError::Truncated(format!(
                "header needs {} bytes, found {}",
                HEADER_LEN,
                buf.len()
            )));
        }

        Ok(Self {
            magic: array(&buf[0..4]),
            version: u16::from_le_bytes(array(&buf[4..6])),
            flags: u16::from_le_bytes(array(&buf[6..8])),
            num_rows: u64::from_le_bytes(array(&buf[8..16])),
            num_blocks: u32::from_le_bytes(array(&buf[16..20])),
            freq_bins: u32::from_le_bytes(array(&buf[20..24])),
            time_bins: u32::from_le_bytes(array(&buf[24..28])),
        })
    }
}

/// Header preceding each block's payloads (40 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Rows in this block
    pub rows: u32,
    /// Stored (possibly compressed) payload lengths
    pub data_len: u64,
    pub label_len: u64,
    pub flag_len: u64,
    /// CRC-64 over the three stored payloads
    pub checksum: u64,
}

impl BlockHeader {
    pub fn payload_len(&self) -> u64 {
        self.data_len + self.label_len + self.flag_len
    }

    pub fn to_bytes(&self) -> [u8; BLOCK_HEADER_LEN] {
        let mut buf = [0u8; BLOCK_HEADER_LEN];
        buf[0..4].copy_from_slice(&BLOCK_MAGIC);
        buf[4..8].copy_from_slice(&self.rows.to_le_bytes());
        buf[8..16].copy_from_slice(&self.data_len.to_le_bytes());
        buf[16..24].copy_from_slice(&self.label_len.to_le_bytes());
        buf[24..32].copy_from_slice(&self.flag_len.to_le_bytes());
        buf[32..40].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8], block: usize) -> Result<Self> {
        if buf.len() < BLOCK_HEADER_LEN {
            return Err(StoreError::Truncated(format!("block {} header", block)));
        }
        if buf[0..4] != BLOCK_MAGIC {
            return Err(StoreError::Corrupt {
                block,
                reason: "block magic bytes mismatch".to_string(),
            });
        }

        Ok(Self {
            rows: u32::from_le_bytes(array(&buf[4..8])),
            data_len: u64::from_le_bytes(array(&buf[8..16])),
            label_len: u64::from_le_bytes(array(&buf[16..24])),
            flag_len: u64::from_le_bytes(array(&buf[24..32])),
            checksum: u64::from_le_bytes(array(&buf[32..40])),
        })
    }
}

/// f32 values as little-endian bytes
pub fn encode_f32<'a>(values: impl IntoIterator<Item = &'a f32>) -> Vec<u8> {
    values.into_iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Little-endian bytes back to f32 values
pub fn decode_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(array(chunk)))
        .collect()
}

fn array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}
