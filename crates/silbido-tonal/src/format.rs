//! Silbido annotation (.bin) format structures
//!
//! All multi-byte fields are big-endian. A file is an optional header
//! followed by tonal records until end of stream.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// Magic bytes opening a file with a header: "silbido!"
pub const MAGIC: [u8; 8] = *b"silbido!";

/// Format version written by the encoder
pub const VERSION: u16 = 4;

/// Bytes consumed by magic, version, mask, user version and header size
pub const HEADER_FIXED_LEN: u32 = MAGIC.len() as u32 + 3 * 2 + 4;

/// Graph identifier written for every contour by the encoder
pub const SYNTHETIC_GRAPH_ID: i64 = 14567891234567891234u64 as i64;

/// First format version carrying a graph identifier per tonal
pub const GRAPH_ID_MIN_VERSION: i32 = 3;

/// Feature bit-mask describing which optional fields are stored
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureMask(u16);

impl FeatureMask {
    // Per-node features
    pub const TIME: Self = Self(1);
    pub const FREQ: Self = Self(1 << 1);
    pub const SNR: Self = Self(1 << 2);
    pub const PHASE: Self = Self(1 << 3);
    pub const RIDGE: Self = Self(1 << 6);

    // Per-tonal features
    pub const SCORE: Self = Self(1 << 4);
    pub const CONFIDENCE: Self = Self(1 << 5);
    pub const SPECIES: Self = Self(1 << 9);
    pub const CALL: Self = Self(1 << 10);

    // Header features
    pub const TIMESTAMP: Self = Self(1 << 7);
    pub const USERCOMMENT: Self = Self(1 << 8);

    /// Mask assumed for headerless files
    pub const DEFAULT: Self = Self(Self::TIME.0 | Self::FREQ.0);

    const NAMES: [(Self, &'static str); 11] = [
        (Self::TIME, "TIME"),
        (Self::FREQ, "FREQ"),
        (Self::SNR, "SNR"),
        (Self::PHASE, "PHASE"),
        (Self::SCORE, "SCORE"),
        (Self::CONFIDENCE, "CONFIDENCE"),
        (Self::RIDGE, "RIDGE"),
        (Self::TIMESTAMP, "TIMESTAMP"),
        (Self::USERCOMMENT, "USERCOMMENT"),
        (Self::SPECIES, "SPECIES"),
        (Self::CALL, "CALL"),
    ];

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    /// True when every bit of `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when any bit of `other` is set
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Names of the known flags present in the mask
    pub fn flag_names(self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl BitOr for FeatureMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for FeatureMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeatureMask({:#06x} {})", self.0, self.flag_names().join("|"))
    }
}

/// Decoded file header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TonalHeader {
    /// Whether the magic string was found
    pub has_magic: bool,
    /// File format version, -1 when headerless
    pub version: i32,
    /// User supplied version, -1 when headerless
    pub user_version: i32,
    /// Optional field mask
    pub mask: FeatureMask,
    /// Declared header length in bytes (0 when headerless)
    pub header_size: u32,
    pub comment: Option<String>,
    /// Base timestamp of the detections (ISO 8601, as stored)
    pub timestamp: Option<String>,
}

impl TonalHeader {
    /// Header assumed when the magic string is absent
    pub fn headerless() -> Self {
        Self {
            has_magic: false,
            version: -1,
            user_version: -1,
            mask: FeatureMask::DEFAULT,
            header_size: 0,
            comment: None,
            timestamp: None,
        }
    }

    pub fn is_headerless(&self) -> bool {
        !self.has_magic
    }

    pub fn has(&self, feature: FeatureMask) -> bool {
        self.mask.contains(feature)
    }

    /// Whether each tonal record carries a graph identifier
    pub fn has_graph_id(&self) -> bool {
        self.version >= GRAPH_ID_MIN_VERSION
    }

    /// Timestamp parsed as RFC 3339, when present and well formed
    pub fn parsed_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        self.timestamp
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts.trim()).ok())
    }
}

/// One point of a contour
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeFrequencyNode {
    /// Seconds from the start of the recording
    pub time: Option<f64>,
    /// Hz
    pub freq: Option<f64>,
    pub snr: Option<f64>,
    pub phase: Option<f64>,
    pub ridge: Option<bool>,
    /// Ridge flag exactly as stored
    pub ridge_raw: Option<f64>,
}

impl TimeFrequencyNode {
    pub fn new(time: f64, freq: f64) -> Self {
        Self {
            time: Some(time),
            freq: Some(freq),
            ..Self::default()
        }
    }

    /// (time, freq) pair; absent fields read as 0.0
    pub fn time_frequency(&self) -> (f64, f64) {
        (self.time.unwrap_or(0.0), self.freq.unwrap_or(0.0))
    }
}

/// One annotated whistle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tonal {
    pub nodes: Vec<TimeFrequencyNode>,
    pub confidence: Option<f64>,
    pub score: Option<f64>,
    pub species: Option<String>,
    pub call: Option<String>,
    /// Only stored for format versions above 2
    pub graph_id: Option<i64>,
}

impl Tonal {
    /// Contour as (time_s, freq_hz) pairs
    pub fn contour(&self) -> Vec<(f64, f64)> {
        self.nodes.iter().map(TimeFrequencyNode::time_frequency).collect()
    }

    pub fn start_time(&self) -> Option<f64> {
        self.nodes.first().and_then(|n| n.time)
    }

    pub fn end_time(&self) -> Option<f64> {
        self.nodes.last().and_then(|n| n.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_contains_and_intersects() {
        let mask = FeatureMask::TIME | FeatureMask::FREQ | FeatureMask::SNR;
        assert!(mask.contains(FeatureMask::DEFAULT));
        assert!(!mask.contains(FeatureMask::PHASE));
        assert!(mask.intersects(FeatureMask::SNR | FeatureMask::PHASE));
        assert_eq!(mask.bits(), 0x7);
        assert_eq!(mask.flag_names(), vec!["TIME", "FREQ", "SNR"]);
    }

    #[test]
    fn test_headerless_defaults() {
        let header = TonalHeader::headerless();
        assert_eq!(header.version, -1);
        assert_eq!(header.user_version, -1);
        assert_eq!(header.mask, FeatureMask::DEFAULT);
        assert!(!header.has_graph_id());
    }

    #[test]
    fn test_parsed_timestamp() {
        let mut header = TonalHeader::headerless();
        header.timestamp = Some("2017-05-15T17:00:00Z".to_string());
        let ts = header.parsed_timestamp().unwrap();
        assert_eq!(ts.timestamp(), 1494867600);

        header.timestamp = Some("not a date".to_string());
        assert!(header.parsed_timestamp().is_none());
    }

    #[test]
    fn test_header_fixed_len() {
        assert_eq!(HEADER_FIXED_LEN, 18);
    }
}
