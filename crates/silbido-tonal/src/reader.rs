//! Silbido annotation reader
//!
//! `TonalReader` is an explicit cursor over the record stream: `has_more`
//! peeks for remaining bytes at a record boundary and `next_tonal` decodes
//! one record. A clean end of stream ends the sequence; running out of
//! bytes inside a record is a `Truncated` error.

use crate::error::{Result, TonalError};
use crate::format::{FeatureMask, TimeFrequencyNode, Tonal, TonalHeader, HEADER_FIXED_LEN, MAGIC};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Upper bound on node preallocation; counts come from untrusted lengths
const MAX_NODE_PREALLOC: usize = 4096;

/// Per-tonal optional fields, in stored order
#[derive(Debug, Clone, Copy)]
enum RecordField {
    Confidence,
    Score,
    Species,
    Call,
}

const RECORD_FIELDS: [(FeatureMask, RecordField); 4] = [
    (FeatureMask::CONFIDENCE, RecordField::Confidence),
    (FeatureMask::SCORE, RecordField::Score),
    (FeatureMask::SPECIES, RecordField::Species),
    (FeatureMask::CALL, RecordField::Call),
];

impl RecordField {
    fn decode<R: Read>(self, reader: &mut R, tonal: &mut Tonal) -> Result<()> {
        match self {
            RecordField::Confidence => tonal.confidence = Some(read_f64(reader, "tonal confidence")?),
            RecordField::Score => tonal.score = Some(read_f64(reader, "tonal score")?),
            RecordField::Species => tonal.species = Some(read_string(reader, "tonal species")?),
            RecordField::Call => tonal.call = Some(read_string(reader, "tonal call")?),
        }
        Ok(())
    }
}

/// Per-node optional fields, in stored order
#[derive(Debug, Clone, Copy)]
enum NodeField {
    Time,
    Freq,
    Snr,
    Phase,
    Ridge,
}

const NODE_FIELDS: [(FeatureMask, NodeField); 5] = [
    (FeatureMask::TIME, NodeField::Time),
    (FeatureMask::FREQ, NodeField::Freq),
    (FeatureMask::SNR, NodeField::Snr),
    (FeatureMask::PHASE, NodeField::Phase),
    (FeatureMask::RIDGE, NodeField::Ridge),
];

impl NodeField {
    fn decode<R: Read>(self, reader: &mut R, node: &mut TimeFrequencyNode) -> Result<()> {
        match self {
            NodeField::Time => node.time = Some(read_f64(reader, "node time")?),
            NodeField::Freq => node.freq = Some(read_f64(reader, "node frequency")?),
            NodeField::Snr => node.snr = Some(read_f64(reader, "node snr")?),
            NodeField::Phase => node.phase = Some(read_f64(reader, "node phase")?),
            NodeField::Ridge => {
                let raw = read_f64(reader, "node ridge")?;
                node.ridge = Some(raw != 0.0);
                node.ridge_raw = Some(raw);
            }
        }
        Ok(())
    }
}

/// Cursor over the tonals of one annotation stream
pub struct TonalReader<R> {
    inner: R,
    origin: u64,
    header: TonalHeader,
    count: usize,
    failed: bool,
}

impl TonalReader<BufReader<File>> {
    /// Open an annotation file
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| TonalError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(BufReader::new(file))
    }
}

impl<R: BufRead + Seek> TonalReader<R> {
    /// Decode the header and position the cursor at the first record.
    ///
    /// The current stream position is taken as the start of the file; a
    /// headerless stream is rewound to it.
    pub fn new(mut inner: R) -> Result<Self> {
        let origin = inner.stream_position()?;
        let header = read_header(&mut inner, origin)?;

        Ok(Self {
            inner,
            origin,
            header,
            count: 0,
            failed: false,
        })
    }

    pub fn header(&self) -> &TonalHeader {
        &self.header
    }

    /// Number of tonals decoded since the last rewind
    pub fn tonals_read(&self) -> usize {
        self.count
    }

    /// Go back to the first tonal, decoding the header again
    pub fn rewind(&mut self) -> Result<()> {
        self.inner.seek(SeekFrom::Start(self.origin))?;
        self.header = read_header(&mut self.inner, self.origin)?;
        self.count = 0;
        self.failed = false;
        Ok(())
    }

    /// Whether any bytes remain at the current record boundary
    pub fn has_more(&mut self) -> Result<bool> {
        Ok(!self.inner.fill_buf()?.is_empty())
    }

    /// Decode the next tonal, `None` at a clean end of stream
    pub fn next_tonal(&mut self) -> Result<Option<Tonal>> {
        if !self.has_more()? {
            return Ok(None);
        }

        let tonal = self.read_tonal()?;
        self.count += 1;
        Ok(Some(tonal))
    }

    /// Remaining contours as (time_s, freq_hz) pairs
    pub fn time_frequency_contours(&mut self) -> Result<Vec<Vec<(f64, f64)>>> {
        self.by_ref().map(|tonal| tonal.map(|t| t.contour())).collect()
    }

    /// Number of tonals in the stream. Leaves the cursor at the first tonal.
    pub fn count_tonals(&mut self) -> Result<usize> {
        self.rewind()?;
        let mut total = 0;
        while self.next_tonal()?.is_some() {
            total += 1;
        }
        self.rewind()?;
        Ok(total)
    }

    fn read_tonal(&mut self) -> Result<Tonal> {
        let reader = &mut self.inner;
        let mut tonal = Tonal::default();

        for (flag, field) in RECORD_FIELDS {
            if self.header.has(flag) {
                field.decode(reader, &mut tonal)?;
            }
        }

        if self.header.has_graph_id() {
            tonal.graph_id = Some(i64::from_be_bytes(read_bytes(reader, "graph id")?));
        }

        let num_nodes = read_u32(reader, "node count")? as usize;
        let mut nodes = Vec::with_capacity(num_nodes.min(MAX_NODE_PREALLOC));

        for _ in 0..num_nodes {
            let mut node = TimeFrequencyNode::default();
            for (flag, field) in NODE_FIELDS {
                if self.header.has(flag) {
                    field.decode(reader, &mut node)?;
                }
            }
            nodes.push(node);
        }

        tonal.nodes = nodes;
        Ok(tonal)
    }
}

impl<R: BufRead + Seek> Iterator for TonalReader<R> {
    type Item = Result<Tonal>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        match self.next_tonal() {
            Ok(Some(tonal)) => Some(Ok(tonal)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

fn read_header<R: BufRead + Seek>(reader: &mut R, origin: u64) -> Result<TonalHeader> {
    let mut magic = [0u8; MAGIC.len()];
    let filled = read_up_to(reader, &mut magic)?;

    if filled < MAGIC.len() || magic != MAGIC {
        log::debug!("No silbido header found, reading stream as headerless");
        reader.seek(SeekFrom::Start(origin))?;
        return Ok(TonalHeader::headerless());
    }

    let version = read_u16(reader, "header version")?;
    let mask = FeatureMask::from_bits(read_u16(reader, "header feature mask")?);
    let user_version = read_u16(reader, "header user version")?;
    let header_size = read_u32(reader, "header size")?;

    let mut comment = None;
    let mut timestamp = None;

    let remaining = i64::from(header_size) - i64::from(HEADER_FIXED_LEN);
    if remaining > 0 {
        if mask.intersects(FeatureMask::USERCOMMENT | FeatureMask::TIMESTAMP) {
            comment = if mask.contains(FeatureMask::USERCOMMENT) {
                Some(read_string(reader, "header comment")?)
            } else {
                Some(String::new())
            };

            if mask.contains(FeatureMask::TIMESTAMP) {
                timestamp = Some(read_string(reader, "header timestamp")?);
            }
        } else {
            // Older versions stored a comment without flagging it
            comment = Some(read_string(reader, "legacy header comment")?);
        }
    }

    Ok(TonalHeader {
        has_magic: true,
        version: i32::from(version),
        user_version: i32::from(user_version),
        mask,
        header_size,
        comment,
        timestamp,
    })
}

/// Fill as much of `buf` as the stream allows
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

fn read_bytes<const N: usize, R: Read>(reader: &mut R, context: &'static str) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader
        .read_exact(&mut buf)
        .map_err(|e| truncation(e, context))?;
    Ok(buf)
}

fn read_u16<R: Read>(reader: &mut R, context: &'static str) -> Result<u16> {
    Ok(u16::from_be_bytes(read_bytes(reader, context)?))
}

fn read_u32<R: Read>(reader: &mut R, context: &'static str) -> Result<u32> {
    Ok(u32::from_be_bytes(read_bytes(reader, context)?))
}

fn read_f64<R: Read>(reader: &mut R, context: &'static str) -> Result<f64> {
    Ok(f64::from_be_bytes(read_bytes(reader, context)?))
}

fn read_string<R: Read>(reader: &mut R, context: &'static str) -> Result<String> {
    let len = read_u16(reader, context)? as usize;
    let mut bytes = vec![0u8; len];
    reader
        .read_exact(&mut bytes)
        .map_err(|e| truncation(e, context))?;
    String::from_utf8(bytes).map_err(|source| TonalError::Utf8 { context, source })
}

fn truncation(err: io::Error, context: &'static str) -> TonalError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        TonalError::Truncated { context }
    } else {
        TonalError::Io(err)
    }
}
