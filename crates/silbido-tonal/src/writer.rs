//! Silbido annotation writer
//!
//! Writes time and frequency only: format version 4, mask {TIME, FREQ},
//! user version 0, no comment or timestamp, and the same synthetic graph
//! identifier for every contour. Files carrying any other field cannot be
//! reproduced by this writer.

use crate::error::{Result, TonalError};
use crate::format::{FeatureMask, HEADER_FIXED_LEN, MAGIC, SYNTHETIC_GRAPH_ID, VERSION};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct TonalWriter<W: Write> {
    inner: W,
    contours: usize,
}

impl TonalWriter<BufWriter<File>> {
    /// Create an annotation file and write its header
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|source| TonalError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> TonalWriter<W> {
    /// Wrap a sink and write the header
    pub fn new(mut inner: W) -> Result<Self> {
        inner.write_all(&MAGIC)?;
        inner.write_all(&VERSION.to_be_bytes())?;
        inner.write_all(&FeatureMask::DEFAULT.bits().to_be_bytes())?;
        inner.write_all(&0u16.to_be_bytes())?;
        inner.write_all(&HEADER_FIXED_LEN.to_be_bytes())?;

        Ok(Self { inner, contours: 0 })
    }

    /// Append one contour of (time_s, freq_hz) nodes
    pub fn write_contour(&mut self, contour: &[(f64, f64)]) -> Result<()> {
        let num_nodes =
            u32::try_from(contour.len()).map_err(|_| TonalError::TooManyNodes(contour.len()))?;

        self.inner.write_all(&SYNTHETIC_GRAPH_ID.to_be_bytes())?;
        self.inner.write_all(&num_nodes.to_be_bytes())?;

        for &(time, freq) in contour {
            self.inner.write_all(&time.to_be_bytes())?;
            self.inner.write_all(&freq.to_be_bytes())?;
        }

        self.contours += 1;
        Ok(())
    }

    pub fn contours_written(&self) -> usize {
        self.contours
    }

    /// Flush and hand back the sink
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Write all contours to a new annotation file
pub fn write_time_frequency_file(path: &Path, contours: &[Vec<(f64, f64)>]) -> Result<()> {
    let mut writer = TonalWriter::create(path)?;
    for contour in contours {
        writer.write_contour(contour)?;
    }
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::TonalReader;
    use std::io::Cursor;

    #[test]
    fn test_header_layout() {
        let bytes = TonalWriter::new(Vec::new()).unwrap().finish().unwrap();
        assert_eq!(bytes.len(), HEADER_FIXED_LEN as usize);
        assert_eq!(&bytes[..8], b"silbido!");
        assert_eq!(&bytes[8..10], &[0, 4]);
        assert_eq!(&bytes[10..12], &[0, 3]);
        assert_eq!(&bytes[12..14], &[0, 0]);
        assert_eq!(&bytes[14..18], &[0, 0, 0, 18]);
    }

    #[test]
    fn test_written_contours_decode() {
        let mut writer = TonalWriter::new(Vec::new()).unwrap();
        writer.write_contour(&[(0.25, 8000.0), (0.5, 8250.5)]).unwrap();
        writer.write_contour(&[]).unwrap();
        assert_eq!(writer.contours_written(), 2);
        let bytes = writer.finish().unwrap();

        let mut reader = TonalReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.header().version, 4);
        assert_eq!(reader.header().user_version, 0);

        let tonals: Vec<_> = reader.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(tonals.len(), 2);
        assert_eq!(tonals[0].graph_id, Some(SYNTHETIC_GRAPH_ID));
        assert_eq!(tonals[0].contour(), vec![(0.25, 8000.0), (0.5, 8250.5)]);
        assert!(tonals[1].nodes.is_empty());
    }
}
