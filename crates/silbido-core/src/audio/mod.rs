//! Audio decoding
//!
//! Supports WAV and FLAC recordings. Integer samples keep their raw scale.

mod decoder;

pub use decoder::{decode_audio, AudioData};

use std::path::Path;

/// Supported audio formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Flac,
    Unknown,
}

impl AudioFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("wav") | Some("wave") => AudioFormat::Wav,
            Some("flac") => AudioFormat::Flac,
            _ => AudioFormat::Unknown,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, AudioFormat::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(AudioFormat::from_path(Path::new("a/b.wav")), AudioFormat::Wav);
        assert_eq!(AudioFormat::from_path(Path::new("b.WAV")), AudioFormat::Wav);
        assert_eq!(AudioFormat::from_path(Path::new("b.flac")), AudioFormat::Flac);
        assert_eq!(AudioFormat::from_path(Path::new("b.bin")), AudioFormat::Unknown);
        assert!(!AudioFormat::from_path(Path::new("noext")).is_supported());
    }
}
