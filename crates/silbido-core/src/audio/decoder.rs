//! Audio decoding for WAV and FLAC

use super::AudioFormat;
use anyhow::{Context, Result};
use std::path::Path;

/// Decoded audio data
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Interleaved samples, integer PCM kept at its raw scale
    pub samples: Vec<f64>,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
    /// Samples per channel
    pub frames: usize,
}

impl AudioData {
    /// Convert to mono by averaging channels
    pub fn to_mono(&self) -> Vec<f64> {
        if self.channels <= 1 {
            return self.samples.clone();
        }

        let mut mono = Vec::with_capacity(self.frames);
        for chunk in self.samples.chunks(self.channels as usize) {
            let avg = chunk.iter().sum::<f64>() / chunk.len() as f64;
            mono.push(avg);
        }
        mono
    }

    /// Length in ms
    pub fn duration_ms(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64 * 1000.0
    }
}

/// Decode an audio file, downmixed to mono
pub fn decode_audio(path: &Path) -> Result<AudioData> {
    if !path.exists() {
        anyhow::bail!("Audio file not found: {}", path.display());
    }

    let mut audio_data = match AudioFormat::from_path(path) {
        AudioFormat::Wav => decode_wav(path)?,
        AudioFormat::Flac => decode_flac(path)?,
        AudioFormat::Unknown => {
            anyhow::bail!("Unsupported audio format: {}", path.display());
        }
    };

    if audio_data.sample_rate == 0 {
        anyhow::bail!("Audio file has a sample rate of 0: {}", path.display());
    }

    if audio_data.channels > 1 {
        log::debug!(
            "Averaging {} channels of {} to mono",
            audio_data.channels,
            path.display()
        );
        audio_data.samples = audio_data.to_mono();
        audio_data.channels = 1;
    }

    Ok(audio_data)
}

/// Decode WAV file
fn decode_wav(path: &Path) -> Result<AudioData> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();

    let samples: Vec<f64> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<Vec<_>, _>>(),
        hound::SampleFormat::Int => reader
            .samples::<i32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<Vec<_>, _>>(),
    }
    .with_context(|| format!("Failed to decode WAV file: {}", path.display()))?;

    let channels = spec.channels.max(1);
    Ok(AudioData {
        frames: samples.len() / channels as usize,
        samples,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        channels,
    })
}

/// Decode FLAC file
fn decode_flac(path: &Path) -> Result<AudioData> {
    let mut reader = claxon::FlacReader::open(path)
        .with_context(|| format!("Failed to open FLAC file: {}", path.display()))?;

    let info = reader.streaminfo();
    let channels = (info.channels as u16).max(1);

    let samples: Vec<f64> = reader
        .samples()
        .map(|s| s.map(f64::from))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to decode FLAC file: {}", path.display()))?;

    Ok(AudioData {
        frames: samples.len() / channels as usize,
        samples,
        sample_rate: info.sample_rate,
        bits_per_sample: info.bits_per_sample as u16,
        channels,
    })
}
