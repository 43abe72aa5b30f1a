//! Patch generation parameters
//!
//! Defaults reproduce the values the whistle training sets were built with:
//! 8 ms analysis frames every 2 ms, log-magnitudes clipped to [0, 6], a
//! 5-50 kHz band cut into 64x64 patches, 128 patches buffered per block.
//! A TOML file may override any field; missing fields keep their default.

use serde::{Deserialize, Serialize};
use silbido_store::StoreOptions;
use std::ops::Range;
use std::path::Path;

/// Full generator configuration as read from TOML
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub spectrogram: SpectrogramConfig,
    #[serde(default)]
    pub patches: PatchConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub images: ImageConfig,
}

/// Framing, clipping and frequency band of the rendered spectrogram
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SpectrogramConfig {
    /// ms, length of one analysis frame
    #[serde(default = "default_frame_time_span")]
    pub frame_time_span_ms: f64,
    /// ms, distance between consecutive frames
    #[serde(default = "default_step_time_span")]
    pub step_time_span_ms: f64,
    /// log10 magnitude mapped to 0.0
    #[serde(default = "default_clip_min")]
    pub clip_min: f64,
    /// log10 magnitude mapped to 1.0
    #[serde(default = "default_clip_max")]
    pub clip_max: f64,
    #[serde(default = "default_min_freq")]
    pub min_freq_hz: f64,
    #[serde(default = "default_max_freq")]
    pub max_freq_hz: f64,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            frame_time_span_ms: default_frame_time_span(),
            step_time_span_ms: default_step_time_span(),
            clip_min: default_clip_min(),
            clip_max: default_clip_max(),
            min_freq_hz: default_min_freq(),
            max_freq_hz: default_max_freq(),
        }
    }
}

impl SpectrogramConfig {
    /// Hz covered by one FFT bin
    pub fn freq_resolution(&self) -> f64 {
        1000.0 / self.frame_time_span_ms
    }

    /// FFT bins `[floor(start/res), floor(end/res))` of a frequency band.
    ///
    /// Spectrogram and mask rows both follow this range: row `r` is bin
    /// `end - 1 - r`, whether or not the bin lies below Nyquist.
    pub fn band_bins(&self, freq_start_hz: f64, freq_end_hz: f64) -> Range<usize> {
        let res = self.freq_resolution();
        let low = (freq_start_hz / res).floor().max(0.0) as usize;
        let high = (freq_end_hz / res).floor().max(0.0) as usize;
        low..high.max(low)
    }
}

fn default_frame_time_span() -> f64 {
    8.0
}
fn default_step_time_span() -> f64 {
    2.0
}
fn default_clip_min() -> f64 {
    0.0
}
fn default_clip_max() -> f64 {
    6.0
}
fn default_min_freq() -> f64 {
    5000.0
}
fn default_max_freq() -> f64 {
    50000.0
}

/// Patch size and stride, in spectrogram frames
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PatchConfig {
    #[serde(default = "default_patch_frames")]
    pub time_patch_frames: usize,
    #[serde(default = "default_patch_frames")]
    pub freq_patch_frames: usize,
    #[serde(default = "default_patch_frames")]
    pub time_patch_advance: usize,
    #[serde(default = "default_patch_frames")]
    pub freq_patch_advance: usize,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            time_patch_frames: default_patch_frames(),
            freq_patch_frames: default_patch_frames(),
            time_patch_advance: default_patch_frames(),
            freq_patch_advance: default_patch_frames(),
        }
    }
}

impl PatchConfig {
    /// (freq_bins, time_bins) of every patch
    pub fn shape(&self) -> (usize, usize) {
        (self.freq_patch_frames, self.time_patch_frames)
    }
}

fn default_patch_frames() -> usize {
    64
}

/// Output store settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Patches held in memory between writes. Does not affect the output.
    #[serde(default = "default_patches_per_block")]
    pub patches_per_block: usize,
    #[serde(default = "default_compress")]
    pub compress: bool,
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            patches_per_block: default_patches_per_block(),
            compress: default_compress(),
            compression_level: default_compression_level(),
        }
    }
}

impl StoreConfig {
    pub fn options(&self) -> StoreOptions {
        StoreOptions {
            compress: self.compress,
            compression_level: self.compression_level,
        }
    }
}

fn default_patches_per_block() -> usize {
    128
}
fn default_compress() -> bool {
    true
}
fn default_compression_level() -> i32 {
    3
}

/// Image export settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ImageConfig {
    /// ms of audio per exported image
    #[serde(default = "default_split_time")]
    pub split_time_ms: f64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            split_time_ms: default_split_time(),
        }
    }
}

fn default_split_time() -> f64 {
    3000.0
}

impl GeneratorConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        let config: GeneratorConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> anyhow::Result<()> {
        let spec = &self.spectrogram;
        if !(spec.frame_time_span_ms > 0.0) {
            anyhow::bail!("frame_time_span_ms must be > 0");
        }
        if !(spec.step_time_span_ms > 0.0) {
            anyhow::bail!("step_time_span_ms must be > 0");
        }
        if !(spec.clip_min < spec.clip_max) {
            anyhow::bail!("clip_min must be < clip_max");
        }
        if spec.min_freq_hz < 0.0 {
            anyhow::bail!("min_freq_hz must be >= 0");
        }
        if !(spec.min_freq_hz < spec.max_freq_hz) {
            anyhow::bail!("min_freq_hz must be < max_freq_hz");
        }

        let patches = &self.patches;
        if patches.time_patch_frames == 0 || patches.freq_patch_frames == 0 {
            anyhow::bail!("patch sizes must be > 0");
        }
        if patches.time_patch_advance == 0 || patches.freq_patch_advance == 0 {
            anyhow::bail!("patch advances must be > 0");
        }

        if self.store.patches_per_block == 0 {
            anyhow::bail!("patches_per_block must be > 0");
        }
        if !(self.images.split_time_ms > 0.0) {
            anyhow::bail!("split_time_ms must be > 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.spectrogram.frame_time_span_ms, 8.0);
        assert_eq!(config.spectrogram.step_time_span_ms, 2.0);
        assert_eq!(config.spectrogram.freq_resolution(), 125.0);
        assert_eq!(config.spectrogram.band_bins(5000.0, 13000.0), 40..104);
        assert_eq!(config.spectrogram.band_bins(5000.0, 4000.0), 40..40);
        assert_eq!(config.patches.shape(), (64, 64));
        assert_eq!(config.store.patches_per_block, 128);
        assert!(config.store.compress);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
            [spectrogram]
            frame_time_span_ms = 4.0
            max_freq_hz = 40000.0

            [store]
            patches_per_block = 16
            compress = false
        "#;

        let config: GeneratorConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.spectrogram.frame_time_span_ms, 4.0);
        assert_eq!(config.spectrogram.max_freq_hz, 40000.0);
        assert_eq!(config.spectrogram.min_freq_hz, 5000.0);
        assert_eq!(config.patches, PatchConfig::default());
        assert_eq!(config.store.patches_per_block, 16);
        assert!(!config.store.options().compress);
        assert_eq!(config.images.split_time_ms, 3000.0);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: GeneratorConfig = toml::from_str("").unwrap();
        assert_eq!(config, GeneratorConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = GeneratorConfig::default();
        config.spectrogram.min_freq_hz = 60000.0;
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::default();
        config.spectrogram.clip_max = config.spectrogram.clip_min;
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::default();
        config.patches.time_patch_advance = 0;
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::default();
        config.store.patches_per_block = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patches.toml");
        std::fs::write(&path, "[patches]\ntime_patch_frames = 32\n").unwrap();

        let config = GeneratorConfig::load(&path).unwrap();
        assert_eq!(config.patches.shape(), (64, 32));

        assert!(GeneratorConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
