//! Patch grid planning
//!
//! Tiles one recording's time-frequency plane with equally sized windows.
//! Bands are laid out from the bottom of the configured frequency range,
//! windows from the start of the recording. Windows that would extend past
//! either boundary are dropped, never clipped.

use crate::config::{PatchConfig, SpectrogramConfig};
use serde::Serialize;

/// Boundaries of one training window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PatchSpec {
    pub freq_start_hz: f64,
    pub freq_end_hz: f64,
    pub time_start_ms: f64,
    pub time_end_ms: f64,
}

impl PatchSpec {
    pub fn new(freq_start_hz: f64, freq_end_hz: f64, time_start_ms: f64, time_end_ms: f64) -> Self {
        Self {
            freq_start_hz,
            freq_end_hz,
            time_start_ms,
            time_end_ms,
        }
    }

    pub fn height_hz(&self) -> f64 {
        self.freq_end_hz - self.freq_start_hz
    }

    pub fn width_ms(&self) -> f64 {
        self.time_end_ms - self.time_start_ms
    }
}

/// Band and window origins for one recording
#[derive(Debug, Clone, PartialEq)]
pub struct PatchGrid {
    band_starts: Vec<f64>,
    window_starts: Vec<f64>,
    height_hz: f64,
    width_ms: f64,
}

impl PatchGrid {
    pub fn plan(spectrogram: &SpectrogramConfig, patches: &PatchConfig, duration_ms: f64) -> Self {
        let freq_resolution = spectrogram.freq_resolution();
        let height_hz = freq_resolution * patches.freq_patch_frames as f64;
        let freq_advance_hz = freq_resolution * patches.freq_patch_advance as f64;
        let width_ms = spectrogram.step_time_span_ms * patches.time_patch_frames as f64;
        let time_advance_ms = spectrogram.step_time_span_ms * patches.time_patch_advance as f64;

        let band_starts = positions(spectrogram.min_freq_hz, freq_advance_hz, |start| {
            start + height_hz <= spectrogram.max_freq_hz
        });
        // the trailing frame span keeps the last window's final frame in bounds
        let window_starts = positions(0.0, time_advance_ms, |start| {
            start + width_ms + spectrogram.frame_time_span_ms <= duration_ms
        });

        Self {
            band_starts,
            window_starts,
            height_hz,
            width_ms,
        }
    }

    pub fn bands(&self) -> usize {
        self.band_starts.len()
    }

    pub fn windows_per_band(&self) -> usize {
        self.window_starts.len()
    }

    /// Total number of patches
    pub fn count(&self) -> usize {
        self.bands() * self.windows_per_band()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Patches in band-major order
    pub fn iter(&self) -> impl Iterator<Item = PatchSpec> + '_ {
        self.band_starts.iter().flat_map(move |&freq| {
            self.window_starts.iter().map(move |&time| {
                PatchSpec::new(freq, freq + self.height_hz, time, time + self.width_ms)
            })
        })
    }

    pub fn specs(&self) -> Vec<PatchSpec> {
        self.iter().collect()
    }
}

/// Plan the patches of one recording
pub fn plan_patches(
    spectrogram: &SpectrogramConfig,
    patches: &PatchConfig,
    duration_ms: f64,
) -> Vec<PatchSpec> {
    PatchGrid::plan(spectrogram, patches, duration_ms).specs()
}

/// `origin + k * advance` for k = 0, 1, ... while `fits` holds
fn positions(origin: f64, advance: f64, fits: impl Fn(f64) -> bool) -> Vec<f64> {
    let mut starts = Vec::new();
    loop {
        let start = origin + starts.len() as f64 * advance;
        if !fits(start) {
            break;
        }
        starts.push(start);
        if !(advance > 0.0) {
            break;
        }
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grid() {
        let spectrogram = SpectrogramConfig::default();
        let patches = PatchConfig::default();

        // 64 bins * 125 Hz = 8000 Hz bands from 5000 Hz while
        // start + 8000 <= 50000 -> starts 5000, 13000, ..., 37000 -> 5 bands
        // 64 frames * 2 ms = 128 ms windows; 1000 ms recording:
        // start + 128 + 8 <= 1000 -> starts 0, 128, ..., 768 -> 7 windows
        let grid = PatchGrid::plan(&spectrogram, &patches, 1000.0);
        assert_eq!(grid.bands(), 5);
        assert_eq!(grid.windows_per_band(), 7);
        assert_eq!(grid.count(), 35);

        let specs = grid.specs();
        assert_eq!(specs[0], PatchSpec::new(5000.0, 13000.0, 0.0, 128.0));
        assert_eq!(specs[1], PatchSpec::new(5000.0, 13000.0, 128.0, 256.0));
        assert_eq!(specs[7], PatchSpec::new(13000.0, 21000.0, 0.0, 128.0));
        assert_eq!(specs[34], PatchSpec::new(37000.0, 45000.0, 768.0, 896.0));
    }

    #[test]
    fn test_exact_fit_is_kept() {
        let spectrogram = SpectrogramConfig {
            min_freq_hz: 0.0,
            max_freq_hz: 1000.0,
            ..SpectrogramConfig::default()
        };
        let patches = PatchConfig {
            freq_patch_frames: 8,
            freq_patch_advance: 8,
            time_patch_frames: 10,
            time_patch_advance: 10,
        };

        // bands of exactly 1000 Hz fill the range once
        // windows of 20 ms need 28 ms of audio each
        let grid = PatchGrid::plan(&spectrogram, &patches, 48.0);
        assert_eq!(grid.bands(), 1);
        assert_eq!(grid.windows_per_band(), 2);
    }

    #[test]
    fn test_short_recording_has_no_patches() {
        let grid = PatchGrid::plan(&SpectrogramConfig::default(), &PatchConfig::default(), 100.0);
        assert!(grid.is_empty());
        assert!(grid.specs().is_empty());
    }

    #[test]
    fn test_overlapping_advance() {
        let patches = PatchConfig {
            time_patch_advance: 32,
            freq_patch_advance: 32,
            ..PatchConfig::default()
        };
        let grid = PatchGrid::plan(&SpectrogramConfig::default(), &patches, 1000.0);
        // bands: start + 8000 <= 50000 with 4000 Hz steps from 5000 -> 10
        // windows: start + 136 <= 1000 with 64 ms steps -> 14
        assert_eq!(grid.bands(), 10);
        assert_eq!(grid.windows_per_band(), 14);
    }
}
