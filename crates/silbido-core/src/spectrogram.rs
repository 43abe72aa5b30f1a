//! Log-magnitude spectrogram rendering
//!
//! Frames the samples of one window, takes the magnitude of the real FFT of
//! each frame (no window function, no zero padding), keeps the bins of the
//! requested band, and maps `log10` magnitudes through the clip range onto
//! `[0, 1]`. Row 0 of the result is the highest frequency.

use crate::config::SpectrogramConfig;
use crate::framing::{frame_signal, Frames};
use crate::planner::PatchSpec;
use ndarray::Array2;
use std::ops::Range;
use rustfft::{num_complex::Complex, FftPlanner};

/// Rendered spectrogram of one window
#[derive(Debug, Clone)]
pub struct RenderedSpectrogram {
    /// (freq_bins, frames), highest frequency first
    pub patch: Array2<f32>,
    /// ms, `start + frames * step`; may differ from the requested end
    pub actual_end_ms: f64,
}

impl RenderedSpectrogram {
    pub fn frames(&self) -> usize {
        self.patch.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.patch.ncols() == 0
    }
}

pub struct SpectrogramRenderer {
    config: SpectrogramConfig,
    planner: FftPlanner<f64>,
}

impl SpectrogramRenderer {
    pub fn new(config: SpectrogramConfig) -> Self {
        Self {
            config,
            planner: FftPlanner::new(),
        }
    }

    pub fn config(&self) -> &SpectrogramConfig {
        &self.config
    }

    /// Hz per FFT bin
    pub fn freq_resolution(&self) -> f64 {
        self.config.freq_resolution()
    }

    /// Frame length in samples
    pub fn frame_samples(&self, sample_rate: u32) -> usize {
        (self.config.frame_time_span_ms / 1000.0 * sample_rate as f64).floor() as usize
    }

    /// Frame step in samples, possibly fractional
    pub fn step_samples(&self, sample_rate: u32) -> f64 {
        self.config.step_time_span_ms / 1000.0 * sample_rate as f64
    }

    /// Sample range analysed for `window`, extended so the frame starting
    /// at the last step still fits, clamped to the signal.
    pub fn sample_range(&self, signal_len: usize, sample_rate: u32, window: &PatchSpec) -> (usize, usize) {
        let rate = sample_rate as f64;
        let start = (window.time_start_ms / 1000.0 * rate) as usize;
        let end = ((window.time_end_ms / 1000.0 + self.config.frame_time_span_ms / 1000.0
            - self.config.step_time_span_ms / 1000.0)
            * rate) as usize;

        let end = end.min(signal_len);
        (start.min(end), end)
    }

    /// Bin range of the window's band, see [`SpectrogramConfig::band_bins`]
    pub fn band_bins(&self, window: &PatchSpec) -> Range<usize> {
        self.config.band_bins(window.freq_start_hz, window.freq_end_hz)
    }

    /// Render the spectrogram of `window`.
    ///
    /// A window holding fewer samples than one frame renders with zero
    /// frames. The patch always has one row per bin of the band; bins above
    /// the Nyquist frequency stay zero.
    pub fn render(&mut self, samples: &[f64], sample_rate: u32, window: &PatchSpec) -> RenderedSpectrogram {
        let (start, end) = self.sample_range(samples.len(), sample_rate, window);
        let selected = &samples[start..end];
        let frame_len = self.frame_samples(sample_rate);
        let bins = self.band_bins(window);

        let empty = || RenderedSpectrogram {
            patch: Array2::zeros((bins.len(), 0)),
            actual_end_ms: window.time_start_ms,
        };

        if selected.len() < frame_len {
            return empty();
        }

        let frames = match frame_signal(selected, frame_len, self.step_samples(sample_rate)) {
            Ok(frames) => frames,
            Err(err) => {
                log::warn!(
                    "No frames for {:.1}-{:.1} ms: {}",
                    window.time_start_ms,
                    window.time_end_ms,
                    err
                );
                return empty();
            }
        };

        let spectra = self.magnitude_spectra(&frames);
        let available = spectra.ncols();
        if bins.end > available {
            log::debug!(
                "Band {:.0}-{:.0} Hz reaches past Nyquist at {} Hz; {} rows left empty",
                window.freq_start_hz,
                window.freq_end_hz,
                sample_rate / 2,
                bins.end - bins.start.max(available)
            );
        }

        let clip_min = self.config.clip_min;
        let clip_max = self.config.clip_max;
        let span = clip_max - clip_min;

        let patch = Array2::from_shape_fn((bins.len(), spectra.nrows()), |(row, frame)| {
            let bin = bins.end - 1 - row;
            if bin >= available {
                return 0.0;
            }
            let level = spectra[[frame, bin]].log10().max(clip_min).min(clip_max);
            ((level - clip_min) / span) as f32
        });

        RenderedSpectrogram {
            actual_end_ms: window.time_start_ms + frames.len() as f64 * self.config.step_time_span_ms,
            patch,
        }
    }

    /// Magnitude spectrum of every frame, shape (frames, frame_len / 2 + 1)
    pub fn magnitude_spectra(&mut self, frames: &Frames<'_>) -> Array2<f64> {
        let n = frames.frame_len();
        let bins = n / 2 + 1;
        let fft = self.planner.plan_fft_forward(n);

        let mut spectra = Array2::zeros((frames.len(), bins));
        let mut buffer = vec![Complex::new(0.0, 0.0); n];
        for (index, frame) in frames.iter().enumerate() {
            for (slot, &sample) in buffer.iter_mut().zip(frame) {
                *slot = Complex::new(sample, 0.0);
            }
            fft.process(&mut buffer);
            for (bin, value) in buffer.iter().take(bins).enumerate() {
                spectra[[index, bin]] = value.norm();
            }
        }
        spectra
    }
}
