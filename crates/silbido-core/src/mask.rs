//! Contour mask rasterization
//!
//! Projects annotated contours onto the pixel grid of a spectrogram patch.
//! Consecutive nodes are joined by sampled line segments; every sample that
//! lands inside the grid sets one pixel.

use crate::config::SpectrogramConfig;
use crate::planner::PatchSpec;
use ndarray::Array2;
use std::ops::Range;

/// Segments whose time span is below this are drawn at the node's frequency
const TIME_EPSILON: f64 = 1e-10;

/// Binary mask of one window
#[derive(Debug, Clone, PartialEq)]
pub struct MaskPatch {
    /// (freq_bins, time_bins) of 0.0/1.0, highest frequency first
    pub mask: Array2<f32>,
    /// Whether any pixel is set
    pub positive_flag: bool,
}

impl MaskPatch {
    fn empty(shape: (usize, usize)) -> Self {
        Self {
            mask: Array2::zeros(shape),
            positive_flag: false,
        }
    }

    pub fn pixels_set(&self) -> usize {
        self.mask.iter().filter(|&&v| v != 0.0).count()
    }
}

#[derive(Debug, Clone)]
pub struct MaskRasterizer {
    config: SpectrogramConfig,
}

impl MaskRasterizer {
    pub fn new(config: &SpectrogramConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// (height, width) of the mask for `window`. The height is the band's
    /// bin count, the same rows the spectrogram renders at any sample rate.
    pub fn shape(&self, window: &PatchSpec) -> (usize, usize) {
        let bins = self
            .config
            .band_bins(window.freq_start_hz, window.freq_end_hz);
        let width = (window.width_ms() / self.config.step_time_span_ms).max(0.0) as usize;
        (bins.len(), width)
    }

    /// Rasterize `contours` over `window`.
    ///
    /// Contours must be ordered by start time and by end time; contours
    /// without nodes are skipped.
    pub fn rasterize(&self, contours: &[Vec<(f64, f64)>], window: &PatchSpec) -> MaskPatch {
        let shape = self.shape(window);
        let contours: Vec<&[(f64, f64)]> = contours
            .iter()
            .filter(|c| !c.is_empty())
            .map(Vec::as_slice)
            .collect();

        let visible = visible_range(&contours, window.time_start_ms, window.time_end_ms);
        if visible.is_empty() || shape.0 == 0 || shape.1 == 0 {
            return MaskPatch::empty(shape);
        }

        let mut patch = MaskPatch::empty(shape);
        for contour in &contours[visible] {
            self.draw_contour(&mut patch, contour, window);
        }
        patch
    }

    fn draw_contour(&self, patch: &mut MaskPatch, contour: &[(f64, f64)], window: &PatchSpec) {
        let (height, width) = patch.mask.dim();
        let time_span = window.width_ms();
        let res = self.config.freq_resolution();

        let to_pixel = |time_s: f64, freq_hz: f64| {
            (
                (time_s * 1000.0 - window.time_start_ms) * width as f64 / time_span,
                (freq_hz - window.freq_start_hz) / res,
            )
        };

        let mut nodes = contour.iter().map(|&(t, f)| to_pixel(t, f));
        let Some(mut prev) = nodes.next() else {
            return;
        };

        for (time_frame, freq_frame) in nodes {
            let (prev_time, prev_freq) = prev;
            let distance = (time_frame - prev_time).hypot(freq_frame - prev_freq);
            let points = distance.ceil() as usize + 1;
            let slope = (prev_freq - freq_frame) / (prev_time - time_frame);

            for x in linspace(prev_time, time_frame, points) {
                let column = x.round_ties_even();
                if column < 0.0 || column >= width as f64 {
                    continue;
                }

                let freq = if time_frame - prev_time < TIME_EPSILON {
                    freq_frame
                } else {
                    freq_frame + slope * (x - time_frame)
                };
                let row = freq.round_ties_even();
                if row < 0.0 || row >= height as f64 {
                    continue;
                }

                let row = height - 1 - row as usize;
                patch.mask[[row, column as usize]] = 1.0;
                patch.positive_flag = true;
            }

            prev = (time_frame, freq_frame);
        }
    }
}

/// Indices of the contours overlapping `[start_ms, end_ms]`.
///
/// Binary searches the contours' end times for the first one ending after
/// the window start and their start times for the first one starting at or
/// after the window end.
pub fn visible_range(contours: &[&[(f64, f64)]], start_ms: f64, end_ms: f64) -> Range<usize> {
    let start_s = start_ms / 1000.0;
    let end_s = end_ms / 1000.0;

    let low = contours.partition_point(|c| c.last().map_or(f64::NEG_INFINITY, |n| n.0) <= start_s);
    let high = contours.partition_point(|c| c.first().map_or(f64::NEG_INFINITY, |n| n.0) < end_s);

    low..high.max(low)
}

/// `count` evenly spaced values from `start` to `stop` inclusive
fn linspace(start: f64, stop: f64, count: usize) -> impl Iterator<Item = f64> {
    let step = if count > 1 {
        (stop - start) / (count - 1) as f64
    } else {
        0.0
    };
    (0..count).map(move |i| {
        if count > 1 && i == count - 1 {
            stop
        } else {
            start + i as f64 * step
        }
    })
}
