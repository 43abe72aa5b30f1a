//! PNG export of spectrogram/mask pairs
//!
//! A recording is cut into consecutive `split_time_ms` windows over the
//! whole configured band. Window `n` is written as `<n>-a.png` (spectrogram)
//! and `<n>-b.png` (mask), 8-bit grayscale with 1.0 mapped to white.

use crate::audio::decode_audio;
use crate::config::GeneratorConfig;
use crate::mask::MaskRasterizer;
use crate::pairing::RecordingPair;
use crate::pipeline::load_contours;
use crate::planner::PatchSpec;
use crate::spectrogram::SpectrogramRenderer;
use anyhow::{Context, Result};
use image::{GrayImage, Luma};
use ndarray::ArrayView2;
use std::fs;
use std::path::Path;

/// Grayscale image of a `[0, 1]` patch, row 0 at the top
pub fn patch_to_image(patch: ArrayView2<'_, f32>) -> GrayImage {
    let (height, width) = patch.dim();
    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let value = patch[[y as usize, x as usize]].clamp(0.0, 1.0);
        Luma([(value * 255.0).round() as u8])
    })
}

/// Write the image pairs of one recording into `output_dir`.
///
/// Returns the number of pairs written. Windows too short to hold one
/// analysis frame are skipped.
pub fn write_images(
    samples: &[f64],
    sample_rate: u32,
    contours: &[Vec<(f64, f64)>],
    output_dir: &Path,
    config: &GeneratorConfig,
) -> Result<usize> {
    if !(config.images.split_time_ms > 0.0) {
        anyhow::bail!(
            "split_time_ms must be > 0, got {}",
            config.images.split_time_ms
        );
    }

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let spec_config = &config.spectrogram;
    let mut renderer = SpectrogramRenderer::new(spec_config.clone());
    let rasterizer = MaskRasterizer::new(spec_config);

    let length_ms = samples.len() as f64 / sample_rate as f64 * 1000.0;
    let mut written = 0;
    let mut time = 0.0;

    while time < length_ms {
        let end = (time + config.images.split_time_ms).min(length_ms);
        let window = PatchSpec::new(spec_config.min_freq_hz, spec_config.max_freq_hz, time, end);

        let rendered = renderer.render(samples, sample_rate, &window);
        if rendered.is_empty() {
            log::debug!("Skipping {:.1}-{:.1} ms: no complete frame", time, end);
            time = end;
            continue;
        }

        let mask_window = PatchSpec {
            time_end_ms: rendered.actual_end_ms,
            ..window
        };
        let mask = rasterizer.rasterize(contours, &mask_window);

        save(&patch_to_image(rendered.patch.view()), &output_dir.join(format!("{}-a.png", written)))?;
        save(&patch_to_image(mask.mask.view()), &output_dir.join(format!("{}-b.png", written)))?;

        written += 1;
        time = end;
    }

    Ok(written)
}

/// Decode one recording and write its images under
/// `<output_root>/<recording name>/`
pub fn write_recording_images(pair: &RecordingPair, output_root: &Path, config: &GeneratorConfig) -> Result<usize> {
    let audio = decode_audio(&pair.audio)?;
    let contours = load_contours(&pair.annotation)?;
    let output_dir = output_root.join(pair.name());

    let count = write_images(&audio.samples, audio.sample_rate, &contours, &output_dir, config)?;
    log::info!("Wrote {} image pairs to {}", count, output_dir.display());
    Ok(count)
}

fn save(image: &GrayImage, path: &Path) -> Result<()> {
    image
        .save(path)
        .with_context(|| format!("Failed to write image {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_patch_to_image() {
        let patch = array![[0.0f32, 1.0], [0.5, 2.0], [-1.0, 0.25]];
        let image = patch_to_image(patch.view());
        assert_eq!(image.dimensions(), (2, 3));
        assert_eq!(image.get_pixel(0, 0)[0], 0);
        assert_eq!(image.get_pixel(1, 0)[0], 255);
        assert_eq!(image.get_pixel(0, 1)[0], 128);
        assert_eq!(image.get_pixel(1, 1)[0], 255);
        assert_eq!(image.get_pixel(0, 2)[0], 0);
        assert_eq!(image.get_pixel(1, 2)[0], 64);
    }

    #[test]
    fn test_write_images_splits_recording() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = GeneratorConfig::default();
        config.images.split_time_ms = 200.0;

        // 500 ms at 192 kHz keeps the whole 5-50 kHz band below Nyquist;
        // windows 0-200, 200-400, 400-500
        let samples: Vec<f64> = (0..96000).map(|i| ((i % 17) as f64) * 50.0).collect();
        let contours = vec![vec![(0.05, 10000.0), (0.15, 12000.0)]];

        let count = write_images(&samples, 192000, &contours, dir.path(), &config).unwrap();
        assert_eq!(count, 3);

        for n in 0..3 {
            assert!(dir.path().join(format!("{}-a.png", n)).exists());
            assert!(dir.path().join(format!("{}-b.png", n)).exists());
        }

        let spectrogram = image::open(dir.path().join("0-a.png")).unwrap().to_luma8();
        let mask = image::open(dir.path().join("0-b.png")).unwrap().to_luma8();
        assert_eq!(spectrogram.dimensions(), mask.dimensions());
        assert_eq!(spectrogram.height(), 360);
        assert_eq!(spectrogram.width(), 100);
        assert!(mask.pixels().any(|p| p[0] == 255));

        let last = image::open(dir.path().join("2-b.png")).unwrap().to_luma8();
        assert_eq!(last.width(), 47);
    }

    #[test]
    fn test_write_images_below_band_nyquist() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = GeneratorConfig::default();
        config.images.split_time_ms = 200.0;

        // 16 kHz audio only reaches 8 kHz of the 5-50 kHz band
        let rate = 16000;
        let samples: Vec<f64> = (0..rate / 2)
            .map(|i| 1000.0 * (2.0 * std::f64::consts::PI * 7000.0 * i as f64 / rate as f64).sin())
            .collect();
        let contours = vec![vec![(0.0, 7000.0), (0.5, 7000.0)]];

        let count = write_images(&samples, rate as u32, &contours, dir.path(), &config).unwrap();
        assert_eq!(count, 3);

        let spectrogram = image::open(dir.path().join("0-a.png")).unwrap().to_luma8();
        let mask = image::open(dir.path().join("0-b.png")).unwrap().to_luma8();
        assert_eq!(spectrogram.dimensions(), mask.dimensions());
        assert_eq!(spectrogram.height(), 360);

        // 7 kHz is bin 56, 16 bins above 5 kHz: row 359 - 16
        let row = 359 - 16;
        let brightest = (0..spectrogram.height())
            .max_by_key(|&y| spectrogram.get_pixel(10, y)[0])
            .unwrap();
        assert_eq!(brightest, row);
        assert_eq!(mask.get_pixel(10, row)[0], 255);
    }

    #[test]
    fn test_write_images_rejects_zero_split_time() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = GeneratorConfig::default();
        config.images.split_time_ms = 0.0;

        let samples = vec![0.0; 16000];
        assert!(write_images(&samples, 16000, &[], dir.path(), &config).is_err());
    }
}
