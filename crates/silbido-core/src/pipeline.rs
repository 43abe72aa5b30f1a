//! Dataset generation
//!
//! One recording at a time: decode its contours once, plan the patch grid,
//! render spectrogram and mask for every window and push the pair into the
//! block writer. The writer is finished after the last recording so the
//! final partial block is flushed.

use crate::audio::decode_audio;
use crate::config::GeneratorConfig;
use crate::mask::MaskRasterizer;
use crate::pairing::RecordingPair;
use crate::planner::PatchGrid;
use crate::spectrogram::SpectrogramRenderer;
use anyhow::{Context, Result};
use ndarray::{s, Array2};
use serde::Serialize;
use silbido_store::{BlockSink, BlockWriter, StoreWriter};
use silbido_tonal::TonalReader;
use std::path::{Path, PathBuf};

/// Per-recording counts
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordingSummary {
    pub name: String,
    pub duration_ms: f64,
    pub contours: usize,
    pub patches: usize,
    pub positive_patches: usize,
    /// Patches padded or truncated to the configured shape
    pub conformed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationSummary {
    pub output: PathBuf,
    pub store_created: bool,
    pub rows_written: u64,
    pub blocks_flushed: usize,
    pub positive_patches: usize,
    pub recordings: Vec<RecordingSummary>,
}

/// Turns recordings into patch rows of one store
pub struct PatchGenerator<S> {
    config: GeneratorConfig,
    renderer: SpectrogramRenderer,
    rasterizer: MaskRasterizer,
    writer: BlockWriter<S>,
}

impl<S: BlockSink> PatchGenerator<S> {
    pub fn new(config: GeneratorConfig, sink: S) -> Result<Self> {
        config.validate()?;
        let writer = BlockWriter::new(sink, config.store.patches_per_block)?;

        Ok(Self {
            renderer: SpectrogramRenderer::new(config.spectrogram.clone()),
            rasterizer: MaskRasterizer::new(&config.spectrogram),
            config,
            writer,
        })
    }

    pub fn writer(&self) -> &BlockWriter<S> {
        &self.writer
    }

    /// Decode and add one recording
    pub fn add_recording(&mut self, pair: &RecordingPair) -> Result<RecordingSummary> {
        let audio = decode_audio(&pair.audio)?;
        let contours = load_contours(&pair.annotation)?;
        self.add_samples(&pair.name(), &audio.samples, audio.sample_rate, &contours)
    }

    /// Add the patches of one mono recording
    pub fn add_samples(
        &mut self,
        name: &str,
        samples: &[f64],
        sample_rate: u32,
        contours: &[Vec<(f64, f64)>],
    ) -> Result<RecordingSummary> {
        let duration_ms = samples.len() as f64 / sample_rate as f64 * 1000.0;
        let grid = PatchGrid::plan(&self.config.spectrogram, &self.config.patches, duration_ms);
        let shape = self.config.patches.shape();

        log::info!(
            "Processing {}: {:.1} s, {} contours, {} patches",
            name,
            duration_ms / 1000.0,
            contours.len(),
            grid.count()
        );

        let mut summary = RecordingSummary {
            name: name.to_string(),
            duration_ms,
            contours: contours.len(),
            ..RecordingSummary::default()
        };

        for window in grid.iter() {
            let rendered = self.renderer.render(samples, sample_rate, &window);
            let mask = self.rasterizer.rasterize(contours, &window);

            let (spectrogram, spec_changed) = conform(rendered.patch, shape);
            let (label, mask_changed) = conform(mask.mask, shape);
            if spec_changed || mask_changed {
                log::debug!(
                    "Conformed patch at {:.0} Hz, {:.0} ms of {} to {:?}",
                    window.freq_start_hz,
                    window.time_start_ms,
                    name,
                    shape
                );
                summary.conformed += 1;
            }

            self.writer
                .push(spectrogram.view(), label.view(), mask.positive_flag)
                .with_context(|| format!("Failed to store patch of {}", name))?;

            summary.patches += 1;
            if mask.positive_flag {
                summary.positive_patches += 1;
            }
        }

        Ok(summary)
    }

    /// Flush the final partial block and return the sink
    pub fn finish(self) -> Result<S> {
        Ok(self.writer.finish()?)
    }
}

/// All contours of an annotation file as (time_s, freq_hz) pairs
pub fn load_contours(path: &Path) -> Result<Vec<Vec<(f64, f64)>>> {
    let mut reader = TonalReader::open(path)?;
    reader
        .time_frequency_contours()
        .with_context(|| format!("Failed to decode annotations: {}", path.display()))
}

/// Pad with zeros or truncate `patch` to `shape`, keeping its top-left
/// corner. Returns whether the shape changed.
pub fn conform(patch: Array2<f32>, shape: (usize, usize)) -> (Array2<f32>, bool) {
    if patch.dim() == shape {
        return (patch, false);
    }

    let rows = patch.nrows().min(shape.0);
    let cols = patch.ncols().min(shape.1);
    let mut conformed = Array2::zeros(shape);
    conformed
        .slice_mut(s![..rows, ..cols])
        .assign(&patch.slice(s![..rows, ..cols]));
    (conformed, true)
}

/// Generate the patch store `output` from `pairs`
pub fn generate_dataset(
    pairs: &[RecordingPair],
    output: &Path,
    config: &GeneratorConfig,
) -> Result<GenerationSummary> {
    let sink = StoreWriter::new(output, config.store.options());
    let mut generator = PatchGenerator::new(config.clone(), sink)?;

    let mut recordings = Vec::with_capacity(pairs.len());
    for (index, pair) in pairs.iter().enumerate() {
        log::info!(
            "Processing audio file {}/{}: {}",
            index + 1,
            pairs.len(),
            pair.audio.display()
        );
        let summary = generator
            .add_recording(pair)
            .with_context(|| format!("Failed to process {}", pair.audio.display()))?;
        recordings.push(summary);
    }

    let blocks_flushed_before = generator.writer().flushes();
    let buffered = generator.writer().buffered();
    let sink = generator.finish()?;
    let blocks_flushed = blocks_flushed_before + usize::from(buffered > 0);

    let summary = GenerationSummary {
        output: output.to_path_buf(),
        store_created: sink.is_created(),
        rows_written: sink.rows(),
        blocks_flushed,
        positive_patches: recordings.iter().map(|r| r.positive_patches).sum(),
        recordings,
    };

    log::info!(
        "Wrote {} patches ({} positive) to {} in {} blocks",
        summary.rows_written,
        summary.positive_patches,
        output.display(),
        summary.blocks_flushed
    );
    if !summary.store_created {
        log::warn!("No patches generated; {} was not created", output.display());
    }

    Ok(summary)
}
