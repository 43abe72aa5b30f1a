//! Shared command-line plumbing for the patch tools

pub mod output;

use anyhow::Result;
use clap::Args;
use silbido_core::GeneratorConfig;
use std::path::PathBuf;

/// Initialize logger.
///
/// Default: no logs (clean JSON output for parsing).
/// Verbose: Info level logs for debugging.
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Off
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

/// Generator settings: an optional TOML file, then per-flag overrides
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigArgs {
    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// ms, length of time for one time window for dft
    #[arg(long)]
    pub frame_time_span: Option<f64>,

    /// ms, length of time step for spectrogram
    #[arg(long)]
    pub step_time_span: Option<f64>,

    /// log magnitude spectrogram min-max normalization, minimum value
    #[arg(long, allow_negative_numbers = true)]
    pub spec_clip_min: Option<f64>,

    /// log magnitude spectrogram min-max normalization, maximum value
    #[arg(long, allow_negative_numbers = true)]
    pub spec_clip_max: Option<f64>,

    /// Hz, lower bound of frequency for spectrogram
    #[arg(long)]
    pub min_freq: Option<f64>,

    /// Hz, upper bound of frequency for spectrogram
    #[arg(long)]
    pub max_freq: Option<f64>,
}

impl ConfigArgs {
    /// Configuration file (or defaults) with the flags applied on top
    pub fn load(&self) -> Result<GeneratorConfig> {
        let mut config = match &self.config {
            Some(path) => GeneratorConfig::load(path)?,
            None => GeneratorConfig::default(),
        };

        let spectrogram = &mut config.spectrogram;
        override_with(&mut spectrogram.frame_time_span_ms, self.frame_time_span);
        override_with(&mut spectrogram.step_time_span_ms, self.step_time_span);
        override_with(&mut spectrogram.clip_min, self.spec_clip_min);
        override_with(&mut spectrogram.clip_max, self.spec_clip_max);
        override_with(&mut spectrogram.min_freq_hz, self.min_freq);
        override_with(&mut spectrogram.max_freq_hz, self.max_freq);

        Ok(config)
    }
}

/// Patch grid and block settings of `patchgen`
#[derive(Args, Debug, Default, Clone)]
pub struct PatchArgs {
    /// number of time frames, the length of each datum
    #[arg(long)]
    pub time_patch_frames: Option<usize>,

    /// number of frequency frames, the height of each datum
    #[arg(long)]
    pub freq_patch_frames: Option<usize>,

    /// number of frames, the time distance between patches
    #[arg(long)]
    pub time_patch_advance: Option<usize>,

    /// number of frames, the frequency distance between patches
    #[arg(long)]
    pub freq_patch_advance: Option<usize>,

    /// patches computed before each write. Does not affect output, only RAM use
    #[arg(long)]
    pub patches_per_block: Option<usize>,

    /// Store block payloads uncompressed
    #[arg(long)]
    pub no_compress: bool,
}

impl PatchArgs {
    pub fn apply(&self, config: &mut GeneratorConfig) {
        let patches = &mut config.patches;
        override_with(&mut patches.time_patch_frames, self.time_patch_frames);
        override_with(&mut patches.freq_patch_frames, self.freq_patch_frames);
        override_with(&mut patches.time_patch_advance, self.time_patch_advance);
        override_with(&mut patches.freq_patch_advance, self.freq_patch_advance);
        override_with(&mut config.store.patches_per_block, self.patches_per_block);
        if self.no_compress {
            config.store.compress = false;
        }
    }
}

fn override_with<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}
