//! Silbido Core - Whistle Patch Dataset Library
//!
//! Turns long underwater recordings and their annotated tonal contours into
//! fixed-size (spectrogram, mask) training patches.

pub mod audio;
pub mod config;
pub mod framing;
pub mod images;
pub mod mask;
pub mod pairing;
pub mod pipeline;
pub mod planner;
pub mod spectrogram;

pub use config::{GeneratorConfig, ImageConfig, PatchConfig, SpectrogramConfig, StoreConfig};
pub use framing::{frame_signal, Frames, FramingError};
pub use mask::{MaskPatch, MaskRasterizer};
pub use pairing::{pair_recordings, PairingError, RecordingPair};
pub use pipeline::{generate_dataset, GenerationSummary, PatchGenerator, RecordingSummary};
pub use planner::{plan_patches, PatchGrid, PatchSpec};
pub use spectrogram::{RenderedSpectrogram, SpectrogramRenderer};

/// Generate a patch store from every annotated recording under the given
/// directories
pub fn generate_from_dirs(
    audio_dir: &std::path::Path,
    annotation_dir: &std::path::Path,
    output: &std::path::Path,
    config: &GeneratorConfig,
) -> anyhow::Result<GenerationSummary> {
    let pairs = pair_recordings(audio_dir, annotation_dir)?;
    generate_dataset(&pairs, output, config)
}
