//! patchimages - Write spectrogram/mask PNG pairs for visual inspection
//!
//! Usage: patchimages --audio-dir <dir> --annotation-dir <dir> --output-dir <dir>

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use silbido_cli::output::print_json;
use silbido_cli::{init_logging, ConfigArgs};
use silbido_core::images::write_recording_images;
use silbido_core::pair_recordings;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "patchimages")]
#[command(about = "Render spectrogram and mask images of annotated recordings", long_about = None)]
struct Args {
    /// Directory of the .wav/.flac recordings
    #[arg(long)]
    audio_dir: PathBuf,

    /// Directory of the .bin annotation files
    #[arg(long)]
    annotation_dir: PathBuf,

    /// Root directory for the images, one subdirectory per recording
    #[arg(long)]
    output_dir: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,

    /// ms, length of each image
    #[arg(long)]
    split_time: Option<f64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct RecordingImages {
    name: String,
    image_pairs: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = args.config.load()?;
    if let Some(split_time) = args.split_time {
        config.images.split_time_ms = split_time;
    }
    config.validate()?;

    let pairs = pair_recordings(&args.audio_dir, &args.annotation_dir)?;
    let mut written = Vec::with_capacity(pairs.len());
    for pair in &pairs {
        let image_pairs = write_recording_images(pair, &args.output_dir, &config)?;
        written.push(RecordingImages {
            name: pair.name(),
            image_pairs,
        });
    }

    print_json(&written);
    Ok(())
}
