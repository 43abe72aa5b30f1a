//! patchgen - Spectrogram/mask patch store generator
//!
//! Usage: patchgen --audio-dir <dir> --annotation-dir <dir> --output-file <file>

use anyhow::{Context, Result};
use clap::Parser;
use silbido_cli::output::print_json;
use silbido_cli::{init_logging, ConfigArgs, PatchArgs};
use silbido_core::generate_from_dirs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "patchgen")]
#[command(about = "Generate a patch store of spectrograms and contour masks", long_about = None)]
struct Args {
    /// Directory of the .wav/.flac recordings
    #[arg(long)]
    audio_dir: PathBuf,

    /// Directory of the .bin annotation files
    #[arg(long)]
    annotation_dir: PathBuf,

    /// Patch store to create
    #[arg(long)]
    output_file: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    patches: PatchArgs,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = args.config.load()?;
    args.patches.apply(&mut config);

    if let Some(parent) = args.output_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let summary = generate_from_dirs(&args.audio_dir, &args.annotation_dir, &args.output_file, &config)?;

    print_json(&summary);
    Ok(())
}
