//! tonalinfo - Describe tonal annotation files
//!
//! Usage: tonalinfo <file.bin>...

use anyhow::{Context, Result};
use clap::Parser;
use silbido_cli::init_logging;
use silbido_cli::output::{print_json, TonalFileSummary};
use silbido_tonal::TonalReader;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "tonalinfo")]
#[command(about = "Print header and contour statistics of tonal annotation files", long_about = None)]
struct Args {
    /// Annotation files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let summaries = args
        .files
        .iter()
        .map(|path| describe(path))
        .collect::<Result<Vec<_>>>()?;

    print_json(&summaries);
    Ok(())
}

fn describe(path: &Path) -> Result<TonalFileSummary> {
    let reader = TonalReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut summary = TonalFileSummary::new(path, reader.header());

    for tonal in reader {
        let tonal = tonal.with_context(|| format!("Failed to read {}", path.display()))?;
        summary.add(&tonal);
    }

    log::info!("{}: {} tonals", path.display(), summary.tonals);
    Ok(summary)
}
