//! patchsplit - Split a patch store by positive flag
//!
//! Usage: patchsplit <input> <output_dir>

use anyhow::{Context, Result};
use clap::Parser;
use silbido_cli::init_logging;
use silbido_cli::output::print_json;
use silbido_store::{split_store, StoreOptions};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "patchsplit")]
#[command(about = "Split a patch store into positive and negative stores", long_about = None)]
struct Args {
    /// Patch store to split
    input: PathBuf,

    /// Directory for the two output stores
    output_dir: PathBuf,

    /// File name of the store of patches with a contour
    #[arg(long, default_value = "pos.patches")]
    positive_file_name: String,

    /// File name of the store of patches without a contour
    #[arg(long, default_value = "neg.patches")]
    negative_file_name: String,

    /// Rows per block of the output stores
    #[arg(long, default_value_t = 128)]
    block_size: usize,

    /// Store block payloads uncompressed
    #[arg(long)]
    no_compress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;

    let positive = args.output_dir.join(&args.positive_file_name);
    let negative = args.output_dir.join(&args.negative_file_name);
    let options = StoreOptions {
        compress: !args.no_compress,
        ..StoreOptions::default()
    };

    let summary = split_store(&args.input, &positive, &negative, args.block_size, options)?;

    print_json(&serde_json::json!({
        "input": args.input,
        "positive": {
            "path": positive,
            "rows": summary.positive_rows,
            "created": summary.positive_rows > 0,
        },
        "negative": {
            "path": negative,
            "rows": summary.negative_rows,
            "created": summary.negative_rows > 0,
        },
    }));
    Ok(())
}
