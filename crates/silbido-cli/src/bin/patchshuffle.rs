//! patchshuffle - Shuffle the rows of a patch store
//!
//! Usage: patchshuffle <input> [--output <file>] [--seed <n>]

use anyhow::Result;
use clap::Parser;
use silbido_cli::init_logging;
use silbido_cli::output::print_json;
use silbido_store::{shuffle_store, StoreOptions};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "patchshuffle")]
#[command(about = "Shuffle the rows of a patch store", long_about = None)]
struct Args {
    /// Patch store to shuffle
    input: PathBuf,

    /// Shuffled store (default: replace the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seed for the permutation (default: random)
    #[arg(long)]
    seed: Option<u64>,

    /// Rows per block of the shuffled store
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

    let output = args.output.clone().unwrap_or_else(|| args.input.clone());
    let seed = args.seed.unwrap_or_else(rand::random);
    let options = StoreOptions {
        compress: !args.no_compress,
        ..StoreOptions::default()
    };

    let summary = shuffle_store(&args.input, &output, seed, args.block_size, options)?;

    print_json(&serde_json::json!({
        "input": args.input,
        "output": output,
        "rows": summary.rows,
        "seed": summary.seed,
    }));
    Ok(())
}
