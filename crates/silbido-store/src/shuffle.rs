//! Row shuffling
//!
//! One seeded permutation is applied to all three arrays, so row `i` of
//! `data`, `label` and `positive_flag` still describe the same patch after
//! the shuffle. The whole store is held in memory while it is rewritten.

use crate::block::BlockWriter;
use crate::error::{Result, StoreError};
use crate::reader::StoreReader;
use crate::writer::{StoreOptions, StoreWriter};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShuffleSummary {
    pub rows: u64,
    pub seed: u64,
}

/// Permutation of `0..rows` determined by `seed`
pub fn permutation(rows: usize, seed: u64) -> Vec<usize> {
    let mut order: Vec<usize> = (0..rows).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));
    order
}

/// Write the rows of `input` to `output` in shuffled order.
///
/// `output` may equal `input`; the store is then replaced once the
/// shuffled copy is complete.
pub fn shuffle_store(
    input: &Path,
    output: &Path,
    seed: u64,
    block_size: usize,
    options: StoreOptions,
) -> Result<ShuffleSummary> {
    let reader = StoreReader::open(input)?;
    let rows = reader.len();
    let all = reader.read_all()?;
    drop(reader);

    log::info!(
        "Shuffling {} rows of {} with seed {}",
        rows,
        input.display(),
        seed
    );

    let in_place = same_file(input, output);
    let target = if in_place {
        output.with_extension("shuffling")
    } else {
        output.to_path_buf()
    };

    let mut writer = BlockWriter::new(StoreWriter::new(&target, options), block_size)?;
    for index in permutation(all.rows(), seed) {
        let (spectrogram, mask, positive) = all.row(index);
        writer.push(spectrogram, mask, positive)?;
    }
    let sink = writer.finish()?;

    if in_place && sink.is_created() {
        fs::rename(&target, output).map_err(|source| StoreError::File {
            action: "replace patch store",
            path: output.to_path_buf(),
            source,
        })?;
    }

    Ok(ShuffleSummary { rows, seed })
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permutation_is_deterministic() {
        assert_eq!(permutation(50, 7), permutation(50, 7));
        assert_ne!(permutation(50, 7), permutation(50, 8));
    }

    #[test]
    fn test_permutation_covers_every_row() {
        let mut order = permutation(100, 1234);
        order.sort_unstable();
        assert_eq!(order, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_permutation() {
        assert!(permutation(0, 1).is_empty());
    }
}
