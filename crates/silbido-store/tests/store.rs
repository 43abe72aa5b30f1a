use ndarray::Array2;
use silbido_store::{
    shuffle_store, split_store, BlockWriter, StoreError, StoreOptions, StoreReader, StoreWriter,
};
use std::fs;
use std::io::Write;
use std::path::Path;

const SHAPE: (usize, usize) = (4, 6);

/// Patch `i` is filled with `i`, its mask with `i % 2`
fn patch(i: usize) -> (Array2<f32>, Array2<f32>, bool) {
    let positive = i % 2 == 1;
    let mask = Array2::from_elem(SHAPE, if positive { 1.0 } else { 0.0 });
    (Array2::from_elem(SHAPE, i as f32), mask, positive)
}

fn write_store(path: &Path, count: usize, capacity: usize, options: StoreOptions) -> StoreWriter {
    let mut writer = BlockWriter::new(StoreWriter::new(path, options), capacity).unwrap();
    for i in 0..count {
        let (spectrogram, mask, positive) = patch(i);
        writer.push(spectrogram.view(), mask.view(), positive).unwrap();
    }
    writer.finish().unwrap()
}

#[test]
fn test_store_row_count_matches_patch_count() {
    let dir = tempfile::tempdir().unwrap();

    for (count, capacity) in [(1, 1), (5, 2), (8, 4), (9, 4), (3, 10), (17, 3)] {
        let path = dir.path().join(format!("p{}_c{}.patches", count, capacity));
        write_store(&path, count, capacity, StoreOptions::default());

        let reader = StoreReader::open(&path).unwrap();
        assert_eq!(reader.len(), count as u64);
        assert_eq!(reader.shape(), SHAPE);
        assert_eq!(reader.num_blocks(), count.div_ceil(capacity));

        let all = reader.read_all().unwrap();
        assert_eq!(all.rows(), count);
        for i in 0..count {
            let (spectrogram, mask, positive) = all.row(i);
            assert!(spectrogram.iter().all(|&v| v == i as f32));
            assert_eq!(positive, i % 2 == 1);
            assert_eq!(mask[[0, 0]], if positive { 1.0 } else { 0.0 });
        }
    }
}

#[test]
fn test_no_patches_creates_no_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.patches");

    let sink = write_store(&path, 0, 4, StoreOptions::default());
    assert!(!sink.is_created());
    assert!(!path.exists());
}

#[test]
fn test_uncompressed_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("raw.patches");
    let options = StoreOptions {
        compress: false,
        ..StoreOptions::default()
    };

    write_store(&path, 6, 4, options);

    let reader = StoreReader::open(&path).unwrap();
    assert!(!reader.header().is_compressed());
    assert_eq!(reader.positive_flags().unwrap(), vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);

    // 64 byte header, two 40 byte block headers, raw f32 payloads
    let values = 6 * (2 * SHAPE.0 * SHAPE.1 + 1);
    let expected = 64 + 2 * 40 + 4 * values;
    assert_eq!(fs::metadata(&path).unwrap().len(), expected as u64);
}

#[test]
fn test_append_discards_bytes_after_last_block() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("torn.patches");
    let options = StoreOptions {
        compress: false,
        ..StoreOptions::default()
    };

    let mut writer = BlockWriter::new(StoreWriter::new(&path, options), 2).unwrap();
    for i in 0..2 {
        let (spectrogram, mask, positive) = patch(i);
        writer.push(spectrogram.view(), mask.view(), positive).unwrap();
    }

    // leftovers of an interrupted block write
    let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(b"BLK0 partial block").unwrap();
    drop(file);

    for i in 2..4 {
        let (spectrogram, mask, positive) = patch(i);
        writer.push(spectrogram.view(), mask.view(), positive).unwrap();
    }
    writer.finish().unwrap();

    let reader = StoreReader::open(&path).unwrap();
    assert_eq!(reader.len(), 4);
    assert_eq!(reader.num_blocks(), 2);
    let all = reader.read_all().unwrap();
    for i in 0..4 {
        assert!(all.row(i).0.iter().all(|&v| v == i as f32));
    }

    let values = 4 * (2 * SHAPE.0 * SHAPE.1 + 1);
    let expected = 64 + 2 * 40 + 4 * values;
    assert_eq!(fs::metadata(&path).unwrap().len(), expected as u64);
}

#[test]
fn test_corrupt_payload_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.patches");
    write_store(
        &path,
        2,
        2,
        StoreOptions {
            compress: false,
            ..StoreOptions::default()
        },
    );

    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    fs::write(&path, &bytes).unwrap();

    let reader = StoreReader::open(&path).unwrap();
    assert!(matches!(
        reader.read_block(0),
        Err(StoreError::Checksum { block: 0 })
    ));
}

#[test]
fn test_not_a_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bogus.patches");
    fs::write(&path, vec![0u8; 128]).unwrap();

    assert!(matches!(
        StoreReader::open(&path),
        Err(StoreError::BadMagic { .. })
    ));
}

#[test]
fn test_shuffle_keeps_rows_together() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("ordered.patches");
    let output = dir.path().join("shuffled.patches");
    write_store(&input, 23, 5, StoreOptions::default());

    let summary = shuffle_store(&input, &output, 99, 4, StoreOptions::default()).unwrap();
    assert_eq!(summary.rows, 23);
    assert_eq!(summary.seed, 99);

    let shuffled = StoreReader::open(&output).unwrap().read_all().unwrap();
    assert_eq!(shuffled.rows(), 23);

    let mut seen = Vec::new();
    for i in 0..shuffled.rows() {
        let (spectrogram, mask, positive) = shuffled.row(i);
        let original = spectrogram[[0, 0]] as usize;
        assert_eq!(positive, original % 2 == 1);
        assert_eq!(mask[[1, 1]], if positive { 1.0 } else { 0.0 });
        seen.push(original);
    }

    assert_ne!(seen, (0..23).collect::<Vec<_>>());
    seen.sort_unstable();
    assert_eq!(seen, (0..23).collect::<Vec<_>>());
}

#[test]
fn test_shuffle_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.patches");
    write_store(&path, 10, 3, StoreOptions::default());

    shuffle_store(&path, &path, 5, 3, StoreOptions::default()).unwrap();

    let reader = StoreReader::open(&path).unwrap();
    assert_eq!(reader.len(), 10);
    assert!(!path.with_extension("shuffling").exists());
}

#[test]
fn test_split_by_positive_flag() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("all.patches");
    let positive = dir.path().join("pos.patches");
    let negative = dir.path().join("neg.patches");
    write_store(&input, 11, 4, StoreOptions::default());

    let summary = split_store(&input, &positive, &negative, 4, StoreOptions::default()).unwrap();
    assert_eq!(summary.positive_rows, 5);
    assert_eq!(summary.negative_rows, 6);

    let pos = StoreReader::open(&positive).unwrap();
    assert!(pos.positive_flags().unwrap().iter().all(|&f| f == 1.0));
    let pos_all = pos.read_all().unwrap();
    let values: Vec<f32> = (0..pos_all.rows()).map(|i| pos_all.row(i).0[[0, 0]]).collect();
    assert_eq!(values, vec![1.0, 3.0, 5.0, 7.0, 9.0]);

    let neg = StoreReader::open(&negative).unwrap();
    assert_eq!(neg.len(), 6);
    assert!(neg.positive_flags().unwrap().iter().all(|&f| f == 0.0));
}

#[test]
fn test_split_without_positives() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("all.patches");
    let positive = dir.path().join("pos.patches");
    let negative = dir.path().join("neg.patches");
    write_store(&input, 1, 4, StoreOptions::default());

    let summary = split_store(&input, &positive, &negative, 4, StoreOptions::default()).unwrap();
    assert_eq!(summary.positive_rows, 0);
    assert_eq!(summary.negative_rows, 1);
    assert!(!positive.exists());
}
